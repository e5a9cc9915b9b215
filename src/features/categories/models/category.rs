use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

/// Database model for category
#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct Category {
    pub id: Uuid,
    pub parent_id: Option<Uuid>,
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub image_url: String,
    pub level: i32,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Category {
    /// Apply a partial update in place
    pub fn apply(&mut self, changes: CategoryChanges) {
        if let Some(name) = changes.name {
            self.name = name;
        }
        if let Some(slug) = changes.slug {
            self.slug = slug;
        }
        if let Some(description) = changes.description {
            self.description = description;
        }
        if let Some(image_url) = changes.image_url {
            self.image_url = image_url;
        }
        if let Some(parent_id) = changes.parent_id {
            self.parent_id = parent_id;
        }
        if let Some(level) = changes.level {
            self.level = level;
        }
        if let Some(is_active) = changes.is_active {
            self.is_active = is_active;
        }
        self.updated_at = changes.updated_at;
    }
}

/// Field-level update for a single category.
///
/// `None` leaves a field untouched. For the nullable columns the inner
/// `Option` is the new value, so `Some(None)` clears it.
#[derive(Debug, Clone, PartialEq)]
pub struct CategoryChanges {
    pub name: Option<String>,
    pub slug: Option<String>,
    pub description: Option<Option<String>>,
    pub image_url: Option<String>,
    pub parent_id: Option<Option<Uuid>>,
    pub level: Option<i32>,
    pub is_active: Option<bool>,
    pub updated_at: DateTime<Utc>,
}

impl CategoryChanges {
    /// An update that only refreshes `updated_at`
    pub fn touch(updated_at: DateTime<Utc>) -> Self {
        Self {
            name: None,
            slug: None,
            description: None,
            image_url: None,
            parent_id: None,
            level: None,
            is_active: None,
            updated_at,
        }
    }
}
