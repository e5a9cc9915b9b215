use serde::Deserialize;
use std::str::FromStr;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::features::categories::models::Category;
use crate::shared::constants::ROOT_PARENT_SENTINEL;

/// Which parent a category must hang under to match a filter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParentFilter {
    Root,
    Id(Uuid),
}

impl ParentFilter {
    pub fn as_parent_id(&self) -> Option<Uuid> {
        match self {
            ParentFilter::Root => None,
            ParentFilter::Id(id) => Some(*id),
        }
    }
}

impl FromStr for ParentFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == ROOT_PARENT_SENTINEL {
            return Ok(ParentFilter::Root);
        }
        Uuid::parse_str(s)
            .map(ParentFilter::Id)
            .map_err(|_| format!("parentId must be a category id or '{}'", ROOT_PARENT_SENTINEL))
    }
}

/// Conjunction of optional predicates over categories
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CategoryFilter {
    /// Case-insensitive substring of the name
    pub name: Option<String>,
    pub parent: Option<ParentFilter>,
    pub is_active: Option<bool>,
}

impl CategoryFilter {
    pub fn children_of(parent_id: Uuid) -> Self {
        Self {
            parent: Some(ParentFilter::Id(parent_id)),
            ..Default::default()
        }
    }

    pub fn matches(&self, category: &Category) -> bool {
        if let Some(ref name) = self.name {
            if !category.name.to_lowercase().contains(&name.to_lowercase()) {
                return false;
            }
        }
        if let Some(parent) = self.parent {
            if category.parent_id != parent.as_parent_id() {
                return false;
            }
        }
        if let Some(is_active) = self.is_active {
            if category.is_active != is_active {
                return false;
            }
        }
        true
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub enum SortField {
    #[default]
    Name,
    Slug,
    Level,
    CreatedAt,
    UpdatedAt,
}

impl SortField {
    pub fn as_column(&self) -> &'static str {
        match self {
            SortField::Name => "name",
            SortField::Slug => "slug",
            SortField::Level => "level",
            SortField::CreatedAt => "created_at",
            SortField::UpdatedAt => "updated_at",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl SortDirection {
    pub fn as_sql(&self) -> &'static str {
        match self {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CategorySort {
    pub field: SortField,
    pub direction: SortDirection,
}

impl CategorySort {
    pub fn by_name() -> Self {
        Self::default()
    }

    /// Total order over categories, ties broken by id
    pub fn compare(&self, a: &Category, b: &Category) -> std::cmp::Ordering {
        let ordering = match self.field {
            SortField::Name => a.name.cmp(&b.name),
            SortField::Slug => a.slug.cmp(&b.slug),
            SortField::Level => a.level.cmp(&b.level),
            SortField::CreatedAt => a.created_at.cmp(&b.created_at),
            SortField::UpdatedAt => a.updated_at.cmp(&b.updated_at),
        };
        let ordering = match self.direction {
            SortDirection::Asc => ordering,
            SortDirection::Desc => ordering.reverse(),
        };
        ordering.then_with(|| a.id.cmp(&b.id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn category(name: &str, parent_id: Option<Uuid>, is_active: bool) -> Category {
        let now = Utc::now();
        Category {
            id: Uuid::now_v7(),
            parent_id,
            name: name.to_string(),
            slug: name.to_lowercase(),
            description: None,
            image_url: String::new(),
            level: 0,
            is_active,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_parent_filter_parse() {
        assert_eq!("null".parse::<ParentFilter>(), Ok(ParentFilter::Root));

        let id = Uuid::now_v7();
        assert_eq!(
            id.to_string().parse::<ParentFilter>(),
            Ok(ParentFilter::Id(id))
        );
        assert!("root".parse::<ParentFilter>().is_err());
        assert!("".parse::<ParentFilter>().is_err());
    }

    #[test]
    fn test_filter_matches_name_case_insensitively() {
        let filter = CategoryFilter {
            name: Some("GARD".to_string()),
            ..Default::default()
        };
        assert!(filter.matches(&category("Home & Garden", None, true)));
        assert!(!filter.matches(&category("Books", None, true)));
    }

    #[test]
    fn test_filter_matches_parent_and_active() {
        let parent = Uuid::now_v7();
        let child = category("Child", Some(parent), false);
        let root = category("Root", None, true);

        let roots = CategoryFilter {
            parent: Some(ParentFilter::Root),
            ..Default::default()
        };
        assert!(roots.matches(&root));
        assert!(!roots.matches(&child));

        assert!(CategoryFilter::children_of(parent).matches(&child));

        let active = CategoryFilter {
            is_active: Some(true),
            ..Default::default()
        };
        assert!(active.matches(&root));
        assert!(!active.matches(&child));
    }

    #[test]
    fn test_sort_compare_desc_and_tie_break() {
        let a = category("Alpha", None, true);
        let b = category("Beta", None, true);
        let desc = CategorySort {
            field: SortField::Name,
            direction: SortDirection::Desc,
        };
        assert_eq!(desc.compare(&a, &b), std::cmp::Ordering::Greater);

        let mut twin = a.clone();
        twin.id = Uuid::now_v7();
        assert_eq!(
            CategorySort::by_name().compare(&a, &twin),
            a.id.cmp(&twin.id)
        );
    }
}
