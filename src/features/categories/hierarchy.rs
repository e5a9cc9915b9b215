//! Rules that keep the category forest well formed.
//!
//! Every check takes the store handle explicitly so the same rules run
//! against PostgreSQL in production and the in-memory store in tests.

use thiserror::Error;
use uuid::Uuid;

use crate::core::config::HierarchyConfig;
use crate::core::error::{AppError, Result};
use crate::features::categories::models::Category;
use crate::features::categories::repositories::CategoryStore;
use crate::shared::validation::{SLUG_REGEX, SLUG_SEPARATOR_REGEX};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HierarchyError {
    #[error("Category {0} not found")]
    CategoryNotFound(Uuid),

    #[error("Parent category {0} not found")]
    ParentNotFound(Uuid),

    #[error("Category cannot be its own parent")]
    SelfParent(Uuid),

    #[error("Circular reference detected in category hierarchy: {parent_id} descends from {category_id}")]
    CircularReference { category_id: Uuid, parent_id: Uuid },

    #[error("Cannot delete category with subcategories. Delete subcategories first or reassign them.")]
    HasChildren(Uuid),

    #[error("Category hierarchy above {start} is deeper than {max_depth} levels")]
    CorruptHierarchy { start: Uuid, max_depth: usize },
}

impl HierarchyError {
    pub fn code(&self) -> &'static str {
        match self {
            HierarchyError::CategoryNotFound(_) | HierarchyError::ParentNotFound(_) => "NOT_FOUND",
            HierarchyError::SelfParent(_) => "SELF_PARENT",
            HierarchyError::CircularReference { .. } => "CIRCULAR_REFERENCE",
            HierarchyError::HasChildren(_) => "HAS_CHILDREN",
            HierarchyError::CorruptHierarchy { .. } => "CORRUPT_HIERARCHY",
        }
    }
}

/// Lowercase the name and collapse every run of non `[a-z0-9]` characters to one hyphen
pub fn derive_slug(name: &str) -> String {
    let slug = SLUG_SEPARATOR_REGEX
        .replace_all(&name.to_lowercase(), "-")
        .into_owned();
    debug_assert!(SLUG_REGEX.is_match(&slug), "malformed slug {:?}", slug);
    slug
}

/// Depth below `parent`, roots sit at 0
pub fn derive_level(parent: Option<&Category>) -> i32 {
    parent.map_or(0, |p| p.level + 1)
}

#[derive(Debug, Clone, Copy)]
pub struct CategoryHierarchy {
    max_depth: usize,
}

impl CategoryHierarchy {
    pub fn new(config: HierarchyConfig) -> Self {
        Self {
            max_depth: config.max_depth.max(1),
        }
    }

    /// Reject a level at or beyond the configured depth bound, so saved
    /// levels always stay within reach of the `check_circular` walk
    pub fn check_depth(&self, level: i32) -> Result<()> {
        if usize::try_from(level).is_ok_and(|l| l >= self.max_depth) {
            return Err(AppError::Validation(format!(
                "Category hierarchy cannot be deeper than {} levels",
                self.max_depth
            )));
        }
        Ok(())
    }

    /// Resolve `parent_id` to its record, failing if it is set but unknown
    pub async fn validate_parent(
        &self,
        store: &dyn CategoryStore,
        parent_id: Option<Uuid>,
    ) -> Result<Option<Category>> {
        let Some(parent_id) = parent_id else {
            return Ok(None);
        };

        match store.find_by_id(parent_id).await? {
            Some(parent) => Ok(Some(parent)),
            None => Err(HierarchyError::ParentNotFound(parent_id).into()),
        }
    }

    /// Reject moving `category_id` under `candidate_parent_id` when that would
    /// make the category its own ancestor.
    ///
    /// Walks up from the candidate parent. A missing node or a root ends the walk.
    pub async fn check_circular(
        &self,
        store: &dyn CategoryStore,
        category_id: Uuid,
        candidate_parent_id: Uuid,
    ) -> Result<()> {
        if category_id == candidate_parent_id {
            return Err(HierarchyError::SelfParent(category_id).into());
        }

        let mut current = candidate_parent_id;
        for _ in 0..self.max_depth {
            let Some(node) = store.find_by_id(current).await? else {
                return Ok(());
            };

            match node.parent_id {
                Some(parent_id) if parent_id == category_id => {
                    return Err(HierarchyError::CircularReference {
                        category_id,
                        parent_id: candidate_parent_id,
                    }
                    .into());
                }
                Some(parent_id) => current = parent_id,
                None => return Ok(()),
            }
        }

        Err(HierarchyError::CorruptHierarchy {
            start: candidate_parent_id,
            max_depth: self.max_depth,
        }
        .into())
    }
}

impl Default for CategoryHierarchy {
    fn default() -> Self {
        Self::new(HierarchyConfig::default())
    }
}
