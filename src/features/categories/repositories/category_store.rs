use async_trait::async_trait;
use uuid::Uuid;

use crate::core::error::Result;
use crate::features::categories::models::{Category, CategoryChanges, CategoryFilter, CategorySort};

/// Document-store interface for category persistence.
///
/// Implementations hold no hierarchy rules of their own; parent validation,
/// cycle detection and derived fields are handled before a record gets here.
#[async_trait]
pub trait CategoryStore: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Category>>;

    /// Fetch every category whose id is in `ids`, in no particular order
    async fn find_by_ids(&self, ids: &[Uuid]) -> Result<Vec<Category>>;

    /// Matching categories in `sort` order, skipping `skip` and returning at most `limit`
    async fn find(
        &self,
        filter: &CategoryFilter,
        sort: CategorySort,
        skip: i64,
        limit: Option<i64>,
    ) -> Result<Vec<Category>>;

    async fn count(&self, filter: &CategoryFilter) -> Result<i64>;

    async fn insert(&self, category: Category) -> Result<Category>;

    /// Returns the updated record, or `None` if `id` does not exist
    async fn update_by_id(&self, id: Uuid, changes: CategoryChanges) -> Result<Option<Category>>;

    /// Returns whether a record was removed
    async fn delete_by_id(&self, id: Uuid) -> Result<bool>;
}
