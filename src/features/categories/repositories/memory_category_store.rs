use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::core::error::Result;
use crate::features::categories::models::{Category, CategoryChanges, CategoryFilter, CategorySort};
use crate::features::categories::repositories::CategoryStore;

/// Process-local store, used with `STORAGE_BACKEND=memory` and in tests
#[derive(Debug, Default)]
pub struct InMemoryCategoryStore {
    categories: RwLock<HashMap<Uuid, Category>>,
}

impl InMemoryCategoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CategoryStore for InMemoryCategoryStore {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Category>> {
        Ok(self.categories.read().await.get(&id).cloned())
    }

    async fn find_by_ids(&self, ids: &[Uuid]) -> Result<Vec<Category>> {
        let categories = self.categories.read().await;
        Ok(ids
            .iter()
            .filter_map(|id| categories.get(id).cloned())
            .collect())
    }

    async fn find(
        &self,
        filter: &CategoryFilter,
        sort: CategorySort,
        skip: i64,
        limit: Option<i64>,
    ) -> Result<Vec<Category>> {
        let mut matched: Vec<Category> = self
            .categories
            .read()
            .await
            .values()
            .filter(|c| filter.matches(c))
            .cloned()
            .collect();

        matched.sort_by(|a, b| sort.compare(a, b));

        let skip = usize::try_from(skip.max(0)).unwrap_or(usize::MAX);
        let limit = limit
            .map(|l| usize::try_from(l.max(0)).unwrap_or(usize::MAX))
            .unwrap_or(usize::MAX);

        Ok(matched.into_iter().skip(skip).take(limit).collect())
    }

    async fn count(&self, filter: &CategoryFilter) -> Result<i64> {
        let count = self
            .categories
            .read()
            .await
            .values()
            .filter(|c| filter.matches(c))
            .count();
        Ok(count as i64)
    }

    async fn insert(&self, category: Category) -> Result<Category> {
        self.categories
            .write()
            .await
            .insert(category.id, category.clone());
        Ok(category)
    }

    async fn update_by_id(&self, id: Uuid, changes: CategoryChanges) -> Result<Option<Category>> {
        let mut categories = self.categories.write().await;
        Ok(categories.get_mut(&id).map(|category| {
            category.apply(changes);
            category.clone()
        }))
    }

    async fn delete_by_id(&self, id: Uuid) -> Result<bool> {
        Ok(self.categories.write().await.remove(&id).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::categories::models::{ParentFilter, SortDirection, SortField};
    use chrono::Utc;

    fn category(name: &str, parent_id: Option<Uuid>) -> Category {
        let now = Utc::now();
        Category {
            id: Uuid::now_v7(),
            parent_id,
            name: name.to_string(),
            slug: name.to_lowercase(),
            description: None,
            image_url: String::new(),
            level: if parent_id.is_some() { 1 } else { 0 },
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn test_find_sorts_and_pages() {
        let store = InMemoryCategoryStore::new();
        for name in ["Delta", "Alpha", "Charlie", "Bravo"] {
            store.insert(category(name, None)).await.unwrap();
        }

        let page = store
            .find(&CategoryFilter::default(), CategorySort::by_name(), 1, Some(2))
            .await
            .unwrap();
        let names: Vec<_> = page.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["Bravo", "Charlie"]);

        let desc = CategorySort {
            field: SortField::Name,
            direction: SortDirection::Desc,
        };
        let all = store
            .find(&CategoryFilter::default(), desc, 0, None)
            .await
            .unwrap();
        assert_eq!(all.first().map(|c| c.name.as_str()), Some("Delta"));
        assert_eq!(all.len(), 4);
    }

    #[tokio::test]
    async fn test_name_order_is_bytewise() {
        let store = InMemoryCategoryStore::new();
        for name in ["apple", "Banana", "cherry", "Apple"] {
            store.insert(category(name, None)).await.unwrap();
        }

        let all = store
            .find(&CategoryFilter::default(), CategorySort::by_name(), 0, None)
            .await
            .unwrap();
        let names: Vec<_> = all.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["Apple", "Banana", "apple", "cherry"]);
    }

    #[tokio::test]
    async fn test_count_and_find_by_ids() {
        let store = InMemoryCategoryStore::new();
        let root = store.insert(category("Root", None)).await.unwrap();
        let child = store.insert(category("Child", Some(root.id))).await.unwrap();

        let roots = CategoryFilter {
            parent: Some(ParentFilter::Root),
            ..Default::default()
        };
        assert_eq!(store.count(&roots).await.unwrap(), 1);
        assert_eq!(
            store
                .count(&CategoryFilter::children_of(root.id))
                .await
                .unwrap(),
            1
        );

        let found = store
            .find_by_ids(&[child.id, Uuid::now_v7()])
            .await
            .unwrap();
        assert_eq!(found, vec![child]);
    }

    #[tokio::test]
    async fn test_update_and_delete_missing_ids() {
        let store = InMemoryCategoryStore::new();
        let missing = Uuid::now_v7();

        let updated = store
            .update_by_id(missing, CategoryChanges::touch(Utc::now()))
            .await
            .unwrap();
        assert!(updated.is_none());
        assert!(!store.delete_by_id(missing).await.unwrap());
    }

    #[tokio::test]
    async fn test_update_applies_changes() {
        let store = InMemoryCategoryStore::new();
        let saved = store.insert(category("Old", None)).await.unwrap();

        let mut changes = CategoryChanges::touch(Utc::now());
        changes.name = Some("New".to_string());
        changes.description = Some(Some("desc".to_string()));
        changes.is_active = Some(false);

        let updated = store
            .update_by_id(saved.id, changes)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.name, "New");
        assert_eq!(updated.description.as_deref(), Some("desc"));
        assert!(!updated.is_active);
        assert_eq!(updated.slug, "old");
        assert_eq!(store.find_by_id(saved.id).await.unwrap(), Some(updated));
    }

    #[tokio::test]
    async fn test_name_filter_matches_substring_case_insensitively() {
        use fake::faker::company::en::CompanyName;
        use fake::Fake;
        use tokio_test::assert_ok;

        let store = InMemoryCategoryStore::new();
        let mut names = Vec::new();
        for _ in 0..25 {
            let name: String = CompanyName().fake();
            assert_ok!(store.insert(category(&name, None)).await);
            names.push(name);
        }

        let needle = names[0].chars().take(3).collect::<String>().to_uppercase();
        let expected = names
            .iter()
            .filter(|n| n.to_lowercase().contains(&needle.to_lowercase()))
            .count() as i64;

        let filter = CategoryFilter {
            name: Some(needle),
            ..Default::default()
        };
        assert_eq!(assert_ok!(store.count(&filter).await), expected);
        assert!(expected >= 1);
    }
}
