use chrono::Utc;
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

use crate::core::error::{AppError, Result};
use crate::features::categories::dtos::{
    CategoryParentDto, CategoryQueryParams, CategoryResponseDto, CategoryTreeDto,
    CreateCategoryDto, UpdateCategoryDto,
};
use crate::features::categories::hierarchy::{
    derive_level, derive_slug, CategoryHierarchy, HierarchyError,
};
use crate::features::categories::models::{
    Category, CategoryChanges, CategoryFilter, CategorySort, ParentFilter,
};
use crate::features::categories::repositories::CategoryStore;
use crate::shared::types::{PageRequest, Pagination};

/// Service for category operations
pub struct CategoryService {
    store: Arc<dyn CategoryStore>,
    hierarchy: CategoryHierarchy,
}

impl CategoryService {
    pub fn new(store: Arc<dyn CategoryStore>, hierarchy: CategoryHierarchy) -> Self {
        Self { store, hierarchy }
    }

    /// Create a category under an optional parent
    pub async fn create(&self, dto: CreateCategoryDto) -> Result<CategoryResponseDto> {
        let dto = dto.normalized();
        dto.validate()?;

        let parent = self
            .hierarchy
            .validate_parent(self.store.as_ref(), dto.parent_id)
            .await
            .inspect_err(|e| tracing::warn!("Rejected category create: {}", e))?;

        let level = derive_level(parent.as_ref());
        self.hierarchy
            .check_depth(level)
            .inspect_err(|e| tracing::warn!("Rejected category create: {}", e))?;

        let now = Utc::now();
        let category = Category {
            id: Uuid::now_v7(),
            parent_id: dto.parent_id,
            slug: derive_slug(&dto.name),
            name: dto.name,
            description: dto.description,
            image_url: dto.image_url.unwrap_or_default(),
            level,
            is_active: true,
            created_at: now,
            updated_at: now,
        };

        let saved = self.store.insert(category).await?;
        tracing::info!(
            "Category created: id={}, parent={:?}, level={}",
            saved.id,
            saved.parent_id,
            saved.level
        );

        let parent = parent.as_ref().map(CategoryParentDto::from);
        Ok(CategoryResponseDto::from(saved).with_parent(parent))
    }

    /// Get category by id, with its parent summarised
    pub async fn get_by_id(&self, id: Uuid) -> Result<CategoryResponseDto> {
        let category = self
            .store
            .find_by_id(id)
            .await?
            .ok_or(HierarchyError::CategoryNotFound(id))?;

        let parent = match category.parent_id {
            Some(parent_id) => self
                .store
                .find_by_id(parent_id)
                .await?
                .as_ref()
                .map(CategoryParentDto::from),
            None => None,
        };

        Ok(CategoryResponseDto::from(category).with_parent(parent))
    }

    /// List categories with filters, sorting and pagination
    pub async fn list(
        &self,
        params: &CategoryQueryParams,
    ) -> Result<(Vec<CategoryResponseDto>, Pagination)> {
        let parent = params
            .parent_id
            .as_deref()
            .map(str::parse::<ParentFilter>)
            .transpose()
            .map_err(AppError::Validation)?;

        let filter = CategoryFilter {
            name: params.name.clone().filter(|n| !n.is_empty()),
            parent,
            is_active: params.is_active,
        };
        let sort = CategorySort {
            field: params.sort_by,
            direction: params.sort_order,
        };
        let page = PageRequest::new(params.page, params.limit);

        let total = self.store.count(&filter).await?;
        let categories = self
            .store
            .find(&filter, sort, page.offset(), Some(page.limit))
            .await?;

        let items = self.with_parents(categories).await?;
        Ok((items, Pagination::new(total, page.page, page.limit)))
    }

    /// Direct children of a parent (or all roots), sorted by name
    pub async fn list_by_parent(&self, parent: ParentFilter) -> Result<Vec<CategoryResponseDto>> {
        let filter = CategoryFilter {
            parent: Some(parent),
            ..Default::default()
        };

        let categories = self
            .store
            .find(&filter, CategorySort::by_name(), 0, None)
            .await?;

        Ok(categories.into_iter().map(CategoryResponseDto::from).collect())
    }

    /// Apply a partial update, re-validating the hierarchy when the parent moves
    pub async fn update(&self, id: Uuid, dto: UpdateCategoryDto) -> Result<CategoryResponseDto> {
        let dto = dto.normalized();
        dto.validate()?;

        let mut changes = CategoryChanges::touch(Utc::now());
        let mut parent: Option<Category> = None;

        if let Some(new_parent_id) = dto.parent_id {
            if let Some(candidate) = new_parent_id {
                self.hierarchy
                    .check_circular(self.store.as_ref(), id, candidate)
                    .await
                    .inspect_err(|e| tracing::warn!("Rejected move of category {}: {}", id, e))?;
                parent = self
                    .hierarchy
                    .validate_parent(self.store.as_ref(), Some(candidate))
                    .await
                    .inspect_err(|e| tracing::warn!("Rejected move of category {}: {}", id, e))?;
            }
            // Only this category's level is refreshed; descendants keep theirs
            let level = derive_level(parent.as_ref());
            self.hierarchy
                .check_depth(level)
                .inspect_err(|e| tracing::warn!("Rejected move of category {}: {}", id, e))?;
            changes.parent_id = Some(new_parent_id);
            changes.level = Some(level);
        }

        if let Some(name) = dto.name {
            changes.slug = Some(derive_slug(&name));
            changes.name = Some(name);
        }
        if let Some(description) = dto.description {
            changes.description = Some(Some(description).filter(|d| !d.is_empty()));
        }
        changes.image_url = dto.image_url;
        changes.is_active = dto.is_active;

        let updated = self
            .store
            .update_by_id(id, changes)
            .await?
            .ok_or(HierarchyError::CategoryNotFound(id))?;
        tracing::info!("Category updated: id={}", id);

        let parent = match (parent, updated.parent_id) {
            (Some(parent), _) => Some(CategoryParentDto::from(&parent)),
            (None, Some(parent_id)) => self
                .store
                .find_by_id(parent_id)
                .await?
                .as_ref()
                .map(CategoryParentDto::from),
            (None, None) => None,
        };

        Ok(CategoryResponseDto::from(updated).with_parent(parent))
    }

    /// Delete a leaf category
    pub async fn delete(&self, id: Uuid) -> Result<()> {
        let children = self.store.count(&CategoryFilter::children_of(id)).await?;
        if children > 0 {
            tracing::warn!(
                "Rejected delete of category {}: {} subcategories",
                id,
                children
            );
            return Err(HierarchyError::HasChildren(id).into());
        }

        if !self.store.delete_by_id(id).await? {
            return Err(HierarchyError::CategoryNotFound(id).into());
        }

        tracing::info!("Category deleted: id={}", id);
        Ok(())
    }

    /// Materialise the whole forest, optionally restricted by active status
    pub async fn list_tree(&self, is_active: Option<bool>) -> Result<Vec<CategoryTreeDto>> {
        let filter = CategoryFilter {
            is_active,
            ..Default::default()
        };
        let categories = self
            .store
            .find(&filter, CategorySort::by_name(), 0, None)
            .await?;

        let tree = CategoryTreeDto::build_tree(categories);
        tracing::debug!(
            "Category tree built: {} roots, {} nodes",
            tree.len(),
            tree.iter().map(CategoryTreeDto::size).sum::<usize>()
        );
        Ok(tree)
    }

    /// Attach `{id, name}` parent summaries with one batched lookup
    async fn with_parents(&self, categories: Vec<Category>) -> Result<Vec<CategoryResponseDto>> {
        let parent_ids: Vec<Uuid> = categories
            .iter()
            .filter_map(|c| c.parent_id)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        let parents: HashMap<Uuid, CategoryParentDto> = self
            .store
            .find_by_ids(&parent_ids)
            .await?
            .iter()
            .map(|p| (p.id, CategoryParentDto::from(p)))
            .collect();

        Ok(categories
            .into_iter()
            .map(|c| {
                let parent = c.parent_id.and_then(|id| parents.get(&id).cloned());
                CategoryResponseDto::from(c).with_parent(parent)
            })
            .collect())
    }
}
