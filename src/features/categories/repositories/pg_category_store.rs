use async_trait::async_trait;
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::core::error::{AppError, Result};
use crate::features::categories::hierarchy::HierarchyError;
use crate::features::categories::models::{
    Category, CategoryChanges, CategoryFilter, CategorySort, ParentFilter, SortField,
};
use crate::features::categories::repositories::CategoryStore;

const CATEGORY_COLUMNS: &str =
    "id, parent_id, name, slug, description, image_url, level, is_active, created_at, updated_at";

// PostgreSQL error codes
const FOREIGN_KEY_VIOLATION: &str = "23503";
const CHECK_VIOLATION: &str = "23514";

/// Escape `%`, `_` and `\` so user input is matched literally by ILIKE
fn escape_like(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for c in input.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

fn push_filter(builder: &mut QueryBuilder<'_, Postgres>, filter: &CategoryFilter) {
    builder.push(" WHERE TRUE");

    if let Some(ref name) = filter.name {
        builder
            .push(" AND name ILIKE ")
            .push_bind(format!("%{}%", escape_like(name)))
            .push(" ESCAPE '\\'");
    }

    match filter.parent {
        Some(ParentFilter::Root) => {
            builder.push(" AND parent_id IS NULL");
        }
        Some(ParentFilter::Id(parent_id)) => {
            builder.push(" AND parent_id = ").push_bind(parent_id);
        }
        None => {}
    }

    if let Some(is_active) = filter.is_active {
        builder.push(" AND is_active = ").push_bind(is_active);
    }
}

/// Text columns sort bytewise (`COLLATE "C"`) to match the in-memory store and tree order
fn order_by_clause(sort: CategorySort) -> String {
    let collation = match sort.field {
        SortField::Name | SortField::Slug => " COLLATE \"C\"",
        SortField::Level | SortField::CreatedAt | SortField::UpdatedAt => "",
    };
    format!(
        " ORDER BY {}{} {}, id ASC",
        sort.field.as_column(),
        collation,
        sort.direction.as_sql()
    )
}

/// Map constraint violations raised by concurrent writers onto hierarchy errors
fn handle_write_error(e: sqlx::Error, category_id: Uuid, parent_id: Option<Uuid>) -> AppError {
    if let sqlx::Error::Database(ref db_err) = e {
        match (db_err.code().as_deref(), parent_id) {
            // Parent removed between validation and write
            (Some(FOREIGN_KEY_VIOLATION), Some(parent_id)) => {
                return HierarchyError::ParentNotFound(parent_id).into();
            }
            (Some(CHECK_VIOLATION), _)
                if db_err.constraint() == Some("categories_not_self_parent") =>
            {
                return HierarchyError::SelfParent(category_id).into();
            }
            _ => {}
        }
    }
    AppError::Database(e)
}

/// PostgreSQL-backed category store
pub struct PgCategoryStore {
    pool: PgPool,
}

impl PgCategoryStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CategoryStore for PgCategoryStore {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Category>> {
        let query = format!("SELECT {} FROM categories WHERE id = $1", CATEGORY_COLUMNS);
        sqlx::query_as::<_, Category>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                tracing::error!("Failed to get category by id: {:?}", e);
                AppError::Database(e)
            })
    }

    async fn find_by_ids(&self, ids: &[Uuid]) -> Result<Vec<Category>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let query = format!(
            "SELECT {} FROM categories WHERE id = ANY($1)",
            CATEGORY_COLUMNS
        );
        sqlx::query_as::<_, Category>(&query)
            .bind(ids.to_vec())
            .fetch_all(&self.pool)
            .await
            .map_err(|e| {
                tracing::error!("Failed to get categories by ids: {:?}", e);
                AppError::Database(e)
            })
    }

    async fn find(
        &self,
        filter: &CategoryFilter,
        sort: CategorySort,
        skip: i64,
        limit: Option<i64>,
    ) -> Result<Vec<Category>> {
        let mut builder = QueryBuilder::<Postgres>::new(format!(
            "SELECT {} FROM categories",
            CATEGORY_COLUMNS
        ));
        push_filter(&mut builder, filter);

        builder.push(order_by_clause(sort));

        if let Some(limit) = limit {
            builder.push(" LIMIT ").push_bind(limit.max(0));
        }
        if skip > 0 {
            builder.push(" OFFSET ").push_bind(skip);
        }

        builder
            .build_query_as::<Category>()
            .fetch_all(&self.pool)
            .await
            .map_err(|e| {
                tracing::error!("Failed to list categories: {:?}", e);
                AppError::Database(e)
            })
    }

    async fn count(&self, filter: &CategoryFilter) -> Result<i64> {
        let mut builder = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM categories");
        push_filter(&mut builder, filter);

        builder
            .build_query_scalar::<i64>()
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                tracing::error!("Failed to count categories: {:?}", e);
                AppError::Database(e)
            })
    }

    async fn insert(&self, category: Category) -> Result<Category> {
        let query = format!(
            r#"
            INSERT INTO categories ({columns})
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING {columns}
            "#,
            columns = CATEGORY_COLUMNS
        );

        sqlx::query_as::<_, Category>(&query)
            .bind(category.id)
            .bind(category.parent_id)
            .bind(&category.name)
            .bind(&category.slug)
            .bind(&category.description)
            .bind(&category.image_url)
            .bind(category.level)
            .bind(category.is_active)
            .bind(category.created_at)
            .bind(category.updated_at)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                tracing::error!("Failed to insert category: {:?}", e);
                handle_write_error(e, category.id, category.parent_id)
            })
    }

    async fn update_by_id(&self, id: Uuid, changes: CategoryChanges) -> Result<Option<Category>> {
        let new_parent = changes.parent_id.flatten();

        let mut builder = QueryBuilder::<Postgres>::new("UPDATE categories SET updated_at = ");
        builder.push_bind(changes.updated_at);

        if let Some(name) = changes.name {
            builder.push(", name = ").push_bind(name);
        }
        if let Some(slug) = changes.slug {
            builder.push(", slug = ").push_bind(slug);
        }
        if let Some(description) = changes.description {
            builder.push(", description = ").push_bind(description);
        }
        if let Some(image_url) = changes.image_url {
            builder.push(", image_url = ").push_bind(image_url);
        }
        if let Some(parent_id) = changes.parent_id {
            builder.push(", parent_id = ").push_bind(parent_id);
        }
        if let Some(level) = changes.level {
            builder.push(", level = ").push_bind(level);
        }
        if let Some(is_active) = changes.is_active {
            builder.push(", is_active = ").push_bind(is_active);
        }

        builder.push(" WHERE id = ").push_bind(id);
        builder.push(format!(" RETURNING {}", CATEGORY_COLUMNS));

        builder
            .build_query_as::<Category>()
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                tracing::error!("Failed to update category {}: {:?}", id, e);
                handle_write_error(e, id, new_parent)
            })
    }

    async fn delete_by_id(&self, id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM categories WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                // A child inserted after the children check trips the foreign key
                if let sqlx::Error::Database(ref db_err) = e {
                    if db_err.code().as_deref() == Some(FOREIGN_KEY_VIOLATION) {
                        return AppError::from(HierarchyError::HasChildren(id));
                    }
                }
                tracing::error!("Failed to delete category {}: {:?}", id, e);
                AppError::Database(e)
            })?;

        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_like() {
        assert_eq!(escape_like("garden"), "garden");
        assert_eq!(escape_like("50%_off"), "50\\%\\_off");
        assert_eq!(escape_like("a\\b"), "a\\\\b");
    }

    #[test]
    fn test_push_filter_builds_conjunction() {
        let filter = CategoryFilter {
            name: Some("tv".to_string()),
            parent: Some(ParentFilter::Root),
            is_active: Some(true),
        };
        let mut builder = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM categories");
        push_filter(&mut builder, &filter);

        assert_eq!(
            builder.sql(),
            "SELECT COUNT(*) FROM categories WHERE TRUE AND name ILIKE $1 ESCAPE '\\' AND parent_id IS NULL AND is_active = $2"
        );
    }

    #[test]
    fn test_push_filter_by_parent_id() {
        let filter = CategoryFilter::children_of(Uuid::now_v7());
        let mut builder = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM categories");
        push_filter(&mut builder, &filter);

        assert_eq!(
            builder.sql(),
            "SELECT COUNT(*) FROM categories WHERE TRUE AND parent_id = $1"
        );
    }

    #[test]
    fn test_order_by_text_columns_is_bytewise() {
        assert_eq!(
            order_by_clause(CategorySort::by_name()),
            " ORDER BY name COLLATE \"C\" ASC, id ASC"
        );
        assert_eq!(
            order_by_clause(CategorySort {
                field: SortField::Slug,
                direction: crate::features::categories::models::SortDirection::Desc,
            }),
            " ORDER BY slug COLLATE \"C\" DESC, id ASC"
        );
        assert_eq!(
            order_by_clause(CategorySort {
                field: SortField::Level,
                ..Default::default()
            }),
            " ORDER BY level ASC, id ASC"
        );
    }
}
