use utoipa::{Modify, OpenApi};

use crate::features::categories::{
    dtos as categories_dtos, handlers as categories_handlers, models as categories_models,
};
use crate::shared::types::{ApiResponse, Pagination};

#[derive(OpenApi)]
#[openapi(
    paths(
        // Categories
        categories_handlers::create_category,
        categories_handlers::list_categories,
        categories_handlers::get_category_tree,
        categories_handlers::list_subcategories,
        categories_handlers::get_category,
        categories_handlers::update_category,
        categories_handlers::delete_category,
    ),
    components(
        schemas(
            // Shared
            Pagination,
            // Categories
            categories_models::SortField,
            categories_models::SortDirection,
            categories_dtos::CreateCategoryDto,
            categories_dtos::UpdateCategoryDto,
            categories_dtos::CategoryParentDto,
            categories_dtos::CategoryResponseDto,
            categories_dtos::CategoryTreeDto,
            ApiResponse<categories_dtos::CategoryResponseDto>,
            ApiResponse<Vec<categories_dtos::CategoryResponseDto>>,
            ApiResponse<Vec<categories_dtos::CategoryTreeDto>>,
        )
    ),
    tags(
        (name = "categories", description = "Hierarchical product categories"),
    ),
    info(
        title = "Catalog API",
        version = "0.1.0",
        description = "API documentation for the category catalog",
    )
)]
pub struct ApiDoc;

/// Modifier to override OpenAPI info from config
pub struct SwaggerInfoModifier {
    pub title: String,
    pub version: String,
    pub description: String,
}

impl Modify for SwaggerInfoModifier {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        openapi.info.title = self.title.clone();
        openapi.info.version = self.version.clone();
        openapi.info.description = Some(self.description.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_lists_category_paths() {
        let doc = ApiDoc::openapi();
        let paths: Vec<_> = doc.paths.paths.keys().cloned().collect();
        for path in [
            "/api/categories",
            "/api/categories/tree",
            "/api/categories/parent/{parent_id}",
            "/api/categories/{id}",
        ] {
            assert!(paths.iter().any(|p| p == path), "missing {}", path);
        }
    }

    #[test]
    fn test_info_modifier_overrides_defaults() {
        let mut doc = ApiDoc::openapi();
        SwaggerInfoModifier {
            title: "Shop".to_string(),
            version: "2.0.0".to_string(),
            description: "Shop categories".to_string(),
        }
        .modify(&mut doc);

        assert_eq!(doc.info.title, "Shop");
        assert_eq!(doc.info.version, "2.0.0");
        assert_eq!(doc.info.description.as_deref(), Some("Shop categories"));
    }
}
