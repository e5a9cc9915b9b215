use std::sync::Arc;

use axum::{extract::State, http::StatusCode, Json};
use uuid::Uuid;

use crate::core::error::{AppError, Result};
use crate::core::extractor::{AppJson, AppPath, AppQuery};
use crate::features::categories::dtos::{
    CategoryQueryParams, CategoryResponseDto, CategoryTreeDto, CategoryTreeQuery,
    CreateCategoryDto, UpdateCategoryDto,
};
use crate::features::categories::models::ParentFilter;
use crate::features::categories::services::CategoryService;
use crate::shared::types::ApiResponse;

/// Create a category
#[utoipa::path(
    post,
    path = "/api/categories",
    request_body = CreateCategoryDto,
    responses(
        (status = 201, description = "Category created", body = ApiResponse<CategoryResponseDto>),
        (status = 400, description = "Validation error or parent category not found")
    ),
    tag = "categories"
)]
pub async fn create_category(
    State(service): State<Arc<CategoryService>>,
    AppJson(dto): AppJson<CreateCategoryDto>,
) -> Result<(StatusCode, Json<ApiResponse<CategoryResponseDto>>)> {
    let category = service.create(dto).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(
            Some(category),
            Some("Category created successfully".to_string()),
        )),
    ))
}

/// List categories
///
/// Supports filtering by name substring, parent (`null` for roots) and active
/// status, plus sorting and pagination.
#[utoipa::path(
    get,
    path = "/api/categories",
    params(CategoryQueryParams),
    responses(
        (status = 200, description = "Paginated list of categories", body = ApiResponse<Vec<CategoryResponseDto>>),
        (status = 400, description = "Invalid query parameters")
    ),
    tag = "categories"
)]
pub async fn list_categories(
    State(service): State<Arc<CategoryService>>,
    AppQuery(params): AppQuery<CategoryQueryParams>,
) -> Result<Json<ApiResponse<Vec<CategoryResponseDto>>>> {
    let (categories, pagination) = service.list(&params).await?;
    let count = categories.len();
    Ok(Json(ApiResponse::collection(
        categories,
        count,
        Some(pagination),
    )))
}

/// Get category tree
///
/// Returns root categories with their descendants nested under `children`.
#[utoipa::path(
    get,
    path = "/api/categories/tree",
    params(CategoryTreeQuery),
    responses(
        (status = 200, description = "Category forest", body = ApiResponse<Vec<CategoryTreeDto>>)
    ),
    tag = "categories"
)]
pub async fn get_category_tree(
    State(service): State<Arc<CategoryService>>,
    AppQuery(query): AppQuery<CategoryTreeQuery>,
) -> Result<Json<ApiResponse<Vec<CategoryTreeDto>>>> {
    let tree = service.list_tree(query.is_active).await?;
    let count = tree.len();
    Ok(Json(ApiResponse::collection(tree, count, None)))
}

/// List direct subcategories of a parent
#[utoipa::path(
    get,
    path = "/api/categories/parent/{parent_id}",
    params(
        ("parent_id" = String, Path, description = "Parent category id, or `null` for root categories")
    ),
    responses(
        (status = 200, description = "Subcategories sorted by name", body = ApiResponse<Vec<CategoryResponseDto>>),
        (status = 400, description = "Invalid parent id")
    ),
    tag = "categories"
)]
pub async fn list_subcategories(
    State(service): State<Arc<CategoryService>>,
    AppPath(parent_id): AppPath<String>,
) -> Result<Json<ApiResponse<Vec<CategoryResponseDto>>>> {
    let parent = parent_id
        .parse::<ParentFilter>()
        .map_err(AppError::Validation)?;

    let categories = service.list_by_parent(parent).await?;
    let count = categories.len();
    Ok(Json(ApiResponse::collection(categories, count, None)))
}

/// Get category by id
#[utoipa::path(
    get,
    path = "/api/categories/{id}",
    params(
        ("id" = Uuid, Path, description = "Category id")
    ),
    responses(
        (status = 200, description = "Category found", body = ApiResponse<CategoryResponseDto>),
        (status = 404, description = "Category not found")
    ),
    tag = "categories"
)]
pub async fn get_category(
    State(service): State<Arc<CategoryService>>,
    AppPath(id): AppPath<Uuid>,
) -> Result<Json<ApiResponse<CategoryResponseDto>>> {
    let category = service.get_by_id(id).await?;
    Ok(Json(ApiResponse::success(Some(category), None)))
}

/// Update a category
///
/// Omitted fields are left unchanged. `parentId: null` moves the category to
/// the root.
#[utoipa::path(
    put,
    path = "/api/categories/{id}",
    params(
        ("id" = Uuid, Path, description = "Category id")
    ),
    request_body = UpdateCategoryDto,
    responses(
        (status = 200, description = "Category updated", body = ApiResponse<CategoryResponseDto>),
        (status = 400, description = "Validation error, unknown parent, self parent or circular reference"),
        (status = 404, description = "Category not found")
    ),
    tag = "categories"
)]
pub async fn update_category(
    State(service): State<Arc<CategoryService>>,
    AppPath(id): AppPath<Uuid>,
    AppJson(dto): AppJson<UpdateCategoryDto>,
) -> Result<Json<ApiResponse<CategoryResponseDto>>> {
    let category = service.update(id, dto).await?;
    Ok(Json(ApiResponse::success(
        Some(category),
        Some("Category updated successfully".to_string()),
    )))
}

/// Delete a category
///
/// Only categories without subcategories can be deleted.
#[utoipa::path(
    delete,
    path = "/api/categories/{id}",
    params(
        ("id" = Uuid, Path, description = "Category id")
    ),
    responses(
        (status = 200, description = "Category deleted"),
        (status = 400, description = "Category has subcategories"),
        (status = 404, description = "Category not found")
    ),
    tag = "categories"
)]
pub async fn delete_category(
    State(service): State<Arc<CategoryService>>,
    AppPath(id): AppPath<Uuid>,
) -> Result<Json<ApiResponse<()>>> {
    service.delete(id).await?;
    Ok(Json(ApiResponse::success(
        None,
        Some("Category deleted successfully".to_string()),
    )))
}
