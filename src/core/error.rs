use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use crate::features::categories::HierarchyError;
use crate::shared::types::ApiResponse;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error(transparent)]
    Hierarchy(#[from] HierarchyError),
}

impl AppError {
    /// Machine readable kind carried in the error envelope
    pub fn code(&self) -> &'static str {
        match self {
            AppError::Database(_) => "DATABASE_ERROR",
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::Validation(_) => "VALIDATION_ERROR",
            AppError::BadRequest(_) => "BAD_REQUEST",
            AppError::Hierarchy(e) => e.code(),
        }
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        AppError::Validation(errors.to_string())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let code = self.code();
        let (status, message, errors) = match self {
            AppError::Database(ref e) => {
                tracing::error!("Database error: {:?}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Database error occurred".to_string(),
                    None,
                )
            }
            AppError::NotFound(ref msg) => (StatusCode::NOT_FOUND, msg.clone(), None),
            AppError::Validation(ref msg) => (
                StatusCode::BAD_REQUEST,
                msg.clone(),
                Some(vec![msg.clone()]),
            ),
            AppError::BadRequest(ref msg) => (StatusCode::BAD_REQUEST, msg.clone(), None),
            AppError::Hierarchy(ref e) => {
                let status = match e {
                    HierarchyError::CategoryNotFound(_) => StatusCode::NOT_FOUND,
                    HierarchyError::CorruptHierarchy { .. } => {
                        tracing::error!("Corrupt category hierarchy: {}", e);
                        StatusCode::INTERNAL_SERVER_ERROR
                    }
                    _ => StatusCode::BAD_REQUEST,
                };
                (status, e.to_string(), None)
            }
        };

        let body = Json(ApiResponse::<()>::error(Some(message), code, errors));

        (status, body).into_response()
    }
}

pub type Result<T> = std::result::Result<T, AppError>;

/// Fallback for requests that match no route
pub async fn route_not_found() -> AppError {
    AppError::NotFound("The requested resource was not found".to_string())
}
