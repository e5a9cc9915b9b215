use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::shared::constants::{DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE};

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Number of items in `data` for collection responses
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub count: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pagination: Option<Pagination>,
    /// Machine readable error kind, only set on failures
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub errors: Option<Vec<String>>,
}

// =============================================================================
// PAGINATION
// =============================================================================

/// Page metadata returned alongside paginated lists
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Pagination {
    pub total: i64,
    pub page: i64,
    pub limit: i64,
    pub pages: i64,
}

impl Pagination {
    pub fn new(total: i64, page: i64, limit: i64) -> Self {
        let limit = limit.max(1);
        Self {
            total,
            page,
            limit,
            pages: (total + limit - 1) / limit,
        }
    }
}

/// Page/limit pair after defaults and clamping have been applied
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: i64,
    pub limit: i64,
}

impl PageRequest {
    pub fn new(page: Option<i64>, limit: Option<i64>) -> Self {
        Self {
            page: page.unwrap_or(1).max(1),
            limit: limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE),
        }
    }

    /// Number of records to skip before this page, saturating for absurd page numbers
    pub fn offset(&self) -> i64 {
        (self.page - 1).saturating_mul(self.limit)
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::new(None, None)
    }
}

impl<T> ApiResponse<T> {
    pub fn success(data: Option<T>, message: Option<String>) -> Self {
        Self {
            success: true,
            data,
            message,
            count: None,
            pagination: None,
            code: None,
            errors: None,
        }
    }

    /// Success response for a collection, `count` is the number of items returned
    pub fn collection(data: T, count: usize, pagination: Option<Pagination>) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: None,
            count: Some(count),
            pagination,
            code: None,
            errors: None,
        }
    }

    pub fn error(
        message: Option<String>,
        code: &str,
        errors: Option<Vec<String>>,
    ) -> ApiResponse<()> {
        ApiResponse {
            success: false,
            data: None,
            message,
            count: None,
            pagination: None,
            code: Some(code.to_string()),
            errors,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pagination_pages_rounds_up() {
        assert_eq!(Pagination::new(0, 1, 10).pages, 0);
        assert_eq!(Pagination::new(10, 1, 10).pages, 1);
        assert_eq!(Pagination::new(11, 2, 10).pages, 2);
    }

    #[test]
    fn test_page_request_defaults_and_clamps() {
        let page = PageRequest::new(None, None);
        assert_eq!(page.page, 1);
        assert_eq!(page.limit, DEFAULT_PAGE_SIZE);
        assert_eq!(page.offset(), 0);

        let page = PageRequest::new(Some(0), Some(1000));
        assert_eq!(page.page, 1);
        assert_eq!(page.limit, MAX_PAGE_SIZE);

        let page = PageRequest::new(Some(3), Some(20));
        assert_eq!(page.offset(), 40);

        let page = PageRequest::new(Some(i64::MAX), Some(MAX_PAGE_SIZE));
        assert_eq!(page.page, i64::MAX);
        assert_eq!(page.offset(), i64::MAX);

        let page = PageRequest::new(Some(i64::MIN), Some(i64::MIN));
        assert_eq!(page.page, 1);
        assert_eq!(page.limit, 1);
        assert_eq!(page.offset(), 0);
    }

    #[test]
    fn test_error_envelope_omits_empty_fields() {
        let body = ApiResponse::<()>::error(Some("boom".to_string()), "DATABASE_ERROR", None);
        let value = serde_json::to_value(&body).unwrap();
        assert_eq!(value["success"], false);
        assert_eq!(value["code"], "DATABASE_ERROR");
        assert!(value.get("pagination").is_none());
        assert!(value.get("errors").is_none());
    }
}
