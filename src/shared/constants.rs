/// Default page size for pagination
pub const DEFAULT_PAGE_SIZE: i64 = 10;

/// Maximum page size allowed
pub const MAX_PAGE_SIZE: i64 = 100;

/// Literal used in paths and query strings to address root categories
pub const ROOT_PARENT_SENTINEL: &str = "null";
