//! Hierarchical product categories.
//!
//! Categories form a forest: each one optionally points to a parent and caches
//! its depth in `level`. Every mutation keeps the parent graph acyclic.
//!
//! ## Endpoints
//!
//! | Method | Endpoint | Description |
//! |--------|----------|-------------|
//! | POST | `/api/categories` | Create a category |
//! | GET | `/api/categories` | List categories (filter, sort, paginate) |
//! | GET | `/api/categories/tree` | Nested category forest |
//! | GET | `/api/categories/parent/{parent_id}` | Direct subcategories (`null` for roots) |
//! | GET | `/api/categories/{id}` | Get category by id |
//! | PUT | `/api/categories/{id}` | Update a category |
//! | DELETE | `/api/categories/{id}` | Delete a leaf category |

pub mod dtos;
pub mod handlers;
pub mod hierarchy;
pub mod models;
pub mod repositories;
pub mod routes;
pub mod services;

pub use hierarchy::{CategoryHierarchy, HierarchyError};
pub use repositories::{CategoryStore, InMemoryCategoryStore, PgCategoryStore};
pub use services::CategoryService;
