mod category;
mod query;

pub use category::{Category, CategoryChanges};
pub use query::{CategoryFilter, CategorySort, ParentFilter, SortDirection, SortField};
