mod category_store;
mod memory_category_store;
mod pg_category_store;

pub use category_store::CategoryStore;
pub use memory_category_store::InMemoryCategoryStore;
pub use pg_category_store::PgCategoryStore;
