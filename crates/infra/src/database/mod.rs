//! SQLite persistence for synchronized catalog leaves

pub mod catalog_repository;
pub mod manager;

pub use catalog_repository::SqliteCatalogStore;
pub use manager::{DbManager, SqliteConnection};
