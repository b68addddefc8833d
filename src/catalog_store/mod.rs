//! Songbook catalog storage.
//!
//! Three levels, strictly owned: a songbook holds categories, a category
//! holds songs.

mod error;
mod models;
mod ordering;
mod page_numbers;
mod projection;
mod schema;
mod store;
mod trait_def;

pub use error::{CatalogError, CatalogResult};
pub use models::*;
pub use ordering::{next_sibling_order, resolve_order, ORDER_STEP};
pub use page_numbers::{parse_page_value, PageNumberPolicy, PageNumbers};
pub use projection::{CategoryTree, SongbookTree, MULTIPLE_SONGBOOKS, SONGBOOK_NOT_FOUND};
pub use schema::CATALOG_VERSIONED_SCHEMAS;
pub use store::SqliteCatalogStore;
pub use trait_def::CatalogStore;
