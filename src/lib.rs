//! Songbook Server Library
//!
//! This library exposes the internal modules for the binaries and for testing.

pub mod catalog_store;
pub mod cli_style;
pub mod config;
pub mod import;
pub mod server;
pub mod sqlite_persistence;
pub mod user;

// Re-export commonly used types for convenience
pub use catalog_store::{CatalogStore, SqliteCatalogStore};
pub use server::{make_app, run_server, RequestsLoggingLevel, ServerConfig};
pub use user::{SqliteUserStore, UserManager, UserRole, UserStore};
