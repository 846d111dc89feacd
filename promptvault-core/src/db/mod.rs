//! Storage abstraction layer for PromptVault
//!
//! This module provides a trait-based abstraction for storage backends,
//! allowing the system to use different stores (SQLite, flat JSON files)
//! while maintaining a consistent interface.

mod json_backend;
mod migration;
mod sqlite_backend;
mod traits;

pub use json_backend::JsonBackend;
pub use migration::{
    export_to_json_file, import_from_json_file, migrate_json_to_sqlite, migrate_sqlite_to_json,
};
pub use sqlite_backend::SqliteBackend;
pub use traits::{BackendType, StorageBackend, StorageStats};

use anyhow::Result;
use std::path::Path;

/// Creates a storage backend based on the file extension or explicit type
pub fn create_backend(
    path: &Path,
    backend_type: Option<BackendType>,
) -> Result<Box<dyn StorageBackend>> {
    let bt = backend_type.unwrap_or_else(|| {
        // Infer from file extension
        match path.extension().and_then(|e| e.to_str()) {
            Some("json") => BackendType::Json,
            Some("db") | Some("sqlite") | Some("sqlite3") => BackendType::Sqlite,
            _ => BackendType::Sqlite, // Default to SQLite
        }
    });

    match bt {
        BackendType::Sqlite => Ok(Box::new(SqliteBackend::new(path)?)),
        BackendType::Json => Ok(Box::new(JsonBackend::new(path))),
    }
}
