//! Migration utilities for converting between storage backends
//!
//! Exactly one durable representation is authoritative at a time; these
//! functions are the explicit path for reconciling one into the other, plus
//! import/export to plain JSON files for interoperability.

use anyhow::{Context, Result};
use std::path::Path;

use super::traits::StorageBackend;
use super::{JsonBackend, SqliteBackend};
use crate::models::PromptLibrary;

/// Migrates data from a flat JSON file to a SQLite database
///
/// # Returns
/// The number of prompts migrated
pub fn migrate_json_to_sqlite<P1: AsRef<Path>, P2: AsRef<Path>>(
    json_path: P1,
    sqlite_path: P2,
) -> Result<usize> {
    let json_backend = JsonBackend::new(json_path);
    let sqlite_backend = SqliteBackend::new(sqlite_path)?;

    let library = json_backend
        .load()
        .context("Failed to load JSON store")?;

    let prompt_count = library.prompts.len();

    sqlite_backend
        .save(&library)
        .context("Failed to save to SQLite database")?;

    Ok(prompt_count)
}

/// Migrates data from a SQLite database to a flat JSON file
///
/// # Returns
/// The number of prompts migrated
pub fn migrate_sqlite_to_json<P1: AsRef<Path>, P2: AsRef<Path>>(
    sqlite_path: P1,
    json_path: P2,
) -> Result<usize> {
    let sqlite_backend = SqliteBackend::new(sqlite_path)?;
    let json_backend = JsonBackend::new(json_path);

    let library = sqlite_backend
        .load()
        .context("Failed to load SQLite database")?;

    let prompt_count = library.prompts.len();

    json_backend
        .save(&library)
        .context("Failed to save to JSON file")?;

    Ok(prompt_count)
}

/// Exports a PromptLibrary to a JSON file
pub fn export_to_json_file<P: AsRef<Path>>(library: &PromptLibrary, json_path: P) -> Result<()> {
    let json = serde_json::to_string_pretty(library).context("Failed to serialize to JSON")?;

    std::fs::write(json_path, json).context("Failed to write JSON file")?;

    Ok(())
}

/// Imports a PromptLibrary from a JSON file
pub fn import_from_json_file<P: AsRef<Path>>(json_path: P) -> Result<PromptLibrary> {
    let json = std::fs::read_to_string(json_path).context("Failed to read JSON file")?;

    let library: PromptLibrary = serde_json::from_str(&json).context("Failed to parse JSON")?;

    Ok(library)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Prompt;
    use tempfile::{NamedTempFile, TempDir};

    #[test]
    fn test_json_to_sqlite_migration() {
        let temp_dir = TempDir::new().unwrap();
        let json_path = temp_dir.path().join("prompts.json");
        let sqlite_file = NamedTempFile::with_suffix(".db").unwrap();

        let json_backend = JsonBackend::new(&json_path);
        let mut library = PromptLibrary::new();
        library.prompts.push(Prompt::new("Code Review".into()));
        json_backend.save(&library).unwrap();

        let count = migrate_json_to_sqlite(&json_path, sqlite_file.path()).unwrap();
        assert_eq!(count, 1);

        let sqlite_backend = SqliteBackend::new(sqlite_file.path()).unwrap();
        let loaded = sqlite_backend.load().unwrap();
        assert_eq!(loaded.prompts.len(), 1);
        assert_eq!(loaded.prompts[0].title, "Code Review");
    }

    #[test]
    fn test_sqlite_to_json_migration() {
        let sqlite_file = NamedTempFile::with_suffix(".db").unwrap();
        let temp_dir = TempDir::new().unwrap();
        let json_path = temp_dir.path().join("prompts.json");

        let sqlite_backend = SqliteBackend::new(sqlite_file.path()).unwrap();
        let mut library = PromptLibrary::new();
        library.prompts.push(Prompt::new("Summarize".into()));
        sqlite_backend.save(&library).unwrap();

        let count = migrate_sqlite_to_json(sqlite_file.path(), &json_path).unwrap();
        assert_eq!(count, 1);

        let json_backend = JsonBackend::new(&json_path);
        let loaded = json_backend.load().unwrap();
        assert_eq!(loaded.prompts.len(), 1);
        assert_eq!(loaded.prompts[0].title, "Summarize");
    }

    #[test]
    fn test_json_file_export_import() {
        let temp_dir = TempDir::new().unwrap();
        let json_path = temp_dir.path().join("export.json");

        let mut library = PromptLibrary::new();
        library.prompts.push(Prompt::new("Code Review".into()));

        export_to_json_file(&library, &json_path).unwrap();

        let loaded = import_from_json_file(&json_path).unwrap();
        assert_eq!(loaded.prompts.len(), 1);
        assert_eq!(loaded.prompts[0].title, "Code Review");
    }
}
