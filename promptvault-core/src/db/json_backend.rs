//! Flat JSON file storage backend
//!
//! This backend stores all data in a single JSON file, using the `Storage`
//! implementation with file locking support. It is the fallback target when
//! the SQLite backend faults.

use anyhow::Result;
use std::path::{Path, PathBuf};

use super::traits::{BackendType, StorageBackend};
use crate::models::PromptLibrary;
use crate::storage::Storage;

/// JSON file backend implementation
///
/// This wraps the `Storage` class to implement the `StorageBackend` trait.
/// All per-record operations use the trait defaults (load, modify, save the
/// whole document), which is the fallback store's contract: a flat ordered
/// list per collection, rewritten wholesale on every change.
pub struct JsonBackend {
    storage: Storage,
    path: PathBuf,
}

impl JsonBackend {
    /// Creates a new JSON backend for the given file path
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref().to_path_buf();
        Self {
            storage: Storage::new(&path),
            path,
        }
    }

    /// Gets a reference to the underlying Storage
    pub fn storage(&self) -> &Storage {
        &self.storage
    }
}

impl StorageBackend for JsonBackend {
    fn backend_type(&self) -> BackendType {
        BackendType::Json
    }

    fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Result<PromptLibrary> {
        self.storage.load()
    }

    fn save(&self, library: &PromptLibrary) -> Result<()> {
        self.storage.save(library)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Prompt, PromptPatch};
    use tempfile::TempDir;

    #[test]
    fn test_json_backend_create_and_load() {
        let temp_dir = TempDir::new().unwrap();
        let file_path = temp_dir.path().join("prompts.json");
        let backend = JsonBackend::new(&file_path);

        backend.create_if_not_exists().unwrap();

        let library = backend.load().unwrap();
        assert!(library.prompts.is_empty());
        assert!(library.categories.is_empty());
    }

    #[test]
    fn test_json_backend_prompt_crud_via_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let backend = JsonBackend::new(temp_dir.path().join("prompts.json"));

        let prompt = Prompt::new("Code Review".into());
        backend.add_prompt(&prompt).unwrap();

        let loaded = backend.get_prompt(&prompt.id).unwrap().unwrap();
        assert_eq!(loaded.title, "Code Review");

        let merged = backend
            .update_prompt(
                &prompt.id,
                &PromptPatch {
                    tags: Some("dev".into()),
                    ..Default::default()
                },
            )
            .unwrap()
            .unwrap();
        assert_eq!(merged.tags, "dev");

        assert!(backend.delete_prompt(&prompt.id).unwrap());
        assert!(backend.list_prompts().unwrap().is_empty());
    }

    #[test]
    fn test_json_backend_corrupted_file_reads_empty() {
        let temp_dir = TempDir::new().unwrap();
        let file_path = temp_dir.path().join("prompts.json");
        std::fs::write(&file_path, "{{{{ definitely not json").unwrap();

        let backend = JsonBackend::new(&file_path);
        let library = backend.load().unwrap();
        assert!(library.prompts.is_empty());
    }
}
