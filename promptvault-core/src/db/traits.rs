//! Storage backend traits
//!
//! This module defines the core trait that all storage backends must implement.

use anyhow::Result;
use std::path::Path;
use uuid::Uuid;

use crate::models::{Category, CustomField, Prompt, PromptLibrary, PromptPatch, SearchField};

/// Types of storage backends available
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendType {
    /// SQLite database storage
    Sqlite,
    /// Flat JSON file storage (single file)
    Json,
}

impl std::fmt::Display for BackendType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BackendType::Sqlite => write!(f, "SQLite"),
            BackendType::Json => write!(f, "JSON"),
        }
    }
}

/// Core trait for storage backends
///
/// The design philosophy is:
/// - `load()` and `save()` work with the full `PromptLibrary`
/// - Individual operations are provided for more efficient database access
/// - Backends can choose to implement efficient versions or delegate to
///   load/save
pub trait StorageBackend: Send + Sync {
    /// Returns the backend type
    fn backend_type(&self) -> BackendType;

    /// Returns the path to the backing file
    fn path(&self) -> &Path;

    // =========================================================================
    // Full Library Operations
    // =========================================================================

    /// Loads the entire library from the backend
    fn load(&self) -> Result<PromptLibrary>;

    /// Saves the entire library to the backend
    fn save(&self, library: &PromptLibrary) -> Result<()>;

    // =========================================================================
    // Prompt Operations
    // =========================================================================

    /// Lists all prompts ordered by `updated_at` descending
    fn list_prompts(&self) -> Result<Vec<Prompt>> {
        Ok(self.load()?.prompts_by_recency())
    }

    /// Gets a prompt by its UUID
    fn get_prompt(&self, id: &Uuid) -> Result<Option<Prompt>> {
        let library = self.load()?;
        Ok(library.get_prompt(id).cloned())
    }

    /// Adds a new prompt
    fn add_prompt(&self, prompt: &Prompt) -> Result<()> {
        let mut library = self.load()?;
        library.prompts.push(prompt.clone());
        self.save(&library)
    }

    /// Applies a partial update to a prompt, refreshing `updated_at`
    ///
    /// Returns the merged record, or `None` if the id is unknown to this
    /// backend.
    fn update_prompt(&self, id: &Uuid, patch: &PromptPatch) -> Result<Option<Prompt>> {
        let mut library = self.load()?;
        let Some(prompt) = library.get_prompt_mut(id) else {
            return Ok(None);
        };
        prompt.apply_patch(patch);
        let merged = prompt.clone();
        self.save(&library)?;
        Ok(Some(merged))
    }

    /// Deletes a prompt by UUID; returns whether a record was removed
    fn delete_prompt(&self, id: &Uuid) -> Result<bool> {
        let mut library = self.load()?;
        let original_len = library.prompts.len();
        library.prompts.retain(|p| &p.id != id);
        if library.prompts.len() == original_len {
            return Ok(false);
        }
        self.save(&library)?;
        Ok(true)
    }

    /// Case-insensitive substring search over a single field
    ///
    /// Scans the full collection; no index is used.
    fn search_prompts(&self, query: &str, field: SearchField) -> Result<Vec<Prompt>> {
        let needle = query.to_lowercase();
        Ok(self
            .list_prompts()?
            .into_iter()
            .filter(|p| p.field_text(field).to_lowercase().contains(&needle))
            .collect())
    }

    // =========================================================================
    // Category Operations
    // =========================================================================

    /// Lists all categories
    fn list_categories(&self) -> Result<Vec<Category>> {
        Ok(self.load()?.categories)
    }

    /// Adds a new category
    fn add_category(&self, category: &Category) -> Result<()> {
        let mut library = self.load()?;
        library.categories.push(category.clone());
        self.save(&library)
    }

    /// Replaces a category; returns whether a record was updated
    fn update_category(&self, category: &Category) -> Result<bool> {
        let mut library = self.load()?;
        let Some(existing) = library.get_category_mut(&category.id) else {
            return Ok(false);
        };
        *existing = category.clone();
        self.save(&library)?;
        Ok(true)
    }

    /// Deletes a category by UUID; returns whether a record was removed
    fn delete_category(&self, id: &Uuid) -> Result<bool> {
        let mut library = self.load()?;
        let original_len = library.categories.len();
        library.categories.retain(|c| &c.id != id);
        if library.categories.len() == original_len {
            return Ok(false);
        }
        self.save(&library)?;
        Ok(true)
    }

    // =========================================================================
    // Custom Field / Selection Operations
    // =========================================================================

    /// Replaces the stored custom field definitions
    fn save_custom_fields(&self, fields: &[CustomField]) -> Result<()> {
        let mut library = self.load()?;
        library.custom_fields = fields.to_vec();
        self.save(&library)
    }

    /// Persists the current selection
    fn save_selection(&self, selected: Option<&Uuid>) -> Result<()> {
        let mut library = self.load()?;
        library.selected_prompt_id = selected.copied();
        self.save(&library)
    }

    // =========================================================================
    // Utility Operations
    // =========================================================================

    /// Resets the backend to an empty library
    fn clear(&self) -> Result<()> {
        self.save(&PromptLibrary::new())
    }

    /// Returns true if the backing file exists
    fn exists(&self) -> bool {
        self.path().exists()
    }

    /// Creates the backing store with empty data if it doesn't exist
    fn create_if_not_exists(&self) -> Result<()> {
        if !self.exists() {
            self.save(&PromptLibrary::new())?;
        }
        Ok(())
    }

    /// Returns statistics about the stored data
    fn stats(&self) -> Result<StorageStats> {
        let library = self.load()?;
        Ok(StorageStats {
            prompt_count: library.prompts.len(),
            custom_field_count: library.custom_fields.len(),
            category_count: library.categories.len(),
            backend_type: self.backend_type(),
        })
    }
}

/// Statistics about a backend's contents
#[derive(Debug, Clone)]
pub struct StorageStats {
    pub prompt_count: usize,
    pub custom_field_count: usize,
    pub category_count: usize,
    pub backend_type: BackendType,
}
