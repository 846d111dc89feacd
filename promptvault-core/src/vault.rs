//! The vault: the single authoritative mutation path
//!
//! `PromptVault` owns validation, the in-memory library snapshot, the
//! current selection, and persistence. Every mutation validates first,
//! applies to the snapshot, then writes through the storage service.
//! Validation and not-found errors surface to the caller; storage faults
//! never do.

use std::path::Path;

use chrono::Utc;
use thiserror::Error;
use uuid::Uuid;

use crate::models::{
    Category, CustomField, FieldType, Prompt, PromptDraft, PromptLibrary, PromptPatch, SearchField,
};
use crate::service::{StorageInfo, StorageService};

/// Errors surfaced by vault operations
///
/// Storage failures are not represented here; the storage service swallows
/// them and falls back.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum VaultError {
    /// Input failed a validation rule; recoverable by correcting the input
    #[error("{0}")]
    Validation(String),

    /// An operation referenced an id that does not exist
    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: Uuid },
}

impl VaultError {
    fn validation(message: &str) -> Self {
        VaultError::Validation(message.to_string())
    }

    fn not_found(kind: &'static str, id: Uuid) -> Self {
        VaultError::NotFound { kind, id }
    }
}

pub type VaultResult<T> = Result<T, VaultError>;

/// The in-memory source of truth for a prompt collection, write-through
/// persisted via `StorageService`
pub struct PromptVault {
    storage: StorageService,
    library: PromptLibrary,
}

impl PromptVault {
    /// Creates a vault over an already-constructed storage service,
    /// hydrating the snapshot from whichever store answers
    pub fn new(storage: StorageService) -> Self {
        let hydrated = storage.load_library();
        log::debug!(
            "Hydrated {} prompts from the {} store",
            hydrated.value.prompts.len(),
            hydrated.source
        );
        Self {
            storage,
            library: hydrated.value,
        }
    }

    /// Opens the standard store pair for a database path
    pub fn open<P: AsRef<Path>>(db_path: P) -> Self {
        Self::new(StorageService::open(db_path))
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// All prompts in insertion order
    pub fn prompts(&self) -> &[Prompt] {
        &self.library.prompts
    }

    /// All prompts ordered by `updated_at` descending
    pub fn get_all_prompts(&self) -> Vec<Prompt> {
        self.library.prompts_by_recency()
    }

    /// Looks up a prompt; absence is not an error
    pub fn get_prompt(&self, id: &Uuid) -> Option<&Prompt> {
        self.library.get_prompt(id)
    }

    /// Custom field definitions
    pub fn custom_fields(&self) -> &[CustomField] {
        &self.library.custom_fields
    }

    /// All categories
    pub fn categories(&self) -> &[Category] {
        &self.library.categories
    }

    /// The currently selected prompt, if any
    pub fn selected_prompt(&self) -> Option<&Prompt> {
        self.library.selected_prompt()
    }

    /// The current selection id
    pub fn selected_prompt_id(&self) -> Option<Uuid> {
        self.library.selected_prompt_id
    }

    /// Case-insensitive substring search over a single field, delegated to
    /// the storage service
    pub fn search_prompts(&self, query: &str, field: SearchField) -> Vec<Prompt> {
        self.storage.search_prompts(query, field).into_value()
    }

    /// Best-effort storage usage/quota figures
    pub fn storage_info(&self) -> StorageInfo {
        self.storage.storage_info()
    }

    // =========================================================================
    // Prompt mutations
    // =========================================================================

    /// Creates a prompt from a draft
    ///
    /// The title is trimmed and must be non-empty and unique
    /// (case-insensitively). On success the new prompt becomes the current
    /// selection. Nothing is written to storage when validation fails.
    pub fn create_prompt(&mut self, draft: PromptDraft) -> VaultResult<Prompt> {
        let title = draft.title.trim().to_string();
        if title.is_empty() {
            return Err(VaultError::validation("Title is required"));
        }
        if self.library.title_taken(&title, None) {
            return Err(VaultError::validation("Title must be unique"));
        }

        let mut prompt = Prompt::new(title);
        prompt.prompt_text = draft.prompt_text;
        prompt.category = draft.category;
        prompt.tags = draft.tags;
        prompt.expected_output = draft.expected_output;
        prompt.notes = draft.notes;
        prompt.custom_fields = draft.custom_fields;

        self.storage.add_prompt(&prompt);
        self.library.prompts.push(prompt.clone());
        self.library.selected_prompt_id = Some(prompt.id);
        self.storage.save_selection(Some(&prompt.id));

        Ok(prompt)
    }

    /// Applies a partial update to a prompt
    ///
    /// A patched title is trimmed and re-checked for uniqueness against all
    /// other prompts; keeping the prompt's own title is allowed. The merge
    /// refreshes `updated_at` and never touches `created_at`.
    pub fn update_prompt(&mut self, id: &Uuid, mut patch: PromptPatch) -> VaultResult<Prompt> {
        if self.library.get_prompt(id).is_none() {
            return Err(VaultError::not_found("Prompt", *id));
        }

        if let Some(title) = patch.title.take() {
            let trimmed = title.trim().to_string();
            if trimmed.is_empty() {
                return Err(VaultError::validation("Title is required"));
            }
            if self.library.title_taken(&trimmed, Some(id)) {
                return Err(VaultError::validation("Title must be unique"));
            }
            patch.title = Some(trimmed);
        }

        let stored = self.storage.update_prompt(id, &patch).value;
        let Some(prompt) = self.library.get_prompt_mut(id) else {
            return Err(VaultError::not_found("Prompt", *id));
        };
        match stored {
            // The storage layer performed the merge; mirror its record so
            // the snapshot and the stores agree on timestamps.
            Some(merged) => *prompt = merged,
            // No store knew the record; the snapshot carries the merge.
            None => prompt.apply_patch(&patch),
        }

        Ok(prompt.clone())
    }

    /// Deletes a prompt, clearing the selection if it pointed at it
    pub fn delete_prompt(&mut self, id: &Uuid) -> VaultResult<()> {
        if self.library.get_prompt(id).is_none() {
            return Err(VaultError::not_found("Prompt", *id));
        }

        self.library.prompts.retain(|p| &p.id != id);
        if self.library.selected_prompt_id.as_ref() == Some(id) {
            self.library.selected_prompt_id = None;
            self.storage.save_selection(None);
        }
        self.storage.delete_prompt(id);

        Ok(())
    }

    /// Sets the current selection; the id is not validated against the
    /// collection
    pub fn select_prompt(&mut self, id: Option<Uuid>) {
        self.library.selected_prompt_id = id;
        self.storage.save_selection(self.library.selected_prompt_id.as_ref());
    }

    /// Records that a prompt was just used, stamping `last_used`
    pub fn mark_used(&mut self, id: &Uuid) -> VaultResult<Prompt> {
        self.update_prompt(
            id,
            PromptPatch {
                last_used: Some(Utc::now()),
                ..Default::default()
            },
        )
    }

    // =========================================================================
    // Custom field mutations
    // =========================================================================

    /// Defines a new custom field
    ///
    /// The name is trimmed and must be non-empty and unique
    /// (case-insensitively). Options are kept only for select fields.
    pub fn add_custom_field(
        &mut self,
        name: &str,
        field_type: FieldType,
        options: Vec<String>,
    ) -> VaultResult<CustomField> {
        let name = name.trim();
        if name.is_empty() {
            return Err(VaultError::validation("Field name is required"));
        }
        if self.library.field_name_taken(name, None) {
            return Err(VaultError::validation("Field name must be unique"));
        }

        let field = CustomField::new(name.to_string(), field_type, options);
        self.library.custom_fields.push(field.clone());
        self.storage.save_custom_fields(&self.library.custom_fields);

        Ok(field)
    }

    /// Updates a custom field definition; absent arguments leave the
    /// current value in place
    pub fn update_custom_field(
        &mut self,
        id: &Uuid,
        name: Option<&str>,
        field_type: Option<FieldType>,
        options: Option<Vec<String>>,
    ) -> VaultResult<CustomField> {
        if self.library.get_custom_field(id).is_none() {
            return Err(VaultError::not_found("Custom field", *id));
        }

        let new_name = match name {
            Some(n) => {
                let trimmed = n.trim().to_string();
                if trimmed.is_empty() {
                    return Err(VaultError::validation("Field name is required"));
                }
                if self.library.field_name_taken(&trimmed, Some(id)) {
                    return Err(VaultError::validation("Field name must be unique"));
                }
                Some(trimmed)
            }
            None => None,
        };

        let Some(field) = self.library.custom_fields.iter_mut().find(|f| &f.id == id) else {
            return Err(VaultError::not_found("Custom field", *id));
        };
        if let Some(n) = new_name {
            field.name = n;
        }
        if let Some(t) = field_type {
            field.field_type = t;
        }
        if let Some(o) = options {
            field.options = o;
        }
        if field.field_type != FieldType::Select {
            field.options.clear();
        }
        let updated = field.clone();

        self.storage.save_custom_fields(&self.library.custom_fields);
        Ok(updated)
    }

    /// Removes a custom field definition
    ///
    /// Values already stored on prompts under the field's id are not
    /// scrubbed.
    pub fn remove_custom_field(&mut self, id: &Uuid) -> VaultResult<()> {
        if self.library.get_custom_field(id).is_none() {
            return Err(VaultError::not_found("Custom field", *id));
        }

        self.library.custom_fields.retain(|f| &f.id != id);
        self.storage.save_custom_fields(&self.library.custom_fields);
        Ok(())
    }

    // =========================================================================
    // Category mutations
    // =========================================================================

    /// Creates a category; the name is required but uniqueness is not
    /// enforced
    pub fn add_category(
        &mut self,
        name: &str,
        color: &str,
        description: Option<String>,
    ) -> VaultResult<Category> {
        let name = name.trim();
        if name.is_empty() {
            return Err(VaultError::validation("Category name is required"));
        }

        let category = Category::new(name.to_string(), color.to_string(), description);
        self.library.categories.push(category.clone());
        self.storage.add_category(&category);

        Ok(category)
    }

    /// Updates a category; absent arguments leave the current value in place
    pub fn update_category(
        &mut self,
        id: &Uuid,
        name: Option<&str>,
        color: Option<&str>,
        description: Option<String>,
    ) -> VaultResult<Category> {
        let Some(category) = self.library.get_category_mut(id) else {
            return Err(VaultError::not_found("Category", *id));
        };

        if let Some(n) = name {
            let trimmed = n.trim();
            if trimmed.is_empty() {
                return Err(VaultError::validation("Category name is required"));
            }
            category.name = trimmed.to_string();
        }
        if let Some(c) = color {
            category.color = c.to_string();
        }
        if let Some(d) = description {
            category.description = Some(d);
        }
        let updated = category.clone();

        self.storage.update_category(&updated);
        Ok(updated)
    }

    /// Removes a category
    ///
    /// Prompts referencing the category by name keep the stale value; no
    /// cascade.
    pub fn remove_category(&mut self, id: &Uuid) -> VaultResult<()> {
        if self.library.get_category(id).is_none() {
            return Err(VaultError::not_found("Category", *id));
        }

        self.library.categories.retain(|c| &c.id != id);
        self.storage.delete_category(id);
        Ok(())
    }

    // =========================================================================
    // Whole-library operations
    // =========================================================================

    /// Resets every collection and the selection, then persists the empty
    /// snapshot. Destructive and irreversible; callers gate this behind an
    /// explicit confirmation.
    pub fn clear_database(&mut self) {
        self.library = PromptLibrary::new();
        self.storage.clear_all();
    }

    /// Picks a title that is not yet taken by suffixing a counter,
    /// e.g. `"Code Review (2)"`
    pub fn next_available_title(&self, base: &str) -> String {
        let base = base.trim();
        if !self.library.title_taken(base, None) {
            return base.to_string();
        }
        let mut n = 2;
        loop {
            let candidate = format!("{} ({})", base, n);
            if !self.library.title_taken(&candidate, None) {
                return candidate;
            }
            n += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn vault(dir: &TempDir) -> PromptVault {
        PromptVault::open(dir.path().join("prompts.db"))
    }

    fn draft(title: &str) -> PromptDraft {
        PromptDraft {
            title: title.into(),
            ..Default::default()
        }
    }

    #[test]
    fn test_create_prompt_stamps_matching_timestamps() {
        let dir = TempDir::new().unwrap();
        let mut vault = vault(&dir);

        let prompt = vault.create_prompt(draft("Code Review")).unwrap();
        assert_eq!(prompt.created_at, prompt.updated_at);
        assert_eq!(prompt.title, "Code Review");
        assert_eq!(vault.selected_prompt_id(), Some(prompt.id));
    }

    #[test]
    fn test_create_prompt_trims_title() {
        let dir = TempDir::new().unwrap();
        let mut vault = vault(&dir);

        let prompt = vault.create_prompt(draft("  Code Review  ")).unwrap();
        assert_eq!(prompt.title, "Code Review");
    }

    #[test]
    fn test_create_prompt_requires_title() {
        let dir = TempDir::new().unwrap();
        let mut vault = vault(&dir);

        let err = vault.create_prompt(draft("   ")).unwrap_err();
        assert_eq!(err, VaultError::Validation("Title is required".into()));
        assert!(vault.prompts().is_empty());
        // No storage write happened either
        assert!(vault.storage.get_all_prompts().value.is_empty());
    }

    #[test]
    fn test_create_prompt_rejects_duplicate_title_case_insensitively() {
        let dir = TempDir::new().unwrap();
        let mut vault = vault(&dir);

        vault.create_prompt(draft("Code Review")).unwrap();
        let err = vault.create_prompt(draft("code review")).unwrap_err();
        assert_eq!(err, VaultError::Validation("Title must be unique".into()));
        assert_eq!(vault.prompts().len(), 1);
        assert_eq!(vault.storage.get_all_prompts().value.len(), 1);
    }

    #[test]
    fn test_update_prompt_advances_updated_at_only() {
        let dir = TempDir::new().unwrap();
        let mut vault = vault(&dir);

        let prompt = vault.create_prompt(draft("Code Review")).unwrap();
        let updated = vault
            .update_prompt(
                &prompt.id,
                PromptPatch {
                    category: Some("Dev".into()),
                    ..Default::default()
                },
            )
            .unwrap();

        assert_eq!(updated.category, "Dev");
        assert_eq!(updated.title, "Code Review");
        assert_eq!(updated.created_at, prompt.created_at);
        assert!(updated.updated_at > prompt.updated_at);
    }

    #[test]
    fn test_update_prompt_title_uniqueness_excludes_self() {
        let dir = TempDir::new().unwrap();
        let mut vault = vault(&dir);

        let first = vault.create_prompt(draft("Code Review")).unwrap();
        let second = vault.create_prompt(draft("Summarize")).unwrap();

        // Colliding with another prompt fails
        let err = vault
            .update_prompt(
                &second.id,
                PromptPatch {
                    title: Some("CODE REVIEW".into()),
                    ..Default::default()
                },
            )
            .unwrap_err();
        assert_eq!(err, VaultError::Validation("Title must be unique".into()));

        // Keeping one's own title succeeds
        let updated = vault
            .update_prompt(
                &first.id,
                PromptPatch {
                    title: Some("Code Review".into()),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(updated.title, "Code Review");
    }

    #[test]
    fn test_update_and_delete_missing_prompt_not_found() {
        let dir = TempDir::new().unwrap();
        let mut vault = vault(&dir);

        let id = Uuid::new_v4();
        let err = vault.update_prompt(&id, PromptPatch::default()).unwrap_err();
        assert!(err.to_string().contains("Prompt not found"));

        let err = vault.delete_prompt(&id).unwrap_err();
        assert_eq!(err, VaultError::not_found("Prompt", id));
    }

    #[test]
    fn test_delete_prompt_clears_matching_selection() {
        let dir = TempDir::new().unwrap();
        let mut vault = vault(&dir);

        let first = vault.create_prompt(draft("Code Review")).unwrap();
        let second = vault.create_prompt(draft("Summarize")).unwrap();
        assert_eq!(vault.selected_prompt_id(), Some(second.id));

        // Deleting an unselected prompt keeps the selection
        vault.delete_prompt(&first.id).unwrap();
        assert_eq!(vault.selected_prompt_id(), Some(second.id));

        vault.delete_prompt(&second.id).unwrap();
        assert_eq!(vault.selected_prompt_id(), None);
    }

    #[test]
    fn test_select_prompt_accepts_unknown_id() {
        let dir = TempDir::new().unwrap();
        let mut vault = vault(&dir);

        let stale = Uuid::new_v4();
        vault.select_prompt(Some(stale));
        assert_eq!(vault.selected_prompt_id(), Some(stale));
        assert!(vault.selected_prompt().is_none());
    }

    #[test]
    fn test_mark_used_stamps_last_used() {
        let dir = TempDir::new().unwrap();
        let mut vault = vault(&dir);

        let prompt = vault.create_prompt(draft("Code Review")).unwrap();
        assert!(prompt.last_used.is_none());

        let used = vault.mark_used(&prompt.id).unwrap();
        assert!(used.last_used.is_some());
        assert!(used.updated_at > prompt.updated_at);
    }

    #[test]
    fn test_round_trip_survives_reopen() {
        let dir = TempDir::new().unwrap();
        let db_path = dir.path().join("prompts.db");

        let id = {
            let mut vault = PromptVault::open(&db_path);
            let mut draft = draft("Code Review");
            draft.tags = "dev,weekly".into();
            let prompt = vault.create_prompt(draft).unwrap();
            prompt.id
        };

        let vault = PromptVault::open(&db_path);
        let prompts = vault.get_all_prompts();
        assert_eq!(prompts.len(), 1);
        assert_eq!(prompts[0].id, id);
        assert_eq!(prompts[0].tags, "dev,weekly");
        assert_eq!(vault.selected_prompt_id(), Some(id));
    }

    #[test]
    fn test_custom_field_name_uniqueness() {
        let dir = TempDir::new().unwrap();
        let mut vault = vault(&dir);

        vault
            .add_custom_field("Model", FieldType::Text, Vec::new())
            .unwrap();
        let err = vault
            .add_custom_field("  model ", FieldType::Number, Vec::new())
            .unwrap_err();
        assert_eq!(err, VaultError::Validation("Field name must be unique".into()));
    }

    #[test]
    fn test_update_custom_field_normalizes_options() {
        let dir = TempDir::new().unwrap();
        let mut vault = vault(&dir);

        let field = vault
            .add_custom_field("Model", FieldType::Select, vec!["a".into(), "b".into()])
            .unwrap();

        // Switching away from select drops the options
        let updated = vault
            .update_custom_field(&field.id, None, Some(FieldType::Text), None)
            .unwrap();
        assert!(updated.options.is_empty());
    }

    #[test]
    fn test_remove_category_does_not_cascade() {
        let dir = TempDir::new().unwrap();
        let mut vault = vault(&dir);

        let category = vault.add_category("Dev", "#3366ff", None).unwrap();
        let mut d = draft("Code Review");
        d.category = "Dev".into();
        let prompt = vault.create_prompt(d).unwrap();

        vault.remove_category(&category.id).unwrap();
        assert!(vault.categories().is_empty());
        // The prompt keeps the stale category name
        assert_eq!(vault.get_prompt(&prompt.id).unwrap().category, "Dev");
    }

    #[test]
    fn test_clear_database_resets_everything() {
        let dir = TempDir::new().unwrap();
        let mut vault = vault(&dir);

        vault.create_prompt(draft("Code Review")).unwrap();
        vault.add_category("Dev", "#3366ff", None).unwrap();
        vault
            .add_custom_field("Model", FieldType::Text, Vec::new())
            .unwrap();

        vault.clear_database();
        assert!(vault.prompts().is_empty());
        assert!(vault.categories().is_empty());
        assert!(vault.custom_fields().is_empty());
        assert_eq!(vault.selected_prompt_id(), None);

        // The stores were cleared too
        assert!(vault.storage.get_all_prompts().value.is_empty());
    }

    #[test]
    fn test_next_available_title() {
        let dir = TempDir::new().unwrap();
        let mut vault = vault(&dir);

        assert_eq!(vault.next_available_title("Code Review"), "Code Review");
        vault.create_prompt(draft("Code Review")).unwrap();
        assert_eq!(vault.next_available_title("Code Review"), "Code Review (2)");
    }

    #[test]
    fn test_spec_scenario_code_review() {
        let dir = TempDir::new().unwrap();
        let mut vault = vault(&dir);

        let created = vault.create_prompt(draft("Code Review")).unwrap();
        let all = vault.get_all_prompts();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].title, "Code Review");
        assert_eq!(all[0].created_at, all[0].updated_at);

        let err = vault.create_prompt(draft("code review")).unwrap_err();
        assert_eq!(err, VaultError::Validation("Title must be unique".into()));

        let updated = vault
            .update_prompt(
                &created.id,
                PromptPatch {
                    category: Some("Dev".into()),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(updated.category, "Dev");
        assert_eq!(updated.title, "Code Review");
        assert!(updated.updated_at > created.updated_at);
    }
}
