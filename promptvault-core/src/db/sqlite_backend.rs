//! SQLite storage backend
//!
//! This is the primary persistence target: a structured, indexed on-device
//! database with per-record access paths.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use uuid::Uuid;

use crate::models::{
    Category, CustomField, FieldType, FieldValue, Prompt, PromptLibrary, PromptPatch,
};

use super::traits::{BackendType, StorageBackend};

/// Current schema version
const SCHEMA_VERSION: i32 = 1;

/// SQLite backend implementation
pub struct SqliteBackend {
    path: PathBuf,
    conn: Mutex<Connection>,
}

impl SqliteBackend {
    /// Creates a new SQLite backend
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(&path)?;

        // Enable WAL mode for better concurrent access
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;

        let backend = Self {
            path,
            conn: Mutex::new(conn),
        };

        backend.init_schema()?;
        Ok(backend)
    }

    /// Initialize the database schema
    fn init_schema(&self) -> Result<()> {
        let conn = self.conn.lock().unwrap();

        let current_version: i32 = conn
            .query_row("SELECT version FROM schema_version LIMIT 1", [], |row| {
                row.get(0)
            })
            .unwrap_or(0);

        if current_version == 0 {
            conn.execute_batch(include_str!("schema.sql"))?;
        } else if current_version < SCHEMA_VERSION {
            // Future: handle migrations
            anyhow::bail!(
                "Database schema version {} is outdated, expected {}",
                current_version,
                SCHEMA_VERSION
            );
        }

        Ok(())
    }

    /// Serializes complex types to JSON for storage
    fn to_json<T: serde::Serialize>(value: &T) -> Result<String> {
        serde_json::to_string(value).context("Failed to serialize to JSON")
    }

    /// Deserializes complex types from JSON storage
    fn from_json<T: serde::de::DeserializeOwned>(json: &str) -> Result<T> {
        serde_json::from_str(json).context("Failed to deserialize from JSON")
    }

    /// Converts a FieldType to a string for storage
    fn field_type_to_str(field_type: &FieldType) -> &'static str {
        match field_type {
            FieldType::Text => "text",
            FieldType::Number => "number",
            FieldType::Textarea => "textarea",
            FieldType::Select => "select",
        }
    }

    /// Parses a FieldType from a string
    fn str_to_field_type(s: &str) -> FieldType {
        FieldType::parse(s)
    }

    fn parse_timestamp(s: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(s)
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(|_| Utc::now())
    }

    /// Builds a Prompt from a row of the canonical column order
    fn prompt_from_row(row: &Row<'_>) -> rusqlite::Result<Prompt> {
        let id_str: String = row.get(0)?;
        let title: String = row.get(1)?;
        let prompt_text: String = row.get(2)?;
        let category: String = row.get(3)?;
        let tags: String = row.get(4)?;
        let expected_output: String = row.get(5)?;
        let notes: String = row.get(6)?;
        let custom_fields_json: String = row.get(7)?;
        let last_used_str: Option<String> = row.get(8)?;
        let created_at_str: String = row.get(9)?;
        let updated_at_str: String = row.get(10)?;

        let custom_fields: HashMap<Uuid, FieldValue> =
            Self::from_json(&custom_fields_json).unwrap_or_default();

        Ok(Prompt {
            id: Uuid::parse_str(&id_str).unwrap_or_else(|_| Uuid::new_v4()),
            title,
            prompt_text,
            category,
            tags,
            expected_output,
            notes,
            custom_fields,
            last_used: last_used_str.as_deref().map(Self::parse_timestamp),
            created_at: Self::parse_timestamp(&created_at_str),
            updated_at: Self::parse_timestamp(&updated_at_str),
        })
    }

    const PROMPT_COLUMNS: &'static str = "id, title, prompt_text, category, tags, \
         expected_output, notes, custom_fields, last_used, created_at, updated_at";

    /// Load prompts from the database, most recently updated first
    fn load_prompts(&self, conn: &Connection) -> Result<Vec<Prompt>> {
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM prompts ORDER BY updated_at DESC",
            Self::PROMPT_COLUMNS
        ))?;

        let rows = stmt.query_map([], Self::prompt_from_row)?;

        let mut prompts = Vec::new();
        for row_result in rows {
            prompts.push(row_result?);
        }
        Ok(prompts)
    }

    /// Load custom field definitions from the database
    fn load_custom_fields(&self, conn: &Connection) -> Result<Vec<CustomField>> {
        let mut stmt = conn.prepare("SELECT id, name, field_type, options FROM custom_fields")?;

        let rows = stmt.query_map([], |row| {
            let id_str: String = row.get(0)?;
            let name: String = row.get(1)?;
            let field_type_str: String = row.get(2)?;
            let options_json: String = row.get(3)?;
            Ok((id_str, name, field_type_str, options_json))
        })?;

        let mut fields = Vec::new();
        for row_result in rows {
            let (id_str, name, field_type_str, options_json) = row_result?;
            fields.push(CustomField {
                id: Uuid::parse_str(&id_str).unwrap_or_else(|_| Uuid::new_v4()),
                name,
                field_type: Self::str_to_field_type(&field_type_str),
                options: Self::from_json(&options_json).unwrap_or_default(),
            });
        }
        Ok(fields)
    }

    /// Load categories from the database
    fn load_categories(&self, conn: &Connection) -> Result<Vec<Category>> {
        let mut stmt = conn.prepare("SELECT id, name, color, description FROM categories")?;

        let rows = stmt.query_map([], |row| {
            let id_str: String = row.get(0)?;
            let name: String = row.get(1)?;
            let color: String = row.get(2)?;
            let description: Option<String> = row.get(3)?;
            Ok((id_str, name, color, description))
        })?;

        let mut categories = Vec::new();
        for row_result in rows {
            let (id_str, name, color, description) = row_result?;
            categories.push(Category {
                id: Uuid::parse_str(&id_str).unwrap_or_else(|_| Uuid::new_v4()),
                name,
                color,
                description,
            });
        }
        Ok(categories)
    }

    /// Load the persisted selection from the meta table
    fn load_selection(&self, conn: &Connection) -> Result<Option<Uuid>> {
        let selected: Option<String> = conn
            .query_row("SELECT selected_prompt_id FROM meta WHERE id = 1", [], |row| {
                row.get(0)
            })
            .optional()?
            .flatten();

        Ok(selected.and_then(|s| Uuid::parse_str(&s).ok()))
    }

    /// Save a prompt to the database
    fn save_prompt(&self, conn: &Connection, prompt: &Prompt) -> Result<()> {
        conn.execute(
            "INSERT OR REPLACE INTO prompts
             (id, title, prompt_text, category, tags, expected_output, notes,
              custom_fields, last_used, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
            params![
                prompt.id.to_string(),
                prompt.title,
                prompt.prompt_text,
                prompt.category,
                prompt.tags,
                prompt.expected_output,
                prompt.notes,
                Self::to_json(&prompt.custom_fields)?,
                prompt.last_used.map(|t| t.to_rfc3339()),
                prompt.created_at.to_rfc3339(),
                prompt.updated_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    /// Save a custom field definition to the database
    fn save_custom_field(&self, conn: &Connection, field: &CustomField) -> Result<()> {
        conn.execute(
            "INSERT OR REPLACE INTO custom_fields (id, name, field_type, options)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                field.id.to_string(),
                field.name,
                Self::field_type_to_str(&field.field_type),
                Self::to_json(&field.options)?,
            ],
        )?;
        Ok(())
    }

    /// Save a category to the database
    fn save_category(&self, conn: &Connection, category: &Category) -> Result<()> {
        conn.execute(
            "INSERT OR REPLACE INTO categories (id, name, color, description)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                category.id.to_string(),
                category.name,
                category.color,
                category.description,
            ],
        )?;
        Ok(())
    }

    /// Save the selection to the meta table
    fn save_selection_row(&self, conn: &Connection, selected: Option<&Uuid>) -> Result<()> {
        conn.execute(
            "INSERT OR REPLACE INTO meta (id, selected_prompt_id) VALUES (1, ?1)",
            params![selected.map(|id| id.to_string())],
        )?;
        Ok(())
    }
}

impl StorageBackend for SqliteBackend {
    fn backend_type(&self) -> BackendType {
        BackendType::Sqlite
    }

    fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Result<PromptLibrary> {
        let conn = self.conn.lock().unwrap();

        let prompts = self.load_prompts(&conn)?;
        let custom_fields = self.load_custom_fields(&conn)?;
        let categories = self.load_categories(&conn)?;
        let selected_prompt_id = self.load_selection(&conn)?;

        Ok(PromptLibrary {
            prompts,
            custom_fields,
            categories,
            selected_prompt_id,
        })
    }

    fn save(&self, library: &PromptLibrary) -> Result<()> {
        let conn = self.conn.lock().unwrap();

        // Use a transaction for atomicity
        conn.execute("BEGIN TRANSACTION", [])?;

        conn.execute("DELETE FROM prompts", [])?;
        conn.execute("DELETE FROM custom_fields", [])?;
        conn.execute("DELETE FROM categories", [])?;

        for prompt in &library.prompts {
            self.save_prompt(&conn, prompt)?;
        }
        for field in &library.custom_fields {
            self.save_custom_field(&conn, field)?;
        }
        for category in &library.categories {
            self.save_category(&conn, category)?;
        }
        self.save_selection_row(&conn, library.selected_prompt_id.as_ref())?;

        conn.execute("COMMIT", [])?;
        Ok(())
    }

    // Override for more efficient single-record operations

    fn list_prompts(&self) -> Result<Vec<Prompt>> {
        let conn = self.conn.lock().unwrap();
        self.load_prompts(&conn)
    }

    fn get_prompt(&self, id: &Uuid) -> Result<Option<Prompt>> {
        let conn = self.conn.lock().unwrap();

        conn.query_row(
            &format!(
                "SELECT {} FROM prompts WHERE id = ?1",
                Self::PROMPT_COLUMNS
            ),
            [id.to_string()],
            Self::prompt_from_row,
        )
        .optional()
        .map_err(|e| e.into())
    }

    fn add_prompt(&self, prompt: &Prompt) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        self.save_prompt(&conn, prompt)
    }

    fn update_prompt(&self, id: &Uuid, patch: &PromptPatch) -> Result<Option<Prompt>> {
        let Some(mut prompt) = self.get_prompt(id)? else {
            return Ok(None);
        };
        prompt.apply_patch(patch);

        let conn = self.conn.lock().unwrap();
        self.save_prompt(&conn, &prompt)?;
        Ok(Some(prompt))
    }

    fn delete_prompt(&self, id: &Uuid) -> Result<bool> {
        let conn = self.conn.lock().unwrap();
        let rows_affected = conn.execute("DELETE FROM prompts WHERE id = ?1", [id.to_string()])?;
        Ok(rows_affected > 0)
    }

    fn list_categories(&self) -> Result<Vec<Category>> {
        let conn = self.conn.lock().unwrap();
        self.load_categories(&conn)
    }

    fn add_category(&self, category: &Category) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        self.save_category(&conn, category)
    }

    fn update_category(&self, category: &Category) -> Result<bool> {
        let conn = self.conn.lock().unwrap();
        let rows_affected = conn.execute(
            "UPDATE categories SET name = ?2, color = ?3, description = ?4 WHERE id = ?1",
            params![
                category.id.to_string(),
                category.name,
                category.color,
                category.description,
            ],
        )?;
        Ok(rows_affected > 0)
    }

    fn delete_category(&self, id: &Uuid) -> Result<bool> {
        let conn = self.conn.lock().unwrap();
        let rows_affected =
            conn.execute("DELETE FROM categories WHERE id = ?1", [id.to_string()])?;
        Ok(rows_affected > 0)
    }

    fn save_custom_fields(&self, fields: &[CustomField]) -> Result<()> {
        let conn = self.conn.lock().unwrap();

        conn.execute("BEGIN TRANSACTION", [])?;
        conn.execute("DELETE FROM custom_fields", [])?;
        for field in fields {
            self.save_custom_field(&conn, field)?;
        }
        conn.execute("COMMIT", [])?;
        Ok(())
    }

    fn save_selection(&self, selected: Option<&Uuid>) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        self.save_selection_row(&conn, selected)
    }

    fn clear(&self) -> Result<()> {
        let conn = self.conn.lock().unwrap();

        conn.execute("BEGIN TRANSACTION", [])?;
        conn.execute("DELETE FROM prompts", [])?;
        conn.execute("DELETE FROM custom_fields", [])?;
        conn.execute("DELETE FROM categories", [])?;
        self.save_selection_row(&conn, None)?;
        conn.execute("COMMIT", [])?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SearchField;
    use tempfile::NamedTempFile;

    #[test]
    fn test_sqlite_backend_create_and_load() {
        let temp_file = NamedTempFile::with_suffix(".db").unwrap();
        let backend = SqliteBackend::new(temp_file.path()).unwrap();

        let library = backend.load().unwrap();
        assert!(library.prompts.is_empty());
        assert!(library.categories.is_empty());
        assert!(library.selected_prompt_id.is_none());
    }

    #[test]
    fn test_sqlite_backend_save_and_load() {
        let temp_file = NamedTempFile::with_suffix(".db").unwrap();
        let backend = SqliteBackend::new(temp_file.path()).unwrap();

        let mut library = PromptLibrary::new();
        let mut prompt = Prompt::new("Code Review".into());
        prompt.tags = "dev,review".into();
        prompt
            .custom_fields
            .insert(Uuid::new_v4(), FieldValue::Number(3.0));
        library.selected_prompt_id = Some(prompt.id);
        library.prompts.push(prompt);
        library
            .categories
            .push(Category::new("Dev".into(), "#ff8800".into(), None));

        backend.save(&library).unwrap();

        let loaded = backend.load().unwrap();
        assert_eq!(loaded.prompts.len(), 1);
        assert_eq!(loaded.prompts[0].title, "Code Review");
        assert_eq!(loaded.prompts[0].tags, "dev,review");
        assert_eq!(loaded.prompts[0].custom_fields.len(), 1);
        assert_eq!(loaded.categories.len(), 1);
        assert_eq!(loaded.selected_prompt_id, library.selected_prompt_id);
    }

    #[test]
    fn test_sqlite_backend_prompt_crud() {
        let temp_file = NamedTempFile::with_suffix(".db").unwrap();
        let backend = SqliteBackend::new(temp_file.path()).unwrap();

        let prompt = Prompt::new("Summarize".into());
        backend.add_prompt(&prompt).unwrap();

        let loaded = backend.get_prompt(&prompt.id).unwrap();
        assert!(loaded.is_some());
        assert_eq!(loaded.unwrap().title, "Summarize");

        let patch = PromptPatch {
            category: Some("Writing".into()),
            ..Default::default()
        };
        let merged = backend.update_prompt(&prompt.id, &patch).unwrap().unwrap();
        assert_eq!(merged.category, "Writing");
        assert!(merged.updated_at > prompt.updated_at);
        assert_eq!(merged.created_at, prompt.created_at);

        assert!(backend.delete_prompt(&prompt.id).unwrap());
        assert!(backend.get_prompt(&prompt.id).unwrap().is_none());
        assert!(!backend.delete_prompt(&prompt.id).unwrap());
    }

    #[test]
    fn test_sqlite_backend_list_ordered_by_recency() {
        let temp_file = NamedTempFile::with_suffix(".db").unwrap();
        let backend = SqliteBackend::new(temp_file.path()).unwrap();

        let first = Prompt::new("First".into());
        backend.add_prompt(&first).unwrap();
        let second = Prompt::new("Second".into());
        backend.add_prompt(&second).unwrap();

        // Touch the older prompt so it becomes the most recent
        backend
            .update_prompt(
                &first.id,
                &PromptPatch {
                    notes: Some("touched".into()),
                    ..Default::default()
                },
            )
            .unwrap();

        let prompts = backend.list_prompts().unwrap();
        assert_eq!(prompts[0].title, "First");
        assert_eq!(prompts[1].title, "Second");
    }

    #[test]
    fn test_sqlite_backend_search() {
        let temp_file = NamedTempFile::with_suffix(".db").unwrap();
        let backend = SqliteBackend::new(temp_file.path()).unwrap();

        let mut prompt = Prompt::new("Code Review".into());
        prompt.notes = "Weekly checklist".into();
        backend.add_prompt(&prompt).unwrap();
        backend.add_prompt(&Prompt::new("Summarize".into())).unwrap();

        let hits = backend.search_prompts("code", SearchField::Title).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].title, "Code Review");

        let hits = backend.search_prompts("CHECKLIST", SearchField::Notes).unwrap();
        assert_eq!(hits.len(), 1);

        let hits = backend.search_prompts("code", SearchField::Notes).unwrap();
        assert!(hits.is_empty());
    }
}
