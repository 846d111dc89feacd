//! The storage service: best-effort durable persistence over two backends
//!
//! Every operation tries the primary backend first; on any primary fault it
//! logs and redirects to the fallback, and a fallback fault degrades to the
//! empty default. No operation ever returns a storage error to the caller —
//! storage must not crash the application. Each result records which store
//! actually served it, so the silent failover stays debuggable.

use std::path::{Path, PathBuf};

use anyhow::Result;
use uuid::Uuid;

use crate::db::{JsonBackend, SqliteBackend, StorageBackend};
use crate::models::{Category, CustomField, Prompt, PromptLibrary, PromptPatch, SearchField};

/// Which backing store actually served a request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Served {
    /// The primary (SQLite) store answered
    Primary,
    /// The primary faulted; the fallback (flat JSON) store answered
    Fallback,
    /// Both stores faulted; the caller got the empty default
    Default,
}

impl std::fmt::Display for Served {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Served::Primary => write!(f, "primary"),
            Served::Fallback => write!(f, "fallback"),
            Served::Default => write!(f, "default"),
        }
    }
}

/// A storage result paired with the store that produced it
///
/// The caller-facing data shape is the same whichever store answered; the
/// provenance is carried for logging and diagnostics.
#[derive(Debug, Clone)]
pub struct Outcome<T> {
    pub value: T,
    pub source: Served,
}

impl<T> Outcome<T> {
    /// Discards the provenance and returns the value
    pub fn into_value(self) -> T {
        self.value
    }
}

/// Best-effort usage and quota figures for the backing stores
#[derive(Debug, Clone, Copy, Default)]
pub struct StorageInfo {
    /// Bytes currently used by the backing files
    pub usage: u64,
    /// Bytes of capacity on the containing volume
    pub quota: u64,
}

/// Persistence façade over a primary and a fallback backend
pub struct StorageService {
    primary: Option<Box<dyn StorageBackend>>,
    fallback: Box<dyn StorageBackend>,
}

impl StorageService {
    /// Creates a service from explicit backends
    pub fn new(primary: Box<dyn StorageBackend>, fallback: Box<dyn StorageBackend>) -> Self {
        Self {
            primary: Some(primary),
            fallback,
        }
    }

    /// Opens the standard pair of stores for a database path: SQLite at the
    /// given path, flat JSON at the `.json` sibling.
    ///
    /// If the SQLite store cannot even be opened, the service starts in
    /// fallback-only mode rather than failing.
    pub fn open<P: AsRef<Path>>(db_path: P) -> Self {
        let db_path = db_path.as_ref();
        let fallback_path = db_path.with_extension("json");

        let primary: Option<Box<dyn StorageBackend>> = match SqliteBackend::new(db_path) {
            Ok(backend) => Some(Box::new(backend)),
            Err(e) => {
                log::warn!(
                    "Could not open primary store at {:?}, running on fallback only: {:#}",
                    db_path,
                    e
                );
                None
            }
        };

        Self {
            primary,
            fallback: Box::new(JsonBackend::new(fallback_path)),
        }
    }

    /// Path of the primary store, if one was opened
    pub fn primary_path(&self) -> Option<&Path> {
        self.primary.as_deref().map(|b| b.path())
    }

    /// Path of the fallback store
    pub fn fallback_path(&self) -> &Path {
        self.fallback.path()
    }

    /// Runs an operation against the primary store, falling back on fault
    fn run<T>(
        &self,
        what: &str,
        default: T,
        op: impl Fn(&dyn StorageBackend) -> Result<T>,
    ) -> Outcome<T> {
        if let Some(primary) = self.primary.as_deref() {
            match op(primary) {
                Ok(value) => {
                    return Outcome {
                        value,
                        source: Served::Primary,
                    }
                }
                Err(e) => {
                    log::warn!("Primary store failed to {}, falling back: {:#}", what, e);
                }
            }
        }

        match op(self.fallback.as_ref()) {
            Ok(value) => Outcome {
                value,
                source: Served::Fallback,
            },
            Err(e) => {
                log::warn!(
                    "Fallback store also failed to {}, serving default: {:#}",
                    what,
                    e
                );
                Outcome {
                    value: default,
                    source: Served::Default,
                }
            }
        }
    }

    /// Loads the whole library, used for hydration at startup
    pub fn load_library(&self) -> Outcome<PromptLibrary> {
        self.run("load library", PromptLibrary::new(), |b| b.load())
    }

    /// All prompts ordered by `updated_at` descending
    pub fn get_all_prompts(&self) -> Outcome<Vec<Prompt>> {
        self.run("list prompts", Vec::new(), |b| b.list_prompts())
    }

    /// Looks up a single prompt
    pub fn get_prompt(&self, id: &Uuid) -> Outcome<Option<Prompt>> {
        self.run("get prompt", None, |b| b.get_prompt(id))
    }

    /// Inserts a prompt
    pub fn add_prompt(&self, prompt: &Prompt) -> Outcome<()> {
        self.run("add prompt", (), |b| b.add_prompt(prompt))
    }

    /// Applies a partial update, refreshing `updated_at`; returns the merged
    /// record when the store knew the id
    pub fn update_prompt(&self, id: &Uuid, patch: &PromptPatch) -> Outcome<Option<Prompt>> {
        self.run("update prompt", None, |b| b.update_prompt(id, patch))
    }

    /// Deletes a prompt; the value is whether the store removed a record
    pub fn delete_prompt(&self, id: &Uuid) -> Outcome<bool> {
        self.run("delete prompt", false, |b| b.delete_prompt(id))
    }

    /// Case-insensitive substring search over a single field
    pub fn search_prompts(&self, query: &str, field: SearchField) -> Outcome<Vec<Prompt>> {
        self.run("search prompts", Vec::new(), |b| {
            b.search_prompts(query, field)
        })
    }

    /// All categories
    pub fn get_all_categories(&self) -> Outcome<Vec<Category>> {
        self.run("list categories", Vec::new(), |b| b.list_categories())
    }

    /// Inserts a category
    pub fn add_category(&self, category: &Category) -> Outcome<()> {
        self.run("add category", (), |b| b.add_category(category))
    }

    /// Replaces a category
    pub fn update_category(&self, category: &Category) -> Outcome<bool> {
        self.run("update category", false, |b| b.update_category(category))
    }

    /// Deletes a category
    pub fn delete_category(&self, id: &Uuid) -> Outcome<bool> {
        self.run("delete category", false, |b| b.delete_category(id))
    }

    /// Replaces the stored custom field definitions
    pub fn save_custom_fields(&self, fields: &[CustomField]) -> Outcome<()> {
        self.run("save custom fields", (), |b| b.save_custom_fields(fields))
    }

    /// Persists the current selection
    pub fn save_selection(&self, selected: Option<&Uuid>) -> Outcome<()> {
        self.run("save selection", (), |b| b.save_selection(selected))
    }

    /// Resets every store to an empty library
    pub fn clear_all(&self) -> Outcome<()> {
        // Clear both stores, not just whichever answers first; leftover
        // fallback data would otherwise resurface after a primary fault.
        let mut source = Served::Fallback;
        if let Some(primary) = self.primary.as_deref() {
            match primary.clear() {
                Ok(()) => source = Served::Primary,
                Err(e) => log::warn!("Primary store failed to clear: {:#}", e),
            }
        }
        if let Err(e) = self.fallback.clear() {
            log::warn!("Fallback store failed to clear: {:#}", e);
            if source != Served::Primary {
                source = Served::Default;
            }
        }
        Outcome { value: (), source }
    }

    /// Best-effort usage/quota figures; zeros when unavailable
    pub fn storage_info(&self) -> StorageInfo {
        let mut usage = 0u64;
        let mut probe_path: Option<PathBuf> = None;

        let mut paths: Vec<&Path> = vec![self.fallback.path()];
        if let Some(primary) = self.primary.as_deref() {
            paths.push(primary.path());
        }

        for path in paths {
            if let Ok(meta) = std::fs::metadata(path) {
                usage += meta.len();
                if probe_path.is_none() {
                    probe_path = path.parent().map(|p| p.to_path_buf());
                }
            }
        }

        let quota = probe_path
            .and_then(|p| fs2::total_space(p).ok())
            .unwrap_or(0);

        StorageInfo { usage, quota }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::BackendType;
    use tempfile::TempDir;

    /// A primary store that throws on every call
    struct FailingBackend {
        path: PathBuf,
    }

    impl StorageBackend for FailingBackend {
        fn backend_type(&self) -> BackendType {
            BackendType::Sqlite
        }

        fn path(&self) -> &Path {
            &self.path
        }

        fn load(&self) -> Result<PromptLibrary> {
            anyhow::bail!("primary store is down")
        }

        fn save(&self, _library: &PromptLibrary) -> Result<()> {
            anyhow::bail!("primary store is down")
        }
    }

    fn failing_service(dir: &TempDir) -> StorageService {
        StorageService::new(
            Box::new(FailingBackend {
                path: dir.path().join("broken.db"),
            }),
            Box::new(JsonBackend::new(dir.path().join("prompts.json"))),
        )
    }

    #[test]
    fn test_happy_path_serves_primary() {
        let dir = TempDir::new().unwrap();
        let service = StorageService::open(dir.path().join("prompts.db"));

        let prompt = Prompt::new("Code Review".into());
        assert_eq!(service.add_prompt(&prompt).source, Served::Primary);

        let all = service.get_all_prompts();
        assert_eq!(all.source, Served::Primary);
        assert_eq!(all.value.len(), 1);
    }

    #[test]
    fn test_failing_primary_falls_back_self_consistently() {
        let dir = TempDir::new().unwrap();
        let service = failing_service(&dir);

        let prompt = Prompt::new("Code Review".into());
        let outcome = service.add_prompt(&prompt);
        assert_eq!(outcome.source, Served::Fallback);

        let all = service.get_all_prompts();
        assert_eq!(all.source, Served::Fallback);
        assert_eq!(all.value.len(), 1);
        assert_eq!(all.value[0].title, "Code Review");

        let merged = service
            .update_prompt(
                &prompt.id,
                &PromptPatch {
                    category: Some("Dev".into()),
                    ..Default::default()
                },
            )
            .value
            .unwrap();
        assert_eq!(merged.category, "Dev");
        assert_eq!(merged.created_at, prompt.created_at);

        let got = service.get_prompt(&prompt.id);
        assert_eq!(got.source, Served::Fallback);
        assert_eq!(got.value.unwrap().category, "Dev");

        assert!(service.delete_prompt(&prompt.id).value);
        assert!(service.get_all_prompts().value.is_empty());
    }

    #[test]
    fn test_search_falls_back() {
        let dir = TempDir::new().unwrap();
        let service = failing_service(&dir);

        let mut prompt = Prompt::new("Code Review".into());
        prompt.tags = "dev,weekly".into();
        service.add_prompt(&prompt);

        let hits = service.search_prompts("WEEKLY", SearchField::Tags);
        assert_eq!(hits.source, Served::Fallback);
        assert_eq!(hits.value.len(), 1);
    }

    #[test]
    fn test_both_stores_down_serves_default() {
        let dir = TempDir::new().unwrap();
        let service = StorageService::new(
            Box::new(FailingBackend {
                path: dir.path().join("broken.db"),
            }),
            Box::new(FailingBackend {
                path: dir.path().join("also-broken.json"),
            }),
        );

        let all = service.get_all_prompts();
        assert_eq!(all.source, Served::Default);
        assert!(all.value.is_empty());

        let got = service.get_prompt(&Uuid::new_v4());
        assert_eq!(got.source, Served::Default);
        assert!(got.value.is_none());
    }

    #[test]
    fn test_categories_fall_back() {
        let dir = TempDir::new().unwrap();
        let service = failing_service(&dir);

        let category = Category::new("Dev".into(), "#3366ff".into(), None);
        assert_eq!(service.add_category(&category).source, Served::Fallback);

        let all = service.get_all_categories();
        assert_eq!(all.value.len(), 1);
        assert_eq!(all.value[0].name, "Dev");
    }

    #[test]
    fn test_storage_info_reports_usage() {
        let dir = TempDir::new().unwrap();
        let service = StorageService::open(dir.path().join("prompts.db"));
        service.add_prompt(&Prompt::new("Code Review".into()));

        let info = service.storage_info();
        assert!(info.usage > 0);
    }
}
