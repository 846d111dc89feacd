pub mod db;
pub mod export;
pub mod models;
pub mod project;
pub mod registry;
pub mod service;
pub mod storage;
pub mod vault;

// Re-export commonly used types
pub use db::{
    create_backend, BackendType, JsonBackend, SqliteBackend, StorageBackend, StorageStats,
};
pub use export::{
    build_export, export_csv_file, export_csv_string, export_json_file, export_json_string,
    parse_csv_import, parse_json_import, ExportDocument, ImportParse, EXPORT_VERSION,
};
pub use models::{
    Category, CustomField, FieldType, FieldValue, Prompt, PromptDraft, PromptLibrary, PromptPatch,
    SearchField,
};
pub use project::{determine_vault_path, list_available_vaults};
pub use registry::{default_data_path, get_registry_path, Registry, VaultEntry};
pub use service::{Outcome, Served, StorageInfo, StorageService};
pub use storage::Storage;
pub use vault::{PromptVault, VaultError, VaultResult};
