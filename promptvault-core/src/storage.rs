use anyhow::{Context, Result};
use fs2::FileExt;
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::models::PromptLibrary;

/// Handles saving and loading the flat JSON fallback file with file locking
///
/// This is the fallback persistence target: a single JSON document holding
/// every collection under its fixed key (`prompts`, `custom_fields`,
/// `categories`, `selected_prompt_id`). Writes replace the whole document;
/// reads parse-or-default, so a corrupted file degrades to an empty library
/// instead of an error.
pub struct Storage {
    file_path: PathBuf,
    lock_file_path: PathBuf,
}

impl Storage {
    /// Creates a new Storage instance
    pub fn new<P: AsRef<Path>>(file_path: P) -> Self {
        let file_path = file_path.as_ref().to_path_buf();
        let lock_file_path = file_path.with_extension("json.lock");
        Self {
            file_path,
            lock_file_path,
        }
    }

    /// Returns the path to the storage file
    pub fn path(&self) -> &Path {
        &self.file_path
    }

    /// Acquire an exclusive lock on the file for writing
    /// Returns the lock file handle which must be held during the operation
    fn acquire_write_lock(&self) -> Result<File> {
        if let Some(parent) = self.lock_file_path.parent() {
            fs::create_dir_all(parent)?;
        }

        let lock_file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&self.lock_file_path)
            .with_context(|| format!("Failed to create lock file: {:?}", self.lock_file_path))?;

        // Try to acquire exclusive lock with timeout
        let start = std::time::Instant::now();
        let timeout = Duration::from_secs(5);

        loop {
            match FileExt::try_lock_exclusive(&lock_file) {
                Ok(()) => return Ok(lock_file),
                Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                    if start.elapsed() > timeout {
                        anyhow::bail!(
                            "Timeout waiting for file lock - another process may be writing: {:?}",
                            self.file_path
                        );
                    }
                    std::thread::sleep(Duration::from_millis(100));
                }
                Err(e) => {
                    return Err(e).with_context(|| {
                        format!("Failed to acquire lock on {:?}", self.lock_file_path)
                    })
                }
            }
        }
    }

    /// Acquire a shared lock on the file for reading
    fn acquire_read_lock(&self) -> Result<Option<File>> {
        if !self.lock_file_path.exists() {
            return Ok(None);
        }

        let lock_file = OpenOptions::new()
            .read(true)
            .open(&self.lock_file_path)
            .with_context(|| format!("Failed to open lock file: {:?}", self.lock_file_path))?;

        let start = std::time::Instant::now();
        let timeout = Duration::from_secs(5);

        loop {
            match FileExt::try_lock_shared(&lock_file) {
                Ok(()) => return Ok(Some(lock_file)),
                Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                    if start.elapsed() > timeout {
                        anyhow::bail!(
                            "Timeout waiting for file lock - another process may be writing: {:?}",
                            self.file_path
                        );
                    }
                    std::thread::sleep(Duration::from_millis(100));
                }
                Err(e) => {
                    return Err(e).with_context(|| {
                        format!("Failed to acquire lock on {:?}", self.lock_file_path)
                    })
                }
            }
        }
    }

    /// Loads the library from the JSON file with file locking
    ///
    /// A missing file yields an empty library. Unparseable content also
    /// yields an empty library (logged at warn), never an error.
    pub fn load(&self) -> Result<PromptLibrary> {
        if !self.file_path.exists() {
            return Ok(PromptLibrary::new());
        }

        // Acquire shared lock for reading
        let _lock = self.acquire_read_lock()?;

        let content = fs::read_to_string(&self.file_path)
            .with_context(|| format!("Failed to read file: {:?}", self.file_path))?;

        match serde_json::from_str(&content) {
            Ok(library) => Ok(library),
            Err(e) => {
                log::warn!(
                    "Fallback store {:?} is not valid JSON ({}), treating as empty",
                    self.file_path,
                    e
                );
                Ok(PromptLibrary::new())
            }
        }
    }

    /// Saves the library to the JSON file with file locking
    pub fn save(&self, library: &PromptLibrary) -> Result<()> {
        if let Some(parent) = self.file_path.parent() {
            fs::create_dir_all(parent)?;
        }

        // Acquire exclusive lock for writing
        let mut lock_file = self.acquire_write_lock()?;

        // Write lock holder info (optional, for debugging)
        let _ = writeln!(
            lock_file,
            "Locked by PID {} at {}",
            std::process::id(),
            chrono::Utc::now().to_rfc3339()
        );

        let json = serde_json::to_string_pretty(library)?;
        fs::write(&self.file_path, json)?;

        // Lock is automatically released when lock_file is dropped
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Prompt;
    use tempfile::TempDir;

    #[test]
    fn test_load_missing_file_yields_empty() {
        let dir = TempDir::new().unwrap();
        let storage = Storage::new(dir.path().join("prompts.json"));

        let library = storage.load().unwrap();
        assert!(library.prompts.is_empty());
        assert!(library.selected_prompt_id.is_none());
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let dir = TempDir::new().unwrap();
        let storage = Storage::new(dir.path().join("prompts.json"));

        let mut library = PromptLibrary::new();
        let prompt = Prompt::new("Code Review".into());
        library.selected_prompt_id = Some(prompt.id);
        library.prompts.push(prompt);
        storage.save(&library).unwrap();

        let loaded = storage.load().unwrap();
        assert_eq!(loaded.prompts.len(), 1);
        assert_eq!(loaded.prompts[0].title, "Code Review");
        assert_eq!(loaded.selected_prompt_id, library.selected_prompt_id);
    }

    #[test]
    fn test_corrupted_file_yields_empty() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("prompts.json");
        fs::write(&path, "this is { not json").unwrap();

        let storage = Storage::new(&path);
        let library = storage.load().unwrap();
        assert!(library.prompts.is_empty());
    }
}
