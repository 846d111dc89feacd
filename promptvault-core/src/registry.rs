use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Represents a registered vault
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VaultEntry {
    /// Path to the vault database file
    pub path: String,
    /// Description of the vault
    pub description: String,
}

/// Registry of all vaults known to this user
#[derive(Debug, Serialize, Deserialize)]
pub struct Registry {
    pub vaults: HashMap<String, VaultEntry>,
    /// Optional default vault name
    pub default_vault: Option<String>,
}

impl Registry {
    /// Loads the registry from the provided path
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read registry file: {:?}", path.as_ref()))?;

        serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse registry file: {:?}", path.as_ref()))
    }

    /// Gets a vault by name
    pub fn get_vault(&self, name: &str) -> Option<&VaultEntry> {
        self.vaults.get(name)
    }

    /// Lists all vault names
    pub fn list_vaults(&self) -> Vec<&str> {
        self.vaults.keys().map(|k| k.as_str()).collect()
    }

    /// Registers a new vault or updates an existing one
    pub fn register_vault(&mut self, name: String, path: String, description: String) {
        self.vaults.insert(name, VaultEntry { path, description });
    }

    /// Sets a vault as the default
    pub fn set_default_vault(&mut self, name: &str) -> Result<()> {
        if !self.vaults.contains_key(name) {
            anyhow::bail!("Vault '{}' not found in registry", name);
        }

        self.default_vault = Some(name.to_string());
        Ok(())
    }

    /// Gets the default vault if set
    pub fn get_default_vault(&self) -> Option<(&str, &VaultEntry)> {
        if let Some(default_name) = &self.default_vault {
            if let Some(vault) = self.vaults.get(default_name) {
                return Some((default_name, vault));
            }
        }
        None
    }

    /// Save the registry to the specified path
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = serde_yaml::to_string(&self)?;

        if let Some(parent) = path.as_ref().parent() {
            fs::create_dir_all(parent)?;
        }

        fs::write(&path, content)
            .with_context(|| format!("Failed to write registry to {:?}", path.as_ref()))?;

        Ok(())
    }

    /// Creates a default registry file if it doesn't exist, registering a
    /// single vault at the default data path
    pub fn create_default<P: AsRef<Path>>(path: P) -> Result<()> {
        if path.as_ref().exists() {
            return Ok(());
        }

        let mut vaults = HashMap::new();
        vaults.insert(
            "default".to_string(),
            VaultEntry {
                path: default_data_path()?.to_string_lossy().into_owned(),
                description: "Default vault".to_string(),
            },
        );

        let registry = Registry {
            vaults,
            default_vault: None,
        };
        registry.save(path)
    }
}

/// Gets the path to the registry file
pub fn get_registry_path() -> Result<PathBuf> {
    // Check if PROMPTVAULT_REGISTRY environment variable is set
    if let Ok(path) = std::env::var("PROMPTVAULT_REGISTRY") {
        return Ok(PathBuf::from(path));
    }

    // Default to ~/.promptvault.config
    let home_dir = dirs::home_dir().context("Failed to determine home directory")?;

    Ok(home_dir.join(".promptvault.config"))
}

/// The default location of the vault database
pub fn default_data_path() -> Result<PathBuf> {
    let home_dir = dirs::home_dir().context("Failed to determine home directory")?;
    Ok(home_dir.join(".promptvault").join("prompts.db"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_registry_save_and_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("registry.yaml");

        let mut registry = Registry {
            vaults: HashMap::new(),
            default_vault: None,
        };
        registry.register_vault(
            "work".into(),
            "/tmp/work.db".into(),
            "Work prompts".into(),
        );
        registry.set_default_vault("work").unwrap();
        registry.save(&path).unwrap();

        let loaded = Registry::load(&path).unwrap();
        assert_eq!(loaded.vaults.len(), 1);
        let (name, entry) = loaded.get_default_vault().unwrap();
        assert_eq!(name, "work");
        assert_eq!(entry.path, "/tmp/work.db");
    }

    #[test]
    fn test_set_default_requires_known_vault() {
        let mut registry = Registry {
            vaults: HashMap::new(),
            default_vault: None,
        };
        assert!(registry.set_default_vault("nope").is_err());
    }
}
