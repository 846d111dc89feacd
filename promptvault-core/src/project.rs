use anyhow::Result;
use std::env;
use std::path::PathBuf;

use crate::registry::{get_registry_path, Registry};

/// Determines the vault database path to use based on the available
/// information
pub fn determine_vault_path(vault_option: Option<&str>) -> Result<PathBuf> {
    // A prompts.db in the current directory wins - but only if no vault is
    // explicitly selected via command line option or environment variable
    let use_local_file = vault_option.is_none() && env::var("PROMPTVAULT_DB").is_err();
    let current_dir_path = PathBuf::from("prompts.db");

    if use_local_file && current_dir_path.exists() {
        return Ok(current_dir_path);
    }

    // Get the registry path and ensure it exists
    let registry_path = get_registry_path()?;
    if !registry_path.exists() {
        Registry::create_default(&registry_path)?;
    }

    // Load the registry
    let registry = Registry::load(&registry_path)?;

    // Priority 1: Use the command line vault option if provided
    if let Some(vault_name) = vault_option {
        if let Some(vault) = registry.get_vault(vault_name) {
            return Ok(PathBuf::from(&vault.path));
        } else {
            anyhow::bail!("Vault '{}' not found in registry", vault_name);
        }
    }

    // Priority 2: Use the PROMPTVAULT_DB environment variable if set
    if let Ok(env_vault) = env::var("PROMPTVAULT_DB") {
        if let Some(vault) = registry.get_vault(&env_vault) {
            return Ok(PathBuf::from(&vault.path));
        } else {
            anyhow::bail!(
                "Vault '{}' from PROMPTVAULT_DB not found in registry",
                env_vault
            );
        }
    }

    // Priority 3: Check if there's only one vault in the registry
    if registry.vaults.len() == 1 {
        if let Some((_, vault)) = registry.vaults.iter().next() {
            return Ok(PathBuf::from(&vault.path));
        }
    }

    // Priority 4: Use the default vault if configured in registry
    if let Some((_, default_vault)) = registry.get_default_vault() {
        return Ok(PathBuf::from(&default_vault.path));
    }

    anyhow::bail!(
        "Multiple vaults registered and no default set - pass --vault or set a default"
    )
}

/// Lists available vaults from the registry
pub fn list_available_vaults() -> Result<Vec<(String, String)>> {
    let registry_path = get_registry_path()?;
    if !registry_path.exists() {
        Registry::create_default(&registry_path)?;
    }

    let registry = Registry::load(&registry_path)?;
    let mut vaults = Vec::new();

    for (name, vault) in &registry.vaults {
        vaults.push((name.clone(), vault.description.clone()));
    }

    Ok(vaults)
}
