mod cli;
mod prompts;

use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;
use std::path::Path;
use uuid::Uuid;

use promptvault_core::{
    build_export, determine_vault_path, export_csv_file, export_json_file, get_registry_path,
    parse_csv_import, parse_json_import, FieldType, ImportParse, Prompt, PromptDraft, PromptVault,
    Registry, SearchField, VaultError,
};

use crate::cli::{CategoryCommand, Cli, Command, FieldCommand, VaultCommand};

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    // Registry management doesn't need a vault opened
    if let Command::Vault(vault_cmd) = &cli.command {
        return handle_vault_command(vault_cmd);
    }

    let vault_path = determine_vault_path(cli.vault.as_deref())?;
    let mut vault = PromptVault::open(&vault_path);

    match &cli.command {
        Command::Add {
            title,
            text,
            category,
            tags,
            expected,
            notes,
            interactive,
        } => {
            // Default to interactive mode if no specific arguments are provided
            let should_be_interactive = *interactive
                || (title.is_none()
                    && text.is_none()
                    && category.is_none()
                    && tags.is_none()
                    && expected.is_none()
                    && notes.is_none());

            if should_be_interactive {
                add_prompt_interactive(&mut vault)?;
            } else {
                add_prompt_cli(&mut vault, title, text, category, tags, expected, notes)?;
            }
        }
        Command::List { category, tag } => {
            list_prompts(&vault, category.as_deref(), tag.as_deref());
        }
        Command::Show { id } => {
            show_prompt(&vault, id.as_deref())?;
        }
        Command::Edit { id } => {
            edit_prompt(&mut vault, id)?;
        }
        Command::Del { id, yes } => {
            delete_prompt(&mut vault, id, *yes)?;
        }
        Command::Search { query, field } => {
            search_prompts(&vault, query, field);
        }
        Command::Use { id } => {
            use_prompt(&mut vault, id)?;
        }
        Command::Select { id } => {
            select_prompt(&mut vault, id.as_deref())?;
        }
        Command::Field(field_cmd) => {
            handle_field_command(field_cmd, &mut vault)?;
        }
        Command::Category(category_cmd) => {
            handle_category_command(category_cmd, &mut vault)?;
        }
        Command::Vault(_) => unreachable!("handled above"),
        Command::Export { format, output } => {
            handle_export_command(&vault, format, output)?;
        }
        Command::Import {
            file,
            format,
            rename_duplicates,
        } => {
            handle_import_command(&mut vault, file, format.as_deref(), *rename_duplicates)?;
        }
        Command::Info => {
            show_info(&vault, &vault_path);
        }
        Command::Clear { yes } => {
            clear_vault(&mut vault, *yes)?;
        }
    }

    Ok(())
}

/// Resolves a prompt reference: a full UUID, an exact title
/// (case-insensitive), or an unambiguous id prefix
fn resolve_prompt_id(vault: &PromptVault, input: &str) -> Result<Uuid> {
    if let Ok(id) = Uuid::parse_str(input) {
        return Ok(id);
    }

    let needle = input.trim().to_lowercase();
    if let Some(prompt) = vault
        .prompts()
        .iter()
        .find(|p| p.title.trim().to_lowercase() == needle)
    {
        return Ok(prompt.id);
    }

    let matches: Vec<&Prompt> = vault
        .prompts()
        .iter()
        .filter(|p| p.id.to_string().starts_with(input))
        .collect();
    match matches.len() {
        1 => Ok(matches[0].id),
        0 => anyhow::bail!("No prompt matches '{}'", input),
        _ => anyhow::bail!("'{}' is ambiguous, give more of the id", input),
    }
}

fn add_prompt_interactive(vault: &mut PromptVault) -> Result<()> {
    let draft = prompts::prompt_new_prompt(vault)?;
    let prompt = vault.create_prompt(draft)?;

    println!("{}", "Prompt added successfully!".green());
    println!("ID: {}", prompt.id);
    println!("Title: {}", prompt.title.green());

    Ok(())
}

fn add_prompt_cli(
    vault: &mut PromptVault,
    title: &Option<String>,
    text: &Option<String>,
    category: &Option<String>,
    tags: &Option<String>,
    expected: &Option<String>,
    notes: &Option<String>,
) -> Result<()> {
    let title = match title {
        Some(t) => t.clone(),
        None => anyhow::bail!("Title is required. Use --title to specify a title."),
    };

    let draft = PromptDraft {
        title,
        prompt_text: text.clone().unwrap_or_default(),
        category: category.clone().unwrap_or_default(),
        tags: tags.clone().unwrap_or_default(),
        expected_output: expected.clone().unwrap_or_default(),
        notes: notes.clone().unwrap_or_default(),
        ..Default::default()
    };

    let prompt = vault.create_prompt(draft)?;

    println!("{}", "Prompt added successfully!".green());
    println!("ID: {}", prompt.id);

    Ok(())
}

fn list_prompts(vault: &PromptVault, category: Option<&str>, tag: Option<&str>) {
    let prompts = vault.get_all_prompts();
    let selected = vault.selected_prompt_id();

    let filtered: Vec<&Prompt> = prompts
        .iter()
        .filter(|p| category.map_or(true, |c| p.category.eq_ignore_ascii_case(c)))
        .filter(|p| {
            tag.map_or(true, |t| {
                p.tags.to_lowercase().contains(&t.to_lowercase())
            })
        })
        .collect();

    if filtered.is_empty() {
        println!("No prompts found.");
        return;
    }

    for prompt in filtered {
        let marker = if Some(prompt.id) == selected { "*" } else { " " };
        let short_id = &prompt.id.to_string()[..8];
        let category = if prompt.category.is_empty() {
            String::new()
        } else {
            format!("  [{}]", prompt.category.cyan())
        };
        println!(
            "{} {}  {}{}  {}",
            marker,
            short_id.dimmed(),
            prompt.title.bold(),
            category,
            prompt.updated_at.format("%Y-%m-%d %H:%M").to_string().dimmed()
        );
    }
}

fn show_prompt(vault: &PromptVault, id: Option<&str>) -> Result<()> {
    let prompt = match id {
        Some(input) => {
            let id = resolve_prompt_id(vault, input)?;
            vault
                .get_prompt(&id)
                .with_context(|| format!("Prompt not found: {}", id))?
        }
        None => match vault.selected_prompt() {
            Some(p) => p,
            None => {
                println!("No prompt selected.");
                return Ok(());
            }
        },
    };

    println!("{}: {}", "Title".bold(), prompt.title.green());
    println!("{}: {}", "ID".bold(), prompt.id);
    if !prompt.category.is_empty() {
        println!("{}: {}", "Category".bold(), prompt.category.cyan());
    }
    if !prompt.tags.is_empty() {
        println!("{}: {}", "Tags".bold(), prompt.tags);
    }
    println!("{}: {}", "Created".bold(), prompt.created_at.format("%Y-%m-%d %H:%M"));
    println!("{}: {}", "Updated".bold(), prompt.updated_at.format("%Y-%m-%d %H:%M"));
    if let Some(last_used) = prompt.last_used {
        println!("{}: {}", "Last used".bold(), last_used.format("%Y-%m-%d %H:%M"));
    }

    for field in vault.custom_fields() {
        if let Some(value) = prompt.custom_fields.get(&field.id) {
            println!("{}: {}", field.name.bold(), value);
        }
    }

    if !prompt.prompt_text.is_empty() {
        println!("\n{}", prompt.prompt_text);
    }
    if !prompt.expected_output.is_empty() {
        println!("\n{}: {}", "Expected output".bold(), prompt.expected_output);
    }
    if !prompt.notes.is_empty() {
        println!("\n{}: {}", "Notes".bold(), prompt.notes);
    }

    Ok(())
}

fn edit_prompt(vault: &mut PromptVault, id: &str) -> Result<()> {
    let id = resolve_prompt_id(vault, id)?;
    let current = vault
        .get_prompt(&id)
        .with_context(|| format!("Prompt not found: {}", id))?
        .clone();

    let patch = prompts::prompt_edit_prompt(&current)?;
    if patch.is_empty() {
        println!("Nothing changed.");
        return Ok(());
    }

    let updated = vault.update_prompt(&id, patch)?;
    println!("{}", "Prompt updated successfully!".green());
    println!("Title: {}", updated.title.green());

    Ok(())
}

fn delete_prompt(vault: &mut PromptVault, id: &str, yes: bool) -> Result<()> {
    let id = resolve_prompt_id(vault, id)?;
    let title = vault
        .get_prompt(&id)
        .with_context(|| format!("Prompt not found: {}", id))?
        .title
        .clone();

    if !yes {
        let confirmed = inquire::Confirm::new(&format!("Delete prompt '{}'?", title))
            .with_default(false)
            .prompt()?;
        if !confirmed {
            println!("Aborted.");
            return Ok(());
        }
    }

    vault.delete_prompt(&id)?;
    println!("{} {}", "Deleted".green(), title);

    Ok(())
}

fn search_prompts(vault: &PromptVault, query: &str, field: &str) {
    let field = SearchField::parse(field);
    let hits = vault.search_prompts(query, field);

    if hits.is_empty() {
        println!("No prompts match '{}' in {}.", query, field);
        return;
    }

    println!("{} match(es) in {}:", hits.len(), field);
    for prompt in hits {
        let short_id = &prompt.id.to_string()[..8];
        println!("  {}  {}", short_id.dimmed(), prompt.title.bold());
    }
}

fn use_prompt(vault: &mut PromptVault, id: &str) -> Result<()> {
    let id = resolve_prompt_id(vault, id)?;
    let prompt = vault.mark_used(&id)?;

    // The prompt text goes to stdout unadorned so it can be piped
    println!("{}", prompt.prompt_text);
    eprintln!("{}", format!("Marked '{}' as used.", prompt.title).dimmed());

    Ok(())
}

fn select_prompt(vault: &mut PromptVault, id: Option<&str>) -> Result<()> {
    match id {
        Some(input) => {
            let id = resolve_prompt_id(vault, input)?;
            vault.select_prompt(Some(id));
            if let Some(prompt) = vault.get_prompt(&id) {
                println!("Selected: {}", prompt.title.green());
            }
        }
        None => {
            vault.select_prompt(None);
            println!("Selection cleared.");
        }
    }
    Ok(())
}

fn handle_field_command(command: &FieldCommand, vault: &mut PromptVault) -> Result<()> {
    match command {
        FieldCommand::Add {
            name,
            r#type,
            options,
            interactive,
        } => {
            let (name, field_type, options) = if *interactive || name.is_none() {
                prompts::prompt_new_field()?
            } else {
                let name = name.clone().unwrap_or_default();
                let field_type = FieldType::parse(r#type.as_deref().unwrap_or("text"));
                let options = options
                    .as_deref()
                    .map(|raw| {
                        raw.split(',')
                            .map(|s| s.trim().to_string())
                            .filter(|s| !s.is_empty())
                            .collect()
                    })
                    .unwrap_or_default();
                (name, field_type, options)
            };

            let field = vault.add_custom_field(&name, field_type, options)?;
            println!("{}", "Custom field added!".green());
            println!("ID: {}", field.id);
            println!("Name: {} ({})", field.name.green(), field.field_type);
        }
        FieldCommand::List => {
            if vault.custom_fields().is_empty() {
                println!("No custom fields defined.");
                return Ok(());
            }
            for field in vault.custom_fields() {
                let short_id = &field.id.to_string()[..8];
                let options = if field.options.is_empty() {
                    String::new()
                } else {
                    format!("  [{}]", field.options.join(", "))
                };
                println!(
                    "  {}  {} ({}){}",
                    short_id.dimmed(),
                    field.name.bold(),
                    field.field_type,
                    options
                );
            }
        }
        FieldCommand::Del { id, yes } => {
            let field = vault
                .custom_fields()
                .iter()
                .find(|f| {
                    f.id.to_string().starts_with(id.as_str())
                        || f.name.eq_ignore_ascii_case(id)
                })
                .with_context(|| format!("No custom field matches '{}'", id))?
                .clone();

            if !yes {
                let confirmed = inquire::Confirm::new(&format!("Delete field '{}'?", field.name))
                    .with_default(false)
                    .prompt()?;
                if !confirmed {
                    println!("Aborted.");
                    return Ok(());
                }
            }

            vault.remove_custom_field(&field.id)?;
            println!("{} {}", "Deleted".green(), field.name);
        }
    }
    Ok(())
}

fn handle_category_command(command: &CategoryCommand, vault: &mut PromptVault) -> Result<()> {
    match command {
        CategoryCommand::Add {
            name,
            color,
            description,
        } => {
            let name = match name {
                Some(n) => n.clone(),
                None => inquire::Text::new("Category name:").prompt()?,
            };
            let color = color.clone().unwrap_or_else(|| "#888888".to_string());

            let category = vault.add_category(&name, &color, description.clone())?;
            println!("{}", "Category added!".green());
            println!("ID: {}", category.id);
            println!("Name: {}", category.name.cyan());
        }
        CategoryCommand::List => {
            if vault.categories().is_empty() {
                println!("No categories defined.");
                return Ok(());
            }
            for category in vault.categories() {
                let short_id = &category.id.to_string()[..8];
                let description = category
                    .description
                    .as_deref()
                    .map(|d| format!("  {}", d.dimmed()))
                    .unwrap_or_default();
                println!(
                    "  {}  {} ({}){}",
                    short_id.dimmed(),
                    category.name.cyan(),
                    category.color,
                    description
                );
            }
        }
        CategoryCommand::Edit {
            id,
            name,
            color,
            description,
        } => {
            let category_id = resolve_category_id(vault, id)?;
            let updated = vault.update_category(
                &category_id,
                name.as_deref(),
                color.as_deref(),
                description.clone(),
            )?;
            println!("{}", "Category updated!".green());
            println!("Name: {}", updated.name.cyan());
        }
        CategoryCommand::Del { id, yes } => {
            let category_id = resolve_category_id(vault, id)?;
            let name = vault
                .categories()
                .iter()
                .find(|c| c.id == category_id)
                .map(|c| c.name.clone())
                .unwrap_or_default();

            if !yes {
                let confirmed = inquire::Confirm::new(&format!("Delete category '{}'?", name))
                    .with_default(false)
                    .prompt()?;
                if !confirmed {
                    println!("Aborted.");
                    return Ok(());
                }
            }

            vault.remove_category(&category_id)?;
            println!("{} {}", "Deleted".green(), name);
            println!("Prompts in this category keep the old category name.");
        }
    }
    Ok(())
}

fn resolve_category_id(vault: &PromptVault, input: &str) -> Result<Uuid> {
    vault
        .categories()
        .iter()
        .find(|c| {
            c.id.to_string().starts_with(input) || c.name.eq_ignore_ascii_case(input)
        })
        .map(|c| c.id)
        .with_context(|| format!("No category matches '{}'", input))
}

fn handle_vault_command(command: &VaultCommand) -> Result<()> {
    match command {
        VaultCommand::Register {
            name,
            path,
            description,
            default,
            interactive,
        } => {
            let (name, path, description, default) = if *interactive || name.is_none() {
                prompts::prompt_register_vault()?
            } else {
                (
                    name.clone().unwrap_or_default(),
                    path.clone().unwrap_or_else(|| "prompts.db".into()),
                    description.clone().unwrap_or_default(),
                    *default,
                )
            };

            let registry_path = get_registry_path()?;
            if !registry_path.exists() {
                Registry::create_default(&registry_path)?;
            }
            let mut registry = Registry::load(&registry_path)?;
            registry.register_vault(
                name.clone(),
                path.to_string_lossy().into_owned(),
                description,
            );
            if default {
                registry.set_default_vault(&name)?;
            }
            registry.save(&registry_path)?;

            println!("{} {}", "Registered vault".green(), name);
        }
        VaultCommand::Path { name } => {
            let path = determine_vault_path(name.as_deref())?;
            println!("{}", path.display());
        }
        VaultCommand::List => {
            let vaults = promptvault_core::list_available_vaults()?;
            if vaults.is_empty() {
                println!("No vaults registered.");
                return Ok(());
            }
            for (name, description) in vaults {
                println!("  {}  {}", name.bold(), description.dimmed());
            }
        }
        VaultCommand::Migrate { from, to } => {
            let count = migrate(from, to)?;
            println!(
                "{} {} prompt(s) from {} to {}",
                "Migrated".green(),
                count,
                from.display(),
                to.display()
            );
        }
    }
    Ok(())
}

fn migrate(from: &Path, to: &Path) -> Result<usize> {
    let ext = |p: &Path| {
        p.extension()
            .and_then(|e| e.to_str())
            .unwrap_or_default()
            .to_lowercase()
    };

    match (ext(from).as_str(), ext(to).as_str()) {
        ("json", "db") | ("json", "sqlite") | ("json", "sqlite3") => {
            promptvault_core::db::migrate_json_to_sqlite(from, to)
        }
        ("db", "json") | ("sqlite", "json") | ("sqlite3", "json") => {
            promptvault_core::db::migrate_sqlite_to_json(from, to)
        }
        _ => anyhow::bail!("Migration needs a .json file on one side and a .db file on the other"),
    }
}

fn handle_export_command(vault: &PromptVault, format: &str, output: &Path) -> Result<()> {
    let prompts = vault.get_all_prompts();

    match format.to_lowercase().as_str() {
        "json" => {
            let document = build_export(&prompts, vault.custom_fields());
            export_json_file(&document, output)?;
        }
        "csv" => {
            export_csv_file(&prompts, vault.custom_fields(), output)?;
        }
        other => anyhow::bail!("Unknown export format: {} (expected json or csv)", other),
    }

    println!("{} {}", "Exported to".green(), output.display());
    println!("  Total prompts: {}", prompts.len());

    Ok(())
}

fn handle_import_command(
    vault: &mut PromptVault,
    file: &Path,
    format: Option<&str>,
    rename_duplicates: bool,
) -> Result<()> {
    let text = std::fs::read_to_string(file)
        .with_context(|| format!("Failed to read import file: {:?}", file))?;

    let format = format
        .map(|f| f.to_lowercase())
        .unwrap_or_else(|| {
            file.extension()
                .and_then(|e| e.to_str())
                .unwrap_or("json")
                .to_lowercase()
        });

    let parse: ImportParse = match format.as_str() {
        "json" => parse_json_import(&text)?,
        "csv" => parse_csv_import(&text, vault.custom_fields())?,
        other => anyhow::bail!("Unknown import format: {} (expected json or csv)", other),
    };

    let mut imported = 0usize;
    let mut duplicates: Vec<String> = Vec::new();
    let mut failed: Vec<String> = Vec::new();

    for draft in parse.drafts {
        let title = draft.title.trim().to_string();
        match vault.create_prompt(draft.clone()) {
            Ok(_) => imported += 1,
            Err(VaultError::Validation(msg)) if msg == "Title must be unique" => {
                if rename_duplicates {
                    let mut renamed = draft;
                    renamed.title = vault.next_available_title(&title);
                    let new_title = renamed.title.clone();
                    match vault.create_prompt(renamed) {
                        Ok(_) => {
                            imported += 1;
                            println!("  {} '{}' imported as '{}'", "duplicate".yellow(), title, new_title);
                        }
                        Err(e) => failed.push(format!("{}: {}", title, e)),
                    }
                } else {
                    duplicates.push(title);
                }
            }
            Err(e) => failed.push(format!("{}: {}", title, e)),
        }
    }

    println!("{} {} prompt(s)", "Imported".green(), imported);
    if !duplicates.is_empty() {
        println!(
            "{} {} duplicate title(s), use --rename-duplicates to import them:",
            "Skipped".yellow(),
            duplicates.len()
        );
        for title in &duplicates {
            println!("  {}", title);
        }
    }
    for reason in parse.skipped.iter().chain(failed.iter()) {
        println!("{} {}", "Skipped".yellow(), reason);
    }

    Ok(())
}

fn show_info(vault: &PromptVault, vault_path: &Path) {
    let info = vault.storage_info();

    println!("{}: {}", "Vault".bold(), vault_path.display());
    println!("  Prompts: {}", vault.prompts().len());
    println!("  Custom fields: {}", vault.custom_fields().len());
    println!("  Categories: {}", vault.categories().len());
    println!("  Storage used: {} bytes", info.usage);
    if info.quota > 0 {
        println!("  Volume capacity: {} bytes", info.quota);
    }
}

fn clear_vault(vault: &mut PromptVault, yes: bool) -> Result<()> {
    if !yes {
        let confirmed = inquire::Confirm::new(
            "Delete EVERY prompt, custom field and category in this vault?",
        )
        .with_default(false)
        .prompt()?;
        if !confirmed {
            println!("Aborted.");
            return Ok(());
        }
    }

    vault.clear_database();
    println!("{}", "Vault cleared.".green());

    Ok(())
}
