use anyhow::Result;
use inquire::{Confirm, Select, Text};
use std::path::PathBuf;

use promptvault_core::{FieldType, Prompt, PromptDraft, PromptPatch, PromptVault};

/// Prompts the user for a new prompt record
pub fn prompt_new_prompt(vault: &PromptVault) -> Result<PromptDraft> {
    let title = Text::new("Title:").prompt()?;

    // Use the Editor type for multiline input
    let prompt_text = inquire::Editor::new("Prompt text:").prompt()?;

    let mut draft = PromptDraft {
        title,
        prompt_text,
        ..Default::default()
    };

    // Offer existing categories, or free-form entry
    let existing: Vec<String> = vault.categories().iter().map(|c| c.name.clone()).collect();
    if existing.is_empty() {
        draft.category = Text::new("Category:").prompt()?;
    } else {
        let mut options = vec!["(none)".to_string(), "Enter new category".to_string()];
        options.extend(existing);
        let selection = Select::new("Category:", options).prompt()?;
        draft.category = match selection.as_str() {
            "(none)" => String::new(),
            "Enter new category" => Text::new("New category name:").prompt()?,
            _ => selection,
        };
    }

    let add_tags = Confirm::new("Add tags?").prompt()?;
    if add_tags {
        draft.tags = Text::new("Tags (comma separated):").prompt()?;
    }

    let add_more = Confirm::new("Add expected output / notes?").prompt()?;
    if add_more {
        draft.expected_output = Text::new("Expected output:").prompt()?;
        draft.notes = Text::new("Notes:").prompt()?;
    }

    Ok(draft)
}

/// Prompts the user to edit an existing prompt, returning the patch to apply
pub fn prompt_edit_prompt(current: &Prompt) -> Result<PromptPatch> {
    let mut patch = PromptPatch::default();

    let title = Text::new("Title:")
        .with_initial_value(&current.title)
        .prompt()?;
    if title != current.title {
        patch.title = Some(title);
    }

    let edit_text = Confirm::new("Edit prompt text?").prompt()?;
    if edit_text {
        let text = inquire::Editor::new("Prompt text:")
            .with_predefined_text(&current.prompt_text)
            .prompt()?;
        patch.prompt_text = Some(text);
    }

    let category = Text::new("Category:")
        .with_initial_value(&current.category)
        .prompt()?;
    if category != current.category {
        patch.category = Some(category);
    }

    let tags = Text::new("Tags (comma separated):")
        .with_initial_value(&current.tags)
        .prompt()?;
    if tags != current.tags {
        patch.tags = Some(tags);
    }

    let notes = Text::new("Notes:")
        .with_initial_value(&current.notes)
        .prompt()?;
    if notes != current.notes {
        patch.notes = Some(notes);
    }

    Ok(patch)
}

/// Prompts the user for a new custom field definition
pub fn prompt_new_field() -> Result<(String, FieldType, Vec<String>)> {
    let name = Text::new("Field name:").prompt()?;

    let type_options = vec![
        FieldType::Text,
        FieldType::Number,
        FieldType::Textarea,
        FieldType::Select,
    ];
    let field_type = Select::new("Field type:", type_options).prompt()?;

    let options = if field_type == FieldType::Select {
        let raw = Text::new("Options (comma separated):").prompt()?;
        raw.split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect()
    } else {
        Vec::new()
    };

    Ok((name, field_type, options))
}

/// Prompts the user for vault registration details
pub fn prompt_register_vault() -> Result<(String, PathBuf, String, bool)> {
    let name = Text::new("Vault name:").prompt()?;

    let path_input = Text::new("Path to vault database:").prompt()?;
    let path = PathBuf::from(path_input);

    let description = Text::new("Vault description:").prompt()?;

    let default = Confirm::new("Set as default vault?").prompt()?;

    Ok((name, path, description, default))
}
