//! Import and export of prompt collections
//!
//! Two interchange formats: a JSON document carrying the custom field
//! definitions alongside the prompts, and a flattened CSV with one row per
//! prompt plus one column per custom field. Import validates only that each
//! record carries a title; everything else is optional.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use uuid::Uuid;

use crate::models::{CustomField, FieldType, FieldValue, Prompt, PromptDraft};

/// Version stamp written into export documents
pub const EXPORT_VERSION: u32 = 1;

/// The JSON export document
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportDocument {
    pub version: u32,
    pub export_date: DateTime<Utc>,
    pub custom_fields: Vec<CustomField>,
    pub prompts: Vec<Prompt>,
}

/// Builds an export document from the current collection
pub fn build_export(prompts: &[Prompt], custom_fields: &[CustomField]) -> ExportDocument {
    ExportDocument {
        version: EXPORT_VERSION,
        export_date: Utc::now(),
        custom_fields: custom_fields.to_vec(),
        prompts: prompts.to_vec(),
    }
}

/// Serializes an export document to pretty JSON
pub fn export_json_string(document: &ExportDocument) -> Result<String> {
    serde_json::to_string_pretty(document).context("Failed to serialize export document")
}

/// Writes a JSON export to a file
pub fn export_json_file(document: &ExportDocument, output_path: &Path) -> Result<()> {
    let json = export_json_string(document)?;
    fs::write(output_path, json)
        .with_context(|| format!("Failed to write export to {:?}", output_path))?;
    Ok(())
}

/// Built-in CSV columns, in order
const CSV_COLUMNS: [&str; 6] = [
    "title",
    "prompt_text",
    "category",
    "tags",
    "expected_output",
    "notes",
];

/// Serializes prompts to CSV, one column per custom field after the
/// built-in columns
pub fn export_csv_string(prompts: &[Prompt], custom_fields: &[CustomField]) -> String {
    let mut out = String::new();

    let mut header: Vec<String> = CSV_COLUMNS.iter().map(|c| c.to_string()).collect();
    header.extend(custom_fields.iter().map(|f| f.name.clone()));
    out.push_str(&csv_row(&header));

    for prompt in prompts {
        let mut row = vec![
            prompt.title.clone(),
            prompt.prompt_text.clone(),
            prompt.category.clone(),
            prompt.tags.clone(),
            prompt.expected_output.clone(),
            prompt.notes.clone(),
        ];
        for field in custom_fields {
            row.push(
                prompt
                    .custom_fields
                    .get(&field.id)
                    .map(|v| v.to_string())
                    .unwrap_or_default(),
            );
        }
        out.push_str(&csv_row(&row));
    }

    out
}

/// Writes a CSV export to a file
pub fn export_csv_file(
    prompts: &[Prompt],
    custom_fields: &[CustomField],
    output_path: &Path,
) -> Result<()> {
    let csv = export_csv_string(prompts, custom_fields);
    fs::write(output_path, csv)
        .with_context(|| format!("Failed to write export to {:?}", output_path))?;
    Ok(())
}

/// Renders one CSV row; every value is quoted, inner quotes doubled
fn csv_row(values: &[String]) -> String {
    let mut row = String::new();
    for (i, value) in values.iter().enumerate() {
        if i > 0 {
            row.push(',');
        }
        row.push('"');
        row.push_str(&value.replace('"', "\"\""));
        row.push('"');
    }
    row.push('\n');
    row
}

/// The result of parsing an import file
#[derive(Debug, Default)]
pub struct ImportParse {
    /// Records that carried a title
    pub drafts: Vec<PromptDraft>,
    /// Rows that could not be imported, with reasons
    pub skipped: Vec<String>,
}

/// A prompt-like record as it appears in import files
///
/// Accepts both this crate's field names and the camelCase spelling used by
/// JSON exports from other tools.
#[derive(Debug, Deserialize)]
struct ImportedPrompt {
    #[serde(default)]
    title: Option<String>,
    #[serde(default, alias = "promptText")]
    prompt_text: String,
    #[serde(default)]
    category: String,
    #[serde(default)]
    tags: String,
    #[serde(default, alias = "expectedOutput")]
    expected_output: String,
    #[serde(default)]
    notes: String,
    #[serde(default, alias = "customFields")]
    custom_fields: HashMap<Uuid, FieldValue>,
}

impl ImportedPrompt {
    fn into_draft(self) -> Option<PromptDraft> {
        let title = self.title.unwrap_or_default();
        if title.trim().is_empty() {
            return None;
        }
        Some(PromptDraft {
            title,
            prompt_text: self.prompt_text,
            category: self.category,
            tags: self.tags,
            expected_output: self.expected_output,
            notes: self.notes,
            custom_fields: self.custom_fields,
        })
    }
}

/// Parses a JSON import: either a full export document or a bare array of
/// prompt-like objects
pub fn parse_json_import(text: &str) -> Result<ImportParse> {
    let value: serde_json::Value =
        serde_json::from_str(text).context("Import file is not valid JSON")?;

    let items = match &value {
        serde_json::Value::Object(map) => map
            .get("prompts")
            .and_then(|p| p.as_array())
            .context("Import document has no \"prompts\" array")?
            .clone(),
        serde_json::Value::Array(items) => items.clone(),
        _ => anyhow::bail!("Import file must be a JSON object or array"),
    };

    let mut parse = ImportParse::default();
    for (index, item) in items.into_iter().enumerate() {
        match serde_json::from_value::<ImportedPrompt>(item) {
            Ok(record) => match record.into_draft() {
                Some(draft) => parse.drafts.push(draft),
                None => parse
                    .skipped
                    .push(format!("record {}: title is required", index + 1)),
            },
            Err(e) => parse
                .skipped
                .push(format!("record {}: {}", index + 1, e)),
        }
    }

    Ok(parse)
}

/// Parses a CSV import with a header row
///
/// Unknown columns whose header matches a custom field name
/// (case-insensitively) populate that field's value, typed by the field
/// definition.
pub fn parse_csv_import(text: &str, custom_fields: &[CustomField]) -> Result<ImportParse> {
    let rows = parse_csv(text);
    let mut rows = rows.into_iter();
    let header = rows.next().context("CSV import needs a header row")?;

    // Resolve each column once
    enum Column {
        Title,
        PromptText,
        Category,
        Tags,
        ExpectedOutput,
        Notes,
        Field(Uuid, FieldType),
        Unknown,
    }

    let columns: Vec<Column> = header
        .iter()
        .map(|name| {
            let normalized = name.trim().to_lowercase();
            match normalized.as_str() {
                "title" => Column::Title,
                "prompt_text" | "prompttext" | "prompt" => Column::PromptText,
                "category" => Column::Category,
                "tags" => Column::Tags,
                "expected_output" | "expectedoutput" => Column::ExpectedOutput,
                "notes" => Column::Notes,
                _ => custom_fields
                    .iter()
                    .find(|f| f.name.trim().to_lowercase() == normalized)
                    .map(|f| Column::Field(f.id, f.field_type))
                    .unwrap_or(Column::Unknown),
            }
        })
        .collect();

    let mut parse = ImportParse::default();
    for (index, row) in rows.enumerate() {
        if row.iter().all(|v| v.trim().is_empty()) {
            continue;
        }

        let mut draft = PromptDraft::default();
        for (value, column) in row.into_iter().zip(&columns) {
            match column {
                Column::Title => draft.title = value,
                Column::PromptText => draft.prompt_text = value,
                Column::Category => draft.category = value,
                Column::Tags => draft.tags = value,
                Column::ExpectedOutput => draft.expected_output = value,
                Column::Notes => draft.notes = value,
                Column::Field(id, field_type) => {
                    if !value.is_empty() {
                        draft.custom_fields.insert(*id, typed_value(&value, *field_type));
                    }
                }
                Column::Unknown => {}
            }
        }

        if draft.title.trim().is_empty() {
            parse
                .skipped
                .push(format!("row {}: title is required", index + 2));
        } else {
            parse.drafts.push(draft);
        }
    }

    Ok(parse)
}

/// Converts a CSV cell to a field value according to the field type
fn typed_value(value: &str, field_type: FieldType) -> FieldValue {
    match field_type {
        FieldType::Number => value
            .trim()
            .parse::<f64>()
            .map(FieldValue::Number)
            .unwrap_or_else(|_| FieldValue::Text(value.to_string())),
        _ => FieldValue::Text(value.to_string()),
    }
}

/// Minimal CSV parser: quoted fields, doubled quotes, newlines inside
/// quotes, CRLF line endings
fn parse_csv(text: &str) -> Vec<Vec<String>> {
    let mut rows = Vec::new();
    let mut row = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        if in_quotes {
            match c {
                '"' => {
                    if chars.peek() == Some(&'"') {
                        chars.next();
                        field.push('"');
                    } else {
                        in_quotes = false;
                    }
                }
                _ => field.push(c),
            }
        } else {
            match c {
                '"' => in_quotes = true,
                ',' => {
                    row.push(std::mem::take(&mut field));
                }
                '\r' => {}
                '\n' => {
                    row.push(std::mem::take(&mut field));
                    rows.push(std::mem::take(&mut row));
                }
                _ => field.push(c),
            }
        }
    }

    if !field.is_empty() || !row.is_empty() {
        row.push(field);
        rows.push(row);
    }

    rows
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Prompt;

    #[test]
    fn test_export_json_document_shape() {
        let prompt = Prompt::new("Code Review".into());
        let document = build_export(&[prompt], &[]);
        let json = export_json_string(&document).unwrap();

        assert!(json.contains("\"version\": 1"));
        assert!(json.contains("\"exportDate\""));
        assert!(json.contains("\"customFields\""));
        assert!(json.contains("\"Code Review\""));
    }

    #[test]
    fn test_export_csv_escapes_quotes_and_commas() {
        let mut prompt = Prompt::new("Say \"hello\"".into());
        prompt.notes = "one,two\nthree".into();
        let csv = export_csv_string(&[prompt], &[]);

        let mut lines = csv.lines();
        assert_eq!(
            lines.next().unwrap(),
            "\"title\",\"prompt_text\",\"category\",\"tags\",\"expected_output\",\"notes\""
        );
        assert!(csv.contains("\"Say \"\"hello\"\"\""));
        assert!(csv.contains("\"one,two\nthree\""));
    }

    #[test]
    fn test_export_csv_includes_custom_field_columns() {
        let field = CustomField::new("Model".into(), FieldType::Text, Vec::new());
        let mut prompt = Prompt::new("Code Review".into());
        prompt
            .custom_fields
            .insert(field.id, FieldValue::Text("claude".into()));

        let csv = export_csv_string(&[prompt], &[field]);
        assert!(csv.starts_with("\"title\""));
        assert!(csv.lines().next().unwrap().ends_with("\"Model\""));
        assert!(csv.contains("\"claude\""));
    }

    #[test]
    fn test_parse_csv_round_trip() {
        let mut prompt = Prompt::new("Say \"hello\"".into());
        prompt.notes = "one,two\nthree".into();
        let csv = export_csv_string(&[prompt], &[]);

        let rows = parse_csv(&csv);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1][0], "Say \"hello\"");
        assert_eq!(rows[1][5], "one,two\nthree");
    }

    #[test]
    fn test_parse_json_import_accepts_bare_array() {
        let text = r#"[
            {"title": "Code Review", "promptText": "Review this"},
            {"notes": "no title here"}
        ]"#;

        let parse = parse_json_import(text).unwrap();
        assert_eq!(parse.drafts.len(), 1);
        assert_eq!(parse.drafts[0].title, "Code Review");
        assert_eq!(parse.drafts[0].prompt_text, "Review this");
        assert_eq!(parse.skipped.len(), 1);
        assert!(parse.skipped[0].contains("title is required"));
    }

    #[test]
    fn test_parse_json_import_accepts_export_document() {
        let mut prompt = Prompt::new("Code Review".into());
        prompt.category = "Dev".into();
        let document = build_export(&[prompt], &[]);
        let json = export_json_string(&document).unwrap();

        let parse = parse_json_import(&json).unwrap();
        assert_eq!(parse.drafts.len(), 1);
        assert_eq!(parse.drafts[0].category, "Dev");
        assert!(parse.skipped.is_empty());
    }

    #[test]
    fn test_parse_csv_import_maps_custom_fields() {
        let field = CustomField::new("Rating".into(), FieldType::Number, Vec::new());
        let csv = "title,notes,Rating\nCode Review,weekly,4\n,missing,1\n";

        let parse = parse_csv_import(csv, &[field.clone()]).unwrap();
        assert_eq!(parse.drafts.len(), 1);
        assert_eq!(parse.drafts[0].notes, "weekly");
        assert_eq!(
            parse.drafts[0].custom_fields.get(&field.id),
            Some(&FieldValue::Number(4.0))
        );
        assert_eq!(parse.skipped.len(), 1);
        assert!(parse.skipped[0].contains("row 3"));
    }

    #[test]
    fn test_parse_json_import_rejects_garbage() {
        assert!(parse_json_import("not json at all").is_err());
        assert!(parse_json_import("\"just a string\"").is_err());
    }
}
