use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use uuid::Uuid;

/// Represents the input type of a custom field
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    Text,
    Number,
    Textarea,
    Select,
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldType::Text => write!(f, "text"),
            FieldType::Number => write!(f, "number"),
            FieldType::Textarea => write!(f, "textarea"),
            FieldType::Select => write!(f, "select"),
        }
    }
}

impl FieldType {
    /// Parse a field type from a string, defaulting to text
    pub fn parse(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "number" => FieldType::Number,
            "textarea" => FieldType::Textarea,
            "select" => FieldType::Select,
            _ => FieldType::Text,
        }
    }
}

/// A scalar value held by a custom field on a prompt
///
/// Serialized untagged so stored values read back as plain JSON scalars.
/// Variant order matters for deserialization: booleans and numbers must be
/// tried before strings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum FieldValue {
    Flag(bool),
    Number(f64),
    Text(String),
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Flag(b) => write!(f, "{}", b),
            FieldValue::Number(n) => write!(f, "{}", n),
            FieldValue::Text(s) => write!(f, "{}", s),
        }
    }
}

/// A user-defined attribute that can be attached to every prompt
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CustomField {
    /// Unique identifier for the field (UUID)
    pub id: Uuid,

    /// Field name, unique case-insensitively among custom fields
    pub name: String,

    /// Input type of the field
    pub field_type: FieldType,

    /// Fixed option list, populated only for select fields
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<String>,
}

impl CustomField {
    /// Creates a new custom field, keeping options only for select fields
    pub fn new(name: String, field_type: FieldType, options: Vec<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name,
            field_type,
            options: if field_type == FieldType::Select {
                options
            } else {
                Vec::new()
            },
        }
    }
}

/// A named grouping for prompts
///
/// Categories are referenced from prompts by name, not by id; deleting a
/// category leaves those references dangling.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Category {
    /// Unique identifier for the category (UUID)
    pub id: Uuid,

    /// Category name, intended unique but not enforced by storage
    pub name: String,

    /// Display color, e.g. a hex string
    pub color: String,

    /// Optional free-form description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Category {
    /// Creates a new category
    pub fn new(name: String, color: String, description: Option<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name,
            color,
            description,
        }
    }
}

/// A single stored prompt
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Prompt {
    /// Unique identifier for the prompt (UUID)
    pub id: Uuid,

    /// Short title, unique case-insensitively across the collection
    pub title: String,

    /// The prompt text itself
    #[serde(default)]
    pub prompt_text: String,

    /// Category name this prompt belongs to
    #[serde(default)]
    pub category: String,

    /// Free-form tag string (comma separated by convention)
    #[serde(default)]
    pub tags: String,

    /// What output the prompt is expected to produce
    #[serde(default)]
    pub expected_output: String,

    /// Free-form notes
    #[serde(default)]
    pub notes: String,

    /// Custom field values keyed by `CustomField::id`
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub custom_fields: HashMap<Uuid, FieldValue>,

    /// When the prompt was last used, if ever
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_used: Option<DateTime<Utc>>,

    /// When the prompt was created; never mutated
    pub created_at: DateTime<Utc>,

    /// When the prompt was last modified
    pub updated_at: DateTime<Utc>,
}

impl Prompt {
    /// Creates a new prompt with the given title and empty optional fields
    pub fn new(title: String) -> Self {
        let now = Utc::now();

        Self {
            id: Uuid::new_v4(),
            title,
            prompt_text: String::new(),
            category: String::new(),
            tags: String::new(),
            expected_output: String::new(),
            notes: String::new(),
            custom_fields: HashMap::new(),
            last_used: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Merges the present fields of a patch onto this prompt and refreshes
    /// `updated_at`. `id` and `created_at` are never touched.
    pub fn apply_patch(&mut self, patch: &PromptPatch) {
        if let Some(title) = &patch.title {
            self.title = title.clone();
        }
        if let Some(prompt_text) = &patch.prompt_text {
            self.prompt_text = prompt_text.clone();
        }
        if let Some(category) = &patch.category {
            self.category = category.clone();
        }
        if let Some(tags) = &patch.tags {
            self.tags = tags.clone();
        }
        if let Some(expected_output) = &patch.expected_output {
            self.expected_output = expected_output.clone();
        }
        if let Some(notes) = &patch.notes {
            self.notes = notes.clone();
        }
        if let Some(custom_fields) = &patch.custom_fields {
            self.custom_fields = custom_fields.clone();
        }
        if let Some(last_used) = patch.last_used {
            self.last_used = Some(last_used);
        }
        self.updated_at = Utc::now();
    }

    /// Returns the text of a single searchable field
    pub fn field_text(&self, field: SearchField) -> &str {
        match field {
            SearchField::Title => &self.title,
            SearchField::PromptText => &self.prompt_text,
            SearchField::Category => &self.category,
            SearchField::Tags => &self.tags,
            SearchField::Notes => &self.notes,
        }
    }
}

/// Initial data for creating a prompt; everything but the title is optional
#[derive(Debug, Clone, Default)]
pub struct PromptDraft {
    pub title: String,
    pub prompt_text: String,
    pub category: String,
    pub tags: String,
    pub expected_output: String,
    pub notes: String,
    pub custom_fields: HashMap<Uuid, FieldValue>,
}

/// A partial update to a prompt; absent fields are left unchanged
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PromptPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt_text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected_output: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_fields: Option<HashMap<Uuid, FieldValue>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_used: Option<DateTime<Utc>>,
}

impl PromptPatch {
    /// True if no field is present
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.prompt_text.is_none()
            && self.category.is_none()
            && self.tags.is_none()
            && self.expected_output.is_none()
            && self.notes.is_none()
            && self.custom_fields.is_none()
            && self.last_used.is_none()
    }
}

/// A prompt field that can be searched
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchField {
    Title,
    PromptText,
    Category,
    Tags,
    Notes,
}

impl Default for SearchField {
    fn default() -> Self {
        SearchField::Title
    }
}

impl fmt::Display for SearchField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SearchField::Title => write!(f, "title"),
            SearchField::PromptText => write!(f, "text"),
            SearchField::Category => write!(f, "category"),
            SearchField::Tags => write!(f, "tags"),
            SearchField::Notes => write!(f, "notes"),
        }
    }
}

impl SearchField {
    /// Parse a search field from a string, defaulting to title
    pub fn parse(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "text" | "prompt" | "prompt_text" => SearchField::PromptText,
            "category" => SearchField::Category,
            "tags" => SearchField::Tags,
            "notes" => SearchField::Notes,
            _ => SearchField::Title,
        }
    }
}

/// The whole persisted collection: prompts, custom fields, categories and
/// the current selection
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptLibrary {
    #[serde(default)]
    pub prompts: Vec<Prompt>,
    #[serde(default)]
    pub custom_fields: Vec<CustomField>,
    #[serde(default)]
    pub categories: Vec<Category>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selected_prompt_id: Option<Uuid>,
}

impl PromptLibrary {
    /// Creates an empty library
    pub fn new() -> Self {
        Self {
            prompts: Vec::new(),
            custom_fields: Vec::new(),
            categories: Vec::new(),
            selected_prompt_id: None,
        }
    }

    /// Gets a prompt by ID
    pub fn get_prompt(&self, id: &Uuid) -> Option<&Prompt> {
        self.prompts.iter().find(|p| &p.id == id)
    }

    /// Gets a mutable reference to a prompt by ID
    pub fn get_prompt_mut(&mut self, id: &Uuid) -> Option<&mut Prompt> {
        self.prompts.iter_mut().find(|p| &p.id == id)
    }

    /// Finds a prompt whose title matches case-insensitively after trimming
    pub fn find_prompt_by_title(&self, title: &str) -> Option<&Prompt> {
        let needle = title.trim().to_lowercase();
        self.prompts
            .iter()
            .find(|p| p.title.trim().to_lowercase() == needle)
    }

    /// True if a prompt other than `exclude` already holds this title
    /// (trimmed, case-insensitive)
    pub fn title_taken(&self, title: &str, exclude: Option<&Uuid>) -> bool {
        let needle = title.trim().to_lowercase();
        self.prompts.iter().any(|p| {
            Some(&p.id) != exclude && p.title.trim().to_lowercase() == needle
        })
    }

    /// Returns the currently selected prompt, if any
    pub fn selected_prompt(&self) -> Option<&Prompt> {
        self.selected_prompt_id
            .as_ref()
            .and_then(|id| self.get_prompt(id))
    }

    /// All prompts ordered by `updated_at` descending
    pub fn prompts_by_recency(&self) -> Vec<Prompt> {
        let mut prompts = self.prompts.clone();
        prompts.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        prompts
    }

    /// Gets a custom field by ID
    pub fn get_custom_field(&self, id: &Uuid) -> Option<&CustomField> {
        self.custom_fields.iter().find(|f| &f.id == id)
    }

    /// Finds a custom field by name (trimmed, case-insensitive)
    pub fn find_custom_field_by_name(&self, name: &str) -> Option<&CustomField> {
        let needle = name.trim().to_lowercase();
        self.custom_fields
            .iter()
            .find(|f| f.name.trim().to_lowercase() == needle)
    }

    /// True if a custom field other than `exclude` already holds this name
    pub fn field_name_taken(&self, name: &str, exclude: Option<&Uuid>) -> bool {
        let needle = name.trim().to_lowercase();
        self.custom_fields.iter().any(|f| {
            Some(&f.id) != exclude && f.name.trim().to_lowercase() == needle
        })
    }

    /// Gets a category by ID
    pub fn get_category(&self, id: &Uuid) -> Option<&Category> {
        self.categories.iter().find(|c| &c.id == id)
    }

    /// Gets a mutable reference to a category by ID
    pub fn get_category_mut(&mut self, id: &Uuid) -> Option<&mut Category> {
        self.categories.iter_mut().find(|c| &c.id == id)
    }
}

impl Default for PromptLibrary {
    fn default() -> Self {
        Self::new()
    }
}
