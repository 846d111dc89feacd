use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[clap(author, version, about = "A personal prompt library manager")]
pub struct Cli {
    /// Vault name to use from the central registry
    #[clap(long, short = 'v')]
    pub vault: Option<String>,

    #[clap(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum FieldCommand {
    /// Add a new custom field
    Add {
        /// Name of the field
        #[clap(long)]
        name: Option<String>,

        /// Field type (text, number, textarea, select)
        #[clap(long)]
        r#type: Option<String>,

        /// Options for select fields (comma-separated)
        #[clap(long)]
        options: Option<String>,

        /// Use interactive mode (prompts)
        #[clap(long)]
        interactive: bool,
    },

    /// List all custom fields
    List,

    /// Delete a custom field
    Del {
        /// The ID or name of the field to delete
        id: String,

        /// Skip confirmation prompt
        #[clap(long, short = 'y')]
        yes: bool,
    },
}

#[derive(Subcommand, Debug)]
pub enum CategoryCommand {
    /// Add a new category
    Add {
        /// Name of the category
        #[clap(long)]
        name: Option<String>,

        /// Display color, e.g. "#3366ff"
        #[clap(long)]
        color: Option<String>,

        /// Description of the category
        #[clap(long)]
        description: Option<String>,
    },

    /// List all categories
    List,

    /// Edit an existing category
    Edit {
        /// The ID or name of the category to edit
        id: String,

        /// New name for the category
        #[clap(long)]
        name: Option<String>,

        /// New color for the category
        #[clap(long)]
        color: Option<String>,

        /// New description for the category
        #[clap(long)]
        description: Option<String>,
    },

    /// Delete a category (prompts keep the stale category name)
    Del {
        /// The ID or name of the category to delete
        id: String,

        /// Skip confirmation prompt
        #[clap(long, short = 'y')]
        yes: bool,
    },
}

#[derive(Subcommand, Debug)]
pub enum VaultCommand {
    /// Register a vault in the registry
    Register {
        /// Name of the vault
        #[clap(long)]
        name: Option<String>,

        /// Path to the vault database file
        #[clap(long)]
        path: Option<PathBuf>,

        /// Description of the vault
        #[clap(long)]
        description: Option<String>,

        /// Set this vault as the default
        #[clap(long)]
        default: bool,

        /// Use interactive mode (prompts)
        #[clap(long)]
        interactive: bool,
    },

    /// Print the path to the vault database file
    Path {
        /// The name of the vault to look up
        #[clap(long)]
        name: Option<String>,
    },

    /// List registered vaults
    List,

    /// Migrate data between the SQLite and JSON representations
    Migrate {
        /// Source file (.db or .json)
        from: PathBuf,

        /// Destination file (.db or .json)
        to: PathBuf,
    },
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Add a new prompt
    Add {
        /// Title of the prompt (must be unique)
        #[clap(long)]
        title: Option<String>,

        /// The prompt text itself
        #[clap(long)]
        text: Option<String>,

        /// Category the prompt belongs to
        #[clap(long)]
        category: Option<String>,

        /// Tags for the prompt (comma-separated)
        #[clap(long)]
        tags: Option<String>,

        /// Expected output of the prompt
        #[clap(long)]
        expected: Option<String>,

        /// Free-form notes
        #[clap(long)]
        notes: Option<String>,

        /// Use interactive mode (prompts)
        #[clap(long)]
        interactive: bool,
    },

    /// List all prompts, most recently updated first
    List {
        /// Filter by category
        #[clap(long)]
        category: Option<String>,

        /// Filter by tag substring
        #[clap(long)]
        tag: Option<String>,
    },

    /// Show details for a prompt (the selected one if no id is given)
    Show {
        /// The ID or title of the prompt to show
        id: Option<String>,
    },

    /// Edit an existing prompt
    Edit {
        /// The ID or title of the prompt to edit
        id: String,
    },

    /// Delete a prompt
    Del {
        /// The ID or title of the prompt to delete
        id: String,

        /// Skip confirmation prompt
        #[clap(long, short = 'y')]
        yes: bool,
    },

    /// Search prompts by a single field
    Search {
        /// The text to search for
        query: String,

        /// Field to search (title, text, category, tags, notes)
        #[clap(long, short = 'f', default_value = "title")]
        field: String,
    },

    /// Print a prompt's text and mark it as used
    Use {
        /// The ID or title of the prompt to use
        id: String,
    },

    /// Select a prompt, or clear the selection with no id
    Select {
        /// The ID or title of the prompt to select
        id: Option<String>,
    },

    /// Custom field management commands
    #[clap(subcommand)]
    Field(FieldCommand),

    /// Category management commands
    #[clap(subcommand)]
    Category(CategoryCommand),

    /// Vault management commands
    #[clap(subcommand)]
    Vault(VaultCommand),

    /// Export prompts to a file
    Export {
        /// Output format (json, csv)
        #[clap(long, short = 'f', default_value = "json")]
        format: String,

        /// Output file path
        #[clap(long, short = 'o')]
        output: PathBuf,
    },

    /// Import prompts from a JSON or CSV file
    Import {
        /// The file to import
        file: PathBuf,

        /// Input format (json, csv); inferred from the extension if omitted
        #[clap(long, short = 'f')]
        format: Option<String>,

        /// Import duplicate-titled records under a suffixed title instead
        /// of skipping them
        #[clap(long)]
        rename_duplicates: bool,
    },

    /// Show storage usage and vault statistics
    Info,

    /// Delete every prompt, custom field and category in the vault
    Clear {
        /// Skip confirmation prompt
        #[clap(long, short = 'y')]
        yes: bool,
    },
}
