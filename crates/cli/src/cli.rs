use std::path::PathBuf;

use clap::{value_parser, Args, Parser, Subcommand};

use crate::model::{CategoryId, ItemId};
use tasksync_core::CategorySelector;

#[derive(Parser, Debug, Clone)]
#[command(
    name = "tasksync",
    version,
    about = "Keep a todo list and its categories in sync with the item service.",
    after_help = "Examples:\n  tasksync add \"Buy milk\" --category 2\n  tasksync list --category none --search milk\n  tasksync toggle 4\n  tasksync apply '{\"action\":\"delete\",\"id\":4}'\n  tasksync categories delete 2 --yes"
)]
pub struct Cli {
    /// Override the data directory (defaults to platform-specific app dir)
    #[arg(long, value_name = "PATH", global = true)]
    pub data_dir: Option<PathBuf>,

    /// Act as this user (defaults to TASKSYNC_USER or "local")
    #[arg(long, value_name = "NAME", global = true)]
    pub user: Option<String>,

    /// Tracing filter directive (e.g. "info", "tasksync_core=debug")
    #[arg(long = "log", value_name = "DIRECTIVE", global = true)]
    pub log_filter: Option<String>,

    /// Give up on a service call after this many milliseconds
    #[arg(long = "timeout-ms", value_name = "MS", global = true, value_parser = value_parser!(u64))]
    pub timeout_ms: Option<u64>,

    /// Print entities as JSON instead of text
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Option<CliCommand>,
}

#[derive(Subcommand, Debug, Clone)]
pub enum CliCommand {
    /// List items, optionally filtered (default command)
    List(ListArgs),
    /// Create an item
    Add(AddArgs),
    /// Change fields of an existing item
    Edit(EditArgs),
    /// Flip the completion flag of an item
    Toggle(ItemArgs),
    /// Delete an item
    Delete(ItemArgs),
    /// Feed a raw dialog close payload through the normalizer and apply it
    Apply(ApplyArgs),
    /// Manage categories
    #[command(subcommand)]
    Categories(CategoriesCommand),
}

impl Default for CliCommand {
    fn default() -> Self {
        CliCommand::List(ListArgs::default())
    }
}

#[derive(Args, Debug, Clone, Default)]
pub struct ListArgs {
    /// Only items in this category id, or "none" for uncategorized items
    #[arg(long, value_name = "ID|none", value_parser = parse_selector)]
    pub category: Option<CategorySelector>,

    /// Case-insensitive text matched against title, description and category name
    #[arg(long, value_name = "TEXT")]
    pub search: Option<String>,
}

#[derive(Args, Debug, Clone)]
pub struct AddArgs {
    /// Item title
    #[arg(value_name = "TITLE", required = true)]
    pub title: Vec<String>,

    /// Optional description (may contain markup)
    #[arg(long)]
    pub description: Option<String>,

    /// Category id to file the item under
    #[arg(long, value_name = "ID")]
    pub category: Option<CategoryId>,

    /// Create the item already completed
    #[arg(long)]
    pub done: bool,
}

#[derive(Args, Debug, Clone)]
pub struct EditArgs {
    /// Item id (e.g. 4 or #4)
    #[arg(value_name = "ID")]
    pub id: ItemId,

    #[arg(long)]
    pub title: Option<String>,

    #[arg(long)]
    pub description: Option<String>,

    /// New category id, or "none" to clear it
    #[arg(long, value_name = "ID|none", value_parser = parse_selector)]
    pub category: Option<CategorySelector>,
}

#[derive(Args, Debug, Clone)]
pub struct ItemArgs {
    /// Item id (e.g. 4 or #4)
    #[arg(value_name = "ID")]
    pub id: ItemId,
}

#[derive(Args, Debug, Clone)]
pub struct ApplyArgs {
    /// JSON payload the dialog closed with; omit for a dismissed dialog
    #[arg(value_name = "JSON")]
    pub payload: Option<String>,

    /// Id of the item the dialog was opened against
    #[arg(long = "item", value_name = "ID")]
    pub opened_against: Option<ItemId>,

    /// Treat the payload as a category dialog result
    #[arg(long = "category-dialog", conflicts_with = "opened_against")]
    pub category_dialog: bool,
}

#[derive(Subcommand, Debug, Clone)]
pub enum CategoriesCommand {
    /// List categories with their item counts
    List,
    /// Create a category
    Add(CategoryAddArgs),
    /// Rename or recolor a category
    Edit(CategoryEditArgs),
    /// Delete a category; its items become uncategorized
    Delete(CategoryDeleteArgs),
}

#[derive(Args, Debug, Clone)]
pub struct CategoryAddArgs {
    #[arg(value_name = "NAME")]
    pub name: String,

    /// Hex color such as #4CAF50
    #[arg(long)]
    pub color: Option<String>,

    #[arg(long)]
    pub description: Option<String>,
}

#[derive(Args, Debug, Clone)]
pub struct CategoryEditArgs {
    #[arg(value_name = "ID")]
    pub id: CategoryId,

    #[arg(long)]
    pub name: Option<String>,

    #[arg(long)]
    pub color: Option<String>,

    #[arg(long)]
    pub description: Option<String>,
}

#[derive(Args, Debug, Clone)]
pub struct CategoryDeleteArgs {
    #[arg(value_name = "ID")]
    pub id: CategoryId,

    /// Skip the confirmation prompt
    #[arg(long, short = 'y')]
    pub yes: bool,
}

fn parse_selector(raw: &str) -> Result<CategorySelector, String> {
    match raw.trim() {
        "none" | "uncategorized" => Ok(CategorySelector::Uncategorized),
        other => other
            .parse::<CategoryId>()
            .map(CategorySelector::Category)
            .map_err(|err| err.to_string()),
    }
}
