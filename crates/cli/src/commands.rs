use std::fmt;
use std::io::Write;
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use serde_json::{json, Value};

use crate::cli::{
    AddArgs, ApplyArgs, CategoriesCommand, CategoryAddArgs, CategoryDeleteArgs, CategoryEditArgs,
    CliCommand, EditArgs, ListArgs,
};
use crate::config::AppConfig;
use crate::model::{Category, CategoryDraft, CategoryRef, Item, ItemDraft, ItemId};
use tasksync_core::normalizer::edit_continuation;
use tasksync_core::{
    classify, classify_category, AlwaysConfirm, CategoryDialogResult, CategorySelector,
    ConfirmationPrompt, EntityKey, FilterCriteria, ItemDialogResult, LocalService,
    MutationCoordinator, MutationKind, MutationOutcome, SessionContext, SyncError,
    ValidationError,
};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

impl OutputFormat {
    pub fn from_flag(json: bool) -> Self {
        if json {
            OutputFormat::Json
        } else {
            OutputFormat::Text
        }
    }
}

/// Run one command on a private single-threaded runtime.
pub fn execute_blocking<W: Write>(
    config: &AppConfig,
    command: CliCommand,
    format: OutputFormat,
    prompt: &dyn ConfirmationPrompt,
    writer: W,
) -> Result<()> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to build tokio runtime")?;
    runtime.block_on(execute(config, command, format, prompt, writer))
}

pub async fn execute<W: Write>(
    config: &AppConfig,
    command: CliCommand,
    format: OutputFormat,
    prompt: &dyn ConfirmationPrompt,
    mut writer: W,
) -> Result<()> {
    let service =
        Arc::new(LocalService::new(config.clone()).context("failed to initialize item service")?);
    let coordinator =
        MutationCoordinator::from_config(config, service, SessionContext::new(config.user()));
    coordinator
        .load_all()
        .await
        .context("failed to load items and categories")?;

    let report = match command {
        CliCommand::List(args) => return handle_list(&coordinator, args, format, &mut writer),
        CliCommand::Categories(CategoriesCommand::List) => {
            return handle_category_list(&coordinator, format, &mut writer)
        }
        command => match handle_mutation(&coordinator, command, prompt).await {
            Ok(report) => report,
            Err(err) if is_validation(&err) => {
                tracing::debug!(error = %err, "invalid input; nothing saved");
                Report::Skipped
            }
            Err(err) => return Err(err),
        },
    };
    report.write_to(format, &mut writer)
}

async fn handle_mutation(
    coordinator: &MutationCoordinator,
    command: CliCommand,
    prompt: &dyn ConfirmationPrompt,
) -> Result<Report> {
    match command {
        CliCommand::Add(args) => handle_add(coordinator, args).await,
        CliCommand::Edit(args) => handle_edit(coordinator, args).await,
        CliCommand::Toggle(args) => {
            let item = existing_item(coordinator, args.id)?;
            let outcome = coordinator
                .toggle_completion(item.id, !item.completed)
                .await?;
            Report::from_outcome(coordinator, outcome)
        }
        CliCommand::Delete(args) => {
            let outcome = coordinator.delete_item(args.id).await?;
            Report::from_outcome(coordinator, outcome)
        }
        CliCommand::Apply(args) => handle_apply(coordinator, args, prompt).await,
        CliCommand::Categories(CategoriesCommand::Add(args)) => {
            handle_category_add(coordinator, args).await
        }
        CliCommand::Categories(CategoriesCommand::Edit(args)) => {
            handle_category_edit(coordinator, args).await
        }
        CliCommand::Categories(CategoriesCommand::Delete(args)) => {
            handle_category_delete(coordinator, args, prompt).await
        }
        CliCommand::List(_) | CliCommand::Categories(CategoriesCommand::List) => {
            Ok(Report::Skipped)
        }
    }
}

/// Blank titles and names end the save quietly instead of failing the command.
fn is_validation(err: &anyhow::Error) -> bool {
    err.downcast_ref::<ValidationError>().is_some()
        || err
            .downcast_ref::<SyncError>()
            .is_some_and(|err| !err.is_user_visible())
}

fn handle_list<W: Write>(
    coordinator: &MutationCoordinator,
    args: ListArgs,
    format: OutputFormat,
    mut writer: W,
) -> Result<()> {
    let criteria = FilterCriteria::new(
        args.category.unwrap_or_default(),
        args.search.unwrap_or_default(),
    );
    let items = coordinator.visible(&criteria);

    if format == OutputFormat::Json {
        serde_json::to_writer_pretty(&mut writer, &items)?;
        writeln!(writer)?;
        return Ok(());
    }

    let categories = coordinator.snapshot().categories;
    if let Some(summary) = criteria.summary(&categories) {
        writeln!(writer, "Filter: {summary}")?;
    }
    if items.is_empty() {
        writeln!(writer, "No items")?;
    }
    for item in &items {
        writeln!(writer, "{}", ItemLine::new(item, &categories))?;
    }
    Ok(())
}

async fn handle_add(coordinator: &MutationCoordinator, args: AddArgs) -> Result<Report> {
    let mut draft = ItemDraft::new(args.title.join(" "));
    draft.description = args.description;
    draft.category = args.category.map(CategoryRef::from);
    draft.completed = args.done;
    let outcome = coordinator.create_item(draft).await?;
    Report::from_outcome(coordinator, outcome)
}

async fn handle_edit(coordinator: &MutationCoordinator, args: EditArgs) -> Result<Report> {
    let mut item = existing_item(coordinator, args.id)?;
    if let Some(title) = args.title {
        item.title = title;
    }
    if let Some(description) = args.description {
        item.description = Some(description);
    }
    match args.category {
        Some(CategorySelector::Category(id)) => item.category = Some(id.into()),
        Some(CategorySelector::Uncategorized) => item.category = None,
        Some(CategorySelector::Any) | None => {}
    }
    let outcome = coordinator.replace_item(item).await?;
    Report::from_outcome(coordinator, outcome)
}

async fn handle_apply(
    coordinator: &MutationCoordinator,
    args: ApplyArgs,
    prompt: &dyn ConfirmationPrompt,
) -> Result<Report> {
    let payload: Option<Value> = args
        .payload
        .as_deref()
        .map(serde_json::from_str::<Value>)
        .transpose()
        .context("dialog payload is not valid JSON")?;

    if args.category_dialog {
        let result = CategoryDialogResult::from_payload(payload.as_ref())?;
        let outcome = coordinator
            .apply_category(classify_category(result)?, prompt)
            .await?;
        return Report::from_outcome(coordinator, outcome);
    }

    let opened = args
        .opened_against
        .map(|id| existing_item(coordinator, id))
        .transpose()?;
    let result = ItemDialogResult::from_payload(payload.as_ref(), opened.as_ref())?;
    if let Some(item) = edit_continuation(&result, opened.as_ref()) {
        return Ok(Report::ContinueEditing(item.clone()));
    }
    let outcome = coordinator.apply(classify(result, opened.as_ref())?).await?;
    Report::from_outcome(coordinator, outcome)
}

fn handle_category_list<W: Write>(
    coordinator: &MutationCoordinator,
    format: OutputFormat,
    mut writer: W,
) -> Result<()> {
    let categories = coordinator.snapshot().categories;
    let counts = coordinator.counts();

    if format == OutputFormat::Json {
        let mut listed = Vec::with_capacity(categories.len());
        for category in &categories {
            let mut value = serde_json::to_value(category)?;
            value["items"] = json!(counts.for_category(category.id));
            listed.push(value);
        }
        let document = json!({ "categories": listed, "uncategorized": counts.uncategorized });
        serde_json::to_writer_pretty(&mut writer, &document)?;
        writeln!(writer)?;
        return Ok(());
    }

    if categories.is_empty() {
        writeln!(writer, "No categories")?;
    }
    for category in &categories {
        writeln!(
            writer,
            "{} {} ({}): {}",
            category.id,
            category.name,
            category.color_or_default(),
            ItemCount(counts.for_category(category.id))
        )?;
    }
    writeln!(writer, "Uncategorized: {}", ItemCount(counts.uncategorized))?;
    Ok(())
}

async fn handle_category_add(
    coordinator: &MutationCoordinator,
    args: CategoryAddArgs,
) -> Result<Report> {
    let mut draft = CategoryDraft::new(args.name);
    draft.color = args.color;
    draft.description = args.description;
    let outcome = coordinator.create_category(draft).await?;
    Report::from_outcome(coordinator, outcome)
}

async fn handle_category_edit(
    coordinator: &MutationCoordinator,
    args: CategoryEditArgs,
) -> Result<Report> {
    let mut category = coordinator.fetch_category(args.id).await?;
    if let Some(name) = args.name {
        category.name = name;
    }
    if let Some(color) = args.color {
        category.color = Some(color);
    }
    if let Some(description) = args.description {
        category.description = Some(description);
    }
    let outcome = coordinator.update_category(category).await?;
    Report::from_outcome(coordinator, outcome)
}

async fn handle_category_delete(
    coordinator: &MutationCoordinator,
    args: CategoryDeleteArgs,
    prompt: &dyn ConfirmationPrompt,
) -> Result<Report> {
    let prompt: &dyn ConfirmationPrompt = if args.yes { &AlwaysConfirm } else { prompt };
    let outcome = coordinator.delete_category(args.id, prompt).await?;
    Report::from_outcome(coordinator, outcome)
}

fn existing_item(coordinator: &MutationCoordinator, id: ItemId) -> Result<Item> {
    coordinator
        .item(id)
        .ok_or_else(|| anyhow!("Item {} not found", id))
}

/// What a finished command tells the user.
#[derive(Debug)]
enum Report {
    Item { kind: MutationKind, item: Item },
    Category { kind: MutationKind, category: Category },
    Removed(EntityKey),
    ContinueEditing(Item),
    Declined,
    Skipped,
}

impl Report {
    fn from_outcome(coordinator: &MutationCoordinator, outcome: MutationOutcome) -> Result<Self> {
        let (kind, key) = match outcome {
            MutationOutcome::Skipped => return Ok(Report::Skipped),
            MutationOutcome::Declined => return Ok(Report::Declined),
            MutationOutcome::Applied { kind, key } => (kind, key),
        };
        if matches!(kind, MutationKind::DeleteItem | MutationKind::DeleteCategory) {
            return Ok(Report::Removed(key));
        }
        let report = match key {
            EntityKey::Item(id) => coordinator
                .item(id)
                .map(|item| Report::Item { kind, item }),
            EntityKey::Category(id) => coordinator
                .category(id)
                .map(|category| Report::Category { kind, category }),
        };
        report.ok_or_else(|| anyhow!("{key} is missing after {kind}"))
    }

    fn write_to<W: Write>(&self, format: OutputFormat, mut writer: W) -> Result<()> {
        match format {
            OutputFormat::Text => writeln!(writer, "{self}")?,
            OutputFormat::Json => {
                serde_json::to_writer_pretty(&mut writer, &self.to_json()?)?;
                writeln!(writer)?;
            }
        }
        Ok(())
    }

    fn to_json(&self) -> Result<Value> {
        let value = match self {
            Report::Item { item, .. } | Report::ContinueEditing(item) => serde_json::to_value(item)?,
            Report::Category { category, .. } => serde_json::to_value(category)?,
            Report::Removed(EntityKey::Item(id)) => json!({ "deletedItem": id }),
            Report::Removed(EntityKey::Category(id)) => json!({ "deletedCategory": id }),
            Report::Declined => json!({ "declined": true }),
            Report::Skipped => Value::Null,
        };
        Ok(value)
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Report::Item { kind, item } => {
                let verb = match kind {
                    MutationKind::CreateItem => "Created",
                    MutationKind::ToggleCompletion if item.completed => "Completed",
                    MutationKind::ToggleCompletion => "Reopened",
                    _ => "Updated",
                };
                write!(f, "{verb} item {} '{}'", item.id, item.title)
            }
            Report::Category { kind, category } => {
                let verb = match kind {
                    MutationKind::CreateCategory => "Created",
                    _ => "Updated",
                };
                write!(f, "{verb} category {} '{}'", category.id, category.name)
            }
            Report::Removed(key) => write!(f, "Deleted {key}"),
            Report::ContinueEditing(item) => {
                write!(f, "Continue editing item {} '{}'", item.id, item.title)
            }
            Report::Declined => write!(f, "Nothing deleted"),
            Report::Skipped => write!(f, "Nothing to apply"),
        }
    }
}

struct ItemLine<'a> {
    item: &'a Item,
    category: Option<&'a str>,
}

impl<'a> ItemLine<'a> {
    fn new(item: &'a Item, categories: &'a [Category]) -> Self {
        let category = item.category_id().and_then(|id| {
            categories
                .iter()
                .find(|category| category.id == id)
                .map(|category| category.name.as_str())
        });
        Self { item, category }
    }
}

impl fmt::Display for ItemLine<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mark = if self.item.completed { 'x' } else { ' ' };
        write!(f, "[{mark}] {} {}", self.item.id, self.item.title)?;
        if let Some(category) = self.category {
            write!(f, " ({category})")?;
        }
        Ok(())
    }
}

struct ItemCount(usize);

impl fmt::Display for ItemCount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} item{}",
            self.0,
            if self.0 == 1 { "" } else { "s" }
        )
    }
}
