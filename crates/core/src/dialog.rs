//! Close results produced by the item and category dialogs.
//!
//! Dialogs hand back typed variants. Older callers still produce loose JSON payloads; the
//! `from_payload` constructors classify those with a fixed precedence so an "edit" envelope can
//! never be read as a completion toggle.

use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

use crate::model::{Category, CategoryDraft, Item, ItemDraft, ItemId};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemDialogResult {
    /// Closed without a result.
    Dismissed,
    /// A full, persisted item to replace the stored one.
    Saved(Item),
    /// Fields for a new item.
    Drafted(ItemDraft),
    /// Completion flipped on the item the dialog was opened against.
    CompletionToggled { completed: bool },
    /// Delete requested. `None` means the item the dialog was opened against.
    Delete { id: Option<ItemId> },
    /// The user asked to continue in the edit dialog.
    Edit { item: Option<Item> },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CategoryDialogResult {
    Dismissed,
    Saved(Category),
    Drafted(CategoryDraft),
}

#[derive(Debug, Error)]
pub enum PayloadError {
    #[error("dialog payload must be a JSON object")]
    NotAnObject,
    #[error("unknown dialog action '{0}'")]
    UnknownAction(String),
    #[error("malformed dialog payload: {0}")]
    Malformed(#[from] serde_json::Error),
}

const ACTION_DELETE: &str = "delete";
const ACTION_EDIT: &str = "edit";
/// Keys under which an action envelope may nest the item it refers to.
const NESTED_ITEM_KEYS: [&str; 2] = ["todo", "item"];

impl ItemDialogResult {
    /// Classify a loose payload. Precedence, first match wins: absent, `action: "delete"`,
    /// `action: "edit"`, identity present, `completed` without identity (only when the dialog
    /// was opened against a persisted item), otherwise a draft.
    pub fn from_payload(
        payload: Option<&Value>,
        opened_against: Option<&Item>,
    ) -> Result<Self, PayloadError> {
        let Some(payload) = payload.filter(|value| !value.is_null()) else {
            return Ok(ItemDialogResult::Dismissed);
        };
        let object = payload.as_object().ok_or(PayloadError::NotAnObject)?;

        if let Some(action) = object.get("action").filter(|value| !value.is_null()) {
            return match action.as_str() {
                Some(ACTION_DELETE) => Ok(ItemDialogResult::Delete {
                    id: envelope_id(payload),
                }),
                Some(ACTION_EDIT) => Ok(ItemDialogResult::Edit {
                    item: nested_item(payload),
                }),
                Some(other) => Err(PayloadError::UnknownAction(other.to_string())),
                None => Err(PayloadError::UnknownAction(action.to_string())),
            };
        }

        if has_value(payload, "id") {
            let item = Item::deserialize(payload)?;
            return Ok(ItemDialogResult::Saved(item));
        }

        if let Some(completed) = payload.get("completed").and_then(Value::as_bool) {
            if opened_against.is_some() {
                return Ok(ItemDialogResult::CompletionToggled { completed });
            }
        }

        let draft = ItemDraft::deserialize(payload)?;
        Ok(ItemDialogResult::Drafted(draft))
    }
}

impl CategoryDialogResult {
    pub fn from_payload(payload: Option<&Value>) -> Result<Self, PayloadError> {
        let Some(payload) = payload.filter(|value| !value.is_null()) else {
            return Ok(CategoryDialogResult::Dismissed);
        };
        if !payload.is_object() {
            return Err(PayloadError::NotAnObject);
        }
        if has_value(payload, "id") {
            return Ok(CategoryDialogResult::Saved(Category::deserialize(payload)?));
        }
        Ok(CategoryDialogResult::Drafted(CategoryDraft::deserialize(
            payload,
        )?))
    }
}

fn has_value(payload: &Value, key: &str) -> bool {
    payload.get(key).is_some_and(|value| !value.is_null())
}

fn envelope_id(payload: &Value) -> Option<ItemId> {
    let top_level = payload.get("id").and_then(Value::as_i64);
    let nested = || {
        NESTED_ITEM_KEYS
            .iter()
            .find_map(|key| payload.get(*key)?.get("id")?.as_i64())
    };
    top_level.or_else(nested).map(ItemId)
}

fn nested_item(payload: &Value) -> Option<Item> {
    NESTED_ITEM_KEYS
        .iter()
        .find_map(|key| payload.get(*key))
        .and_then(|value| Item::deserialize(value).ok())
}
