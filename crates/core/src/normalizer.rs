use crate::dialog::{CategoryDialogResult, ItemDialogResult};
use crate::error::ValidationError;
use crate::model::{Category, CategoryDraft, CategoryId, Item, ItemDraft, ItemId};

/// The single, unambiguous item mutation derived from a dialog result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MutationIntent {
    None,
    Create(ItemDraft),
    Replace(Item),
    Delete(ItemId),
    ToggleCompletion { id: ItemId, completed: bool },
}

impl MutationIntent {
    pub fn is_none(&self) -> bool {
        matches!(self, MutationIntent::None)
    }

    pub fn target(&self) -> Option<ItemId> {
        match self {
            MutationIntent::None | MutationIntent::Create(_) => None,
            MutationIntent::Replace(item) => Some(item.id),
            MutationIntent::Delete(id) => Some(*id),
            MutationIntent::ToggleCompletion { id, .. } => Some(*id),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CategoryIntent {
    None,
    Create(CategoryDraft),
    Update(Category),
    Delete(CategoryId),
}

/// Turn a dialog result into a mutation intent. Drafts and saved items are trimmed here; a blank
/// title is a [`ValidationError`] and the save simply does not proceed.
pub fn classify(
    result: ItemDialogResult,
    opened_against: Option<&Item>,
) -> Result<MutationIntent, ValidationError> {
    let intent = match result {
        ItemDialogResult::Dismissed => MutationIntent::None,
        ItemDialogResult::Delete { id } => match id.or(opened_against.map(|item| item.id)) {
            Some(id) => MutationIntent::Delete(id),
            None => {
                tracing::debug!("delete requested without an item identity");
                MutationIntent::None
            }
        },
        // continuing into the edit dialog is a new dialog-open, not a mutation
        ItemDialogResult::Edit { .. } => MutationIntent::None,
        ItemDialogResult::Saved(item) => MutationIntent::Replace(item.normalized()?),
        ItemDialogResult::CompletionToggled { completed } => match opened_against {
            Some(item) => MutationIntent::ToggleCompletion {
                id: item.id,
                completed,
            },
            None => {
                tracing::debug!("completion toggle without an item identity");
                MutationIntent::None
            }
        },
        ItemDialogResult::Drafted(draft) => MutationIntent::Create(draft.normalized()?),
    };
    Ok(intent)
}

/// The item an "edit" result asks to continue with, if any.
pub fn edit_continuation<'a>(
    result: &'a ItemDialogResult,
    opened_against: Option<&'a Item>,
) -> Option<&'a Item> {
    match result {
        ItemDialogResult::Edit { item } => item.as_ref().or(opened_against),
        _ => None,
    }
}

pub fn classify_category(result: CategoryDialogResult) -> Result<CategoryIntent, ValidationError> {
    let intent = match result {
        CategoryDialogResult::Dismissed => CategoryIntent::None,
        CategoryDialogResult::Saved(category) => CategoryIntent::Update(category.normalized()?),
        CategoryDialogResult::Drafted(draft) => CategoryIntent::Create(draft.normalized()?),
    };
    Ok(intent)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn item(id: i64) -> Item {
        Item {
            id: ItemId(id),
            title: "Buy milk".into(),
            description: None,
            completed: false,
            category: None,
            created_at: None,
            last_modified: None,
        }
    }

    fn classify_json(
        payload: serde_json::Value,
        opened: Option<&Item>,
    ) -> Result<MutationIntent, ValidationError> {
        let result = ItemDialogResult::from_payload(Some(&payload), opened).unwrap();
        classify(result, opened)
    }

    #[test]
    fn delete_envelope_with_completion_is_a_delete() {
        let opened = item(7);
        let intent = classify_json(
            json!({ "action": "delete", "completed": true, "id": 7 }),
            Some(&opened),
        )
        .unwrap();
        assert_eq!(intent, MutationIntent::Delete(ItemId(7)));
    }

    #[test]
    fn delete_without_identity_falls_back_to_opened_item() {
        let opened = item(4);
        let intent = classify_json(json!({ "action": "delete" }), Some(&opened)).unwrap();
        assert_eq!(intent, MutationIntent::Delete(ItemId(4)));

        let intent = classify(ItemDialogResult::Delete { id: None }, None).unwrap();
        assert!(intent.is_none());
    }

    #[test]
    fn edit_envelope_is_no_mutation_but_exposes_continuation() {
        let opened = item(7);
        let payload = json!({ "action": "edit", "todo": { "id": 7, "title": "Buy milk", "completed": true } });
        let result = ItemDialogResult::from_payload(Some(&payload), Some(&opened)).unwrap();

        let continuation = edit_continuation(&result, Some(&opened)).map(|item| item.id);
        assert_eq!(continuation, Some(ItemId(7)));
        assert_eq!(classify(result, Some(&opened)).unwrap(), MutationIntent::None);
    }

    #[test]
    fn toggle_uses_identity_of_opened_item() {
        let opened = item(9);
        let intent = classify_json(json!({ "completed": true }), Some(&opened)).unwrap();
        assert_eq!(
            intent,
            MutationIntent::ToggleCompletion {
                id: ItemId(9),
                completed: true
            }
        );
    }

    #[test]
    fn saved_item_is_trimmed_replace() {
        let opened = item(2);
        let intent = classify_json(
            json!({ "id": 2, "title": "  Buy bread ", "description": "  ", "completed": false }),
            Some(&opened),
        )
        .unwrap();
        match intent {
            MutationIntent::Replace(item) => {
                assert_eq!(item.title, "Buy bread");
                assert_eq!(item.description, None);
            }
            other => panic!("expected replace, got {other:?}"),
        }
    }

    #[test]
    fn blank_titles_are_validation_errors() {
        assert_eq!(
            classify_json(json!({ "title": "   " }), None),
            Err(ValidationError::EmptyTitle)
        );
        assert_eq!(
            classify_json(json!({ "id": 1, "title": "" }), None),
            Err(ValidationError::EmptyTitle)
        );
    }

    #[test]
    fn draft_becomes_create() {
        let intent = classify_json(
            json!({ "title": "Water plants", "description": "<p>balcony</p>", "completed": false }),
            None,
        )
        .unwrap();
        assert_eq!(
            intent,
            MutationIntent::Create(ItemDraft::new("Water plants").with_description("<p>balcony</p>"))
        );
        assert_eq!(intent.target(), None);
    }

    #[test]
    fn category_results_classify() {
        assert_eq!(
            classify_category(CategoryDialogResult::Dismissed).unwrap(),
            CategoryIntent::None
        );
        assert_eq!(
            classify_category(CategoryDialogResult::Drafted(CategoryDraft::new(" Home "))).unwrap(),
            CategoryIntent::Create(CategoryDraft::new("Home"))
        );
        assert_eq!(
            classify_category(CategoryDialogResult::Drafted(CategoryDraft::new(" "))),
            Err(ValidationError::EmptyName)
        );
    }
}
