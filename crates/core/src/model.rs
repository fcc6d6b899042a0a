use std::fmt;
use std::str::FromStr;

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

pub const DEFAULT_CATEGORY_COLOR: &str = "#2196F3";

/// Colors offered by the category dialog.
pub const CATEGORY_PALETTE: [&str; 16] = [
    "#F44336", "#E91E63", "#9C27B0", "#673AB7", "#3F51B5", "#2196F3", "#03A9F4", "#00BCD4",
    "#009688", "#4CAF50", "#8BC34A", "#CDDC39", "#FFEB3B", "#FFC107", "#FF9800", "#FF5722",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(pub i64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CategoryId(pub i64);

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl fmt::Display for CategoryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl FromStr for ItemId {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_id(s).map(ItemId)
    }
}

impl FromStr for CategoryId {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_id(s).map(CategoryId)
    }
}

fn parse_id(s: &str) -> Result<i64> {
    let trimmed = s.trim().trim_start_matches('#');
    trimmed
        .parse()
        .map_err(|_| anyhow!("Invalid id '{}': expected a number such as 7 or #7", s))
}

/// Reference from an item to its category. On the wire this is the nested category object;
/// only the identity is kept.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryRef {
    pub id: CategoryId,
}

impl From<CategoryId> for CategoryRef {
    fn from(id: CategoryId) -> Self {
        Self { id }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Item {
    pub id: ItemId,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub completed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<CategoryRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_modified: Option<String>,
}

impl Item {
    pub fn category_id(&self) -> Option<CategoryId> {
        self.category.map(|category| category.id)
    }

    /// Trimmed copy suitable for an update call.
    pub fn normalized(&self) -> Result<Self, ValidationError> {
        Ok(Self {
            title: validate_title(&self.title)?,
            description: normalize_description(self.description.as_deref()),
            ..self.clone()
        })
    }
}

/// An item that has not been persisted yet and therefore has no identity.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemDraft {
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub completed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<CategoryRef>,
}

impl ItemDraft {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_category(mut self, category: CategoryId) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn normalized(&self) -> Result<Self, ValidationError> {
        Ok(Self {
            title: validate_title(&self.title)?,
            description: normalize_description(self.description.as_deref()),
            completed: self.completed,
            category: self.category,
        })
    }
}

impl From<&Item> for ItemDraft {
    fn from(item: &Item) -> Self {
        Self {
            title: item.title.clone(),
            description: item.description.clone(),
            completed: item.completed,
            category: item.category,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_modified: Option<String>,
}

impl Category {
    pub fn color_or_default(&self) -> &str {
        self.color.as_deref().unwrap_or(DEFAULT_CATEGORY_COLOR)
    }

    pub fn normalized(&self) -> Result<Self, ValidationError> {
        Ok(Self {
            name: validate_name(&self.name)?,
            description: normalize_description(self.description.as_deref()),
            ..self.clone()
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryDraft {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl CategoryDraft {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn with_color(mut self, color: impl Into<String>) -> Self {
        self.color = Some(color.into());
        self
    }

    pub fn normalized(&self) -> Result<Self, ValidationError> {
        Ok(Self {
            name: validate_name(&self.name)?,
            color: self
                .color
                .as_deref()
                .map(str::trim)
                .filter(|color| !color.is_empty())
                .map(str::to_string),
            description: normalize_description(self.description.as_deref()),
        })
    }
}

pub fn validate_title(title: &str) -> Result<String, ValidationError> {
    let trimmed = title.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::EmptyTitle);
    }
    Ok(trimmed.to_string())
}

pub fn validate_name(name: &str) -> Result<String, ValidationError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::EmptyName);
    }
    Ok(trimmed.to_string())
}

pub fn normalize_description(description: Option<&str>) -> Option<String> {
    description
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn item_reads_nested_category_object() {
        let item: Item = serde_json::from_value(json!({
            "id": 4,
            "title": "Buy milk",
            "completed": false,
            "category": { "id": 2, "name": "Groceries", "color": "#4CAF50" },
            "createdAt": "2024-05-01T10:00:00Z"
        }))
        .unwrap();

        assert_eq!(item.id, ItemId(4));
        assert_eq!(item.category_id(), Some(CategoryId(2)));
        assert_eq!(item.created_at.as_deref(), Some("2024-05-01T10:00:00Z"));
        assert_eq!(item.description, None);
    }

    #[test]
    fn draft_normalization_trims_and_rejects_blank_titles() {
        let draft = ItemDraft::new("  Water plants ").with_description("   ");
        let normalized = draft.normalized().unwrap();
        assert_eq!(normalized.title, "Water plants");
        assert_eq!(normalized.description, None);

        assert_eq!(
            ItemDraft::new(" \t ").normalized(),
            Err(ValidationError::EmptyTitle)
        );
        assert_eq!(
            CategoryDraft::new("").normalized(),
            Err(ValidationError::EmptyName)
        );
    }

    #[test]
    fn ids_parse_with_optional_hash() {
        assert_eq!("#12".parse::<ItemId>().unwrap(), ItemId(12));
        assert_eq!(" 3 ".parse::<CategoryId>().unwrap(), CategoryId(3));
        assert!("abc".parse::<ItemId>().is_err());
    }

    #[test]
    fn category_color_falls_back_to_default() {
        let category = Category {
            id: CategoryId(1),
            name: "Work".into(),
            color: None,
            description: None,
            created_at: None,
            last_modified: None,
        };
        assert_eq!(category.color_or_default(), DEFAULT_CATEGORY_COLOR);
        assert!(CATEGORY_PALETTE.contains(&DEFAULT_CATEGORY_COLOR));
    }
}
