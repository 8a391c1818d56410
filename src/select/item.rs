//! Select Items
//!
//! Caller-owned items and sections offered by a selectable list.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Label of the placeholder item.
pub const EMPTY_ITEM_LABEL: &str = "---------";

/// Item identifier or value: text or integer.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SelectKey {
    Number(i64),
    Text(String),
}

impl fmt::Display for SelectKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{}", n),
            Self::Text(s) => f.write_str(s),
        }
    }
}

impl From<&str> for SelectKey {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for SelectKey {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<i64> for SelectKey {
    fn from(value: i64) -> Self {
        Self::Number(value)
    }
}

impl From<i32> for SelectKey {
    fn from(value: i32) -> Self {
        Self::Number(value.into())
    }
}

/// Selectable item.
///
/// Two items are the same item when every field is equal.
#[derive(Clone, Debug, PartialEq)]
pub struct SelectItem<T> {
    pub id: SelectKey,
    pub label: String,
    pub label_postfix: Option<String>,
    pub value: SelectKey,
    pub model: Option<T>,
}

impl<T> SelectItem<T> {
    /// Create an item without postfix or model.
    pub fn new(
        id: impl Into<SelectKey>,
        label: impl Into<String>,
        value: impl Into<SelectKey>,
    ) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            label_postfix: None,
            value: value.into(),
            model: None,
        }
    }

    /// Placeholder item standing for "no choice".
    pub fn empty() -> Self {
        Self::new("", EMPTY_ITEM_LABEL, "")
    }

    /// Set the secondary label.
    pub fn with_postfix(mut self, postfix: impl Into<String>) -> Self {
        self.label_postfix = Some(postfix.into());
        self
    }

    /// Attach the domain object the item represents.
    pub fn with_model(mut self, model: T) -> Self {
        self.model = Some(model);
        self
    }

    /// Whether this is the placeholder item.
    pub fn is_empty_item(&self) -> bool {
        self.model.is_none()
            && self.label_postfix.is_none()
            && self.label == EMPTY_ITEM_LABEL
            && self.id == SelectKey::Text(String::new())
            && self.value == SelectKey::Text(String::new())
    }
}

/// Optionally named group of items.
#[derive(Clone, Debug, PartialEq)]
pub struct SelectItemSection<T> {
    pub name: Option<String>,
    pub items: Vec<SelectItem<T>>,
}

impl<T> SelectItemSection<T> {
    /// Unnamed section.
    pub fn new(items: Vec<SelectItem<T>>) -> Self {
        Self { name: None, items }
    }

    /// Named section.
    pub fn named(name: impl Into<String>, items: Vec<SelectItem<T>>) -> Self {
        Self {
            name: Some(name.into()),
            items,
        }
    }
}
