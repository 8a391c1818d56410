//! Selectable List
//!
//! Framework-independent state of a single or multi-select dropdown with
//! search.

use tracing::trace;

use crate::error::SelectError;
use crate::select::item::{SelectItem, SelectItemSection, SelectKey, EMPTY_ITEM_LABEL};
use crate::select::normalize::{matches_query, normalize};

/// Placeholder shown when nothing is selected.
pub const DEFAULT_PLACEHOLDER: &str = "Nothing selected";

/// Selection behaviour and presentation options.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SelectOptions {
    /// Allow selecting several items.
    pub is_multi_select: bool,
    /// Allow filtering items by query.
    pub is_searchable: bool,
    /// Ignore attempts to open the dropdown.
    pub is_disabled: bool,
    /// Offer a placeholder item standing for "no choice".
    pub has_empty_item: bool,
    /// Start with every item selected (multi-select only).
    pub is_all_selected: bool,
    /// Text shown when nothing is selected.
    pub placeholder: String,
}

impl Default for SelectOptions {
    fn default() -> Self {
        Self {
            is_multi_select: false,
            is_searchable: true,
            is_disabled: false,
            has_empty_item: false,
            is_all_selected: false,
            placeholder: DEFAULT_PLACEHOLDER.to_string(),
        }
    }
}

impl SelectOptions {
    /// Single-select options.
    pub fn single() -> Self {
        Self::default()
    }

    /// Multi-select options.
    pub fn multi() -> Self {
        Self {
            is_multi_select: true,
            ..Self::default()
        }
    }

    /// Enable or disable search.
    pub fn searchable(mut self, searchable: bool) -> Self {
        self.is_searchable = searchable;
        self
    }

    /// Enable or disable the control.
    pub fn disabled(mut self, disabled: bool) -> Self {
        self.is_disabled = disabled;
        self
    }

    /// Offer the placeholder item.
    pub fn with_empty_item(mut self) -> Self {
        self.has_empty_item = true;
        self
    }

    /// Select everything on construction.
    pub fn all_selected(mut self) -> Self {
        self.is_all_selected = true;
        self
    }

    /// Set the placeholder text.
    pub fn placeholder(mut self, placeholder: impl Into<String>) -> Self {
        self.placeholder = placeholder.into();
        self
    }
}

/// Change notification produced by a user action.
#[derive(Clone, Debug, PartialEq)]
pub enum SelectionChange<T> {
    /// The newly selected item.
    Single(SelectItem<T>),
    /// The whole selection after the change, in selection order.
    Multi(Vec<SelectItem<T>>),
}

/// Keys the component reacts to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Key {
    Escape,
    Other,
}

/// Input events routed to the component.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SelectEvent {
    /// Pointer pressed somewhere in the window.
    PointerDown { within_root: bool },
    /// Key pressed somewhere in the window.
    KeyDown(Key),
}

/// Text shown in the closed control.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DisplayText {
    Placeholder(String),
    Selection {
        label: String,
        postfix: Option<String>,
    },
}

/// Selectable list state.
pub struct SelectList<T> {
    options: SelectOptions,
    sections: Vec<SelectItemSection<T>>,
    all_items: Vec<SelectItem<T>>,
    filtered_sections: Vec<SelectItemSection<T>>,
    selected_items: Vec<SelectItem<T>>,
    is_open: bool,
    query: String,
}

impl<T: Clone + PartialEq> SelectList<T> {
    /// Create the list over the caller's sections.
    pub fn new(sections: Vec<SelectItemSection<T>>, options: SelectOptions) -> Self {
        let mut list = Self {
            options,
            sections: Vec::new(),
            all_items: Vec::new(),
            filtered_sections: Vec::new(),
            selected_items: Vec::new(),
            is_open: false,
            query: String::new(),
        };
        list.set_sections(sections);

        if list.options.is_multi_select && list.options.is_all_selected {
            list.selected_items = list.all_items.clone();
        }

        list
    }

    /// Replace the offered items. The selection is kept.
    pub fn set_sections(&mut self, sections: Vec<SelectItemSection<T>>) {
        let placeholder = self.options.has_empty_item.then(SelectItem::empty);

        self.all_items = placeholder
            .into_iter()
            .chain(sections.iter().flat_map(|s| s.items.iter().cloned()))
            .collect();
        self.sections = sections;
        self.refilter();
    }

    /// Options in effect.
    pub fn options(&self) -> &SelectOptions {
        &self.options
    }

    /// Every offered item, flattened across sections.
    pub fn items(&self) -> &[SelectItem<T>] {
        &self.all_items
    }

    /// Sections after applying the current query.
    pub fn filtered_sections(&self) -> &[SelectItemSection<T>] {
        &self.filtered_sections
    }

    /// Selected items in selection order.
    pub fn selected_items(&self) -> &[SelectItem<T>] {
        &self.selected_items
    }

    /// Whether the item is selected.
    pub fn is_selected(&self, item: &SelectItem<T>) -> bool {
        self.selected_items.contains(item)
    }

    /// Whether the dropdown is open.
    pub fn is_open(&self) -> bool {
        self.is_open
    }

    /// Current search query.
    pub fn query(&self) -> &str {
        &self.query
    }

    /// Update the search query. Ignored when search is disabled.
    pub fn set_query(&mut self, query: impl Into<String>) {
        if !self.options.is_searchable {
            return;
        }
        self.query = query.into();
        self.refilter();
    }

    fn refilter(&mut self) {
        let query = normalize(&self.query);
        let placeholder = self.options.has_empty_item.then(SelectItem::empty);

        self.filtered_sections = self
            .sections
            .iter()
            .map(|section| {
                let items = placeholder
                    .iter()
                    .cloned()
                    .chain(
                        section
                            .items
                            .iter()
                            .filter(|item| item_matches(item, &query))
                            .cloned(),
                    )
                    .collect();

                SelectItemSection {
                    name: section.name.clone(),
                    items,
                }
            })
            .collect();

        trace!(query = %self.query, "Filtered select items");
    }

    /// The control was clicked: toggle the dropdown unless disabled.
    pub fn click_input(&mut self) {
        if !self.options.is_disabled {
            self.is_open = !self.is_open;
        }
    }

    /// Close the dropdown.
    pub fn close(&mut self) {
        self.is_open = false;
    }

    /// Handle a window-level event. Returns whether the dropdown closed.
    pub fn handle_event(&mut self, event: SelectEvent) -> bool {
        let closes = match event {
            SelectEvent::PointerDown { within_root } => !within_root,
            SelectEvent::KeyDown(key) => key == Key::Escape,
        };

        if closes && self.is_open {
            self.is_open = false;
            return true;
        }
        false
    }

    /// The user picked an item.
    ///
    /// In single-select mode picking the selected item again does nothing.
    pub fn toggle(&mut self, item: &SelectItem<T>) -> Option<SelectionChange<T>> {
        if self.options.is_multi_select {
            if self.is_selected(item) {
                self.selected_items.retain(|other| other != item);
            } else {
                self.selected_items.push(item.clone());
            }
            return Some(SelectionChange::Multi(self.selected_items.clone()));
        }

        if self.is_selected(item) {
            return None;
        }
        self.select_single(item.clone());
        Some(SelectionChange::Single(item.clone()))
    }

    /// Select every offered item, ignoring the query.
    pub fn select_all(&mut self) -> Option<SelectionChange<T>> {
        if !self.options.is_multi_select {
            return None;
        }
        self.selected_items = self.all_items.clone();
        Some(SelectionChange::Multi(self.selected_items.clone()))
    }

    /// Clear the selection.
    pub fn deselect_all(&mut self) -> Option<SelectionChange<T>> {
        if !self.options.is_multi_select {
            return None;
        }
        self.selected_items.clear();
        Some(SelectionChange::Multi(Vec::new()))
    }

    /// Pre-select the item at `index` of the flattened item list.
    ///
    /// No change notification is produced.
    pub fn select_index(&mut self, index: usize) -> Result<(), SelectError> {
        let item = self
            .all_items
            .get(index)
            .cloned()
            .ok_or(SelectError::IndexOutOfRange {
                index,
                len: self.all_items.len(),
            })?;

        self.preselect(item);
        Ok(())
    }

    /// Pre-select the first item carrying `value`. Unknown values are ignored.
    ///
    /// No change notification is produced.
    pub fn select_value(&mut self, value: &SelectKey) {
        if let Some(item) = self.all_items.iter().find(|i| &i.value == value).cloned() {
            self.preselect(item);
        }
    }

    fn preselect(&mut self, item: SelectItem<T>) {
        if self.options.is_multi_select {
            if !self.is_selected(&item) {
                self.selected_items.push(item);
            }
        } else {
            self.select_single(item);
        }
    }

    fn select_single(&mut self, item: SelectItem<T>) {
        self.selected_items = vec![item];
        self.is_open = false;
    }

    /// Placeholder text in effect.
    pub fn placeholder(&self) -> &str {
        if self.options.has_empty_item {
            EMPTY_ITEM_LABEL
        } else {
            self.options.placeholder.as_str()
        }
    }

    /// Text for the closed control.
    pub fn display_text(&self) -> DisplayText {
        if self.options.is_multi_select {
            if self.selected_items.is_empty() {
                return DisplayText::Placeholder(self.placeholder().to_string());
            }
            return DisplayText::Selection {
                label: format!(
                    "{} of {} selected",
                    self.selected_items.len(),
                    self.all_items.len()
                ),
                postfix: None,
            };
        }

        match self.selected_items.first() {
            Some(item) if !item.is_empty_item() => DisplayText::Selection {
                label: item.label.clone(),
                postfix: item.label_postfix.clone(),
            },
            _ => DisplayText::Placeholder(self.placeholder().to_string()),
        }
    }
}

fn item_matches<T>(item: &SelectItem<T>, normalized_query: &str) -> bool {
    matches_query(&item.label, normalized_query)
        || item
            .label_postfix
            .as_deref()
            .is_some_and(|postfix| matches_query(postfix, normalized_query))
}
