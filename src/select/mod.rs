//! Selectable List
//!
//! Single and multi-select list state with diacritic-insensitive search.

pub mod component;
pub mod item;
pub mod normalize;

pub use component::{
    DisplayText, Key, SelectEvent, SelectList, SelectOptions, SelectionChange,
    DEFAULT_PLACEHOLDER,
};
pub use item::{SelectItem, SelectItemSection, SelectKey, EMPTY_ITEM_LABEL};
pub use normalize::normalize;
