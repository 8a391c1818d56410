//! Token Management
//!
//! Persisted token pair and session state.

pub mod store;

pub use store::{TokenStore, ID_TOKEN_KEY, REFRESH_TOKEN_KEY};
