//! Builders
//!
//! Fluent builder for the authentication configuration.

pub mod config;

pub use config::{auth_config, AuthConfigBuilder};
