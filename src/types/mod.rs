//! Types
//!
//! Data structures shared by the authentication components.

pub mod callback;
pub mod config;
pub mod token;

pub use callback::*;
pub use config::*;
pub use token::*;
