//! Core Components
//!
//! Transport, storage, CSRF state and discovery infrastructure.

pub mod discovery;
pub mod state;
pub mod storage;
pub mod transport;

pub use discovery::*;
pub use state::*;
pub use storage::*;
pub use transport::*;

use std::sync::{Mutex, MutexGuard, PoisonError};

/// Lock a mutex, recovering the data if a previous holder panicked.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
