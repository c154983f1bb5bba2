//! Domain layer for Parley.
//!
//! Session identifiers, ledger messages, analytics, the storage contract and
//! the inference capability the dispatcher consumes. Nothing in this crate
//! performs I/O.

pub mod analytics;
pub mod clock;
pub mod config;
pub mod error;
pub mod inference;
pub mod session;

// Re-export common error type
pub use error::{ParleyError, Result};
