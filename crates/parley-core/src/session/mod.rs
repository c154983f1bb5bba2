//! Session domain module.
//!
//! This module contains the session identifier, message types and the
//! storage contract every session record goes through.
//!
//! # Module Structure
//!
//! - `id`: Validated session identifier (`SessionId`)
//! - `message`: Ledger message types (`MessageRole`, `Message`)
//! - `repository`: Key-value store trait (`SessionStore`, `RecordKey`)
//! - `transcript`: Exportable snapshot of one session (`SessionTranscript`)
//!
//! # Usage
//!
//! ```ignore
//! use parley_core::session::{SessionId, Message, MessageRole};
//! use parley_core::session::{SessionStore, RecordKey};
//! ```

mod id;
mod message;
mod repository;
mod transcript;

// Re-export public API
pub use id::SessionId;
pub use message::{Message, MessageRole};
pub use repository::{RecordKey, SessionStore, load_record, save_record};
pub use transcript::SessionTranscript;
