//! Application layer for Parley.
//!
//! This crate coordinates the domain types from `parley-core` with a
//! `SessionStore` backend: per-session serialization, analytics upkeep and
//! the chat dispatcher that calls inference.

pub mod chat_dispatcher;
pub mod session;

pub use chat_dispatcher::{ChatDispatcher, ChatTurn};
pub use session::{SessionCoordinator, SessionRegistry};
