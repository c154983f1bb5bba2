//! Session application services.
//!
//! This module contains the per-session write path: the ledger and analytics
//! aggregator, the coordinator that serializes them, and the registry that
//! hands out one coordinator per session.

mod aggregator;
mod coordinator;
mod ledger;
mod registry;

pub use aggregator::AnalyticsAggregator;
pub use coordinator::SessionCoordinator;
pub use ledger::{Appended, ConversationLedger};
pub use registry::SessionRegistry;
