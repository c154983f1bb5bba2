//! Analytics domain module.
//!
//! Holds the derived per-session statistics and the pure update step the
//! aggregator applies on every append.

mod model;

pub use model::Analytics;
