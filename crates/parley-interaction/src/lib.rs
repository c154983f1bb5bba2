//! Inference backends for Parley.
//!
//! Implementations of `parley_core::inference::InferenceService` that reach
//! external model servers over HTTP.

pub mod openai_api_service;

pub use openai_api_service::OpenAiCompatibleService;
