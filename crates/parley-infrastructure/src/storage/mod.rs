//! Storage layer for atomic file operations.

mod atomic_json;
mod filename;

pub use atomic_json::AtomicJsonFile;
pub use filename::{decode_session_dir, encode_session_dir};
