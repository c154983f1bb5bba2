//! Inference capability consumed by the request dispatcher.
//!
//! The session core never calls inference itself. It only hands out history
//! as context and stores whatever text the dispatcher extracts from the
//! reply. Replies cross this boundary untyped ([`InferencePayload`]) and are
//! validated before they become a message.

mod payload;

pub use payload::InferencePayload;

use crate::error::Result;
use crate::session::Message;
use async_trait::async_trait;

/// An image handed to the vision model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageInput {
    pub bytes: Vec<u8>,
    pub mime_type: String,
}

impl ImageInput {
    pub fn new(bytes: Vec<u8>, mime_type: impl Into<String>) -> Self {
        Self {
            bytes,
            mime_type: mime_type.into(),
        }
    }

    /// Builds an input whose MIME type is sniffed from the leading bytes.
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        let mime_type = sniff_image_mime(&bytes).unwrap_or("image/jpeg");
        Self::new(bytes, mime_type)
    }
}

/// Recognizes the common web image formats by magic number.
pub fn sniff_image_mime(bytes: &[u8]) -> Option<&'static str> {
    if bytes.starts_with(&[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A]) {
        Some("image/png")
    } else if bytes.starts_with(&[0xFF, 0xD8, 0xFF]) {
        Some("image/jpeg")
    } else if bytes.starts_with(b"GIF87a") || bytes.starts_with(b"GIF89a") {
        Some("image/gif")
    } else if bytes.len() >= 12 && &bytes[..4] == b"RIFF" && &bytes[8..12] == b"WEBP" {
        Some("image/webp")
    } else {
        None
    }
}

/// External text/vision generation service.
///
/// Implementations return the provider's raw reply; the dispatcher decides
/// whether it carries usable text.
#[async_trait]
pub trait InferenceService: Send + Sync {
    /// Generates a reply to `new_user_text` given the prior conversation.
    ///
    /// `history` is the ledger as it stood before the new user turn was
    /// recorded.
    async fn run_text(
        &self,
        system_prompt: Option<&str>,
        history: &[Message],
        new_user_text: &str,
    ) -> Result<InferencePayload>;

    /// Describes or answers a question about an image.
    async fn run_vision(&self, image: &ImageInput, prompt: &str) -> Result<InferencePayload>;
}
