//! Untyped inference replies and reply-text extraction.

use crate::error::{ParleyError, Result};
use serde_json::Value;

/// A provider reply exactly as received.
#[derive(Debug, Clone, PartialEq)]
pub struct InferencePayload(Value);

impl InferencePayload {
    pub fn new(value: Value) -> Self {
        Self(value)
    }

    /// Extracts the reply text.
    ///
    /// Accepted shapes, first match wins:
    /// - a bare JSON string
    /// - `{"response": "..."}` (text models)
    /// - `{"description": "..."}` (vision models)
    /// - `{"result": {"response": "..."}}` (wrapped text models)
    /// - `{"choices": [{"message": {"content": "..."}}]}` (Chat Completions)
    ///
    /// # Errors
    ///
    /// Returns `ParleyError::Inference` if none of the shapes match or the
    /// text is blank.
    pub fn into_text(self) -> Result<String> {
        let text = match &self.0 {
            Value::String(text) => Some(text.as_str()),
            Value::Object(_) => self
                .0
                .get("response")
                .and_then(Value::as_str)
                .or_else(|| self.0.get("description").and_then(Value::as_str))
                .or_else(|| self.0.pointer("/result/response").and_then(Value::as_str))
                .or_else(|| {
                    self.0
                        .pointer("/choices/0/message/content")
                        .and_then(Value::as_str)
                }),
            _ => None,
        };

        match text.map(str::trim) {
            Some(text) if !text.is_empty() => Ok(text.to_string()),
            Some(_) => Err(ParleyError::inference("inference returned an empty reply")),
            None => Err(ParleyError::inference(format!(
                "unexpected inference payload shape: {}",
                summarize(&self.0)
            ))),
        }
    }
}

impl From<Value> for InferencePayload {
    fn from(value: Value) -> Self {
        Self::new(value)
    }
}

fn summarize(value: &Value) -> String {
    let rendered = value.to_string();
    if rendered.chars().count() > 200 {
        let head: String = rendered.chars().take(200).collect();
        format!("{head}...")
    } else {
        rendered
    }
}
