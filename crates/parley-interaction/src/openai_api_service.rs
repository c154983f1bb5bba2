//! OpenAiCompatibleService - REST client for Chat Completions endpoints.
//!
//! Works against OpenAI itself and any server exposing the same
//! `/v1/chat/completions` contract (local model servers, proxies).
//! The reply body is handed back untouched; text extraction happens in the
//! dispatcher.

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use parley_core::config::InferenceConfig;
use parley_core::error::{ParleyError, Result};
use parley_core::inference::{ImageInput, InferencePayload, InferenceService};
use parley_core::session::{Message, MessageRole};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Inference service that talks to an OpenAI-compatible HTTP API.
#[derive(Clone)]
pub struct OpenAiCompatibleService {
    client: Client,
    base_url: String,
    api_key: Option<String>,
    model: String,
    vision_model: String,
    max_tokens: Option<u32>,
}

impl OpenAiCompatibleService {
    /// Creates a service for `base_url` using `model` for both text and vision.
    pub fn new(base_url: impl Into<String>, model: impl Into<String>) -> Self {
        let model = model.into();
        Self {
            client: Client::new(),
            base_url: base_url.into(),
            api_key: None,
            vision_model: model.clone(),
            model,
            max_tokens: None,
        }
    }

    /// Builds the service from configuration, reading the API key from the
    /// process environment.
    pub fn from_config(config: &InferenceConfig) -> Self {
        Self::from_config_with_env(config, |name| std::env::var(name).ok())
    }

    /// Builds the service from configuration, resolving the API key through
    /// `env`.
    ///
    /// A missing key is not an error: local servers usually need none, and
    /// a remote one will answer 401, which surfaces as an inference failure.
    pub fn from_config_with_env<F>(config: &InferenceConfig, env: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_key = env(&config.api_key_env).filter(|key| !key.trim().is_empty());
        if api_key.is_none() {
            tracing::debug!(
                "{} is not set, sending requests without Authorization",
                config.api_key_env
            );
        }

        let mut service = Self::new(&config.base_url, &config.model)
            .with_vision_model(config.vision_model());
        service.api_key = api_key;
        service.max_tokens = config.max_tokens;
        service
    }

    pub fn with_vision_model(mut self, model: impl Into<String>) -> Self {
        self.vision_model = model.into();
        self
    }

    /// Sets the maximum number of tokens to generate.
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    fn text_request(
        &self,
        system_prompt: Option<&str>,
        history: &[Message],
        new_user_text: &str,
    ) -> ChatCompletionRequest {
        let mut messages = Vec::with_capacity(history.len() + 2);

        if let Some(prompt) = system_prompt.filter(|p| !p.trim().is_empty()) {
            messages.push(ChatMessage::text("system", prompt));
        }

        // System entries in the ledger are not replayed; the prompt above
        // is the only system context.
        for message in history {
            match message.role {
                MessageRole::User => messages.push(ChatMessage::text("user", &message.content)),
                MessageRole::Assistant => {
                    messages.push(ChatMessage::text("assistant", &message.content))
                }
                MessageRole::System => {}
            }
        }

        messages.push(ChatMessage::text("user", new_user_text));

        ChatCompletionRequest {
            model: self.model.clone(),
            messages,
            max_tokens: self.max_tokens,
        }
    }

    fn vision_request(&self, image: &ImageInput, prompt: &str) -> ChatCompletionRequest {
        // OpenAI expects data URLs for base64 images
        let data_url = format!(
            "data:{};base64,{}",
            image.mime_type,
            BASE64_STANDARD.encode(&image.bytes)
        );

        ChatCompletionRequest {
            model: self.vision_model.clone(),
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: vec![
                    MessageContent::Text {
                        text: prompt.to_string(),
                    },
                    MessageContent::ImageUrl {
                        image_url: ImageUrl { url: data_url },
                    },
                ],
            }],
            max_tokens: self.max_tokens,
        }
    }

    async fn send_request(&self, body: &ChatCompletionRequest) -> Result<InferencePayload> {
        let mut request = self
            .client
            .post(&self.base_url)
            .header("content-type", "application/json")
            .json(body);
        if let Some(api_key) = &self.api_key {
            request = request.header("Authorization", format!("Bearer {}", api_key));
        }

        let response = request.send().await.map_err(|err| {
            ParleyError::inference(format!("Inference request failed: {err}"))
        })?;

        if !response.status().is_success() {
            let status = response.status();
            let body_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to read error body".to_string());
            return Err(map_http_error(status, &body_text));
        }

        let body: Value = response.json().await.map_err(|err| {
            ParleyError::inference(format!("Failed to parse inference response: {err}"))
        })?;

        tracing::debug!(model = %body.get("model").and_then(serde_json::Value::as_str).unwrap_or("?"), "Inference reply received");
        Ok(InferencePayload::new(body))
    }
}

#[async_trait]
impl InferenceService for OpenAiCompatibleService {
    async fn run_text(
        &self,
        system_prompt: Option<&str>,
        history: &[Message],
        new_user_text: &str,
    ) -> Result<InferencePayload> {
        let request = self.text_request(system_prompt, history, new_user_text);
        self.send_request(&request).await
    }

    async fn run_vision(&self, image: &ImageInput, prompt: &str) -> Result<InferencePayload> {
        let request = self.vision_request(image, prompt);
        self.send_request(&request).await
    }
}

#[derive(Serialize)]
struct ChatCompletionRequest {
    model: String,
    messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

#[derive(Serialize)]
struct ChatMessage {
    role: String,
    content: Vec<MessageContent>,
}

impl ChatMessage {
    fn text(role: &str, text: &str) -> Self {
        Self {
            role: role.to_string(),
            content: vec![MessageContent::Text {
                text: text.to_string(),
            }],
        }
    }
}

enum MessageContent {
    Text { text: String },
    ImageUrl { image_url: ImageUrl },
}

// Custom serialization for MessageContent
impl Serialize for MessageContent {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        use serde::ser::SerializeMap;

        let mut map = serializer.serialize_map(None)?;

        match self {
            MessageContent::Text { text } => {
                map.serialize_entry("type", "text")?;
                map.serialize_entry("text", text)?;
            }
            MessageContent::ImageUrl { image_url } => {
                map.serialize_entry("type", "image_url")?;
                map.serialize_entry("image_url", image_url)?;
            }
        }

        map.end()
    }
}

#[derive(Serialize)]
struct ImageUrl {
    url: String,
}

#[derive(Deserialize)]
struct ErrorResponse {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: String,
}

fn map_http_error(status: StatusCode, body: &str) -> ParleyError {
    let message = serde_json::from_str::<ErrorResponse>(body)
        .map(|wrapper| wrapper.error.message)
        .unwrap_or_else(|_| body.to_string());

    ParleyError::inference(format!("HTTP {}: {}", status.as_u16(), message))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use serde_json::json;

    fn message(role: MessageRole, content: &str) -> Message {
        Message {
            id: String::new(),
            role,
            content: content.to_string(),
            timestamp: Some(Utc::now()),
        }
    }

    fn service() -> OpenAiCompatibleService {
        OpenAiCompatibleService::new("http://localhost:9/v1/chat/completions", "text-model")
            .with_vision_model("vision-model")
    }

    #[test]
    fn test_text_request_orders_context() {
        let history = vec![
            message(MessageRole::User, "hi"),
            message(MessageRole::System, "ignored"),
            message(MessageRole::Assistant, "hello"),
        ];
        let request = service().text_request(Some("be kind"), &history, "how are you?");
        let body = serde_json::to_value(&request).unwrap();

        assert_eq!(body["model"], "text-model");
        assert!(body.get("max_tokens").is_none());

        let roles: Vec<&str> = body["messages"]
            .as_array()
            .unwrap()
            .iter()
            .map(|m| m["role"].as_str().unwrap())
            .collect();
        assert_eq!(roles, ["system", "user", "assistant", "user"]);
        assert_eq!(
            body["messages"][3]["content"][0],
            json!({"type": "text", "text": "how are you?"})
        );
    }

    #[test]
    fn test_blank_system_prompt_is_omitted() {
        let request = service().text_request(Some("  "), &[], "hi");
        let body = serde_json::to_value(&request).unwrap();
        assert_eq!(body["messages"].as_array().unwrap().len(), 1);
    }

    #[test]
    fn test_vision_request_embeds_data_url() {
        let image = ImageInput::new(vec![1, 2, 3], "image/png");
        let request = service().with_max_tokens(64).vision_request(&image, "what is it?");
        let body = serde_json::to_value(&request).unwrap();

        assert_eq!(body["model"], "vision-model");
        assert_eq!(body["max_tokens"], 64);
        let content = &body["messages"][0]["content"];
        assert_eq!(content[0], json!({"type": "text", "text": "what is it?"}));
        assert_eq!(content[1]["type"], "image_url");
        assert_eq!(content[1]["image_url"]["url"], "data:image/png;base64,AQID");
    }

    #[test]
    fn test_from_config_reads_named_key() {
        let config = InferenceConfig {
            api_key_env: "CUSTOM_KEY".to_string(),
            vision_model: Some("vision".to_string()),
            max_tokens: Some(10),
            ..InferenceConfig::default()
        };
        let service = OpenAiCompatibleService::from_config_with_env(&config, |name| {
            (name == "CUSTOM_KEY").then(|| "secret".to_string())
        });

        assert_eq!(service.api_key.as_deref(), Some("secret"));
        assert_eq!(service.model, "gpt-4o-mini");
        assert_eq!(service.vision_model, "vision");
        assert_eq!(service.max_tokens, Some(10));

        let keyless = OpenAiCompatibleService::from_config_with_env(&config, |_| None);
        assert!(keyless.api_key.is_none());
    }

    #[test]
    fn test_http_error_carries_status_and_message() {
        let err = map_http_error(
            StatusCode::UNAUTHORIZED,
            r#"{"error": {"message": "bad key", "type": "auth"}}"#,
        );
        assert!(err.is_inference_failure());
        assert_eq!(err.to_string(), "Inference error: HTTP 401: bad key");

        let raw = map_http_error(StatusCode::BAD_GATEWAY, "upstream down");
        assert_eq!(raw.to_string(), "Inference error: HTTP 502: upstream down");
    }

    #[tokio::test]
    async fn test_unreachable_server_is_inference_failure() {
        let err = service().run_text(None, &[], "hi").await.unwrap_err();
        assert!(err.is_inference_failure());
    }
}
