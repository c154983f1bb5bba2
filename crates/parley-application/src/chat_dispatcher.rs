//! Chat dispatcher.
//!
//! Turns a caller request into a recorded conversation turn: the user
//! message is stored, inference runs outside the session lock under a
//! timeout, and the extracted reply is stored as the assistant message.

use crate::session::SessionRegistry;
use parley_core::error::{ParleyError, Result};
use parley_core::inference::{ImageInput, InferencePayload, InferenceService};
use parley_core::session::Message;
use serde::Serialize;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

/// Used when neither the caller nor configuration sets a timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Prompt sent with an image when the caller gives none.
pub const DEFAULT_IMAGE_PROMPT: &str = "Describe this image in detail.";

/// A completed exchange: the recorded user message and the recorded reply.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatTurn {
    pub user: Message,
    pub assistant: Message,
}

/// Routes requests through the session registry and the inference service.
///
/// The dispatcher is the only component that calls inference. It never holds
/// a session lock while waiting on it, so a slow model stalls only the
/// request that is waiting for it.
pub struct ChatDispatcher {
    registry: Arc<SessionRegistry>,
    inference: Arc<dyn InferenceService>,
    system_prompt: Option<String>,
    default_timeout: Duration,
}

impl ChatDispatcher {
    pub fn new(registry: Arc<SessionRegistry>, inference: Arc<dyn InferenceService>) -> Self {
        Self {
            registry,
            inference,
            system_prompt: None,
            default_timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Sets the system prompt passed as context on text turns.
    pub fn with_system_prompt(mut self, system_prompt: Option<String>) -> Self {
        self.system_prompt = system_prompt.filter(|prompt| !prompt.trim().is_empty());
        self
    }

    pub fn with_default_timeout(mut self, timeout: Duration) -> Self {
        self.default_timeout = timeout;
        self
    }

    pub fn registry(&self) -> &Arc<SessionRegistry> {
        &self.registry
    }

    /// Runs one text turn.
    ///
    /// The user message is recorded before inference is called, and stays
    /// recorded if inference fails or times out. No assistant message is
    /// stored in that case.
    ///
    /// # Errors
    ///
    /// - `InvalidSession` / `InvalidInput` for a blank identifier or text
    /// - `Storage` if either append fails
    /// - `Inference` / `Timeout` if no usable reply arrives in time
    pub async fn chat(
        &self,
        session_id: &str,
        text: &str,
        timeout: Option<Duration>,
    ) -> Result<ChatTurn> {
        if text.trim().is_empty() {
            return Err(ParleyError::InvalidInput(
                "message text must not be empty".to_string(),
            ));
        }

        let coordinator = self.registry.coordinator(session_id).await?;
        let turn = coordinator.submit_user_turn(text).await?;

        let context: Vec<Message> = turn
            .prior()
            .iter()
            .filter(|message| message.role.is_counted())
            .cloned()
            .collect();

        tracing::debug!(
            session_id = %coordinator.session_id(),
            context_len = context.len(),
            "[Dispatcher] Running text inference"
        );

        let payload = self
            .with_timeout(
                timeout,
                self.inference
                    .run_text(self.system_prompt.as_deref(), &context, text),
            )
            .await;
        let reply = self.reply_text(session_id, payload)?;

        let assistant = coordinator.submit_assistant_message(reply).await?;
        Ok(ChatTurn {
            user: turn.message,
            assistant,
        })
    }

    /// Runs one vision turn.
    ///
    /// The user message records the prompt tagged with the image type; the
    /// image bytes themselves are not stored.
    pub async fn describe_image(
        &self,
        session_id: &str,
        image: ImageInput,
        prompt: Option<&str>,
        timeout: Option<Duration>,
    ) -> Result<ChatTurn> {
        if image.bytes.is_empty() {
            return Err(ParleyError::InvalidInput("image must not be empty".to_string()));
        }
        let prompt = prompt
            .map(str::trim)
            .filter(|prompt| !prompt.is_empty())
            .unwrap_or(DEFAULT_IMAGE_PROMPT);

        let coordinator = self.registry.coordinator(session_id).await?;
        let user = coordinator
            .submit_user_message(format!("[image: {}] {}", image.mime_type, prompt))
            .await?;

        tracing::debug!(
            session_id = %coordinator.session_id(),
            mime_type = %image.mime_type,
            bytes = image.bytes.len(),
            "[Dispatcher] Running vision inference"
        );

        let payload = self
            .with_timeout(timeout, self.inference.run_vision(&image, prompt))
            .await;
        let reply = self.reply_text(session_id, payload)?;

        let assistant = coordinator.submit_assistant_message(reply).await?;
        Ok(ChatTurn { user, assistant })
    }

    async fn with_timeout<F>(&self, timeout: Option<Duration>, call: F) -> Result<InferencePayload>
    where
        F: Future<Output = Result<InferencePayload>>,
    {
        let limit = timeout.unwrap_or(self.default_timeout);
        match tokio::time::timeout(limit, call).await {
            Ok(result) => result,
            Err(_) => Err(ParleyError::Timeout {
                seconds: whole_seconds_rounded_up(limit),
            }),
        }
    }

    fn reply_text(&self, session_id: &str, payload: Result<InferencePayload>) -> Result<String> {
        match payload.and_then(InferencePayload::into_text) {
            Ok(text) => Ok(text),
            Err(e) => {
                tracing::warn!(
                    session_id = %session_id,
                    error = %e,
                    "[Dispatcher] Inference produced no reply, user message kept"
                );
                Err(e)
            }
        }
    }
}

fn whole_seconds_rounded_up(limit: Duration) -> u64 {
    if limit.subsec_nanos() > 0 {
        limit.as_secs().saturating_add(1)
    } else {
        limit.as_secs()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use parley_core::clock::ManualClock;
    use parley_core::session::MessageRole;
    use parley_infrastructure::InMemorySessionStore;
    use serde_json::{Value, json};
    use std::sync::Mutex;

    /// Replies with a fixed payload and records what it was asked.
    struct ScriptedInference {
        reply: Value,
        seen_history: Mutex<Vec<Vec<String>>>,
        seen_prompts: Mutex<Vec<String>>,
    }

    impl ScriptedInference {
        fn new(reply: Value) -> Self {
            Self {
                reply,
                seen_history: Mutex::new(Vec::new()),
                seen_prompts: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl InferenceService for ScriptedInference {
        async fn run_text(
            &self,
            system_prompt: Option<&str>,
            history: &[Message],
            new_user_text: &str,
        ) -> Result<InferencePayload> {
            self.seen_history
                .lock()
                .unwrap()
                .push(history.iter().map(|m| m.content.clone()).collect());
            self.seen_prompts
                .lock()
                .unwrap()
                .push(format!("{}|{}", system_prompt.unwrap_or("-"), new_user_text));
            Ok(InferencePayload::new(self.reply.clone()))
        }

        async fn run_vision(&self, image: &ImageInput, prompt: &str) -> Result<InferencePayload> {
            self.seen_prompts
                .lock()
                .unwrap()
                .push(format!("{}|{}", image.mime_type, prompt));
            Ok(InferencePayload::new(self.reply.clone()))
        }
    }

    /// Never answers within any reasonable timeout.
    struct StalledInference;

    #[async_trait]
    impl InferenceService for StalledInference {
        async fn run_text(
            &self,
            _system_prompt: Option<&str>,
            _history: &[Message],
            _new_user_text: &str,
        ) -> Result<InferencePayload> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok(InferencePayload::new(json!("too late")))
        }

        async fn run_vision(&self, _image: &ImageInput, _prompt: &str) -> Result<InferencePayload> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok(InferencePayload::new(json!("too late")))
        }
    }

    fn dispatcher(inference: Arc<dyn InferenceService>) -> ChatDispatcher {
        let registry = SessionRegistry::with_clock(
            Arc::new(InMemorySessionStore::new()),
            Arc::new(ManualClock::from_millis(1000)),
        );
        ChatDispatcher::new(Arc::new(registry), inference)
    }

    #[tokio::test]
    async fn test_chat_records_both_messages() {
        let inference = Arc::new(ScriptedInference::new(json!({"response": "hello there"})));
        let dispatcher = dispatcher(inference.clone())
            .with_system_prompt(Some("be brief".to_string()));

        let turn = dispatcher.chat("s1", "hi", None).await.unwrap();
        assert_eq!(turn.user.role, MessageRole::User);
        assert_eq!(turn.assistant.content, "hello there");

        let history = dispatcher.registry().get_history("s1").await.unwrap();
        assert_eq!(history, vec![turn.user, turn.assistant]);
        assert_eq!(
            inference.seen_prompts.lock().unwrap().as_slice(),
            ["be brief|hi".to_string()]
        );
    }

    #[tokio::test]
    async fn test_context_excludes_the_new_turn() {
        let inference = Arc::new(ScriptedInference::new(json!("ok")));
        let dispatcher = dispatcher(inference.clone());

        dispatcher.chat("s1", "first", None).await.unwrap();
        dispatcher.chat("s1", "second", None).await.unwrap();

        let seen = inference.seen_history.lock().unwrap().clone();
        assert_eq!(seen[0], Vec::<String>::new());
        assert_eq!(seen[1], vec!["first".to_string(), "ok".to_string()]);
    }

    #[tokio::test]
    async fn test_blank_text_is_rejected_before_storage() {
        let dispatcher = dispatcher(Arc::new(ScriptedInference::new(json!("ok"))));

        let err = dispatcher.chat("s1", "   ", None).await.unwrap_err();
        assert!(matches!(err, ParleyError::InvalidInput(_)));
        assert!(dispatcher.registry().get_history("s1").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unusable_reply_keeps_only_the_user_message() {
        let dispatcher = dispatcher(Arc::new(ScriptedInference::new(json!({"status": "ok"}))));

        let err = dispatcher.chat("s1", "hi", None).await.unwrap_err();
        assert!(err.is_inference_failure());

        let history = dispatcher.registry().get_history("s1").await.unwrap();
        assert_eq!(history.len(), 1);
        assert!(history[0].is_user());

        let analytics = dispatcher.registry().get_analytics("s1").await.unwrap();
        assert_eq!(analytics.total_messages, 1);
        assert_eq!(analytics.assistant_messages, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_keeps_user_message() {
        let dispatcher = dispatcher(Arc::new(StalledInference));

        let err = dispatcher
            .chat("s1", "anyone?", Some(Duration::from_secs(5)))
            .await
            .unwrap_err();
        assert!(err.is_timeout());
        assert!(matches!(err, ParleyError::Timeout { seconds: 5 }));

        let history = dispatcher.registry().get_history("s1").await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].content, "anyone?");
    }

    #[tokio::test(start_paused = true)]
    async fn test_sub_second_timeout_reports_one_second() {
        let dispatcher = dispatcher(Arc::new(StalledInference));

        let err = dispatcher
            .chat("s1", "quick?", Some(Duration::from_millis(250)))
            .await
            .unwrap_err();
        assert!(matches!(err, ParleyError::Timeout { seconds: 1 }));
        assert_eq!(err.to_string(), "Inference timed out after 1s");
    }

    #[test]
    fn test_timeout_seconds_round_up() {
        assert_eq!(whole_seconds_rounded_up(Duration::from_secs(5)), 5);
        assert_eq!(whole_seconds_rounded_up(Duration::from_millis(5001)), 6);
        assert_eq!(whole_seconds_rounded_up(Duration::ZERO), 0);
    }

    #[tokio::test]
    async fn test_describe_image_uses_default_prompt() {
        let inference = Arc::new(ScriptedInference::new(json!({"description": "a cat"})));
        let dispatcher = dispatcher(inference.clone());

        let image = ImageInput::new(vec![0xFF, 0xD8, 0xFF], "image/jpeg");
        let turn = dispatcher
            .describe_image("s1", image, Some("  "), None)
            .await
            .unwrap();

        assert_eq!(turn.assistant.content, "a cat");
        assert_eq!(
            turn.user.content,
            format!("[image: image/jpeg] {DEFAULT_IMAGE_PROMPT}")
        );
        assert_eq!(
            inference.seen_prompts.lock().unwrap().as_slice(),
            [format!("image/jpeg|{DEFAULT_IMAGE_PROMPT}")]
        );
    }

    #[tokio::test]
    async fn test_empty_image_is_rejected() {
        let dispatcher = dispatcher(Arc::new(ScriptedInference::new(json!("ok"))));
        let err = dispatcher
            .describe_image("s1", ImageInput::new(Vec::new(), "image/png"), None, None)
            .await
            .unwrap_err();
        assert!(matches!(err, ParleyError::InvalidInput(_)));
    }
}
