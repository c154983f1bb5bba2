pub mod chat;
pub mod session;

use anyhow::{Context, Result};
use parley_application::{ChatDispatcher, SessionRegistry};
use parley_core::config::RootConfig;
use parley_infrastructure::build_session_store;
use parley_interaction::OpenAiCompatibleService;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;

/// Everything a command needs, wired from configuration.
pub struct App {
    pub registry: Arc<SessionRegistry>,
    pub dispatcher: ChatDispatcher,
}

impl App {
    pub async fn build(config: &RootConfig) -> Result<Self> {
        let store = build_session_store(&config.storage)
            .await
            .context("Failed to open session store")?;
        let registry = Arc::new(SessionRegistry::new(store));

        let inference = Arc::new(OpenAiCompatibleService::from_config(&config.inference));
        let dispatcher = ChatDispatcher::new(registry.clone(), inference)
            .with_system_prompt(config.inference.system_prompt.clone())
            .with_default_timeout(Duration::from_secs(config.inference.timeout_secs));

        Ok(Self {
            registry,
            dispatcher,
        })
    }
}

pub fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let rendered = serde_json::to_string_pretty(value).context("Failed to render JSON")?;
    println!("{}", rendered);
    Ok(())
}
