use super::{App, print_json};
use anyhow::{Context, Result};
use std::path::Path;

pub async fn list(app: &App) -> Result<()> {
    let sessions = app.registry.list_sessions().await?;
    if sessions.is_empty() {
        eprintln!("No sessions stored.");
    }
    for session in sessions {
        println!("{}", session);
    }
    Ok(())
}

pub async fn history(app: &App, session: &str) -> Result<()> {
    let messages = app.registry.get_history(session).await?;
    print_json(&messages)
}

pub async fn analytics(app: &App, session: &str) -> Result<()> {
    let analytics = app.registry.get_analytics(session).await?;
    print_json(&analytics)
}

pub async fn clear(app: &App, session: &str) -> Result<()> {
    app.registry.clear_session(session).await?;
    eprintln!("Cleared session {}", session);
    Ok(())
}

pub async fn export(app: &App, session: &str, output: Option<&Path>) -> Result<()> {
    let transcript = app.registry.export(session).await?;

    match output {
        Some(path) => {
            let rendered = serde_json::to_string_pretty(&transcript)?;
            tokio::fs::write(path, rendered)
                .await
                .with_context(|| format!("Failed to write {}", path.display()))?;
            eprintln!(
                "Exported {} messages to {}",
                transcript.messages.len(),
                path.display()
            );
            Ok(())
        }
        None => print_json(&transcript),
    }
}
