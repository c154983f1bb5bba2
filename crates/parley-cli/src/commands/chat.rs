use super::App;
use anyhow::{Context, Result};
use parley_core::inference::ImageInput;
use std::path::Path;
use std::time::Duration;

pub async fn send(app: &App, session: &str, text: &str, timeout: Option<u64>) -> Result<()> {
    let turn = app
        .dispatcher
        .chat(session, text, timeout.map(Duration::from_secs))
        .await?;
    println!("{}", turn.assistant.content);
    Ok(())
}

pub async fn describe(
    app: &App,
    session: &str,
    image_path: &Path,
    prompt: Option<&str>,
    timeout: Option<u64>,
) -> Result<()> {
    let bytes = tokio::fs::read(image_path)
        .await
        .with_context(|| format!("Failed to read {}", image_path.display()))?;

    let image = match image_mime_from_path(image_path) {
        Some(mime_type) => ImageInput::new(bytes, mime_type),
        None => ImageInput::from_bytes(bytes),
    };

    let turn = app
        .dispatcher
        .describe_image(session, image, prompt, timeout.map(Duration::from_secs))
        .await?;
    println!("{}", turn.assistant.content);
    Ok(())
}

/// MIME type implied by the file extension, if it names an image format.
fn image_mime_from_path(path: &Path) -> Option<String> {
    mime_guess::from_path(path)
        .first()
        .filter(|mime| mime.type_() == mime_guess::mime::IMAGE)
        .map(|mime| mime.essence_str().to_string())
}
