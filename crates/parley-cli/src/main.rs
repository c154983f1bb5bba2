use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use parley_core::config::RootConfig;
use parley_infrastructure::ConfigService;
use std::path::PathBuf;

mod commands;
mod logging;

#[derive(Parser)]
#[command(name = "parley")]
#[command(about = "Parley CLI - session-scoped conversation history and analytics", long_about = None)]
struct Cli {
    /// Path to config.toml (defaults to the platform config directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Directory holding session data, overriding configuration
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List stored session identifiers
    Sessions,
    /// Print a session's message history as JSON
    History { session: String },
    /// Print a session's analytics as JSON
    Analytics { session: String },
    /// Send one message and record the reply
    Send {
        session: String,
        text: String,
        /// Inference timeout in seconds
        #[arg(long)]
        timeout: Option<u64>,
    },
    /// Ask the vision model about an image and record the reply
    Describe {
        session: String,
        image: PathBuf,
        #[arg(long)]
        prompt: Option<String>,
        /// Inference timeout in seconds
        #[arg(long)]
        timeout: Option<u64>,
    },
    /// Delete a session's history and reset its analytics
    Clear { session: String },
    /// Print a transcript with history and analytics
    Export {
        session: String,
        /// Write to a file instead of stdout
        #[arg(long, short)]
        output: Option<PathBuf>,
    },
}

fn load_config(cli: &Cli) -> Result<RootConfig> {
    let service = match &cli.config {
        Some(path) => ConfigService::new(path),
        None => ConfigService::default_location()?,
    };
    let mut config = service
        .load()
        .with_context(|| format!("Failed to load {}", service.path().display()))?;

    if let Some(dir) = &cli.data_dir {
        config.storage.data_dir = Some(dir.clone());
    }
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = load_config(&cli)?;
    logging::init_logging(&config.logging);

    let app = commands::App::build(&config).await?;

    match cli.command {
        Commands::Sessions => commands::session::list(&app).await?,
        Commands::History { session } => commands::session::history(&app, &session).await?,
        Commands::Analytics { session } => commands::session::analytics(&app, &session).await?,
        Commands::Send {
            session,
            text,
            timeout,
        } => commands::chat::send(&app, &session, &text, timeout).await?,
        Commands::Describe {
            session,
            image,
            prompt,
            timeout,
        } => commands::chat::describe(&app, &session, &image, prompt.as_deref(), timeout).await?,
        Commands::Clear { session } => commands::session::clear(&app, &session).await?,
        Commands::Export { session, output } => {
            commands::session::export(&app, &session, output.as_deref()).await?
        }
    }

    Ok(())
}
