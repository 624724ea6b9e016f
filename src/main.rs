use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;

use pestel_sim::config::{load_settings, save_settings, settings_path};
use pestel_sim::engine::session::SessionHandle;
use pestel_sim::ui::terminal;
use pestel_sim::OpenAiNarrator;

#[derive(Parser, Debug)]
#[command(name = "pestel_sim", about = "PESTEL market-entry simulator narrated by an LLM")]
struct Cli {
    /// Settings file (defaults to the user config directory)
    #[arg(long)]
    config: Option<PathBuf>,

    /// OpenAI-compatible API base URL
    #[arg(long)]
    base_url: Option<String>,

    /// Model identifier
    #[arg(long)]
    model: Option<String>,

    /// Narrator request timeout in seconds
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
    timeout_secs: Option<u64>,

    /// Check the connection to the narrator endpoint and exit
    #[arg(long)]
    check: bool,

    /// Write the effective settings (without the API key) back to the settings file
    #[arg(long)]
    save_settings: bool,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("pestel_sim=info,warn")),
        )
        .init();

    let cli = Cli::parse();
    let _ = dotenvy::dotenv();

    let path = cli.config.clone().unwrap_or_else(settings_path);
    let mut settings = load_settings(&path);
    settings.apply_env(|key| std::env::var(key).ok());
    if let Some(url) = cli.base_url {
        settings.base_url = url;
    }
    if let Some(model) = cli.model {
        settings.model = model;
    }
    if let Some(secs) = cli.timeout_secs {
        settings.timeout_secs = secs;
    }

    if cli.save_settings {
        save_settings(&path, &settings)?;
        tracing::info!(path = %path.display(), "settings saved");
    }

    tracing::info!(base_url = %settings.base_url, model = %settings.model, "narrator configured");
    let narrator = OpenAiNarrator::new(settings).context("building narrator client")?;

    if cli.check {
        let summary = narrator.test_connection().context("narrator connection check")?;
        println!("{}", summary);
        return Ok(());
    }

    let session = SessionHandle::spawn(narrator);
    let result = terminal::run(&session);
    session.shutdown();
    result
}
