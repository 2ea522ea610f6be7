use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use startpage::config::Config;
use startpage::pipeline::{run_on_schedule, run_once};

#[derive(Debug, Parser)]
#[command(version, about = "Render recent posts from a few feeds into a start page")]
struct Cli {
    /// TOML config, or a plain newline-delimited list of feed URLs
    #[arg(short, long, env = "STARTPAGE_CONFIG", default_value = "startpage.toml")]
    config: PathBuf,

    /// Run once even if a refresh interval is configured
    #[arg(long)]
    once: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "startpage=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    // Load configuration
    let config = Config::load(&cli.config)
        .with_context(|| format!("failed to load {}", cli.config.display()))?;
    info!("Loaded configuration from {}", cli.config.display());

    if cli.once || config.refresh_interval == 0 {
        let summary = run_once(&config).await.context("start page run failed")?;
        info!(
            "Published {} new posts from {} feeds",
            summary.posts, summary.sources
        );
    } else {
        let interval = Duration::from_secs(config.refresh_interval.saturating_mul(60));
        run_on_schedule(&config, interval).await;
    }

    Ok(())
}
