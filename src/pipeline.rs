use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use thiserror::Error;
use tracing::{error, info};

use crate::aggregator::{Aggregator, DiagnosticSink, TracingSink};
use crate::config::{Config, ConfigError};
use crate::fetcher::{FetchError, FetchOptions, Fetcher};
use crate::publish::PublishError;
use crate::report::{self, ReportError};

/// Errors that abort a whole run. Per-feed failures never show up here.
#[derive(Debug, Error)]
pub enum RunError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error(transparent)]
    Report(#[from] ReportError),
    #[error(transparent)]
    Publish(#[from] PublishError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    pub sources: usize,
    pub posts: usize,
}

pub async fn run_once(config: &Config) -> Result<RunSummary, RunError> {
    run_with_sink(config, Arc::new(TracingSink)).await
}

/// Loads the registry, collects posts, renders the page and publishes it.
///
/// Config problems fail before any feed is fetched. An empty collection is
/// still rendered and published.
pub async fn run_with_sink(
    config: &Config,
    sink: Arc<dyn DiagnosticSink>,
) -> Result<RunSummary, RunError> {
    let sources = config.sources().await?;
    let target = config.publish_target()?;
    let fetcher = Fetcher::new(FetchOptions::from(config))?;

    let summary_sources = sources.len();
    let collection = Aggregator::new(fetcher.clone())
        .with_sink(sink)
        .collect(sources)
        .await
        .ordered(config.order);

    let html = report::render(&collection, Utc::now())?;
    target.publish(fetcher.client(), html).await?;

    Ok(RunSummary {
        sources: summary_sources,
        posts: collection.len(),
    })
}

pub async fn run_on_schedule(config: &Config, interval: Duration) {
    info!("Starting initial run");
    scheduled_run(config).await;

    loop {
        tokio::time::sleep(interval).await;
        info!("Starting scheduled run");
        scheduled_run(config).await;
    }
}

/// One iteration of the schedule. Failures are logged, never returned.
pub async fn scheduled_run(config: &Config) -> Option<RunSummary> {
    match run_once(config).await {
        Ok(summary) => {
            info!(
                sources = summary.sources,
                posts = summary.posts,
                "Start page updated"
            );
            Some(summary)
        }
        Err(e) => {
            error!("Run failed: {}", e);
            None
        }
    }
}
