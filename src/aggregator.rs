use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::feed::{FeedSource, Post, PostCollection};
use crate::fetcher::{FetchError, Fetcher};

/// Receives per-source outcomes from the fetch tasks.
pub trait DiagnosticSink: Send + Sync {
    fn fetch_failed(&self, source: &FeedSource, error: &FetchError);

    fn fetch_succeeded(&self, _source: &FeedSource, _post: &Post) {}
}

/// Reports fetch outcomes through `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl DiagnosticSink for TracingSink {
    fn fetch_failed(&self, source: &FeedSource, error: &FetchError) {
        if error.is_no_update() {
            info!(source = source.label(), url = %source.url, "No updates found");
        } else {
            warn!(
                source = source.label(),
                url = %source.url,
                error = %error,
                "Failed to fetch feed"
            );
        }
    }

    fn fetch_succeeded(&self, source: &FeedSource, post: &Post) {
        debug!(source = source.label(), title = %post.title, "Found new post");
    }
}

/// Fans out one fetch task per source and gathers whatever they find.
pub struct Aggregator {
    fetcher: Fetcher,
    sink: Arc<dyn DiagnosticSink>,
}

impl Aggregator {
    pub fn new(fetcher: Fetcher) -> Self {
        Self {
            fetcher,
            sink: Arc::new(TracingSink),
        }
    }

    pub fn with_sink(mut self, sink: Arc<dyn DiagnosticSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Fetches every source concurrently and returns the posts in arrival order.
    ///
    /// A failing source only logs through the sink. Completes once every task
    /// has finished, so the wall-clock cost is roughly the slowest source's
    /// deadline.
    pub async fn collect(&self, sources: Vec<FeedSource>) -> PostCollection {
        if sources.is_empty() {
            return PostCollection::default();
        }

        // At most one post per source, so sends never wait for capacity.
        let (tx, mut rx) = mpsc::channel(sources.len());
        let mut handles = Vec::with_capacity(sources.len());

        info!("Fetching {} feeds", sources.len());
        for source in sources {
            let fetcher = self.fetcher.clone();
            let sink = Arc::clone(&self.sink);
            let tx = tx.clone();

            handles.push(tokio::spawn(async move {
                match fetcher.fetch(&source).await {
                    Ok(post) => {
                        sink.fetch_succeeded(&source, &post);
                        if tx.send(post).await.is_err() {
                            warn!(source = source.label(), "Result channel closed early");
                        }
                    }
                    Err(e) => sink.fetch_failed(&source, &e),
                }
            }));
        }

        for handle in handles {
            if let Err(e) = handle.await {
                warn!(error = %e, "Fetch task did not complete");
            }
        }

        // Only the coordinator's sender is left; dropping it closes the channel.
        drop(tx);

        let mut posts = Vec::new();
        while let Some(post) = rx.recv().await {
            posts.push(post);
        }

        info!("Collected {} new posts", posts.len());
        PostCollection { posts }
    }
}
