//! Startpage - a "new posts" page built from a handful of feeds
//!
//! Each run fetches every configured RSS/Atom feed concurrently, keeps the
//! newest post published inside a sliding time window, and renders the posts
//! it found into a static HTML page that is written to disk or uploaded to an
//! object store.

pub mod aggregator;
pub mod config;
pub mod feed;
pub mod fetcher;
pub mod pipeline;
pub mod publish;
pub mod report;
