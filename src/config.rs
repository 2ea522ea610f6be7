use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use crate::feed::{FeedSource, PostOrder};
use crate::publish::{ObjectStoreTarget, PublishTarget};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid TOML in config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("environment variable {0} is not set")]
    MissingEnv(&'static str),

    #[error("fetch_timeout_secs must be greater than zero")]
    InvalidTimeout,
}

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// How far back a post may have been published, in hours
    #[serde(default = "default_window_hours")]
    pub window_hours: u64,
    /// Deadline for fetching and parsing a single feed, in seconds
    #[serde(default = "default_fetch_timeout_secs")]
    pub fetch_timeout_secs: u64,
    /// Refresh interval in minutes, 0 runs once
    #[serde(default)]
    pub refresh_interval: u64,
    #[serde(default)]
    pub order: PostOrder,
    /// Newline-delimited list of feed URLs, relative to the config file
    #[serde(default)]
    pub feeds_file: Option<PathBuf>,
    #[serde(default)]
    pub publish: PublishConfig,
    #[serde(default)]
    pub feeds: Vec<FeedSource>,
    #[serde(skip)]
    base_dir: Option<PathBuf>,
}

fn default_window_hours() -> u64 {
    48
}

fn default_fetch_timeout_secs() -> u64 {
    3
}

fn default_output_path() -> PathBuf {
    PathBuf::from("startpage.html")
}

#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
#[serde(tag = "target", rename_all = "snake_case")]
pub enum PublishConfig {
    LocalFile {
        #[serde(default = "default_output_path")]
        path: PathBuf,
    },
    /// Bucket, key and region come from `S3_BUCKET`, `S3_FILE_KEY` and
    /// `S3_BUCKET_REGION`; `S3_ENDPOINT` optionally overrides the host.
    ObjectStore,
}

impl Default for PublishConfig {
    fn default() -> Self {
        PublishConfig::LocalFile {
            path: default_output_path(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            window_hours: default_window_hours(),
            fetch_timeout_secs: default_fetch_timeout_secs(),
            refresh_interval: 0,
            order: PostOrder::default(),
            feeds_file: None,
            publish: PublishConfig::default(),
            feeds: Vec::new(),
            base_dir: None,
        }
    }
}

impl Config {
    /// Load a TOML config, or a bare feed list when the file is not `.toml`.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = read(path)?;

        let mut config = if path.extension().is_some_and(|ext| ext == "toml") {
            Self::from_str(&content)?
        } else {
            Self {
                feeds: parse_feed_list(&content),
                ..Self::default()
            }
        };
        config.base_dir = path.parent().map(Path::to_path_buf);
        Ok(config)
    }

    /// Parse config from a TOML string (useful for testing)
    pub fn from_str(content: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(content)?;
        if config.fetch_timeout_secs == 0 {
            return Err(ConfigError::InvalidTimeout);
        }
        Ok(config)
    }

    /// 48 hour window, 3 second deadline, published to the object store.
    pub fn deployed() -> Self {
        Self {
            publish: PublishConfig::ObjectStore,
            ..Self::default()
        }
    }

    /// 27 year window, 5 second deadline, written to a local file.
    pub fn ad_hoc() -> Self {
        Self {
            window_hours: 27 * 365 * 24,
            fetch_timeout_secs: 5,
            ..Self::default()
        }
    }

    pub fn window(&self) -> Duration {
        Duration::from_secs(self.window_hours.saturating_mul(3600))
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }

    /// The ordered feed registry: inline `[[feeds]]` first, then `feeds_file`.
    ///
    /// `feeds_file` is re-read on every call, so edits apply to the next run.
    pub async fn sources(&self) -> Result<Vec<FeedSource>, ConfigError> {
        let mut sources = self.feeds.clone();

        if let Some(file) = &self.feeds_file {
            let path = match &self.base_dir {
                Some(dir) if file.is_relative() => dir.join(file),
                _ => file.clone(),
            };
            sources.extend(load_feed_list(&path).await?);
        }

        Ok(sources)
    }

    pub fn publish_target(&self) -> Result<PublishTarget, ConfigError> {
        self.publish_target_with(|key| std::env::var(key).ok())
    }

    /// Like [`Config::publish_target`] with an explicit variable lookup.
    pub fn publish_target_with<F>(&self, lookup: F) -> Result<PublishTarget, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        match &self.publish {
            PublishConfig::LocalFile { path } => {
                let path = match &self.base_dir {
                    Some(dir) if path.is_relative() => dir.join(path),
                    _ => path.clone(),
                };
                Ok(PublishTarget::LocalFile { path })
            }
            PublishConfig::ObjectStore => {
                let require = |key: &'static str| {
                    lookup(key)
                        .filter(|v| !v.is_empty())
                        .ok_or(ConfigError::MissingEnv(key))
                };
                Ok(PublishTarget::ObjectStore(ObjectStoreTarget {
                    bucket: require("S3_BUCKET")?,
                    key: require("S3_FILE_KEY")?,
                    region: require("S3_BUCKET_REGION")?,
                    endpoint: lookup("S3_ENDPOINT").filter(|v| !v.is_empty()),
                }))
            }
        }
    }
}

/// One URL per line. Blank lines and `#` comments are ignored.
pub fn parse_feed_list(content: &str) -> Vec<FeedSource> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(FeedSource::new)
        .collect()
}

pub async fn load_feed_list<P: AsRef<Path>>(path: P) -> Result<Vec<FeedSource>, ConfigError> {
    let path = path.as_ref();
    let content = tokio::fs::read_to_string(path)
        .await
        .map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
    Ok(parse_feed_list(&content))
}

fn read(path: &Path) -> Result<String, ConfigError> {
    std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;
    use tempfile::{NamedTempFile, TempDir};

    #[test]
    fn test_defaults() {
        assert_eq!(default_window_hours(), 48);
        assert_eq!(default_fetch_timeout_secs(), 3);

        let config = Config::from_str("").unwrap();
        assert_eq!(config.window(), Duration::from_secs(48 * 3600));
        assert_eq!(config.fetch_timeout(), Duration::from_secs(3));
        assert_eq!(config.refresh_interval, 0);
        assert_eq!(config.order, PostOrder::Arrival);
        assert_eq!(config.publish, PublishConfig::default());
        assert!(config.feeds.is_empty());
    }

    #[test]
    fn test_load_valid_config() {
        let content = r#"
            window_hours = 12
            fetch_timeout_secs = 5
            refresh_interval = 30
            order = "source_name"

            [publish]
            target = "local_file"
            path = "out/index.html"

            [[feeds]]
            name = "Test Feed"
            url = "https://example.com/feed.xml"

            [[feeds]]
            url = "https://example.org/rss"
        "#;

        let mut temp_file = NamedTempFile::with_suffix(".toml").unwrap();
        temp_file.write_all(content.as_bytes()).unwrap();

        let config = Config::load(temp_file.path()).unwrap();

        assert_eq!(config.window_hours, 12);
        assert_eq!(config.fetch_timeout_secs, 5);
        assert_eq!(config.refresh_interval, 30);
        assert_eq!(config.order, PostOrder::SourceName);
        assert_eq!(config.feeds.len(), 2);
        assert_eq!(config.feeds[0].name.as_deref(), Some("Test Feed"));
        assert_eq!(config.feeds[0].url, "https://example.com/feed.xml");
        assert_eq!(config.feeds[1].name, None);
    }

    #[tokio::test]
    async fn test_load_plain_feed_list() {
        let mut temp_file = NamedTempFile::with_suffix(".txt").unwrap();
        temp_file
            .write_all(b"https://a.example.com/feed\n\n# comment\n  https://b.example.com/rss  \n")
            .unwrap();

        let config = Config::load(temp_file.path()).unwrap();

        assert_eq!(config.window_hours, 48);
        assert_eq!(
            config.sources().await.unwrap(),
            vec![
                FeedSource::new("https://a.example.com/feed"),
                FeedSource::new("https://b.example.com/rss"),
            ]
        );
    }

    #[test]
    fn test_load_config_missing_file() {
        let result = Config::load("/nonexistent/path/config.toml");
        assert!(matches!(result, Err(ConfigError::Io { .. })));
    }

    #[test]
    fn test_load_config_invalid_toml() {
        let result = Config::from_str("this is not valid toml {{{");
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_load_config_missing_url() {
        let content = r#"
            [[feeds]]
            name = "Test Feed"
        "#;

        assert!(Config::from_str(content).is_err());
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let result = Config::from_str("fetch_timeout_secs = 0");
        assert!(matches!(result, Err(ConfigError::InvalidTimeout)));
    }

    #[tokio::test]
    async fn test_feeds_file_resolved_relative_to_config() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join("feeds.txt"),
            "https://listed.example.com/feed\n",
        )
        .unwrap();
        let config_path = dir.path().join("startpage.toml");
        std::fs::write(
            &config_path,
            r#"
                feeds_file = "feeds.txt"

                [[feeds]]
                name = "Inline"
                url = "https://inline.example.com/feed"
            "#,
        )
        .unwrap();

        let sources = Config::load(&config_path)
            .unwrap()
            .sources()
            .await
            .unwrap();

        assert_eq!(sources.len(), 2);
        assert_eq!(sources[0].name.as_deref(), Some("Inline"));
        assert_eq!(sources[1].url, "https://listed.example.com/feed");
    }

    #[tokio::test]
    async fn test_missing_feeds_file_is_an_error() {
        let config = Config::from_str(r#"feeds_file = "/nonexistent/feeds.txt""#).unwrap();
        assert!(matches!(
            config.sources().await,
            Err(ConfigError::Io { .. })
        ));
    }

    #[test]
    fn test_parse_feed_list_skips_blank_and_comment_lines() {
        let sources = parse_feed_list("\n# header\nhttps://a.example.com\r\n\n");
        assert_eq!(sources, vec![FeedSource::new("https://a.example.com")]);
    }

    #[test]
    fn test_presets() {
        let deployed = Config::deployed();
        assert_eq!(deployed.window(), Duration::from_secs(48 * 3600));
        assert_eq!(deployed.fetch_timeout(), Duration::from_secs(3));
        assert_eq!(deployed.publish, PublishConfig::ObjectStore);

        let ad_hoc = Config::ad_hoc();
        assert_eq!(ad_hoc.window_hours, 27 * 365 * 24);
        assert_eq!(ad_hoc.fetch_timeout(), Duration::from_secs(5));
        assert!(matches!(ad_hoc.publish, PublishConfig::LocalFile { .. }));
    }

    mod publish_target_tests {
        use super::*;

        fn env(vars: &[(&str, &str)]) -> HashMap<String, String> {
            vars.iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect()
        }

        #[test]
        fn test_object_store_from_env() {
            let vars = env(&[
                ("S3_BUCKET", "pages"),
                ("S3_FILE_KEY", "start/index.html"),
                ("S3_BUCKET_REGION", "eu-west-1"),
            ]);

            let target = Config::deployed()
                .publish_target_with(|k| vars.get(k).cloned())
                .unwrap();

            assert_eq!(
                target,
                PublishTarget::ObjectStore(ObjectStoreTarget {
                    bucket: "pages".to_string(),
                    key: "start/index.html".to_string(),
                    region: "eu-west-1".to_string(),
                    endpoint: None,
                })
            );
        }

        #[test]
        fn test_object_store_missing_env() {
            let vars = env(&[("S3_BUCKET", "pages"), ("S3_BUCKET_REGION", "eu-west-1")]);

            let result = Config::deployed().publish_target_with(|k| vars.get(k).cloned());
            assert!(matches!(result, Err(ConfigError::MissingEnv("S3_FILE_KEY"))));
        }

        #[test]
        fn test_object_store_empty_env_counts_as_missing() {
            let vars = env(&[
                ("S3_BUCKET", ""),
                ("S3_FILE_KEY", "index.html"),
                ("S3_BUCKET_REGION", "eu-west-1"),
            ]);

            let result = Config::deployed().publish_target_with(|k| vars.get(k).cloned());
            assert!(matches!(result, Err(ConfigError::MissingEnv("S3_BUCKET"))));
        }

        #[test]
        fn test_local_file_relative_to_config() {
            let dir = TempDir::new().unwrap();
            let config_path = dir.path().join("startpage.toml");
            std::fs::write(
                &config_path,
                "[publish]\ntarget = \"local_file\"\npath = \"page.html\"\n",
            )
            .unwrap();

            let target = Config::load(&config_path)
                .unwrap()
                .publish_target_with(|_| None)
                .unwrap();

            assert_eq!(
                target,
                PublishTarget::LocalFile {
                    path: dir.path().join("page.html")
                }
            );
        }
    }
}
