use chrono::{DateTime, Utc};
use serde::Deserialize;

/// One entry in the feed registry.
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct FeedSource {
    /// Display name. When absent the feed's own title is used.
    #[serde(default)]
    pub name: Option<String>,
    pub url: String,
}

impl FeedSource {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            name: None,
            url: url.into(),
        }
    }

    pub fn named(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            url: url.into(),
        }
    }

    /// Name used in diagnostics: the display name if set, otherwise the URL.
    pub fn label(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.url)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Post {
    pub source: String,
    pub title: String,
    pub url: String,
    pub published: DateTime<Utc>,
}

/// How the collected posts are ordered before rendering.
#[derive(Debug, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PostOrder {
    /// Whatever order the fetch tasks finished in. Not stable across runs.
    #[default]
    Arrival,
    /// Sorted by source name, then title.
    SourceName,
}

/// The posts found in one run, in arrival order unless reordered.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PostCollection {
    pub posts: Vec<Post>,
}

impl PostCollection {
    pub fn len(&self) -> usize {
        self.posts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.posts.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Post> {
        self.posts.iter()
    }

    pub fn ordered(mut self, order: PostOrder) -> Self {
        if order == PostOrder::SourceName {
            self.posts.sort_by(|a, b| {
                a.source
                    .to_lowercase()
                    .cmp(&b.source.to_lowercase())
                    .then_with(|| a.title.cmp(&b.title))
            });
        }
        self
    }
}

impl FromIterator<Post> for PostCollection {
    fn from_iter<I: IntoIterator<Item = Post>>(iter: I) -> Self {
        Self {
            posts: iter.into_iter().collect(),
        }
    }
}
