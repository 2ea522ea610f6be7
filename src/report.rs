use askama::Template;
use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::feed::{Post, PostCollection};

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("failed to render template: {0}")]
    Render(#[from] askama::Error),
}

#[derive(Template)]
#[template(path = "startpage.html")]
pub struct StartPageTemplate<'a> {
    pub posts: &'a [Post],
    pub count: usize,
    pub generated_at: DateTime<Utc>,
}

/// Renders the collection as a standalone HTML page, in the collection's order.
pub fn render(
    collection: &PostCollection,
    generated_at: DateTime<Utc>,
) -> Result<String, ReportError> {
    let template = StartPageTemplate {
        posts: &collection.posts,
        count: collection.len(),
        generated_at,
    };
    Ok(template.render()?)
}
