use std::path::{Path, PathBuf};

use reqwest::header::CONTENT_TYPE;
use reqwest::Client;
use thiserror::Error;
use tracing::info;

const CONTENT_TYPE_HTML: &str = "text/html; charset=utf-8";

#[derive(Debug, Error)]
pub enum PublishError {
    #[error("could not write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("upload failed: {0}")]
    Network(#[from] reqwest::Error),

    #[error("upload to {url} rejected with status {status}")]
    HttpStatus { url: String, status: u16 },
}

/// A bucket/key location reachable with a plain HTTP `PUT`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectStoreTarget {
    pub bucket: String,
    pub key: String,
    pub region: String,
    /// Path-style endpoint for S3-compatible stores
    pub endpoint: Option<String>,
}

impl ObjectStoreTarget {
    pub fn object_url(&self) -> String {
        let key = self.key.trim_start_matches('/');
        match &self.endpoint {
            Some(endpoint) => format!("{}/{}/{}", endpoint.trim_end_matches('/'), self.bucket, key),
            None => format!("https://{}.s3.{}.amazonaws.com/{}", self.bucket, self.region, key),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PublishTarget {
    LocalFile { path: PathBuf },
    ObjectStore(ObjectStoreTarget),
}

impl PublishTarget {
    pub async fn publish(&self, client: &Client, body: String) -> Result<(), PublishError> {
        match self {
            PublishTarget::LocalFile { path } => write_file(path, body).await,
            PublishTarget::ObjectStore(target) => put_object(client, target, body).await,
        }
    }
}

async fn write_file(path: &Path, body: String) -> Result<(), PublishError> {
    let io_err = |source| PublishError::Io {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await.map_err(io_err)?;
    }
    tokio::fs::write(path, body).await.map_err(io_err)?;

    info!(path = %path.display(), "Wrote start page");
    Ok(())
}

async fn put_object(
    client: &Client,
    target: &ObjectStoreTarget,
    body: String,
) -> Result<(), PublishError> {
    let url = target.object_url();
    let response = client
        .put(&url)
        .header(CONTENT_TYPE, CONTENT_TYPE_HTML)
        .body(body)
        .send()
        .await?;

    if !response.status().is_success() {
        return Err(PublishError::HttpStatus {
            url,
            status: response.status().as_u16(),
        });
    }

    info!(bucket = %target.bucket, key = %target.key, "Uploaded start page");
    Ok(())
}
