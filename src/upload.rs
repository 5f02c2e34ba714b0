//! WebDAV publishing for rendered digests.
//!
//! Digests are mirrored to a WebDAV collection so they can be read from
//! a phone or synced folder. Publishing is strictly best-effort: every
//! failure here is logged by the caller and never affects the store or
//! the local files.
//!
//! The protocol surface is deliberately tiny: one `PROPFIND` as a
//! connectivity probe at startup, one `MKCOL` to make sure the target
//! collection exists, and one `PUT` per digest.

use reqwest::{Method, StatusCode};
use std::time::Duration;
use thiserror::Error;
use tokio::fs;
use tracing::{info, instrument, warn};
use url::Url;

/// Errors raised while talking to the WebDAV remote.
#[derive(Debug, Error)]
pub enum UploadError {
    /// The configured URL (or a name joined onto it) was not a valid URL.
    #[error("invalid remote URL: {0}")]
    Url(#[from] url::ParseError),
    /// The request never completed.
    #[error("remote request failed: {0}")]
    Http(#[from] reqwest::Error),
    /// The local digest file could not be read.
    #[error("could not read digest file: {0}")]
    Io(#[from] std::io::Error),
    /// The remote answered with a non-success status.
    #[error("remote returned {0}")]
    Status(StatusCode),
}

fn propfind() -> Method {
    Method::from_bytes(b"PROPFIND").expect("PROPFIND method")
}

fn mkcol() -> Method {
    Method::from_bytes(b"MKCOL").expect("MKCOL method")
}

/// Resolve the collection URL for `dir` under the server `base`.
///
/// The base gets a trailing slash if missing so joins extend the path
/// instead of replacing its last segment. An empty `dir` publishes
/// directly into the base collection.
fn collection_url(base: &str, dir: &str) -> Result<Url, url::ParseError> {
    let mut base = Url::parse(base)?;
    if !base.path().ends_with('/') {
        base.set_path(&format!("{}/", base.path()));
    }
    if dir.is_empty() {
        Ok(base)
    } else {
        base.join(&format!("{}/", urlencoding::encode(dir)))
    }
}

/// Client for one WebDAV collection.
pub struct WebDavUploader {
    http: reqwest::Client,
    collection: Url,
    username: Option<String>,
    password: Option<String>,
}

impl WebDavUploader {
    /// Build the uploader and probe the remote once.
    ///
    /// A failed probe is logged but does not fail construction; the run
    /// proceeds and individual uploads report their own errors. Only a
    /// malformed URL or an unbuildable HTTP client is fatal here.
    pub async fn connect(
        url: &str,
        dir: &str,
        username: Option<String>,
        password: Option<String>,
    ) -> Result<WebDavUploader, UploadError> {
        let collection = collection_url(url, dir)?;
        let http = reqwest::Client::builder()
            .user_agent(concat!("arxiv_digest/", env!("CARGO_PKG_VERSION")))
            .connect_timeout(Duration::from_secs(10))
            .timeout(Duration::from_secs(60))
            .build()?;

        let uploader = WebDavUploader {
            http,
            collection,
            username,
            password,
        };

        match uploader.probe().await {
            Ok(status) => info!(collection = %uploader.collection, %status, "remote store probe answered"),
            Err(e) => {
                warn!(collection = %uploader.collection, error = %e, "remote store unreachable; uploads may fail")
            }
        }

        Ok(uploader)
    }

    fn with_auth(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.username {
            Some(user) => req.basic_auth(user, self.password.as_deref()),
            None => req,
        }
    }

    /// `PROPFIND Depth: 0` against the collection.
    ///
    /// Any HTTP answer proves the server is there; a 404 just means the
    /// collection has not been created yet.
    async fn probe(&self) -> Result<StatusCode, reqwest::Error> {
        let resp = self
            .with_auth(self.http.request(propfind(), self.collection.clone()))
            .header("Depth", "0")
            .send()
            .await?;
        Ok(resp.status())
    }

    /// Create the collection if it does not exist yet.
    ///
    /// Servers answer `MKCOL` on an existing collection with 405, which
    /// counts as success here.
    async fn ensure_collection(&self) -> Result<(), UploadError> {
        let resp = self
            .with_auth(self.http.request(mkcol(), self.collection.clone()))
            .send()
            .await?;
        let status = resp.status();
        if status.is_success() || status == StatusCode::METHOD_NOT_ALLOWED {
            Ok(())
        } else {
            Err(UploadError::Status(status))
        }
    }

    /// Upload one local file into the collection under `remote_name`.
    #[instrument(level = "info", skip_all, fields(%remote_name))]
    pub async fn upload(&self, local_path: &str, remote_name: &str) -> Result<(), UploadError> {
        let bytes = fs::read(local_path).await?;
        self.ensure_collection().await?;

        let target = self.collection.join(urlencoding::encode(remote_name).as_ref())?;
        let resp = self
            .with_auth(self.http.put(target.clone()).body(bytes))
            .send()
            .await?;

        let status = resp.status();
        if status.is_success() {
            info!(url = %target, "Uploaded digest");
            Ok(())
        } else {
            Err(UploadError::Status(status))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collection_url_adds_trailing_slash() {
        let url = collection_url("https://dav.example.com/remote.php/dav", "arxiv_summaries")
            .unwrap();
        assert_eq!(
            url.as_str(),
            "https://dav.example.com/remote.php/dav/arxiv_summaries/"
        );
    }

    #[test]
    fn test_collection_url_empty_dir_uses_base() {
        let url = collection_url("https://dav.example.com/files/", "").unwrap();
        assert_eq!(url.as_str(), "https://dav.example.com/files/");
    }

    #[test]
    fn test_collection_url_encodes_dir() {
        let url = collection_url("https://dav.example.com/files/", "论文 digest").unwrap();
        assert!(url.path().ends_with("/%E8%AE%BA%E6%96%87%20digest/"));
    }

    #[test]
    fn test_collection_url_rejects_garbage() {
        assert!(collection_url("not a url", "dir").is_err());
    }

    #[test]
    fn test_digest_names_survive_joining() {
        let collection = collection_url("https://dav.example.com/files", "arxiv_summaries").unwrap();
        let target = collection
            .join(urlencoding::encode("cs.CV_2025-08-25.md").as_ref())
            .unwrap();
        assert_eq!(
            target.as_str(),
            "https://dav.example.com/files/arxiv_summaries/cs.CV_2025-08-25.md"
        );
    }
}
