//! arXiv RSS feed fetching and decoding.
//!
//! arXiv publishes one RSS 2.0 feed per category (e.g.
//! `http://export.arxiv.org/rss/cs.CV`). Each `<item>` carries the paper
//! title, the abstract in `<description>`, the abstract-page link, and a
//! GUID of the form `oai:arXiv.org:2508.01234v1`.
//!
//! Decoding is tolerant: items missing a title or description are logged
//! and skipped rather than failing the whole feed, and a handful of HTML
//! entities that XML parsers reject are scrubbed up front.

use quick_xml::de::from_str;
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;
use tracing::{info, instrument, warn};

use crate::models::FeedItem;

/// Errors raised while fetching or decoding one feed.
#[derive(Debug, Error)]
pub enum FeedError {
    /// The HTTP request failed or returned a non-success status.
    #[error("feed request failed: {0}")]
    Http(#[from] reqwest::Error),
    /// The response body was not decodable RSS.
    #[error("feed XML could not be decoded: {0}")]
    Decode(#[from] quick_xml::DeError),
}

/// Trait for fetching the items of one feed URL.
///
/// The production implementation is [`ArxivSource`]; tests substitute
/// an in-memory source so pipeline behavior can be exercised without
/// network access.
pub trait FeedSource {
    /// Fetch and decode all items currently published at `url`.
    async fn fetch(&self, url: &str) -> Result<Vec<FeedItem>, FeedError>;
}

/// HTTP-backed [`FeedSource`] for arXiv RSS endpoints.
pub struct ArxivSource {
    http: reqwest::Client,
}

impl ArxivSource {
    /// Build the source with its own HTTP client.
    pub fn new() -> Result<Self, FeedError> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("arxiv_digest/", env!("CARGO_PKG_VERSION")))
            .connect_timeout(Duration::from_secs(10))
            .timeout(Duration::from_secs(30))
            .build()?;
        Ok(Self { http })
    }
}

impl FeedSource for ArxivSource {
    #[instrument(level = "info", skip(self))]
    async fn fetch(&self, url: &str) -> Result<Vec<FeedItem>, FeedError> {
        let body = self
            .http
            .get(url)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;
        let items = decode_rss(&body)?;
        info!(count = items.len(), "decoded feed");
        Ok(items)
    }
}

#[derive(Debug, Deserialize)]
struct Rss {
    channel: Channel,
}

#[derive(Debug, Deserialize)]
struct Channel {
    #[serde(rename = "item", default)]
    items: Vec<RssItem>,
}

#[derive(Debug, Deserialize)]
struct RssItem {
    title: Option<String>,
    link: Option<String>,
    description: Option<String>,
    guid: Option<Guid>,
}

/// `<guid isPermaLink="false">oai:arXiv.org:2508.01234v1</guid>`
#[derive(Debug, Deserialize)]
struct Guid {
    #[serde(rename = "$text")]
    value: Option<String>,
}

/// Decode an RSS document into feed items.
///
/// Items without a title or description are skipped with a warning;
/// everything else about an item is preserved verbatim apart from
/// whitespace trimming.
pub(crate) fn decode_rss(xml: &str) -> Result<Vec<FeedItem>, FeedError> {
    let cleaned = scrub_html_entities_for_xml(xml);
    let rss: Rss = from_str(&cleaned)?;

    let mut items = Vec::with_capacity(rss.channel.items.len());
    for item in rss.channel.items {
        let RssItem {
            title,
            link,
            description,
            guid,
        } = item;
        let (Some(title), Some(description)) = (title, description) else {
            warn!(
                link = link.as_deref().unwrap_or("<none>"),
                "feed item missing title or description; skipping"
            );
            continue;
        };

        let guid_value = guid.and_then(|g| g.value);
        let id = arxiv_id(guid_value.as_deref(), link.as_deref(), &title);
        items.push(FeedItem {
            id,
            title: title.trim().to_string(),
            summary: description.trim().to_string(),
            link: link.unwrap_or_default(),
        });
    }
    Ok(items)
}

/// Extract the short arXiv identifier from GUID, link, or title.
///
/// `oai:arXiv.org:2508.01234v1` and `https://arxiv.org/abs/2508.01234v1`
/// both yield `2508.01234v1`.
fn arxiv_id(guid: Option<&str>, link: Option<&str>, title: &str) -> String {
    let raw = guid.or(link).unwrap_or(title);
    raw.rsplit(['/', ':']).next().unwrap_or(raw).to_string()
}

/// Replace HTML entities that trip the XML parser.
///
/// arXiv abstracts occasionally carry these through from author-supplied
/// HTML.
fn scrub_html_entities_for_xml(s: &str) -> String {
    s.replace("&nbsp;", " ")
        .replace("&ndash;", "-")
        .replace("&mdash;", "-")
        .replace("&ldquo;", "\"")
        .replace("&rdquo;", "\"")
        .replace("&lsquo;", "'")
        .replace("&rsquo;", "'")
}
