//! # arXiv Digest
//!
//! A paper-digest pipeline that reads arXiv category RSS feeds, translates
//! each new paper's title and abstract into Chinese through an
//! OpenAI-compatible LLM API, and writes one Markdown digest per category
//! and day.
//!
//! ## Features
//!
//! - Follows any number of arXiv RSS feeds (cs.CV, cs.AI, ...)
//! - Translates with a primary and an optional backup provider, flipping
//!   to the backup after repeated primary failures
//! - Remembers every processed paper in a SQLite store, so reruns only
//!   translate what is actually new
//! - Degrades gracefully: when translation is impossible the original
//!   English text is kept and the digest ships anyway
//! - Optionally mirrors digests to a WebDAV share
//!
//! ## Usage
//!
//! ```sh
//! PRIMARY_API_KEY=sk-... arxiv_digest -c config.yaml
//! ```
//!
//! ## Architecture
//!
//! Feeds are processed one after another; within a feed the expensive
//! translation calls run concurrently up to a configured bound. Each
//! feed runs through the same sequence:
//! 1. **Fetch**: Download and decode the RSS feed
//! 2. **Filter**: Drop papers whose title is already stored
//! 3. **Translate**: Send the rest to the provider chain, in parallel
//! 4. **Persist**: Upsert each paper as its translation completes
//! 5. **Render**: Write the `(category, date)` digest from the store
//! 6. **Publish**: Best-effort upload of the digest to the WebDAV remote

use chrono::Local;
use clap::Parser;
use std::error::Error;
use std::time::Duration;
use tracing::{debug, error, info, instrument, warn};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

mod api;
mod cli;
mod config;
mod feed;
mod models;
mod outputs;
mod parser;
mod pipeline;
mod store;
mod translator;
mod upload;
mod utils;

use api::{ApiError, ChatClient};
use cli::Cli;
use config::{AppConfig, ProviderConfig};
use feed::ArxivSource;
use pipeline::run_feed;
use store::Store;
use translator::Translator;
use upload::WebDavUploader;
use utils::ensure_writable_dir;

#[tokio::main]
#[instrument]
async fn main() -> Result<(), Box<dyn Error>> {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let start_time = std::time::Instant::now();
    info!("arxiv_digest starting up");

    let args = Cli::parse();
    debug!(config = %args.config, "Parsed CLI arguments");

    let mut config = match AppConfig::load(&args.config) {
        Ok(config) => config,
        Err(e) => {
            error!(path = %args.config, error = %e, "Cannot load configuration");
            return Err(e.into());
        }
    };
    if let Some(dir) = &args.output_dir {
        config.output_dir = dir.clone();
    }
    info!(
        feeds = config.feeds.len(),
        output_dir = %config.output_dir,
        store = %config.store_path,
        "Loaded configuration"
    );

    if config.feeds.is_empty() {
        warn!("No feeds configured; nothing to do");
        return Ok(());
    }

    // Early check: ensure the digest output dir is writable
    if let Err(e) = ensure_writable_dir(&config.output_dir).await {
        error!(
            path = %config.output_dir,
            error = %e,
            "Output directory is not writable (fix perms or choose a different path)"
        );
        return Err(e);
    }

    let store = match Store::open(&config.store_path).await {
        Ok(store) => store,
        Err(e) => {
            error!(path = %config.store_path, error = %e, "Cannot open paper store");
            return Err(e.into());
        }
    };

    let translator = build_translator(&config, &args)?;
    let source = ArxivSource::new()?;

    let uploader = if config.remote.enabled {
        build_uploader(&config, args.webdav_password.clone()).await
    } else {
        None
    };

    // ---- Process feeds one after another ----
    let date = Local::now().date_naive().to_string();
    let mut failed_feeds = 0usize;
    for feed_url in &config.feeds {
        match run_feed(
            feed_url,
            &date,
            &source,
            &translator,
            &store,
            &config.output_dir,
            uploader.as_ref(),
        )
        .await
        {
            Ok(report) => {
                info!(
                    category = %report.category,
                    fetched = report.fetched,
                    skipped = report.skipped,
                    translated = report.translated,
                    fallbacks = report.fallbacks,
                    persisted = report.persisted,
                    digest = report.artifact.as_deref().unwrap_or("<none>"),
                    "Feed complete"
                );
                if let Some(reason) = report.aborted {
                    warn!(feed = %feed_url, %reason, "Feed stopped early on store failure");
                    failed_feeds += 1;
                }
            }
            Err(e) => {
                error!(feed = %feed_url, error = %e, "Feed failed; moving on");
                failed_feeds += 1;
            }
        }
    }

    match store.count().await {
        Ok(total) => info!(total_papers = total, "Store summary"),
        Err(e) => warn!(error = %e, "Could not read store summary"),
    }
    store.close().await;

    let elapsed = start_time.elapsed();
    info!(
        ?elapsed,
        secs = elapsed.as_secs(),
        feeds = config.feeds.len(),
        failed_feeds,
        "Execution complete"
    );

    Ok(())
}

/// Assemble the translation coordinator from config and CLI secrets.
fn build_translator(config: &AppConfig, args: &Cli) -> Result<Translator<ChatClient>, Box<dyn Error>> {
    let cooldown = Duration::from_secs(config.cooldown_secs);

    if !config.translate {
        info!("Translation disabled; papers keep their original text");
        return Ok(Translator::new(
            None,
            None,
            config.max_concurrent,
            config.max_failures,
            cooldown,
        ));
    }

    let primary = build_client("primary", &config.primary, args.primary_api_key.as_deref())?;
    let backup = build_client("backup", &config.backup, args.backup_api_key.as_deref())?;

    if primary.is_none() && backup.is_none() {
        warn!("No translation provider configured; papers keep their original text");
    } else {
        info!(
            primary = primary.as_ref().map(ChatClient::model),
            backup = backup.as_ref().map(ChatClient::model),
            max_concurrent = config.max_concurrent,
            "Translation providers ready"
        );
    }

    Ok(Translator::new(
        primary,
        backup,
        config.max_concurrent,
        config.max_failures,
        cooldown,
    ))
}

/// A provider slot counts as configured only with both a model and a key.
fn build_client(
    name: &str,
    cfg: &ProviderConfig,
    api_key: Option<&str>,
) -> Result<Option<ChatClient>, ApiError> {
    match (api_key, cfg.model.as_deref()) {
        (Some(key), Some(model)) => Ok(Some(ChatClient::new(key, cfg.endpoint(), model)?)),
        (None, Some(model)) => {
            warn!(provider = name, model, "Model configured but no API key; slot disabled");
            Ok(None)
        }
        (Some(_), None) => {
            warn!(provider = name, "API key supplied but no model configured; slot disabled");
            Ok(None)
        }
        (None, None) => Ok(None),
    }
}

/// Build the WebDAV uploader, or disable publishing on config problems.
async fn build_uploader(config: &AppConfig, password: Option<String>) -> Option<WebDavUploader> {
    let Some(url) = config.remote.url.as_deref() else {
        warn!("Remote publishing enabled but no URL configured; disabling");
        return None;
    };
    let dir = config.remote.dir.as_deref().unwrap_or("");

    match WebDavUploader::connect(url, dir, config.remote.username.clone(), password).await {
        Ok(uploader) => Some(uploader),
        Err(e) => {
            warn!(error = %e, "Remote store misconfigured; publishing disabled");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_client_requires_key_and_model() {
        let configured = ProviderConfig {
            base_url: None,
            model: Some("gpt-5-nano".to_string()),
        };
        let blank = ProviderConfig::default();

        let client = build_client("primary", &configured, Some("sk-test")).unwrap();
        assert_eq!(
            client.map(|c| c.model().to_string()).as_deref(),
            Some("gpt-5-nano")
        );

        // A missing key, a missing model, or both leaves the slot empty
        // rather than erroring.
        assert!(build_client("primary", &configured, None).unwrap().is_none());
        assert!(build_client("backup", &blank, Some("sk-test")).unwrap().is_none());
        assert!(build_client("backup", &blank, None).unwrap().is_none());
    }
}
