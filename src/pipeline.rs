//! Per-feed processing pipeline.
//!
//! [`run_feed`] takes one feed URL through the full sequence: fetch the
//! RSS items, drop papers already in the store, translate the rest with
//! bounded concurrency, persist each result the moment it lands, then
//! render and publish the digest for the feed's `(category, date)` pair.
//!
//! # Failure containment
//!
//! Only a fetch failure is fatal to a feed, because without items there
//! is nothing to do. A store failure mid-flight stops further writes for
//! this feed (recorded on the report) but the digest is still rendered
//! from whatever rows were committed. The caller decides what a failed
//! feed means for the process; this function never panics the run.
//!
//! Persisting per completion rather than per batch means a crash or
//! abort loses at most the papers still in flight; everything already
//! yielded is durable and excluded from the next run.

use futures::{StreamExt, pin_mut};
use tracing::{debug, error, info, instrument, warn};

use crate::api::Generate;
use crate::config::feed_category;
use crate::feed::{FeedError, FeedSource};
use crate::models::StoredRecord;
use crate::outputs::markdown::{digest_filename, write_digest};
use crate::parser::parse_translation;
use crate::store::Store;
use crate::translator::Translator;
use crate::upload::WebDavUploader;
use crate::utils::truncate_for_log;

/// What happened to one feed.
#[derive(Debug)]
pub struct FeedReport {
    /// Category label derived from the feed URL.
    pub category: String,
    /// Items decoded from the feed.
    pub fetched: usize,
    /// Items skipped because their title was already stored.
    pub skipped: usize,
    /// Responses that parsed into a translated title and abstract.
    pub translated: usize,
    /// Responses that failed to parse; stored with original text.
    pub fallbacks: usize,
    /// Rows written to the store.
    pub persisted: usize,
    /// Path of the digest written for this feed, if rendering succeeded.
    pub artifact: Option<String>,
    /// Why the feed stopped early, if the store failed mid-run.
    pub aborted: Option<String>,
}

impl FeedReport {
    fn new(category: &str) -> Self {
        FeedReport {
            category: category.to_string(),
            fetched: 0,
            skipped: 0,
            translated: 0,
            fallbacks: 0,
            persisted: 0,
            artifact: None,
            aborted: None,
        }
    }
}

/// Process one feed end to end.
///
/// # Errors
///
/// Returns an error only when the feed itself cannot be fetched or
/// decoded. Store and rendering failures are contained: they are logged,
/// recorded on the report, and the digest still reflects every row that
/// was committed before the failure.
#[instrument(level = "info", skip_all, fields(feed = %feed_url))]
pub async fn run_feed<S: FeedSource, G: Generate>(
    feed_url: &str,
    date: &str,
    source: &S,
    translator: &Translator<G>,
    store: &Store,
    output_dir: &str,
    uploader: Option<&WebDavUploader>,
) -> Result<FeedReport, FeedError> {
    let category = feed_category(feed_url);
    let mut report = FeedReport::new(category);

    let items = source.fetch(feed_url).await?;
    report.fetched = items.len();
    info!(count = items.len(), category, "fetched feed");

    // Drop papers already stored. The check keys on the exact title and
    // spans all categories, so cross-posted papers translate only once.
    let mut fresh = Vec::new();
    for item in items {
        match store.exists(&item.title).await {
            Ok(true) => {
                debug!(id = %item.id, "already stored; skipping");
                report.skipped += 1;
            }
            Ok(false) => fresh.push(item),
            Err(e) => {
                error!(error = %e, "store lookup failed; stopping this feed");
                report.aborted = Some(e.to_string());
                break;
            }
        }
    }

    if report.aborted.is_none() && !fresh.is_empty() {
        info!(count = fresh.len(), "translating new papers");
        let results = translator.translate_batch(fresh);
        pin_mut!(results);

        // Persist in completion order; a stop here abandons only the
        // papers still in flight.
        while let Some((item, raw)) = results.next().await {
            let record = match parse_translation(&raw) {
                Some((translated_title, translated_summary)) => {
                    report.translated += 1;
                    StoredRecord::translated(&item, translated_title, translated_summary, date, category)
                }
                None => {
                    warn!(
                        id = %item.id,
                        response = %truncate_for_log(&raw, 120),
                        "unusable translation; storing original text"
                    );
                    report.fallbacks += 1;
                    StoredRecord::untranslated(&item, date, category)
                }
            };

            match store.upsert(&record).await {
                Ok(()) => {
                    report.persisted += 1;
                    debug!(id = %item.id, "persisted paper");
                }
                Err(e) => {
                    error!(error = %e, "store write failed; stopping this feed");
                    report.aborted = Some(e.to_string());
                    break;
                }
            }
        }
    }

    // Render from the store, not from pipeline state: the digest shows
    // exactly the committed rows, aborted run or not.
    match store.records_for(date, category).await {
        Ok(records) => match write_digest(output_dir, category, date, &records).await {
            Ok(path) => {
                if let Some(uploader) = uploader {
                    let remote_name = digest_filename(category, date);
                    match uploader.upload(&path, &remote_name).await {
                        Ok(()) => info!(%remote_name, "published digest"),
                        Err(e) => warn!(error = %e, "digest upload failed"),
                    }
                }
                report.artifact = Some(path);
            }
            Err(e) => error!(error = %e, "failed to write digest"),
        },
        Err(e) => error!(error = %e, "could not load rows for digest"),
    }

    Ok(report)
}
