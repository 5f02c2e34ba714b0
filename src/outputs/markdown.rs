//! Markdown digest rendering.
//!
//! One digest file per `(category, date)` pair, e.g. `cs.CV_2025-08-25.md`.
//! The digest opens with a paper count line, then one block per paper:
//! original title as a heading, translated title, translated abstract,
//! and the abstract-page link, separated by horizontal rules.
//!
//! Rendering always works from the store, never from in-memory pipeline
//! state, so a digest reflects exactly the committed rows even when a run
//! was cut short.

use std::fmt::Write as _;
use std::io;
use tokio::fs;
use tracing::{info, instrument};

use crate::models::StoredRecord;

/// File name of the digest for one category and date.
pub fn digest_filename(category: &str, date: &str) -> String {
    format!("{category}_{date}.md")
}

/// Render the digest document for a set of stored papers.
pub fn render_digest(records: &[StoredRecord]) -> String {
    let mut md = String::new();
    writeln!(md, "共 {} 篇论文\n", records.len()).unwrap();

    for record in records {
        writeln!(md, "# {}\n", record.title).unwrap();
        writeln!(md, "**标题:** {}\n", record.translated_title).unwrap();
        writeln!(md, "**摘要:**\n\n{}\n", record.translated_summary).unwrap();
        writeln!(md, "**链接:** {}\n", record.link).unwrap();
        writeln!(md, "---\n").unwrap();
    }
    md
}

/// Render and write the digest for one `(category, date)` pair.
///
/// # Returns
///
/// The path of the written file.
#[instrument(level = "info", skip_all, fields(%category, %date))]
pub async fn write_digest(
    output_dir: &str,
    category: &str,
    date: &str,
    records: &[StoredRecord],
) -> Result<String, io::Error> {
    let md = render_digest(records);

    fs::create_dir_all(output_dir).await?;
    let path = format!(
        "{}/{}",
        output_dir.trim_end_matches('/'),
        digest_filename(category, date)
    );
    fs::write(&path, md).await?;

    info!(path = %path, papers = records.len(), "Wrote digest");
    Ok(path)
}
