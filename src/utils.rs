//! Small helpers shared across modules: log-safe truncation of raw LLM
//! text and an output-directory write probe run at startup.

use std::error::Error;
use tokio::fs;
use tracing::{info, instrument};

/// Truncate a string for logging purposes.
///
/// Long strings are truncated to roughly `max` bytes with an ellipsis and
/// byte count indicator appended. The cut is backed off to the nearest
/// character boundary so multi-byte text (translated titles, Chinese
/// abstracts) never splits mid-character.
///
/// # Arguments
///
/// * `s` - The string to potentially truncate
/// * `max` - Maximum number of bytes to keep
///
/// # Returns
///
/// The original string if shorter than `max`, otherwise a truncated version
/// with `"…(+N bytes)"` appended.
pub fn truncate_for_log(s: &str, max: usize) -> String {
    if s.len() <= max {
        s.to_string()
    } else {
        let mut cut = max;
        while !s.is_char_boundary(cut) {
            cut -= 1;
        }
        format!("{}…(+{} bytes)", &s[..cut], s.len() - cut)
    }
}

/// Create `path` if needed and prove it is writable.
///
/// Failing here at startup beats failing after a whole feed has been
/// fetched and translated, so `main` calls this before touching the
/// network.
#[instrument(level = "info", skip_all, fields(path = %path))]
pub async fn ensure_writable_dir(path: &str) -> Result<(), Box<dyn Error>> {
    fs::create_dir_all(path).await?;

    let probe = format!("{}/.digest_write_probe", path.trim_end_matches('/'));
    fs::write(&probe, b"probe").await?;
    fs::remove_file(&probe).await?;

    info!("Output directory is writable");
    Ok(())
}
