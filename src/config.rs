//! Application configuration loaded from a YAML file.
//!
//! Everything tunable lives in one `config.yaml`: the feed list, the
//! output and store locations, translation behavior, and the optional
//! WebDAV remote. Secrets (API keys, the WebDAV password) deliberately
//! stay out of this file and arrive through the CLI or environment.
//!
//! Missing fields fall back to defaults mirroring the arXiv setup this
//! tool was built for, so a minimal config can be a single line.

use serde::Deserialize;
use thiserror::Error;

/// Default chat-completions endpoint when a provider omits `base_url`.
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// Errors raised while loading the configuration file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: String,
        source: serde_yaml::Error,
    },
}

/// Top-level application configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// RSS feed URLs to process, in order.
    pub feeds: Vec<String>,

    /// Directory receiving the per-day Markdown digests.
    pub output_dir: String,

    /// Path of the SQLite store tracking processed papers.
    pub store_path: String,

    /// Whether to translate at all. When false every paper keeps its
    /// original English text.
    pub translate: bool,

    /// Consecutive failures after which the backup provider is tried first.
    pub max_failures: u32,

    /// Upper bound on in-flight translation requests.
    pub max_concurrent: usize,

    /// Pause after a failed provider attempt, in seconds.
    pub cooldown_secs: u64,

    /// Primary translation provider.
    pub primary: ProviderConfig,

    /// Backup translation provider, tried when the primary keeps failing.
    pub backup: ProviderConfig,

    /// Optional WebDAV remote for publishing digests.
    pub remote: RemoteConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            feeds: vec![
                "http://export.arxiv.org/rss/cs.CV".to_string(),
                "http://export.arxiv.org/rss/cs.AI".to_string(),
            ],
            output_dir: "arxiv_summaries".to_string(),
            store_path: "arxiv_summaries/papers.db".to_string(),
            translate: true,
            max_failures: 3,
            max_concurrent: 4,
            cooldown_secs: 2,
            primary: ProviderConfig::default(),
            backup: ProviderConfig::default(),
            remote: RemoteConfig::default(),
        }
    }
}

/// One OpenAI-compatible provider endpoint.
///
/// A provider is considered configured once it has a model *and* the
/// matching API key was supplied at the CLI; otherwise its slot stays
/// empty and the coordinator skips it.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    /// API root; defaults to the public OpenAI endpoint.
    pub base_url: Option<String>,

    /// Model identifier, e.g. `gpt-5-nano`.
    pub model: Option<String>,
}

impl ProviderConfig {
    /// The endpoint to call, with the OpenAI default applied.
    pub fn endpoint(&self) -> &str {
        self.base_url.as_deref().unwrap_or(DEFAULT_BASE_URL)
    }
}

/// WebDAV remote for publishing rendered digests.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RemoteConfig {
    /// Master switch; when false no upload is attempted.
    pub enabled: bool,

    /// Server URL, e.g. `https://dav.example.com/dav/`.
    pub url: Option<String>,

    /// Username for basic auth. Empty means unauthenticated.
    pub username: Option<String>,

    /// Collection (directory) on the server receiving the digests.
    pub dir: Option<String>,
}

impl AppConfig {
    /// Load configuration from a YAML file.
    pub fn load(path: &str) -> Result<AppConfig, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_string(),
            source,
        })?;
        serde_yaml::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_string(),
            source,
        })
    }
}

/// Derive the category label from a feed URL.
///
/// arXiv feed URLs end in the category, e.g.
/// `http://export.arxiv.org/rss/cs.CV` -> `cs.CV`. For URLs without
/// path segments the whole URL is returned so the label is never empty.
pub fn feed_category(url: &str) -> &str {
    url.trim_end_matches('/')
        .rsplit('/')
        .next()
        .filter(|s| !s.is_empty())
        .unwrap_or(url)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_match_arxiv_setup() {
        let config = AppConfig::default();
        assert_eq!(config.feeds.len(), 2);
        assert_eq!(config.output_dir, "arxiv_summaries");
        assert!(config.translate);
        assert_eq!(config.max_failures, 3);
        assert_eq!(config.cooldown_secs, 2);
        assert!(!config.remote.enabled);
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let yaml = r#"
feeds:
  - "http://export.arxiv.org/rss/cs.LG"
primary:
  model: gpt-5-nano
"#;
        let config: AppConfig = serde_yaml::from_str(yaml).unwrap();

        assert_eq!(config.feeds, vec!["http://export.arxiv.org/rss/cs.LG"]);
        assert_eq!(config.primary.model.as_deref(), Some("gpt-5-nano"));
        assert_eq!(config.primary.endpoint(), DEFAULT_BASE_URL);
        // Unspecified fields keep their defaults.
        assert_eq!(config.max_failures, 3);
        assert_eq!(config.store_path, "arxiv_summaries/papers.db");
    }

    #[test]
    fn test_provider_endpoint_override() {
        let yaml = r#"
backup:
  base_url: "https://api.chatanywhere.org/v1"
  model: gpt-4o-mini
"#;
        let config: AppConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.backup.endpoint(), "https://api.chatanywhere.org/v1");
    }

    #[test]
    fn test_load_missing_file_is_an_error() {
        let err = AppConfig::load("/nonexistent/config.yaml").unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }

    #[test]
    fn test_load_rejects_malformed_yaml() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "feeds: [unterminated").unwrap();

        let err = AppConfig::load(file.path().to_str().unwrap()).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn test_feed_category_takes_last_segment() {
        assert_eq!(feed_category("http://export.arxiv.org/rss/cs.CV"), "cs.CV");
        assert_eq!(feed_category("http://export.arxiv.org/rss/cs.AI/"), "cs.AI");
        assert_eq!(feed_category("nonsense"), "nonsense");
    }
}
