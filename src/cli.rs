//! Command-line interface definitions for the arXiv digest tool.
//!
//! This module defines the CLI arguments and options using the `clap` crate.
//! Secrets can be provided via command-line flags or environment variables;
//! everything else lives in the YAML config file.

use clap::Parser;

/// Command-line arguments for the arXiv digest application.
///
/// Only overrides and secrets live here. The feed list, provider models,
/// and remote settings are read from the config file so that runs stay
/// reproducible.
///
/// # Examples
///
/// ```sh
/// # Basic usage with the default config.yaml
/// arxiv_digest
///
/// # Alternate config and output directory
/// arxiv_digest -c ./digest.yaml -o ./out
///
/// # Providing the primary provider key on the command line
/// arxiv_digest --primary-api-key sk-...
/// ```
#[derive(Parser, Debug)]
#[command(version, about)]
pub struct Cli {
    /// Path to the YAML config file
    #[arg(short, long, default_value = "config.yaml")]
    pub config: String,

    /// Override the digest output directory from the config file
    #[arg(short, long)]
    pub output_dir: Option<String>,

    /// API key for the primary translation provider
    #[arg(long, env = "PRIMARY_API_KEY")]
    pub primary_api_key: Option<String>,

    /// API key for the backup translation provider
    #[arg(long, env = "BACKUP_API_KEY")]
    pub backup_api_key: Option<String>,

    /// Password for the WebDAV remote
    #[arg(long, env = "WEBDAV_PASSWORD")]
    pub webdav_password: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_defaults() {
        let cli = Cli::parse_from(["arxiv_digest"]);

        // The key args are env-backed, so their defaults depend on the
        // test environment and stay unasserted here.
        assert_eq!(cli.config, "config.yaml");
        assert_eq!(cli.output_dir, None);
    }

    #[test]
    fn test_cli_overrides() {
        let cli = Cli::parse_from([
            "arxiv_digest",
            "-c",
            "./digest.yaml",
            "-o",
            "/tmp/digests",
            "--primary-api-key",
            "sk-primary",
            "--backup-api-key",
            "sk-backup",
        ]);

        assert_eq!(cli.config, "./digest.yaml");
        assert_eq!(cli.output_dir.as_deref(), Some("/tmp/digests"));
        assert_eq!(cli.primary_api_key.as_deref(), Some("sk-primary"));
        assert_eq!(cli.backup_api_key.as_deref(), Some("sk-backup"));
    }
}
