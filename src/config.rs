//! Configuration file handling.
//!
//! This module handles loading and merging configuration from
//! `.music-index.toml` files.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Name of the configuration file looked up in the working directory.
pub const CONFIG_FILE_NAME: &str = ".music-index.toml";

/// Widest accepted recency window (about a century).
pub const MAX_RECENT_WINDOW_DAYS: i64 = 36_500;

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Backend endpoints.
    #[serde(default)]
    pub endpoint: EndpointConfig,

    /// Listing settings.
    #[serde(default)]
    pub view: ViewConfig,

    /// Analytics thresholds.
    #[serde(default)]
    pub analytics: AnalyticsConfig,

    /// Export and report settings.
    #[serde(default)]
    pub report: ReportConfig,
}

/// Backend endpoint settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EndpointConfig {
    /// URL of the index endpoint.
    #[serde(default = "default_index_url")]
    pub index_url: String,

    /// URL of the error sink.
    #[serde(default = "default_errors_url")]
    pub errors_url: String,

    /// Request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            index_url: default_index_url(),
            errors_url: default_errors_url(),
            timeout_seconds: default_timeout(),
        }
    }
}

fn default_index_url() -> String {
    "http://localhost:8000/api/index".to_string()
}

fn default_errors_url() -> String {
    "http://localhost:8000/api/errors".to_string()
}

fn default_timeout() -> u64 {
    30
}

/// Listing settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ViewConfig {
    /// Characters of content shown per item.
    #[serde(default = "default_preview_chars")]
    pub preview_chars: usize,

    /// Maximum results of a deep search.
    #[serde(default = "default_search_limit")]
    pub search_limit: usize,
}

impl Default for ViewConfig {
    fn default() -> Self {
        Self {
            preview_chars: default_preview_chars(),
            search_limit: default_search_limit(),
        }
    }
}

fn default_preview_chars() -> usize {
    300
}

fn default_search_limit() -> usize {
    20
}

/// Analytics thresholds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyticsConfig {
    #[serde(default = "default_top_n")]
    pub top_collaborators: usize,

    #[serde(default = "default_top_n")]
    pub recent_limit: usize,

    #[serde(default = "default_recent_window_days")]
    pub recent_window_days: i64,

    #[serde(default = "default_min_items")]
    pub min_items: usize,

    #[serde(default = "default_min_section_types")]
    pub min_section_types: usize,
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            top_collaborators: default_top_n(),
            recent_limit: default_top_n(),
            recent_window_days: default_recent_window_days(),
            min_items: default_min_items(),
            min_section_types: default_min_section_types(),
        }
    }
}

fn default_top_n() -> usize {
    5
}

fn default_recent_window_days() -> i64 {
    7
}

fn default_min_items() -> usize {
    10
}

fn default_min_section_types() -> usize {
    3
}

/// Export and report settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportConfig {
    /// Directory exports are written to.
    #[serde(default = "default_output_dir")]
    pub output_dir: String,

    /// Forward runtime errors to the error sink.
    #[serde(default = "default_true")]
    pub report_errors: bool,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            report_errors: true,
        }
    }
}

fn default_output_dir() -> String {
    ".".to_string()
}

fn default_true() -> bool {
    true
}

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Try to load configuration from the default location.
    ///
    /// Returns `Ok(None)` if the file doesn't exist, `Err` if it exists but can't be parsed.
    pub fn load_default() -> Result<Option<Self>> {
        let default_path = Path::new(CONFIG_FILE_NAME);

        if default_path.exists() {
            Ok(Some(Self::load(default_path)?))
        } else {
            Ok(None)
        }
    }

    /// Merge this configuration with CLI arguments.
    ///
    /// Only values given explicitly on the command line (or through their
    /// environment variables) override the file.
    pub fn merge_with_args(&mut self, args: &crate::cli::Args) {
        if let Some(ref url) = args.url {
            self.endpoint.index_url = url.clone();
        }
        if let Some(ref url) = args.errors_url {
            self.endpoint.errors_url = url.clone();
        }
        if let Some(timeout) = args.timeout {
            self.endpoint.timeout_seconds = timeout;
        }

        if let Some(chars) = args.preview_chars {
            self.view.preview_chars = chars;
        }
        if let Some(limit) = args.limit {
            self.view.search_limit = limit;
        }

        if let Some(ref dir) = args.output_dir {
            self.report.output_dir = dir.display().to_string();
        }
        if args.no_error_reporting {
            self.report.report_errors = false;
        }
    }

    /// Validate the merged configuration.
    pub fn validate(&self) -> Result<(), String> {
        for url in [&self.endpoint.index_url, &self.endpoint.errors_url] {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err(format!("URL must start with 'http://' or 'https://': {}", url));
            }
        }

        if self.endpoint.timeout_seconds == 0 {
            return Err("timeout_seconds must be at least 1".to_string());
        }

        if self.view.search_limit == 0 {
            return Err("search_limit must be at least 1".to_string());
        }

        let window = self.analytics.recent_window_days;
        if !(0..=MAX_RECENT_WINDOW_DAYS).contains(&window) {
            return Err(format!(
                "recent_window_days must be between 0 and {}, got {}",
                MAX_RECENT_WINDOW_DAYS, window
            ));
        }

        Ok(())
    }

    /// Generate a default configuration file content.
    pub fn default_toml() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_else(|_| String::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::Args;
    use clap::Parser;
    use std::path::PathBuf;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.endpoint.index_url, "http://localhost:8000/api/index");
        assert_eq!(config.view.preview_chars, 300);
        assert_eq!(config.analytics.recent_window_days, 7);
        assert_eq!(config.analytics.top_collaborators, 5);
        assert!(config.report.report_errors);
    }

    #[test]
    fn test_parse_config() {
        let toml_content = r#"
[endpoint]
index_url = "https://music.example.com/api/index"
timeout_seconds = 5

[analytics]
min_items = 50

[report]
output_dir = "exports"
"#;

        let config: Config = toml::from_str(toml_content).unwrap();
        assert_eq!(config.endpoint.index_url, "https://music.example.com/api/index");
        assert_eq!(config.endpoint.errors_url, "http://localhost:8000/api/errors");
        assert_eq!(config.endpoint.timeout_seconds, 5);
        assert_eq!(config.analytics.min_items, 50);
        assert_eq!(config.analytics.min_section_types, 3);
        assert_eq!(config.report.output_dir, "exports");
    }

    #[test]
    fn test_default_toml_generation() {
        let toml_str = Config::default_toml();
        assert!(toml_str.contains("[endpoint]"));
        assert!(toml_str.contains("[analytics]"));

        let parsed: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.view.search_limit, 20);
    }

    #[test]
    fn test_merge_only_overrides_explicit_args() {
        let mut config = Config::default();
        config.endpoint.timeout_seconds = 99;

        let args = Args::try_parse_from([
            "music-index",
            "--url",
            "http://other:9000/api/index",
            "--output-dir",
            "out",
            "--no-error-reporting",
        ])
        .unwrap();
        config.merge_with_args(&args);

        assert_eq!(config.endpoint.index_url, "http://other:9000/api/index");
        assert_eq!(config.endpoint.timeout_seconds, 99);
        assert_eq!(PathBuf::from(&config.report.output_dir), PathBuf::from("out"));
        assert!(!config.report.report_errors);
    }

    #[test]
    fn test_validate_rejects_bad_file_values() {
        assert!(Config::default().validate().is_ok());

        let config: Config = toml::from_str("[endpoint]\ntimeout_seconds = 0\n").unwrap();
        assert!(config.validate().is_err());

        let config: Config = toml::from_str("[analytics]\nrecent_window_days = -1\n").unwrap();
        assert!(config.validate().is_err());

        let config: Config =
            toml::from_str("[analytics]\nrecent_window_days = 1000000000\n").unwrap();
        assert!(config.validate().is_err());

        let config: Config = toml::from_str("[endpoint]\nindex_url = \"ftp://host/index\"\n").unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_after_merge_accepts_cli_fix() {
        let mut config: Config = toml::from_str("[endpoint]\ntimeout_seconds = 0\n").unwrap();
        let args = Args::try_parse_from(["music-index", "--timeout", "10"]).unwrap();
        config.merge_with_args(&args);
        assert!(config.validate().is_ok());
    }
}
