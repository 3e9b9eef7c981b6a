//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap,
//! including validation and default values.

use crate::models::{Category, FilterState};
use clap::Parser;
use std::path::PathBuf;

/// music-index - browse, search and analyse a music index
///
/// Fetches the precomputed lyrics/document index from its HTTP endpoint,
/// filters it, computes analytics and exports data or reports to disk.
///
/// Examples:
///   music-index --search love --category lyrics
///   music-index --operation analytics --format json
///   music-index --operation generate-report --format markdown -o reports
///   music-index --operation export-filtered --search chorus
///   music-index --operation deep-search --query "verse"
///   music-index --init-config
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    /// Index endpoint URL
    ///
    /// Defaults to the config file value or http://localhost:8000/api/index.
    #[arg(long, value_name = "URL", env = "MUSIC_INDEX_URL")]
    pub url: Option<String>,

    /// Error sink endpoint URL
    #[arg(long, value_name = "URL", env = "MUSIC_INDEX_ERRORS_URL")]
    pub errors_url: Option<String>,

    /// Case-insensitive text matched against titles and content
    #[arg(short, long, default_value = "", value_name = "TEXT")]
    pub search: String,

    /// Restrict results to one category
    #[arg(long, default_value = "all", value_name = "CATEGORY")]
    pub category: Category,

    /// What to do with the fetched index
    #[arg(long, default_value = "list", value_name = "OPERATION")]
    pub operation: Operation,

    /// Id, title or search term for `find` and `deep-search`
    #[arg(long, value_name = "TEXT")]
    pub query: Option<String>,

    /// Maximum number of `deep-search` results
    #[arg(long, value_name = "COUNT")]
    pub limit: Option<usize>,

    /// Output format (text, json, markdown)
    #[arg(long, default_value = "text", value_name = "FORMAT")]
    pub format: OutputFormat,

    /// Directory for exports and reports
    #[arg(short, long, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Characters of content shown per listed item
    #[arg(long, value_name = "CHARS")]
    pub preview_chars: Option<usize>,

    /// Request timeout in seconds
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Path to configuration file
    ///
    /// If not specified, looks for .music-index.toml in the current directory
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Enable verbose logging output
    #[arg(short, long)]
    pub verbose: bool,

    /// Run in quiet mode (minimal output)
    #[arg(short, long)]
    pub quiet: bool,

    /// Do not forward runtime errors to the error sink
    #[arg(long)]
    pub no_error_reporting: bool,

    /// Generate a default .music-index.toml configuration file
    #[arg(long)]
    pub init_config: bool,
}

/// Operation performed on the fetched index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum Operation {
    /// Print the filtered items (default)
    #[default]
    List,
    /// Print the analytics snapshot
    Analytics,
    /// Write every item to a dated JSON file
    ExportAll,
    /// Write the filtered items to a dated JSON file
    ExportFiltered,
    /// Write the analytics report to a dated file
    GenerateReport,
    /// Show one item by id or exact title
    Find,
    /// Search titles, ids and section texts
    DeepSearch,
    /// Show recent errors stored by the error sink
    Errors,
}

impl Operation {
    /// Whether the operation needs the index to be fetched.
    pub fn needs_index(&self) -> bool {
        !matches!(self, Operation::Errors)
    }
}

/// Presentation format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text (default)
    #[default]
    Text,
    /// JSON
    Json,
    /// Markdown
    Markdown,
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// The filter described by `--search` and `--category`.
    pub fn filter_state(&self) -> FilterState {
        FilterState::new(self.search.clone(), self.category)
    }

    /// The trimmed `--query`, if non-empty.
    pub fn query_text(&self) -> Option<&str> {
        self.query
            .as_deref()
            .map(str::trim)
            .filter(|q| !q.is_empty())
    }

    /// Validate the parsed arguments.
    pub fn validate(&self) -> Result<(), String> {
        // Skip validation for --init-config
        if self.init_config {
            return Ok(());
        }

        for url in [&self.url, &self.errors_url].into_iter().flatten() {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err(format!("URL must start with 'http://' or 'https://': {}", url));
            }
        }

        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        if self.timeout == Some(0) {
            return Err("Timeout must be at least 1 second".to_string());
        }

        if self.limit == Some(0) {
            return Err("Limit must be at least 1".to_string());
        }

        if matches!(self.operation, Operation::Find | Operation::DeepSearch)
            && self.query_text().is_none()
        {
            return Err(format!(
                "--query is required for --operation {:?}",
                self.operation
            ));
        }

        Ok(())
    }

    /// Returns the log level based on verbosity settings.
    pub fn log_level(&self) -> tracing::Level {
        if self.quiet {
            tracing::Level::ERROR
        } else if self.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Args {
        let mut argv = vec!["music-index"];
        argv.extend_from_slice(args);
        Args::try_parse_from(argv).unwrap()
    }

    #[test]
    fn test_defaults() {
        let args = parse(&[]);
        assert_eq!(args.operation, Operation::List);
        assert_eq!(args.category, Category::All);
        assert_eq!(args.format, OutputFormat::Text);
        assert_eq!(args.filter_state(), FilterState::default());
        assert!(args.validate().is_ok());
    }

    #[test]
    fn test_operation_and_category_values() {
        let args = parse(&[
            "--operation",
            "export-filtered",
            "--category",
            "documents",
            "-s",
            "Love",
        ]);
        assert_eq!(args.operation, Operation::ExportFiltered);
        assert_eq!(
            args.filter_state(),
            FilterState::new("Love", Category::Documents)
        );
    }

    #[test]
    fn test_validation_invalid_url() {
        let args = parse(&["--url", "localhost:8000/api/index"]);
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_validation_conflicting_options() {
        let args = parse(&["--verbose", "--quiet"]);
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_validation_requires_query() {
        assert!(parse(&["--operation", "find"]).validate().is_err());
        assert!(parse(&["--operation", "deep-search", "--query", "  "])
            .validate()
            .is_err());
        assert!(parse(&["--operation", "deep-search", "--query", "verse"])
            .validate()
            .is_ok());
    }

    #[test]
    fn test_validation_zero_values() {
        assert!(parse(&["--timeout", "0"]).validate().is_err());
        assert!(parse(&["--limit", "0"]).validate().is_err());
    }

    #[test]
    fn test_log_level() {
        let mut args = parse(&[]);
        assert_eq!(args.log_level(), tracing::Level::INFO);

        args.verbose = true;
        assert_eq!(args.log_level(), tracing::Level::DEBUG);

        args.verbose = false;
        args.quiet = true;
        assert_eq!(args.log_level(), tracing::Level::ERROR);
    }
}
