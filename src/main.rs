//! music-index - command-line client for a music lyrics/document index
//!
//! Fetches the precomputed index from its HTTP endpoint, filters it,
//! computes analytics and performs bulk exports. Runtime errors are
//! collected and forwarded to the backend's error sink.
//!
//! Exit codes:
//!   0 - Success (including best-effort export failures)
//!   1 - Runtime error (configuration, fetch failure, item not found)

mod analysis;
mod cli;
mod config;
mod ingest;
mod models;
mod monitor;
mod report;
mod source;

use analysis::AnalyticsOptions;
use anyhow::{Context, Result};
use chrono::{NaiveDate, Utc};
use cli::{Args, Operation, OutputFormat};
use config::Config;
use indicatif::{ProgressBar, ProgressStyle};
use ingest::IndexLoad;
use models::{AnalyticsSnapshot, Item};
use monitor::{ErrorCollector, ErrorReporter};
use report::ExportKind;
use source::IndexClient;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse_args();

    // Validate arguments
    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    // Handle --init-config early (no logging needed)
    if args.init_config {
        return handle_init_config();
    }

    // Initialize logging
    init_logging(&args);

    info!("music-index v{}", env!("CARGO_PKG_VERSION"));
    debug!("Arguments: {:?}", args);

    let collector = ErrorCollector::new();
    collector.install_panic_hook();

    let mut config = match load_config(&args) {
        Ok(config) => config,
        Err(e) => {
            error!("Configuration error: {:#}", e);
            eprintln!("\n❌ Error: {:#}", e);
            std::process::exit(1);
        }
    };
    config.merge_with_args(&args);
    if let Err(e) = config.validate() {
        error!("Configuration error: {}", e);
        eprintln!("\n❌ Error: {}", e);
        std::process::exit(1);
    }

    // Panics inside the command surface as a JoinError; the hook has
    // already recorded them.
    let command = tokio::spawn(run_command(args, config.clone(), collector.clone()));
    let exit_code = match command.await {
        Ok(Ok(code)) => code,
        Ok(Err(e)) => {
            error!("Command failed: {:#}", e);
            eprintln!("\n❌ Error: {:#}", e);
            collector.record_error(format!("{:#}", e));
            1
        }
        Err(e) => {
            error!("Command aborted: {}", e);
            eprintln!("\n❌ Error: command aborted unexpectedly");
            1
        }
    };

    if config.report.report_errors {
        flush_errors(&config, &collector).await;
    }

    std::process::exit(exit_code);
}

/// Handle --init-config: generate a default .music-index.toml.
fn handle_init_config() -> Result<()> {
    let path = Path::new(config::CONFIG_FILE_NAME);

    if path.exists() {
        eprintln!(
            "⚠️  {} already exists. Remove it first or edit it manually.",
            config::CONFIG_FILE_NAME
        );
        std::process::exit(1);
    }

    let content = Config::default_toml();
    std::fs::write(path, &content)
        .with_context(|| format!("Failed to write {}", config::CONFIG_FILE_NAME))?;

    println!(
        "✅ Created {} with default settings.",
        config::CONFIG_FILE_NAME
    );
    println!("   Edit it to customize endpoints, analytics thresholds and export settings.");
    Ok(())
}

/// Initialize logging based on verbosity settings.
fn init_logging(args: &Args) {
    let level = args.log_level();

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .with_writer(std::io::stderr)
        .compact()
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
    }
}

/// Load configuration from file or use defaults.
fn load_config(args: &Args) -> Result<Config> {
    // Try explicit config path
    if let Some(ref config_path) = args.config {
        info!("Loading config from: {}", config_path.display());
        return Config::load(config_path);
    }

    // Try default location
    match Config::load_default() {
        Ok(Some(config)) => {
            info!("Loaded default config from {}", config::CONFIG_FILE_NAME);
            Ok(config)
        }
        Ok(None) => {
            debug!("No config file found, using defaults");
            Ok(Config::default())
        }
        Err(e) => {
            warn!("Failed to load config: {}", e);
            Ok(Config::default())
        }
    }
}

/// Deliver buffered runtime errors to the error sink.
async fn flush_errors(config: &Config, collector: &ErrorCollector) {
    if collector.is_empty() {
        return;
    }
    debug!("Flushing {} runtime errors", collector.len());

    match ErrorReporter::new(&config.endpoint.errors_url, config.endpoint.timeout_seconds) {
        Ok(reporter) => {
            reporter.flush(collector).await;
        }
        Err(e) => warn!("Error reporting unavailable: {:#}", e),
    }
}

/// Run the selected operation. Returns the exit code.
async fn run_command(args: Args, config: Config, collector: ErrorCollector) -> Result<i32> {
    if !args.operation.needs_index() {
        return show_recorded_errors(&args, &config).await;
    }

    let load = fetch_index(&args, &config).await?;
    if let Some(ref built) = load.generated_at {
        info!("Index built at {}", built);
    }
    record_ingest_problems(&load, &collector);

    let items = &load.items;
    let now = Utc::now();
    let today = now.date_naive();
    let options = AnalyticsOptions::from(&config.analytics);
    let output_dir = Path::new(&config.report.output_dir);

    match args.operation {
        Operation::List => {
            let filtered = analysis::filter_items(items, &args.filter_state());
            print_items(&args, &config, &listing_heading(&args), &filtered)?;
        }
        Operation::Analytics => {
            let snapshot = analysis::compute_analytics_at(items, &options, now);
            print_analytics(&args, &config, &snapshot)?;
        }
        Operation::ExportAll => {
            let all: Vec<&Item> = items.iter().collect();
            let result = report::export_items(output_dir, ExportKind::FullExport, today, &all);
            finish_export(result, all.len(), &collector);
        }
        Operation::ExportFiltered => {
            let filtered = analysis::filter_items(items, &args.filter_state());
            let result =
                report::export_items(output_dir, ExportKind::FilteredExport, today, &filtered);
            finish_export(result, filtered.len(), &collector);
        }
        Operation::GenerateReport => {
            let snapshot = analysis::compute_analytics_at(items, &options, now);
            write_reports(args.format, &config, &snapshot, today, &collector);
        }
        Operation::Find => {
            let key = args.query_text().unwrap_or_default();
            match analysis::find_item(items, key) {
                Some(item) => print_item_detail(&args, item)?,
                None => {
                    eprintln!("❌ Item not found: {}", key);
                    return Ok(1);
                }
            }
        }
        Operation::DeepSearch => {
            let query = args.query_text().unwrap_or_default();
            let results = analysis::search_items(items, query, config.view.search_limit);
            print_items(&args, &config, &listing_heading(&args), &results)?;
        }
        Operation::Errors => unreachable!("handled before fetching the index"),
    }

    Ok(0)
}

/// Fetch the index, showing a spinner unless quiet.
async fn fetch_index(args: &Args, config: &Config) -> Result<IndexLoad> {
    let client = IndexClient::new(&config.endpoint.index_url, config.endpoint.timeout_seconds)?;

    let spinner = if args.quiet {
        None
    } else {
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.green} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        pb.set_message(format!("Fetching index from {}", client.index_url()));
        pb.enable_steady_tick(Duration::from_millis(100));
        Some(pb)
    };

    let result = client.fetch_index().await;

    if let Some(pb) = spinner {
        pb.finish_and_clear();
    }

    result.with_context(|| format!("Failed to load index from {}", client.index_url()))
}

/// Log and record entries that broke the item contract. Returns whether
/// anything was recorded.
fn record_ingest_problems(load: &IndexLoad, collector: &ErrorCollector) -> bool {
    let summary = &load.summary;
    if summary.is_clean() {
        return false;
    }

    let message = format!(
        "Index contained {} malformed, {} unreadable and {} duplicate entries out of {}",
        summary.malformed, summary.skipped, summary.duplicate_ids, summary.received
    );
    warn!("{}", message);
    collector.record_error(message);
    true
}

/// Report the outcome of a best-effort export.
fn finish_export(
    result: Result<PathBuf>,
    count: usize,
    collector: &ErrorCollector,
) -> Option<PathBuf> {
    match result {
        Ok(path) => {
            println!("✅ Exported {} items to {}", count, path.display());
            Some(path)
        }
        Err(e) => {
            warn!("Export failed: {:#}", e);
            eprintln!("⚠️  Export failed: {:#}", e);
            collector.record_error(format!("Export failed: {:#}", e));
            None
        }
    }
}

/// Write the JSON report, plus Markdown when requested. Failures are not
/// fatal; the written paths are returned.
fn write_reports(
    format: OutputFormat,
    config: &Config,
    snapshot: &AnalyticsSnapshot,
    today: NaiveDate,
    collector: &ErrorCollector,
) -> Vec<PathBuf> {
    let output_dir = Path::new(&config.report.output_dir);
    let report = report::generate_report(snapshot, Some(config.endpoint.index_url.as_str()));

    let json = report::generate_json_report(&report).and_then(|content| {
        report::write_export(output_dir, ExportKind::AnalyticsReport, today, &content)
    });
    let mut written = vec![json];

    if format == OutputFormat::Markdown {
        let content = report::generate_markdown_report(&report);
        written.push(report::write_export(
            output_dir,
            ExportKind::AnalyticsReportMarkdown,
            today,
            &content,
        ));
    }

    let mut saved = Vec::new();
    for result in written {
        match result {
            Ok(path) => {
                println!("✅ Report saved to: {}", path.display());
                saved.push(path);
            }
            Err(e) => {
                warn!("Report generation failed: {:#}", e);
                eprintln!("⚠️  Report generation failed: {:#}", e);
                collector.record_error(format!("Report generation failed: {:#}", e));
            }
        }
    }

    saved
}

/// Describe what selected the listed items.
fn listing_heading(args: &Args) -> String {
    match args.operation {
        Operation::DeepSearch => format!("query: {:?}", args.query_text().unwrap_or_default()),
        _ => {
            let filter = args.filter_state();
            format!("search: {:?}, category: {}", filter.search_text, filter.category)
        }
    }
}

/// Print a list of items in the requested format.
fn print_items(args: &Args, config: &Config, heading: &str, items: &[&Item]) -> Result<()> {
    match args.format {
        OutputFormat::Json => println!("{}", report::export::items_to_json(items)?),
        OutputFormat::Markdown => {
            for item in items {
                println!("## {}\n", item.display_title());
                println!(
                    "*Source: {} | Id: {}*\n",
                    item.source.as_deref().unwrap_or(analysis::UNKNOWN_SOURCE),
                    item.id
                );
                println!("{}\n", item.preview(config.view.preview_chars));
            }
        }
        OutputFormat::Text => {
            println!("\n📚 {} items ({})\n", items.len(), heading);
            for item in items {
                println!(
                    "🎵 {} [{}]",
                    item.display_title(),
                    item.source.as_deref().unwrap_or(analysis::UNKNOWN_SOURCE)
                );
                println!("   {}", item.preview(config.view.preview_chars).replace('\n', "\n   "));
                println!();
            }
        }
    }

    Ok(())
}

/// Print a single item with all its metadata.
fn print_item_detail(args: &Args, item: &Item) -> Result<()> {
    if args.format == OutputFormat::Json {
        println!("{}", serde_json::to_string_pretty(item)?);
        return Ok(());
    }

    println!("\n🎵 {}", item.display_title());
    println!("   Id: {}", item.id);
    println!(
        "   Source: {}",
        item.source.as_deref().unwrap_or(analysis::UNKNOWN_SOURCE)
    );
    if let Some(ref created) = item.created_at {
        println!("   Created: {}", created);
    }
    if let Some(collaborators) = item.collaborators.as_ref().filter(|c| !c.is_empty()) {
        println!("   Collaborators: {}", collaborators.join(", "));
    }
    if let Some(ref sections) = item.sections {
        for (name, text) in sections.iter() {
            println!("\n   [{}]\n   {}", name, text.replace('\n', "\n   "));
        }
    } else if let Some(ref content) = item.content {
        println!("\n   {}", content.replace('\n', "\n   "));
    }

    Ok(())
}

/// Print the analytics snapshot in the requested format.
fn print_analytics(args: &Args, config: &Config, snapshot: &AnalyticsSnapshot) -> Result<()> {
    match args.format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(snapshot)?);
            return Ok(());
        }
        OutputFormat::Markdown => {
            let report = report::generate_report(snapshot, Some(config.endpoint.index_url.as_str()));
            println!("{}", report::generate_markdown_report(&report));
            return Ok(());
        }
        OutputFormat::Text => {}
    }

    println!("\n📊 Analytics Summary:");
    println!("   Total items: {}", snapshot.total_items);
    println!(
        "   Average content length: {} characters",
        snapshot.avg_content_length
    );
    let types: Vec<String> = snapshot
        .content_type_breakdown
        .iter()
        .map(|(source, count)| format!("{}: {}", source, count))
        .collect();
    println!("   Content types: {}", types.join(" | "));
    println!("   Sections detected: {} types", snapshot.section_stats.len());

    if !snapshot.top_collaborators.is_empty() {
        println!("\n👥 Top Collaborators:");
        for (rank, (name, count)) in snapshot.top_collaborators.iter().enumerate() {
            println!("   #{} {} ({} items)", rank + 1, name, count);
        }
    }

    if !snapshot.recent_additions.is_empty() {
        println!("\n🆕 Recent Additions:");
        for item in &snapshot.recent_additions {
            let date = item
                .created()
                .map(|d| d.format("%Y-%m-%d").to_string())
                .unwrap_or_default();
            println!("   {} ({})", item.display_title(), date);
        }
    }

    if !snapshot.recommendations.is_empty() {
        println!("\n💡 Recommendations:");
        for rec in &snapshot.recommendations {
            println!("   - {}", rec);
        }
    }

    Ok(())
}

/// Show the most recent batches stored by the error sink.
async fn show_recorded_errors(args: &Args, config: &Config) -> Result<i32> {
    let reporter = ErrorReporter::new(&config.endpoint.errors_url, config.endpoint.timeout_seconds)?;
    let batches = reporter.fetch_recent().await?;

    let recent = &batches[batches.len().saturating_sub(5)..];

    if args.format == OutputFormat::Json {
        println!("{}", serde_json::to_string_pretty(recent)?);
        return Ok(0);
    }

    if recent.is_empty() {
        println!("✅ No runtime errors recorded.");
        return Ok(0);
    }

    println!("\n🐛 Runtime Errors ({} batches)", batches.len());
    for batch in recent {
        let when = batch
            .js_errors
            .first()
            .and_then(|e| e.timestamp.as_deref())
            .unwrap_or("unknown time");
        println!("\n   {} ({} errors)", when, batch.js_errors.len());
        for err in batch.js_errors.iter().take(3) {
            println!("     - {}", err.summary());
        }
    }

    Ok(0)
}
