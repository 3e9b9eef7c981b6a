//! Report generation and file export.

pub mod export;
pub mod generator;

pub use export::{export_items, write_export, ExportKind};
pub use generator::{generate_json_report, generate_markdown_report, generate_report};
