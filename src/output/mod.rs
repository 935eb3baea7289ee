//! Output module: records, sinks, diagnostics and crawl reporting
//!
//! This module handles:
//! - The record schema handed to sinks
//! - JSON-lines, SQLite and in-memory sinks
//! - Diagnostic snapshots of failed pages
//! - Crawl counters, the final report and the resume checkpoint

pub mod checkpoint;
pub mod diagnostics;
mod jsonl;
mod memory;
mod record;
mod sqlite_output;
pub mod stats;
mod traits;

pub use checkpoint::{load_checkpoint, remove_checkpoint, save_checkpoint};
pub use diagnostics::{DiagnosticRef, DiagnosticsStore};
pub use jsonl::JsonLinesSink;
pub use memory::MemorySink;
pub use record::{ExtractedFields, Record};
pub use sqlite_output::SqliteSink;
pub use stats::{CrawlReport, CrawlStats, StatsSummary};
pub use traits::{RecordSink, SinkResult};

use crate::config::{OutputConfig, OutputFormat};
use std::path::Path;
use std::sync::Arc;

/// Opens the sink selected by the output configuration
pub fn open_sink(config: &OutputConfig) -> SinkResult<Arc<dyn RecordSink>> {
    let sink: Arc<dyn RecordSink> = match config.format {
        OutputFormat::Jsonl => Arc::new(JsonLinesSink::open(Path::new(&config.records_path))?),
        OutputFormat::Sqlite => Arc::new(SqliteSink::open(Path::new(&config.records_path))?),
    };

    tracing::info!(
        "Writing {:?} records to {}",
        config.format,
        config.records_path
    );
    Ok(sink)
}
