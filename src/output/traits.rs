//! Output sink trait
//!
//! A sink is an append-only destination for completed records. The crawl
//! core never reads records back and keeps nothing after the handoff.

use crate::output::Record;
use crate::SinkError;

/// Result type for sink operations
pub type SinkResult<T> = Result<T, SinkError>;

/// Append-only record destination
///
/// Implementations must be thread-safe: every worker appends through the
/// same sink.
pub trait RecordSink: Send + Sync {
    /// Appends one record
    fn append(&self, record: &Record) -> SinkResult<()>;

    /// Pushes buffered records to durable storage
    fn flush(&self) -> SinkResult<()> {
        Ok(())
    }
}
