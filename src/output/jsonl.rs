//! JSON-lines file sink

use crate::output::traits::{RecordSink, SinkResult};
use crate::output::Record;
use crate::SinkError;
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::Path;
use std::sync::Mutex;

/// Appends one JSON object per line to a file
///
/// The file is opened in append mode, so records from earlier runs are kept.
pub struct JsonLinesSink {
    writer: Mutex<BufWriter<File>>,
}

impl JsonLinesSink {
    pub fn open(path: &Path) -> SinkResult<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let file = OpenOptions::new().create(true).append(true).open(path)?;

        Ok(Self {
            writer: Mutex::new(BufWriter::new(file)),
        })
    }
}

impl RecordSink for JsonLinesSink {
    fn append(&self, record: &Record) -> SinkResult<()> {
        let line = serde_json::to_string(record)?;
        let mut writer = self
            .writer
            .lock()
            .map_err(|e| SinkError::Unavailable(format!("Failed to lock writer: {}", e)))?;
        writer.write_all(line.as_bytes())?;
        writer.write_all(b"\n")?;
        // One line per record reaches the file even if the process dies.
        writer.flush()?;
        Ok(())
    }

    fn flush(&self) -> SinkResult<()> {
        let mut writer = self
            .writer
            .lock()
            .map_err(|e| SinkError::Unavailable(format!("Failed to lock writer: {}", e)))?;
        writer.flush()?;
        Ok(())
    }
}
