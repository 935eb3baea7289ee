//! Crawl checkpoint
//!
//! A cancelled crawl saves its unfinished requests so the next run can pick
//! up where it stopped. The file is a JSON array of `{url, label, attempt}`
//! and is removed once a crawl drains its frontier.

use crate::crawler::{Label, Request};
use crate::{HarvestError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Serialize, Deserialize)]
struct CheckpointEntry {
    url: String,
    label: Label,
    #[serde(default)]
    attempt: u32,
}

/// Writes the unfinished requests to `path`
pub fn save_checkpoint(path: &Path, requests: &[Request]) -> Result<()> {
    let entries: Vec<CheckpointEntry> = requests
        .iter()
        .map(|r| CheckpointEntry {
            url: r.url.to_string(),
            label: r.label,
            attempt: r.attempt,
        })
        .collect();

    let json = serde_json::to_string_pretty(&entries)
        .map_err(|e| HarvestError::Checkpoint(format!("Failed to encode checkpoint: {}", e)))?;

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    std::fs::write(path, json)?;

    tracing::info!(
        "Saved checkpoint with {} requests to {}",
        entries.len(),
        path.display()
    );
    Ok(())
}

/// Reads a checkpoint; `Ok(None)` when no checkpoint exists
pub fn load_checkpoint(path: &Path) -> Result<Option<Vec<Request>>> {
    if !path.exists() {
        return Ok(None);
    }

    let content = std::fs::read_to_string(path)?;
    let entries: Vec<CheckpointEntry> = serde_json::from_str(&content).map_err(|e| {
        HarvestError::Checkpoint(format!("Failed to parse {}: {}", path.display(), e))
    })?;

    let mut requests = Vec::with_capacity(entries.len());
    for entry in entries {
        let mut request = Request::new(&entry.url, entry.label)?;
        request.attempt = entry.attempt;
        requests.push(request);
    }

    Ok(Some(requests))
}

/// Deletes the checkpoint if present
pub fn remove_checkpoint(path: &Path) -> Result<()> {
    match std::fs::remove_file(path) {
        Ok(()) => {
            tracing::debug!("Removed checkpoint {}", path.display());
            Ok(())
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}
