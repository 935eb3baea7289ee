//! Diagnostic snapshots
//!
//! When a page fails (a list page without cards, a detail page without a
//! title, a navigation error) the rendered document is captured so the
//! failure can be inspected after the crawl. Snapshots are written to a
//! directory when one is configured; the references are always kept.

use crate::crawler::Request;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

/// Pointer to a captured snapshot
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiagnosticRef {
    pub url: String,
    pub label: String,
    pub attempt: u32,
    pub reason: String,
    /// Where the snapshot was written, if it was
    pub path: Option<PathBuf>,
    pub size: usize,
}

/// Collects snapshots for the lifetime of one crawl
#[derive(Debug, Default)]
pub struct DiagnosticsStore {
    dir: Option<PathBuf>,
    captured: Mutex<Vec<DiagnosticRef>>,
}

impl DiagnosticsStore {
    /// Store that writes snapshots under `dir`
    pub fn in_dir(dir: &Path) -> Self {
        Self {
            dir: Some(dir.to_path_buf()),
            captured: Mutex::new(Vec::new()),
        }
    }

    /// Store that only records references
    pub fn detached() -> Self {
        Self::default()
    }

    /// Captures one snapshot
    ///
    /// Write failures are logged and leave `path` empty; a diagnostic never
    /// fails the crawl.
    pub fn capture(&self, request: &Request, reason: &str, snapshot: &[u8]) -> DiagnosticRef {
        let path = self.dir.as_ref().and_then(|dir| {
            let path = dir.join(snapshot_file_name(request));
            let written = std::fs::create_dir_all(dir).and_then(|_| std::fs::write(&path, snapshot));
            match written {
                Ok(()) => Some(path),
                Err(e) => {
                    tracing::warn!("Failed to write snapshot for {}: {}", request.url, e);
                    None
                }
            }
        });

        let diagnostic = DiagnosticRef {
            url: request.url.to_string(),
            label: request.label.to_string(),
            attempt: request.attempt,
            reason: reason.to_string(),
            path,
            size: snapshot.len(),
        };

        self.captured
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(diagnostic.clone());

        diagnostic
    }

    /// Snapshot captured for this exact attempt, if any
    pub fn latest_for(&self, request: &Request) -> Option<DiagnosticRef> {
        let url = request.url.as_str();
        let label = request.label.as_str();
        self.captured
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .rev()
            .find(|d| d.url == url && d.label == label && d.attempt == request.attempt)
            .cloned()
    }

    pub fn captured(&self) -> Vec<DiagnosticRef> {
        self.captured
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

/// Characters of the readable URL stem kept in a snapshot file name
const STEM_LEN: usize = 120;

/// File name for a request's snapshot
///
/// The URL with every character outside `[A-Za-z0-9.-]` replaced by `_` and
/// cut to a readable stem, then a short hash of the full URL, label and
/// attempt. URLs sharing a long prefix still get distinct files.
fn snapshot_file_name(request: &Request) -> String {
    let url = request.url.as_str();
    let stem: String = url
        .trim_start_matches("https://")
        .trim_start_matches("http://")
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '.' || c == '-' {
                c
            } else {
                '_'
            }
        })
        .take(STEM_LEN)
        .collect();

    let digest = Sha256::digest(url.as_bytes());
    let hash = hex::encode(&digest[..6]);

    format!("{}-{}-{}-{}.html", stem, hash, request.label, request.attempt)
}
