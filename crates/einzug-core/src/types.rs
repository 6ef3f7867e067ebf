// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Core domain types for the Einzug capture pipeline.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use uuid::Uuid;

/// Unique identifier for a capture batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BatchId(pub Uuid);

impl BatchId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for BatchId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for BatchId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One document-in-progress: the unit of work passed between pipeline stages.
///
/// Created by the capture session when a new batch begins, mutated by exactly
/// one stage at a time, and handed downstream via publish. The stage that
/// publishes a batch must not touch it afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanBatch {
    pub id: BatchId,
    /// Directory owning all intermediate artifacts for this batch.
    pub work_directory: PathBuf,
    /// Whether the directory must be deleted once terminal processing is done.
    pub work_directory_is_temporary: bool,
    /// Final destination, assigned by the output-name allocator observer.
    pub output_target: Option<PathBuf>,
    /// Page artifacts in capture order. Append-only until the batch ends;
    /// non-empty for every batch that is ever published.
    pub files: Vec<PathBuf>,
    /// Merged document, set exactly once by the merge stage.
    pub merge_artifact: Option<PathBuf>,
    pub created_at: DateTime<Utc>,
}

impl ScanBatch {
    pub fn new(work_directory: PathBuf, work_directory_is_temporary: bool) -> Self {
        Self {
            id: BatchId::new(),
            work_directory,
            work_directory_is_temporary,
            output_target: None,
            files: Vec::new(),
            merge_artifact: None,
            created_at: Utc::now(),
        }
    }

    /// Number of captured pages so far.
    pub fn page_count(&self) -> usize {
        self.files.len()
    }
}

/// Scanner settings applied before the first capture.
///
/// Defaults match a duplex sheet-feed scan of A4 paper at 600 dpi.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaptureSettings {
    /// SANE source option, e.g. "ADF Duplex" or "Flatbed".
    pub source: String,
    pub resolution_dpi: u32,
    /// Scan area (bottom-right corner) in millimetres.
    pub page_width_mm: u32,
    pub page_height_mm: u32,
    /// Rotate each page 180° before saving (duplex feeders emit pages
    /// upside down).
    pub rotate_pages: bool,
}

impl Default for CaptureSettings {
    fn default() -> Self {
        Self {
            source: "ADF Duplex".into(),
            resolution_dpi: 600,
            page_width_mm: 210,
            page_height_mm: 297,
            rotate_pages: true,
        }
    }
}

/// Options passed to the OCR collaborator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OcrOptions {
    /// Recognition language (ISO 639-2 code, e.g. "deu", "eng").
    pub language: String,
    /// Straighten skewed pages before recognition.
    pub deskew: bool,
    /// Clean scan artefacts before recognition.
    pub clean: bool,
}

impl Default for OcrOptions {
    fn default() -> Self {
        Self {
            language: "deu".into(),
            deskew: true,
            clean: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_batch_is_empty_and_unmerged() {
        let batch = ScanBatch::new(PathBuf::from("/tmp/einzug-x"), true);
        assert_eq!(batch.page_count(), 0);
        assert!(batch.files.is_empty());
        assert!(batch.merge_artifact.is_none());
        assert!(batch.output_target.is_none());
        assert!(batch.work_directory_is_temporary);
    }

    #[test]
    fn batch_ids_are_unique() {
        assert_ne!(BatchId::new(), BatchId::new());
    }
}
