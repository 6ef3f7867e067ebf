// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Stage transforms plugged into the worker shell: merge a batch's pages into
// one PDF, and run OCR over the merged result.

use std::path::{Path, PathBuf};

use tracing::{info, warn};

use einzug_core::error::Result;
use einzug_core::types::ScanBatch;

use crate::worker::StageTransform;

/// Merged batch PDF, written inside the batch's work directory.
pub const MERGE_ARTIFACT_NAME: &str = "no_ocr.pdf";

/// Searchable batch PDF, written inside the batch's work directory.
pub const OCR_ARTIFACT_NAME: &str = "ocr.pdf";

/// Merge collaborator: concatenates page PDFs in order into `target`.
pub trait MergeBackend: Send {
    fn merge(&self, sources: &[PathBuf], target: &Path) -> Result<()>;
}

/// OCR collaborator: adds a recognised-text layer to `source`, writing the
/// result to `target`.
pub trait OcrBackend: Send {
    fn recognize(&self, source: &Path, target: &Path) -> Result<()>;
}

/// The production merge backend (lopdf-based concatenation).
pub struct PdfMergeBackend;

impl MergeBackend for PdfMergeBackend {
    fn merge(&self, sources: &[PathBuf], target: &Path) -> Result<()> {
        einzug_document::merge_files(sources, target)
    }
}

impl OcrBackend for einzug_document::OcrRunner {
    fn recognize(&self, source: &Path, target: &Path) -> Result<()> {
        self.run(source, target)
    }
}

/// Concatenates a batch's page files into the merge artifact and, when the
/// output target is already assigned, copies it there.
pub struct MergeStage<M: MergeBackend> {
    backend: M,
}

impl<M: MergeBackend> MergeStage<M> {
    pub fn new(backend: M) -> Self {
        Self { backend }
    }
}

impl<M: MergeBackend> StageTransform for MergeStage<M> {
    fn process(&mut self, batch: &mut ScanBatch) -> Result<bool> {
        info!(batch = %batch.id, dir = %batch.work_directory.display(), "merging batch");

        let target = batch.work_directory.join(MERGE_ARTIFACT_NAME);
        self.backend.merge(&batch.files, &target)?;
        batch.merge_artifact = Some(target.clone());

        if let Some(output) = &batch.output_target {
            std::fs::copy(&target, output)?;
            info!(batch = %batch.id, output = %output.display(), "merged document copied to target");
        }

        Ok(true)
    }
}

/// Runs OCR over the merge artifact, producing the searchable document.
///
/// A batch that arrives without a merge artifact is withheld from downstream
/// rather than OCR'd blind — the merge stage always sets the artifact before
/// publishing, so this branch only fires for a misbehaving producer.
pub struct OcrStage<O: OcrBackend> {
    backend: O,
}

impl<O: OcrBackend> OcrStage<O> {
    pub fn new(backend: O) -> Self {
        Self { backend }
    }
}

impl<O: OcrBackend> StageTransform for OcrStage<O> {
    fn process(&mut self, batch: &mut ScanBatch) -> Result<bool> {
        let Some(merge_artifact) = batch.merge_artifact.clone() else {
            warn!(batch = %batch.id, "batch has no merge artifact, withholding from OCR");
            return Ok(false);
        };

        info!(batch = %batch.id, source = %merge_artifact.display(), "running OCR");

        let target = batch.work_directory.join(OCR_ARTIFACT_NAME);
        self.backend.recognize(&merge_artifact, &target)?;

        if let Some(output) = &batch.output_target {
            std::fs::copy(&target, output)?;
            info!(batch = %batch.id, output = %output.display(), "searchable document copied to target");
        }

        Ok(true)
    }
}
