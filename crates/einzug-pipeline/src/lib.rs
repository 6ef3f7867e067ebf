// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// einzug-pipeline — Orchestration core of the Einzug capture pipeline.
//
// Provides the typed publish/subscribe primitive connecting stages, the
// queue-driven stage-worker shell with cooperative shutdown, the capture
// session that decides batch boundaries from device conditions, the merge and
// OCR stage transforms, and the terminal observers (output naming, temp
// directory cleanup).

pub mod capture;
pub mod output;
pub mod publisher;
pub mod stages;
pub mod worker;

pub use capture::{CancelToken, CaptureSession, PageSink};
pub use output::{OutputAllocator, OutputPrinter, TempDirCleaner};
pub use publisher::{Observer, Publisher};
pub use stages::{MergeStage, OcrStage, PdfMergeBackend};
pub use worker::{StageTransform, StageWorker, WorkerState};
