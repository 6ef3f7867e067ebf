// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// einzug-document — Document processing for the Einzug capture pipeline.
//
// Provides the three document collaborators the pipeline plugs in: page-image
// to single-page PDF conversion, ordered lossless PDF concatenation, and the
// OCR runner producing searchable output.

pub mod ocr;
pub mod pdf;

pub use ocr::OcrRunner;
pub use pdf::merge::merge_files;
pub use pdf::page::PageWriter;
