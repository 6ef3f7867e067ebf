// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Unified error types for Einzug.

use thiserror::Error;

/// Top-level error type for all Einzug operations.
#[derive(Debug, Error)]
pub enum EinzugError {
    // -- Device errors --
    #[error("scanner discovery failed: {0}")]
    Discovery(String),

    #[error("device fault: {0}")]
    Device(String),

    // -- Document errors --
    #[error("PDF operation failed: {0}")]
    Pdf(String),

    #[error("image processing failed: {0}")]
    Image(String),

    #[error("OCR failed: {0}")]
    Ocr(String),

    // -- Pipeline errors --
    #[error("stage worker error: {0}")]
    Worker(String),

    // -- Storage --
    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, EinzugError>;
