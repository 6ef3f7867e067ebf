// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Application configuration.

use serde::{Deserialize, Serialize};

use crate::types::{CaptureSettings, OcrOptions};

/// Application settings, assembled from defaults plus CLI overrides.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Scanner model string searched for during discovery.
    pub device_model: String,
    /// Explicit SANE device name; skips discovery when set.
    pub device_name: Option<String>,
    /// Scanner settings applied before the first capture.
    pub capture: CaptureSettings,
    /// Options for the OCR stage.
    pub ocr: OcrOptions,
    /// Whether the OCR stage runs at all (`--no-ocd` disables it).
    pub run_ocr: bool,
    /// Capacity of each stage worker's input queue; producers block when full.
    pub queue_capacity: usize,
    /// How long an idle stage worker sleeps before re-checking its queue.
    pub poll_interval_ms: u64,
    /// Pause before each capture attempt, so a slow feeder is not hammered.
    pub capture_delay_ms: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            device_model: "ES-500WII".into(),
            device_name: None,
            capture: CaptureSettings::default(),
            ocr: OcrOptions::default(),
            run_ocr: true,
            queue_capacity: 16,
            poll_interval_ms: 500,
            capture_delay_ms: 1000,
        }
    }
}
