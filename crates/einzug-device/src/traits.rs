// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Trait seam between the capture session and the physical scanner.

use crate::condition::DeviceCondition;

/// A device that captures one page at a time.
///
/// Implementations hold their own connection state and settings; the capture
/// session only ever asks for the next page and classifies the outcome.
pub trait CaptureDevice: Send {
    /// Capture a single page and return it as encoded image bytes.
    ///
    /// A `DeviceCondition` is returned for every unsuccessful attempt —
    /// including the perfectly ordinary "feeder is empty" end of a batch.
    fn capture_page(&mut self) -> Result<Vec<u8>, DeviceCondition>;

    /// Human-readable device identification, for logging.
    fn describe(&self) -> String;
}
