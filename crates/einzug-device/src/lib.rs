// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// einzug-device — Capture-device collaborator for the Einzug pipeline.
//
// Provides the `CaptureDevice` trait seam, the enumerated device-condition
// type that confines the scanner's literal error messages to this boundary,
// and a SANE frontend implementation driving `scanimage`.

pub mod condition;
pub mod sane;
pub mod traits;

pub use condition::DeviceCondition;
pub use sane::SaneScanner;
pub use traits::CaptureDevice;
