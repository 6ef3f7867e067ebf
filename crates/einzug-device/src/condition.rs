// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Device-condition classification.
//
// The scanner backend reports errors as literal message strings. Exactly two
// of them are transient; everything else is fatal to the capture session.
// The string matching lives here and nowhere else — the rest of the pipeline
// only ever sees the enum.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Literal message the backend raises when the document feeder runs out.
pub const MSG_FEEDER_EMPTY: &str = "Document feeder out of documents";

/// Literal message the backend raises while the device is still warming up
/// or mid-operation.
pub const MSG_DEVICE_BUSY: &str = "Device busy";

/// A condition reported by the capture device, classified at the device
/// boundary.
///
/// `FeederEmpty` and `Busy` are transient: depending on whether a page has
/// already been captured they either end the current batch or are retried.
/// `Fault` aborts the capture session.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum DeviceCondition {
    #[error("Document feeder out of documents")]
    FeederEmpty,

    #[error("Device busy")]
    Busy,

    #[error("{0}")]
    Fault(String),
}

impl DeviceCondition {
    /// Classify a backend message by exact literal text.
    pub fn from_message(message: &str) -> Self {
        match message {
            MSG_FEEDER_EMPTY => Self::FeederEmpty,
            MSG_DEVICE_BUSY => Self::Busy,
            other => Self::Fault(other.to_string()),
        }
    }

    /// Whether the condition is retried / ends a batch rather than aborting
    /// the session.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::FeederEmpty | Self::Busy)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recognised_literals_classify_as_transient() {
        assert_eq!(
            DeviceCondition::from_message("Document feeder out of documents"),
            DeviceCondition::FeederEmpty
        );
        assert_eq!(
            DeviceCondition::from_message("Device busy"),
            DeviceCondition::Busy
        );
        assert!(DeviceCondition::FeederEmpty.is_transient());
        assert!(DeviceCondition::Busy.is_transient());
    }

    #[test]
    fn anything_else_is_a_fault() {
        let cond = DeviceCondition::from_message("Error during device I/O");
        assert_eq!(cond, DeviceCondition::Fault("Error during device I/O".into()));
        assert!(!cond.is_transient());
    }

    #[test]
    fn matching_is_exact_not_substring() {
        // A message merely containing the literal must not be treated as
        // transient.
        let cond = DeviceCondition::from_message("warning: Device busy (retrying)");
        assert!(!cond.is_transient());
    }

    #[test]
    fn display_round_trips_the_literals() {
        assert_eq!(DeviceCondition::FeederEmpty.to_string(), MSG_FEEDER_EMPTY);
        assert_eq!(DeviceCondition::Busy.to_string(), MSG_DEVICE_BUSY);
        assert_eq!(
            DeviceCondition::Fault("paper jam".into()).to_string(),
            "paper jam"
        );
    }
}
