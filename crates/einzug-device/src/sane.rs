// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// SANE frontend driving the `scanimage` command-line tool.
//
// Each capture attempt is one `scanimage` invocation producing a PNG on
// stdout. Backend errors arrive on stderr as lines of the form
// `scanimage: sane_start: Document feeder out of documents`; the trailing
// message is classified via `DeviceCondition::from_message`.

use std::process::Command;

use tracing::{debug, info, instrument, warn};

use einzug_core::error::{EinzugError, Result};
use einzug_core::types::CaptureSettings;

use crate::condition::DeviceCondition;
use crate::traits::CaptureDevice;

/// Sheet-feed scanner reached through the `scanimage` SANE frontend.
pub struct SaneScanner {
    /// SANE device name, e.g. `epson2:libusb:001:006`.
    device: String,
    settings: CaptureSettings,
}

impl SaneScanner {
    pub fn new(device: impl Into<String>, settings: CaptureSettings) -> Self {
        Self {
            device: device.into(),
            settings,
        }
    }

    /// Build the `scanimage` invocation for one page.
    fn capture_command(&self) -> Command {
        let mut cmd = Command::new("scanimage");
        cmd.arg("-d")
            .arg(&self.device)
            .arg("--format=png")
            .arg("--source")
            .arg(&self.settings.source)
            .arg("--resolution")
            .arg(self.settings.resolution_dpi.to_string())
            .arg("-x")
            .arg(self.settings.page_width_mm.to_string())
            .arg("-y")
            .arg(self.settings.page_height_mm.to_string());
        cmd
    }
}

impl CaptureDevice for SaneScanner {
    #[instrument(skip(self), fields(device = %self.device))]
    fn capture_page(&mut self) -> std::result::Result<Vec<u8>, DeviceCondition> {
        let output = self
            .capture_command()
            .output()
            .map_err(|e| DeviceCondition::Fault(format!("cannot run scanimage: {e}")))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let condition = condition_from_stderr(&stderr);
            debug!(%condition, "capture attempt failed");
            return Err(condition);
        }

        if output.stdout.is_empty() {
            return Err(DeviceCondition::Fault(
                "scanimage produced no image data".into(),
            ));
        }

        debug!(bytes = output.stdout.len(), "page captured");
        Ok(output.stdout)
    }

    fn describe(&self) -> String {
        format!("SANE device {}", self.device)
    }
}

/// Extract the backend message from `scanimage` stderr and classify it.
///
/// The frontend prefixes messages with the program and call site
/// (`scanimage: sane_start: <message>`); only the trailing message takes part
/// in the literal-match contract.
fn condition_from_stderr(stderr: &str) -> DeviceCondition {
    let last_line = stderr
        .lines()
        .rev()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .unwrap_or("");

    if last_line.is_empty() {
        return DeviceCondition::Fault("scanimage failed without diagnostics".into());
    }

    let message = last_line.rsplit(": ").next().unwrap_or(last_line);
    DeviceCondition::from_message(message)
}

// ---------------------------------------------------------------------------
// Discovery
// ---------------------------------------------------------------------------

/// Find the SANE device name of the first attached scanner whose description
/// contains `model`.
///
/// Returns `Ok(None)` when no matching device is currently attached; the
/// caller is expected to poll.
#[instrument]
pub fn discover_device(model: &str) -> Result<Option<String>> {
    let output = Command::new("scanimage")
        .arg("-L")
        .output()
        .map_err(|e| EinzugError::Discovery(format!("cannot run scanimage -L: {e}")))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        warn!(stderr = %stderr.trim(), "device listing failed");
        return Err(EinzugError::Discovery(stderr.trim().to_string()));
    }

    let listing = String::from_utf8_lossy(&output.stdout);
    match parse_device_list(&listing, model) {
        Some(device) => {
            info!(%device, model, "scanner found");
            Ok(Some(device))
        }
        None => Ok(None),
    }
}

/// Parse `scanimage -L` output, returning the device name of the first entry
/// whose description contains `model`.
///
/// Lines look like:
/// ```text
/// device `epson2:libusb:001:006' is a Epson ES-500WII sheetfed scanner
/// ```
fn parse_device_list(listing: &str, model: &str) -> Option<String> {
    for line in listing.lines() {
        let line = line.trim();
        if !line.starts_with("device ") {
            continue;
        }

        let Some(start) = line.find('`') else { continue };
        let Some(len) = line[start + 1..].find('\'') else {
            continue;
        };
        let device = &line[start + 1..start + 1 + len];
        let description = &line[start + 1 + len + 1..];

        if description.contains(model) {
            return Some(device.to_string());
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stderr_feeder_message_is_transient() {
        let stderr = "scanimage: sane_start: Document feeder out of documents\n";
        assert_eq!(condition_from_stderr(stderr), DeviceCondition::FeederEmpty);
    }

    #[test]
    fn stderr_busy_message_is_transient() {
        let stderr = "scanimage: sane_start: Device busy\n";
        assert_eq!(condition_from_stderr(stderr), DeviceCondition::Busy);
    }

    #[test]
    fn stderr_unknown_message_is_fault() {
        let stderr = "scanimage: sane_read: Error during device I/O\n";
        let cond = condition_from_stderr(stderr);
        assert_eq!(cond, DeviceCondition::Fault("Error during device I/O".into()));
    }

    #[test]
    fn stderr_uses_last_nonempty_line() {
        let stderr = "scanimage: rounded value of br-x from 215 to 214.99\n\
                      scanimage: sane_start: Device busy\n\n";
        assert_eq!(condition_from_stderr(stderr), DeviceCondition::Busy);
    }

    #[test]
    fn empty_stderr_is_a_fault() {
        assert!(matches!(
            condition_from_stderr(""),
            DeviceCondition::Fault(_)
        ));
    }

    #[test]
    fn device_list_matches_model() {
        let listing = "device `v4l:/dev/video0' is a Noname webcam virtual device\n\
                       device `epson2:libusb:001:006' is a Epson ES-500WII sheetfed scanner\n";
        assert_eq!(
            parse_device_list(listing, "ES-500WII"),
            Some("epson2:libusb:001:006".into())
        );
    }

    #[test]
    fn device_list_without_match_is_none() {
        let listing = "device `v4l:/dev/video0' is a Noname webcam virtual device\n";
        assert_eq!(parse_device_list(listing, "ES-500WII"), None);
    }

    #[test]
    fn model_match_ignores_device_name_field() {
        // The model string must match the description, not the device id.
        let listing = "device `fake:ES-500WII' is a Some other scanner\n";
        assert_eq!(parse_device_list(listing, "ES-500WII"), None);
    }
}
