// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// OCR runner — produce a searchable PDF by shelling out to `ocrmypdf`.
//
// ocrmypdf embeds a recognised-text layer while leaving the pixel content of
// the pages untouched, which is exactly the collaborator contract the
// pipeline expects.

use std::path::Path;
use std::process::Command;

use tracing::{info, instrument};

use einzug_core::error::{EinzugError, Result};
use einzug_core::types::OcrOptions;

/// Runs `ocrmypdf` over a merged batch PDF.
pub struct OcrRunner {
    options: OcrOptions,
}

impl OcrRunner {
    pub fn new(options: OcrOptions) -> Self {
        Self { options }
    }

    /// Build the `ocrmypdf` invocation for one document.
    fn command(&self, source: &Path, target: &Path) -> Command {
        let mut cmd = Command::new("ocrmypdf");
        cmd.arg("--language").arg(&self.options.language);
        if self.options.deskew {
            cmd.arg("--deskew");
        }
        if self.options.clean {
            cmd.arg("--clean");
        }
        cmd.arg("--quiet").arg(source).arg(target);
        cmd
    }

    /// Recognise text in `source` and write the searchable result to `target`.
    #[instrument(skip(self), fields(source = %source.display(), target = %target.display()))]
    pub fn run(&self, source: &Path, target: &Path) -> Result<()> {
        let output = self
            .command(source, target)
            .output()
            .map_err(|e| EinzugError::Ocr(format!("cannot run ocrmypdf: {e}")))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(EinzugError::Ocr(format!(
                "ocrmypdf exited with {}: {}",
                output.status,
                stderr.trim()
            )));
        }

        info!("OCR complete");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::OsString;

    fn args_of(options: OcrOptions) -> Vec<OsString> {
        let runner = OcrRunner::new(options);
        let cmd = runner.command(Path::new("in.pdf"), Path::new("out.pdf"));
        cmd.get_args().map(|a| a.to_os_string()).collect()
    }

    #[test]
    fn default_options_enable_deskew_and_clean() {
        let args = args_of(OcrOptions::default());
        assert!(args.contains(&OsString::from("--deskew")));
        assert!(args.contains(&OsString::from("--clean")));
        assert!(args.contains(&OsString::from("deu")));
    }

    #[test]
    fn disabled_options_are_omitted() {
        let args = args_of(OcrOptions {
            language: "eng".into(),
            deskew: false,
            clean: false,
        });
        assert!(!args.contains(&OsString::from("--deskew")));
        assert!(!args.contains(&OsString::from("--clean")));
        assert!(args.contains(&OsString::from("eng")));
    }

    #[test]
    fn source_and_target_come_last() {
        let args = args_of(OcrOptions::default());
        let n = args.len();
        assert_eq!(args[n - 2], OsString::from("in.pdf"));
        assert_eq!(args[n - 1], OsString::from("out.pdf"));
    }
}
