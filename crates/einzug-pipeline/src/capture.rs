// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Capture session — drives the scanner across an unbounded sequence of
// batches.
//
// Batch boundaries are decided purely from device conditions: a transient
// condition before the first successful page of a batch means "not ready yet,
// try again"; the same condition after at least one page means the feeder ran
// dry and the batch is complete. Anything non-transient aborts the session.
// An empty batch is therefore never published.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tracing::{debug, error, info, instrument, warn};

use einzug_core::error::{EinzugError, Result};
use einzug_core::types::ScanBatch;
use einzug_device::traits::CaptureDevice;

use crate::publisher::Publisher;

/// Cooperative cancellation flag, set from the SIGINT handler and sampled
/// once per capture attempt.
#[derive(Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// Writes one captured page image to disk as a page artifact.
///
/// The production implementation is the document crate's PDF page writer;
/// the seam exists so the session can be exercised without image data.
pub trait PageSink: Send {
    fn write_page(&self, image: &[u8], target: &Path) -> Result<()>;
}

impl PageSink for einzug_document::PageWriter {
    fn write_page(&self, image: &[u8], target: &Path) -> Result<()> {
        einzug_document::PageWriter::write_page(self, image, target)
    }
}

/// The capture stage. Runs on the calling thread and blocks it until a fatal
/// device condition or cancellation.
pub struct CaptureSession<D, S>
where
    D: CaptureDevice,
    S: PageSink,
{
    device: D,
    pages: S,
    publisher: Publisher<ScanBatch>,
    cancel: CancelToken,
    /// Pause before each capture attempt.
    capture_delay: Duration,
    /// Parent directory for per-batch working directories.
    work_root: PathBuf,
}

impl<D, S> CaptureSession<D, S>
where
    D: CaptureDevice,
    S: PageSink,
{
    pub fn new(
        device: D,
        pages: S,
        cancel: CancelToken,
        capture_delay: Duration,
        work_root: PathBuf,
    ) -> Self {
        Self {
            device,
            pages,
            publisher: Publisher::new(),
            cancel,
            capture_delay,
            work_root,
        }
    }

    /// The publisher announcing completed batches.
    pub fn publisher(&self) -> &Publisher<ScanBatch> {
        &self.publisher
    }

    /// Run the capture loop until a fatal condition (`Err`) or cancellation
    /// (`Ok`). The session never terminates on its own.
    #[instrument(skip(self), fields(device = %self.device.describe()))]
    pub fn run(&mut self) -> Result<()> {
        loop {
            if self.cancel.is_cancelled() {
                info!("capture cancelled");
                return Ok(());
            }

            let work_dir = self.create_work_dir()?;
            info!(dir = %work_dir.display(), "temp directory for batch");

            let mut batch = ScanBatch::new(work_dir.clone(), true);
            let mut page_index: usize = 0;
            let mut was_running = false;

            loop {
                if self.cancel.is_cancelled() {
                    info!("capture cancelled mid-batch");
                    discard_work_dir(&work_dir);
                    return Ok(());
                }

                std::thread::sleep(self.capture_delay);

                match self.device.capture_page() {
                    Ok(image) => {
                        let path = work_dir.join(format!("{page_index}.pdf"));
                        if let Err(err) = self.pages.write_page(&image, &path) {
                            discard_work_dir(&work_dir);
                            return Err(err);
                        }
                        batch.files.push(path);
                        was_running = true;
                        info!(batch = %batch.id, page = page_index, "saved scan");
                        page_index += 1;
                    }
                    Err(condition) if condition.is_transient() => {
                        if was_running {
                            debug!(%condition, "batch complete");
                            break;
                        }
                        debug!(%condition, "device not ready, retrying");
                    }
                    Err(condition) => {
                        error!(%condition, "fatal device condition");
                        discard_work_dir(&work_dir);
                        return Err(EinzugError::Device(condition.to_string()));
                    }
                }
            }

            // End of batch: was_running implies at least one file.
            info!(batch = %batch.id, pages = batch.page_count(), "batch complete, publishing");
            self.publisher.publish(batch);
        }
    }

    fn create_work_dir(&self) -> Result<PathBuf> {
        let dir = tempfile::Builder::new()
            .prefix("einzug-")
            .tempdir_in(&self.work_root)?;
        // The terminal cleanup observer owns deletion, not this handle.
        Ok(dir.keep())
    }
}

/// Best-effort removal of an in-progress (never published) work directory.
fn discard_work_dir(dir: &Path) {
    if let Err(err) = std::fs::remove_dir_all(dir) {
        warn!(dir = %dir.display(), error = %err, "could not remove work directory");
    }
}
