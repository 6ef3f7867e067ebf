// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Output naming and the terminal observers sitting at the end of the
// pipeline.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::{NaiveDate, Utc};
use tracing::{info, warn};

use einzug_core::types::ScanBatch;

use crate::publisher::Observer;

/// Pick the next free output path under `directory` for `date`:
/// `{YYYY-MM-DD}-{index}.pdf` with the smallest non-negative `index` neither
/// on disk nor in `claimed`.
pub fn allocate_output_path(directory: &Path, date: NaiveDate, claimed: &HashSet<PathBuf>) -> PathBuf {
    let stamp = date.format("%Y-%m-%d");
    let mut index = 0u32;
    loop {
        let candidate = directory.join(format!("{stamp}-{index}.pdf"));
        if !candidate.exists() && !claimed.contains(&candidate) {
            return candidate;
        }
        index += 1;
    }
}

/// Assigns each published batch its final output path.
///
/// Subscribed to the capture publisher ahead of the merge queue, so the
/// target is claimed before any stage wants to copy to it. Claims are
/// remembered: a batch still in flight reserves its index even though its
/// file does not exist yet.
pub struct OutputAllocator {
    directory: PathBuf,
    claimed: Mutex<HashSet<PathBuf>>,
}

impl OutputAllocator {
    pub fn new(directory: PathBuf) -> Self {
        Self {
            directory,
            claimed: Mutex::new(HashSet::new()),
        }
    }
}

impl Observer<ScanBatch> for OutputAllocator {
    fn notify(&self, batch: &mut ScanBatch) {
        // A poisoned claim set is still valid: insertion is the only mutation.
        let mut claimed = match self.claimed.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        let target = allocate_output_path(&self.directory, Utc::now().date_naive(), &claimed);
        claimed.insert(target.clone());
        info!(batch = %batch.id, target = %target.display(), "output target assigned");
        batch.output_target = Some(target);
    }
}

/// Removes a batch's working directory once terminal processing is done.
pub struct TempDirCleaner;

impl Observer<ScanBatch> for TempDirCleaner {
    fn notify(&self, batch: &mut ScanBatch) {
        if !batch.work_directory_is_temporary {
            return;
        }
        info!(batch = %batch.id, dir = %batch.work_directory.display(), "removing temp directory");
        if let Err(err) = std::fs::remove_dir_all(&batch.work_directory) {
            warn!(
                dir = %batch.work_directory.display(),
                error = %err,
                "could not remove temp directory"
            );
        }
    }
}

/// Prints the absolute path of each finished document to stdout.
pub struct OutputPrinter;

impl Observer<ScanBatch> for OutputPrinter {
    fn notify(&self, batch: &mut ScanBatch) {
        if let Some(target) = &batch.output_target {
            let absolute = std::path::absolute(target).unwrap_or_else(|_| target.clone());
            println!("{}", absolute.display());
        }
    }
}
