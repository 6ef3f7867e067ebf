// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Einzug — sheet-feed document capture: scan, merge, OCR.
//
// Entry point. Parses arguments, initialises logging, finds the scanner,
// wires the pipeline (capture session → merge worker → OCR worker → terminal
// observers) and runs the capture loop on the main thread until a fatal
// device condition or Ctrl-C.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tracing::{error, info};

use einzug_core::AppConfig;
use einzug_core::error::{EinzugError, Result};
use einzug_device::sane::{SaneScanner, discover_device};
use einzug_document::{OcrRunner, PageWriter};
use einzug_pipeline::{
    CancelToken, CaptureSession, MergeStage, OcrStage, OutputAllocator, OutputPrinter,
    PdfMergeBackend, StageWorker, TempDirCleaner,
};

#[derive(Parser, Debug)]
#[command(name = "einzug", version, about = "Sheet-feed document capture: scan, merge, OCR")]
struct Cli {
    /// Directory where finished documents are written.
    #[arg(default_value = ".")]
    path: PathBuf,

    /// Skip the OCR stage; finished documents are merged but not searchable.
    #[arg(long = "no-ocd")]
    no_ocd: bool,

    /// Explicit SANE device name; skips scanner-model discovery.
    #[arg(long)]
    device: Option<String>,

    /// OCR language (ISO 639-2 code).
    #[arg(long)]
    language: Option<String>,

    /// Verbosity: -v for info, -vv for debug.
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn init_logging(verbosity: u8) {
    let default_level = match verbosity {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!(error = %err, "fatal");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let mut config = AppConfig::default();
    config.device_name = cli.device;
    config.run_ocr = !cli.no_ocd;
    if let Some(language) = cli.language {
        config.ocr.language = language;
    }

    let output_dir = std::path::absolute(&cli.path)?;
    info!(path = %output_dir.display(), "save path");

    let cancel = CancelToken::new();
    {
        let cancel = cancel.clone();
        ctrlc::set_handler(move || {
            cancel.cancel();
        })
        .map_err(|e| EinzugError::Worker(format!("cannot install signal handler: {e}")))?;
    }

    let device_name = match config.device_name.clone() {
        Some(name) => name,
        None => loop {
            if cancel.is_cancelled() {
                info!("cancelled before a scanner was found");
                return Ok(());
            }
            if let Some(device) = discover_device(&config.device_model)? {
                break device;
            }
            std::thread::sleep(Duration::from_millis(500));
        },
    };

    let scanner = SaneScanner::new(device_name, config.capture.clone());
    let pages = PageWriter::new(config.capture.resolution_dpi, config.capture.rotate_pages);

    let poll_interval = Duration::from_millis(config.poll_interval_ms);
    let mut merge_worker = StageWorker::new(
        "merge",
        config.queue_capacity,
        poll_interval,
        Box::new(MergeStage::new(PdfMergeBackend)),
    );
    let mut ocr_worker = StageWorker::new(
        "ocr",
        config.queue_capacity,
        poll_interval,
        Box::new(OcrStage::new(OcrRunner::new(config.ocr.clone()))),
    );

    let mut session = CaptureSession::new(
        scanner,
        pages,
        cancel.clone(),
        Duration::from_millis(config.capture_delay_ms),
        std::env::temp_dir(),
    );

    // Wiring: the output target is claimed before the batch enters the merge
    // queue, so downstream stages can copy to it.
    session
        .publisher()
        .subscribe(Arc::new(OutputAllocator::new(output_dir)));
    session.publisher().subscribe(merge_worker.subscriber());

    if config.run_ocr {
        merge_worker.publisher().subscribe(ocr_worker.subscriber());
        ocr_worker.publisher().subscribe(Arc::new(OutputPrinter));
        ocr_worker.publisher().subscribe(Arc::new(TempDirCleaner));

        merge_worker.start()?;
        ocr_worker.start()?;
    } else {
        merge_worker.publisher().subscribe(Arc::new(TempDirCleaner));
        merge_worker.start()?;
    }

    // The capture session blocks this thread until a fatal condition or
    // Ctrl-C; the downstream workers are stopped and drained either way.
    let outcome = session.run();

    // Upstream first: the merge worker must finish draining and publish
    // everything into the OCR queue before the OCR worker is told to stop,
    // or a batch in flight between the stages is lost.
    merge_worker.stop();
    merge_worker.join()?;
    ocr_worker.stop();
    ocr_worker.join()?;

    outcome
}
