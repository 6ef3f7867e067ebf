// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Reusable stage-worker shell.
//
// A stage worker owns a bounded input queue and a publisher, and runs its
// transform on a dedicated thread: drain the queue to empty, publish each
// result in order, sleep briefly when idle. Shutdown is cooperative — the
// stop flag is sampled once per outer iteration and the loop only exits once
// the queue is empty, so no enqueued item is ever abandoned and no item is
// interrupted mid-transform.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::thread::JoinHandle;
use std::time::Duration;

use crossbeam::channel::{Receiver, Sender, TryRecvError, bounded};
use tracing::{debug, error, info, warn};

use einzug_core::error::{EinzugError, Result};
use einzug_core::types::ScanBatch;

use crate::publisher::{Observer, Publisher};

/// Lifecycle states of a stage worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum WorkerState {
    /// Constructed, loop not yet running.
    Created = 0,
    /// Loop running on its own thread.
    Running = 1,
    /// Stop requested; the current drain finishes first.
    Stopping = 2,
    /// Loop exited.
    Stopped = 3,
}

impl WorkerState {
    fn from_u8(raw: u8) -> Self {
        match raw {
            0 => Self::Created,
            1 => Self::Running,
            2 => Self::Stopping,
            _ => Self::Stopped,
        }
    }
}

/// The per-item transformation plugged into a [`StageWorker`].
///
/// Returning `Ok(true)` publishes the (mutated) batch to the worker's
/// observers; `Ok(false)` withholds it. Errors are logged and the item is
/// dropped — the worker itself keeps running.
pub trait StageTransform: Send {
    fn process(&mut self, batch: &mut ScanBatch) -> Result<bool>;
}

/// Queue-driven pipeline stage running on its own thread.
pub struct StageWorker {
    name: &'static str,
    tx: Sender<ScanBatch>,
    rx: Option<Receiver<ScanBatch>>,
    transform: Option<Box<dyn StageTransform>>,
    publisher: Arc<Publisher<ScanBatch>>,
    stop_flag: Arc<AtomicBool>,
    state: Arc<AtomicU8>,
    poll_interval: Duration,
    handle: Option<JoinHandle<()>>,
}

impl StageWorker {
    /// Create a worker with a bounded input queue of `capacity`; producers
    /// block while the queue is full.
    pub fn new(
        name: &'static str,
        capacity: usize,
        poll_interval: Duration,
        transform: Box<dyn StageTransform>,
    ) -> Self {
        let (tx, rx) = bounded(capacity);
        Self {
            name,
            tx,
            rx: Some(rx),
            transform: Some(transform),
            publisher: Arc::new(Publisher::new()),
            stop_flag: Arc::new(AtomicBool::new(false)),
            state: Arc::new(AtomicU8::new(WorkerState::Created as u8)),
            poll_interval,
            handle: None,
        }
    }

    /// The publisher announcing this stage's completed batches.
    pub fn publisher(&self) -> &Publisher<ScanBatch> {
        &self.publisher
    }

    /// An observer that feeds this worker's input queue; subscribe it to the
    /// upstream stage's publisher.
    pub fn subscriber(&self) -> Arc<dyn Observer<ScanBatch>> {
        Arc::new(EnqueueObserver {
            stage: self.name,
            tx: self.tx.clone(),
        })
    }

    /// Thread-safe append to the input queue; blocks while the queue is full.
    pub fn enqueue(&self, batch: ScanBatch) -> Result<()> {
        self.tx
            .send(batch)
            .map_err(|_| EinzugError::Worker(format!("{} queue closed", self.name)))
    }

    pub fn state(&self) -> WorkerState {
        WorkerState::from_u8(self.state.load(Ordering::Acquire))
    }

    /// Begin the loop on a dedicated thread. The caller does not block.
    pub fn start(&mut self) -> Result<()> {
        if self.state() != WorkerState::Created {
            return Err(EinzugError::Worker(format!(
                "{} worker already started",
                self.name
            )));
        }

        let rx = self
            .rx
            .take()
            .ok_or_else(|| EinzugError::Worker(format!("{} worker has no receiver", self.name)))?;
        let transform = self
            .transform
            .take()
            .ok_or_else(|| EinzugError::Worker(format!("{} worker has no transform", self.name)))?;

        let publisher = Arc::clone(&self.publisher);
        let stop_flag = Arc::clone(&self.stop_flag);
        let state = Arc::clone(&self.state);
        let poll_interval = self.poll_interval;
        let name = self.name;

        self.state
            .store(WorkerState::Running as u8, Ordering::Release);

        let handle = std::thread::Builder::new()
            .name(format!("einzug-{name}"))
            .spawn(move || {
                run_loop(name, rx, transform, publisher, stop_flag, state, poll_interval);
            })
            .map_err(|e| EinzugError::Worker(format!("cannot spawn {name} worker: {e}")))?;

        self.handle = Some(handle);
        info!(stage = name, "worker started");
        Ok(())
    }

    /// Request termination. Work already dequeued (and anything still in the
    /// queue) is finished first.
    pub fn stop(&self) {
        if self.state() == WorkerState::Running {
            self.state
                .store(WorkerState::Stopping as u8, Ordering::Release);
        }
        self.stop_flag.store(true, Ordering::Release);
        debug!(stage = self.name, "stop requested");
    }

    /// Block until the worker's loop has observed the stop request and
    /// exited. A no-op for a worker that was never started.
    pub fn join(&mut self) -> Result<()> {
        if let Some(handle) = self.handle.take() {
            handle
                .join()
                .map_err(|_| EinzugError::Worker(format!("{} worker panicked", self.name)))?;
        }
        Ok(())
    }
}

/// The worker loop: drain to empty, publish per item, sleep when idle, exit
/// only with an empty queue after a stop request.
fn run_loop(
    name: &'static str,
    rx: Receiver<ScanBatch>,
    mut transform: Box<dyn StageTransform>,
    publisher: Arc<Publisher<ScanBatch>>,
    stop_flag: Arc<AtomicBool>,
    state: Arc<AtomicU8>,
    poll_interval: Duration,
) {
    loop {
        let mut processed_any = false;

        loop {
            match rx.try_recv() {
                Ok(mut batch) => {
                    processed_any = true;
                    let id = batch.id;
                    match transform.process(&mut batch) {
                        Ok(true) => {
                            publisher.publish(batch);
                        }
                        Ok(false) => {
                            debug!(stage = name, batch = %id, "batch withheld from downstream");
                        }
                        Err(err) => {
                            error!(
                                stage = name,
                                batch = %id,
                                error = %err,
                                "stage processing failed, dropping batch"
                            );
                        }
                    }
                }
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    // All producers gone; nothing can arrive any more.
                    state.store(WorkerState::Stopped as u8, Ordering::Release);
                    info!(stage = name, "input queue closed, worker exiting");
                    return;
                }
            }
        }

        if stop_flag.load(Ordering::Acquire) {
            if rx.is_empty() {
                break;
            }
            // Items arrived since the drain; finish them before exiting.
            continue;
        }

        if !processed_any {
            std::thread::sleep(poll_interval);
        }
    }

    state.store(WorkerState::Stopped as u8, Ordering::Release);
    info!(stage = name, "worker stopped");
}

/// Observer forwarding published batches into a worker's input queue.
///
/// The record is cloned into the queue: the upstream stage keeps (and then
/// drops) its own copy, which is how ownership transfers downstream without
/// sharing mutable state across threads.
pub struct EnqueueObserver {
    stage: &'static str,
    tx: Sender<ScanBatch>,
}

impl Observer<ScanBatch> for EnqueueObserver {
    fn notify(&self, batch: &mut ScanBatch) {
        if self.tx.send(batch.clone()).is_err() {
            warn!(stage = self.stage, batch = %batch.id, "queue closed, dropping batch");
        }
    }
}
