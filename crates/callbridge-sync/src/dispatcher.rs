// SPDX-FileCopyrightText: 2026 Callbridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Bounded queue between the engine and the sync workers.
//!
//! `submit` never blocks: a full queue drops the call with a warning. A pump
//! task takes facts off the queue and runs each on the [`TaskTracker`], with
//! a semaphore capping how many syncs run at once.

use std::sync::Arc;
use std::time::Duration;

use callbridge_core::CallFact;
use callbridge_engine::FactSink;
use tokio::sync::{Semaphore, mpsc};
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, error, info, warn};

use crate::worker::{CallSyncWorker, SyncOutcome};

/// Fire-and-forget dispatch of call facts to [`CallSyncWorker`]s.
#[derive(Debug)]
pub struct SyncDispatcher {
    sender: mpsc::Sender<CallFact>,
    tracker: TaskTracker,
    closing: CancellationToken,
}

impl SyncDispatcher {
    /// Starts the pump with `workers` concurrent syncs and a queue of `capacity`.
    pub fn start(worker: Arc<CallSyncWorker>, workers: usize, capacity: usize) -> Self {
        let (sender, mut receiver) = mpsc::channel::<CallFact>(capacity.max(1));
        let tracker = TaskTracker::new();
        let closing = CancellationToken::new();
        let permits = Arc::new(Semaphore::new(workers.max(1)));

        let pump_tracker = tracker.clone();
        let pump_closing = closing.clone();
        tracker.spawn(async move {
            loop {
                let fact = tokio::select! {
                    fact = receiver.recv() => fact,
                    _ = pump_closing.cancelled() => {
                        // Stop accepting, then hand out what is already queued.
                        receiver.close();
                        receiver.recv().await
                    }
                };
                let Some(fact) = fact else { break };

                let Ok(permit) = permits.clone().acquire_owned().await else {
                    break;
                };
                let worker = worker.clone();
                pump_tracker.spawn(async move {
                    run_one(&worker, &fact).await;
                    drop(permit);
                });
            }
            debug!("sync queue pump stopped");
        });

        info!(workers, capacity, "sync dispatcher started");
        Self {
            sender,
            tracker,
            closing,
        }
    }

    /// Calls waiting in the queue (not yet handed to a worker).
    pub fn queued(&self) -> usize {
        self.sender.max_capacity() - self.sender.capacity()
    }

    /// Stops accepting calls and waits up to `timeout` for queued and
    /// in-flight syncs. Returns false if the timeout expired.
    pub async fn shutdown(&self, timeout: Duration) -> bool {
        self.closing.cancel();
        self.tracker.close();
        match tokio::time::timeout(timeout, self.tracker.wait()).await {
            Ok(()) => {
                info!("sync dispatcher drained");
                true
            }
            Err(_) => {
                warn!(
                    remaining = self.tracker.len(),
                    "sync drain timed out, abandoning in-flight calls"
                );
                false
            }
        }
    }
}

impl FactSink for SyncDispatcher {
    fn submit(&self, fact: CallFact) {
        match self.sender.try_send(fact) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(fact)) => {
                warn!(
                    phone = %fact.phone,
                    unique_id = %fact.unique_id,
                    "sync queue full, dropping call"
                );
            }
            Err(mpsc::error::TrySendError::Closed(fact)) => {
                warn!(
                    phone = %fact.phone,
                    unique_id = %fact.unique_id,
                    "sync dispatcher closed, dropping call"
                );
            }
        }
    }
}

async fn run_one(worker: &CallSyncWorker, fact: &CallFact) {
    match worker.process(fact).await {
        Ok(SyncOutcome::LeadCreated) => {
            debug!(unique_id = %fact.unique_id, "call synced as unsorted lead");
        }
        Ok(SyncOutcome::NoteAttached {
            contact_id,
            recording_uploaded,
        }) => {
            debug!(
                unique_id = %fact.unique_id,
                contact_id,
                recording_uploaded,
                "call synced to contact"
            );
        }
        Err(e) => {
            error!(
                phone = %fact.phone,
                unique_id = %fact.unique_id,
                error = %e,
                "call sync failed; not retried"
            );
        }
    }
}
