// SPDX-FileCopyrightText: 2026 Callbridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The engine task: owns the session table and feeds completed calls to a sink.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use callbridge_core::{CallFact, SwitchEvent};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace};

use crate::engine::CallSessionEngine;

/// Receiver of completed call facts.
///
/// `submit` must not block: the engine calls it inline while processing
/// switch events.
pub trait FactSink: Send + Sync + 'static {
    fn submit(&self, fact: CallFact);
}

/// Read-only view of a running engine task.
#[derive(Debug, Clone, Default)]
pub struct EngineHandle {
    active_sessions: Arc<AtomicUsize>,
}

impl EngineHandle {
    /// Number of sessions tracked after the last processed event.
    pub fn active_sessions(&self) -> usize {
        self.active_sessions.load(Ordering::Relaxed)
    }
}

/// Spawns the engine task.
///
/// The task processes events until the sender side closes or `cancel` fires.
/// Sessions still open at that point are discarded without producing facts.
pub fn spawn_engine(
    mut engine: CallSessionEngine,
    mut events: mpsc::Receiver<SwitchEvent>,
    sink: Arc<dyn FactSink>,
    cancel: CancellationToken,
) -> (EngineHandle, JoinHandle<()>) {
    let handle = EngineHandle::default();
    let counter = handle.active_sessions.clone();

    let task = tokio::spawn(async move {
        info!("call session engine running");
        loop {
            tokio::select! {
                event = events.recv() => {
                    let Some(event) = event else {
                        debug!("switch event channel closed");
                        break;
                    };
                    trace!(unique_id = event.unique_id(), at = %event.at(), "switch event");
                    if let Some(fact) = engine.handle(event) {
                        sink.submit(fact);
                    }
                    counter.store(engine.active_sessions(), Ordering::Relaxed);
                }
                _ = cancel.cancelled() => {
                    debug!("engine received shutdown signal");
                    break;
                }
            }
        }
        info!(
            open_sessions = engine.active_sessions(),
            "call session engine stopped"
        );
    });

    (handle, task)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use std::sync::Mutex;

    use crate::engine::EngineOptions;

    #[derive(Default)]
    struct CollectingSink(Mutex<Vec<CallFact>>);

    impl FactSink for CollectingSink {
        fn submit(&self, fact: CallFact) {
            self.0.lock().unwrap().push(fact);
        }
    }

    #[tokio::test]
    async fn facts_flow_from_events_to_sink() {
        let sink = Arc::new(CollectingSink::default());
        let (tx, rx) = mpsc::channel(16);
        let cancel = CancellationToken::new();
        let (handle, task) = spawn_engine(
            CallSessionEngine::new(EngineOptions::default()),
            rx,
            sink.clone(),
            cancel.clone(),
        );

        let now = Utc::now();
        tx.send(SwitchEvent::NewChannel {
            unique_id: "1.1".into(),
            channel: "SIP/from-trunk-1".into(),
            caller_id: "+7 (916) 123-45-67".into(),
            exten: "s".into(),
            context: "from-trunk".into(),
            at: now,
        })
        .await
        .unwrap();
        tx.send(SwitchEvent::NewChannel {
            unique_id: "1.2".into(),
            channel: "SIP/from-trunk-2".into(),
            caller_id: "79160000000".into(),
            exten: "s".into(),
            context: "from-trunk".into(),
            at: now,
        })
        .await
        .unwrap();
        tx.send(SwitchEvent::Hangup {
            unique_id: "1.1".into(),
            cause: None,
            cause_text: Some("No answer".into()),
            at: now,
        })
        .await
        .unwrap();
        drop(tx);
        task.await.unwrap();

        let facts = sink.0.lock().unwrap();
        assert_eq!(facts.len(), 1);
        assert_eq!(facts[0].phone, "79161234567");
        assert_eq!(handle.active_sessions(), 1);
    }

    #[tokio::test]
    async fn cancellation_stops_engine() {
        let sink = Arc::new(CollectingSink::default());
        let (_tx, rx) = mpsc::channel::<SwitchEvent>(1);
        let cancel = CancellationToken::new();
        let (handle, task) = spawn_engine(CallSessionEngine::default(), rx, sink, cancel.clone());

        cancel.cancel();
        tokio::time::timeout(std::time::Duration::from_secs(1), task)
            .await
            .expect("engine should stop on cancel")
            .unwrap();
        assert_eq!(handle.active_sessions(), 0);
    }
}
