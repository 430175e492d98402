// SPDX-FileCopyrightText: 2026 Callbridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Reader task forwarding switch events to the engine.
//!
//! A lost connection never stops the service: the task logs the outage and
//! either reconnects after a delay or exits, leaving the gateway webhook as
//! the only call source.

use std::time::Duration;

use callbridge_core::{CallbridgeError, EventSource, SwitchEvent};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Spawns the reader task for `source`.
///
/// `reconnect_delay` of `None` disables reconnection.
pub fn spawn_event_reader<S: EventSource>(
    mut source: S,
    events: mpsc::Sender<SwitchEvent>,
    reconnect_delay: Option<Duration>,
    cancel: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let name = source.name().to_string();
        loop {
            let outcome = tokio::select! {
                outcome = pump(&mut source, &events) => outcome,
                _ = cancel.cancelled() => {
                    debug!(source = %name, "event reader shutting down");
                    return;
                }
            };

            match outcome {
                Ok(PumpEnd::SourceClosed) => {
                    warn!(source = %name, "switch connection closed; webhook-only mode");
                }
                Ok(PumpEnd::EngineGone) => {
                    debug!("engine channel closed, stopping event reader");
                    return;
                }
                Err(e) => {
                    warn!(source = %name, error = %e, "switch event source unavailable; webhook-only mode");
                }
            }

            let Some(delay) = reconnect_delay else {
                info!(source = %name, "reconnection disabled, event reader stopped");
                return;
            };
            tokio::select! {
                _ = tokio::time::sleep(delay) => {
                    info!(source = %name, delay_secs = delay.as_secs(), "reconnecting to switch");
                }
                _ = cancel.cancelled() => return,
            }
        }
    })
}

enum PumpEnd {
    SourceClosed,
    EngineGone,
}

async fn pump<S: EventSource>(
    source: &mut S,
    events: &mpsc::Sender<SwitchEvent>,
) -> Result<PumpEnd, CallbridgeError> {
    source.connect().await?;
    while let Some(event) = source.next_event().await? {
        if events.send(event).await.is_err() {
            return Ok(PumpEnd::EngineGone);
        }
    }
    Ok(PumpEnd::SourceClosed)
}
