// SPDX-FileCopyrightText: 2026 Callbridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Proactive token refresh timer.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::credentials::CredentialStore;

/// Spawns a task that refreshes the CRM tokens every `interval`.
///
/// Ticks are skipped while the store is unauthenticated. Refreshes go through
/// the store's single-flight guard, so they never race request-driven ones.
pub fn spawn_refresh_timer(
    credentials: Arc<CredentialStore>,
    interval: Duration,
    cancel: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        // Skip the first immediate tick.
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if !credentials.is_authenticated().await {
                        debug!("token refresh skipped, not authenticated");
                        continue;
                    }
                    match credentials.refresh().await {
                        Ok(_) => debug!("scheduled token refresh complete"),
                        Err(e) => warn!(error = %e, "scheduled token refresh failed"),
                    }
                }
                _ = cancel.cancelled() => {
                    info!("token refresh timer shutting down");
                    break;
                }
            }
        }
    })
}
