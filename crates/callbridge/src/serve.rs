// SPDX-FileCopyrightText: 2026 Callbridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `callbridge serve` command implementation.
//!
//! Wires the AMI reader, the correlation engine, the sync dispatcher, the
//! token refresh timer and the HTTP gateway, then runs until a shutdown
//! signal arrives. Queued calls are drained before exit.

use std::sync::Arc;
use std::time::Duration;

use callbridge_ami::{AmiClient, AmiSettings, spawn_event_reader};
use callbridge_config::CallbridgeConfig;
use callbridge_core::CallbridgeError;
use callbridge_crm::{CrmClient, spawn_refresh_timer};
use callbridge_engine::{CallSessionEngine, EngineOptions, FactSink, normalize_phone, spawn_engine};
use callbridge_gateway::{GatewayState, ServerConfig, start_server};
use callbridge_sync::{CallBridge, CallSyncWorker, RecordingLocator, SyncDispatcher};
use tokio::sync::mpsc;
use tracing::{error, info, warn};

use crate::auth::credential_store;
use crate::shutdown;

/// Switch events buffered between the AMI reader and the engine.
const EVENT_CHANNEL_CAPACITY: usize = 1024;

/// Runs the `callbridge serve` command.
pub async fn run_serve(config: CallbridgeConfig) -> Result<(), CallbridgeError> {
    info!(name = %config.service.name, "starting callbridge serve");

    let credentials = Arc::new(credential_store(&config)?);
    if !credentials.load().await {
        match credentials.authorization_url() {
            Ok(url) => warn!(%url, "CRM not authorized; open the URL to grant access"),
            Err(e) => warn!(error = %e, "CRM not authorized"),
        }
    }

    let crm = CrmClient::new(
        credentials.clone(),
        config.crm.source_name.clone(),
        Duration::from_secs(config.crm.request_timeout_secs),
    )?;
    let recordings = RecordingLocator::new(&config.recordings.root, &config.recordings.extensions);
    if !recordings.root().is_dir() {
        warn!(
            root = %recordings.root().display(),
            "recording root not found; calls sync without recordings"
        );
    }
    let worker = Arc::new(CallSyncWorker::new(crm, recordings));
    let dispatcher = Arc::new(SyncDispatcher::start(
        worker,
        config.sync.workers,
        config.sync.queue_capacity,
    ));
    let sink: Arc<dyn FactSink> = dispatcher.clone();

    let cancel = shutdown::install_signal_handler();

    let options = EngineOptions {
        detailed_logging: config.debug.detailed_ami_logging,
        unresolved_phone_substitute: if config.debug.process_internal_calls {
            config.debug.test_phone.as_deref().and_then(normalize_phone)
        } else {
            None
        },
    };
    let (events_tx, events_rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
    let (engine, engine_task) = spawn_engine(
        CallSessionEngine::new(options),
        events_rx,
        sink.clone(),
        cancel.child_token(),
    );

    let reader_task = if config.ami.enabled {
        let client = AmiClient::new(AmiSettings::from_config(&config.ami)?);
        let reconnect = match config.ami.reconnect_delay_secs {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        };
        Some(spawn_event_reader(client, events_tx, reconnect, cancel.child_token()))
    } else {
        info!("AMI disabled; calls arrive through the webhook only");
        drop(events_tx);
        None
    };

    let refresh_task = spawn_refresh_timer(
        credentials.clone(),
        Duration::from_secs(config.crm.token_refresh_interval_secs),
        cancel.child_token(),
    );

    let bridge = CallBridge::new(credentials, sink, engine)
        .with_test_phone(config.debug.test_phone.clone());
    let server_config = ServerConfig {
        host: config.gateway.host.clone(),
        port: config.gateway.port,
        webhook_token: config.gateway.webhook_token.clone(),
    };

    let served = start_server(&server_config, GatewayState { bridge }, cancel.clone()).await;
    if let Err(e) = &served {
        error!(error = %e, "gateway stopped unexpectedly");
    }
    // A gateway failure takes the other tasks down with it.
    cancel.cancel();

    if let Some(task) = reader_task {
        let _ = task.await;
    }
    let _ = engine_task.await;
    let _ = refresh_task.await;

    info!(queued = dispatcher.queued(), "draining sync queue");
    let drained = dispatcher
        .shutdown(Duration::from_secs(config.sync.drain_timeout_secs))
        .await;
    info!(drained, "callbridge stopped");

    served
}
