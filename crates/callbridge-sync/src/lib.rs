// SPDX-FileCopyrightText: 2026 Callbridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Moves completed calls from the engine into the CRM.
//!
//! [`SyncDispatcher`] receives facts without blocking the engine and runs a
//! [`CallSyncWorker`] for each. [`CallBridge`] is the boundary the gateway
//! talks to.

pub mod bridge;
pub mod dispatcher;
pub mod recording;
pub mod worker;

pub use bridge::{CallBridge, CallCompletionNotice};
pub use dispatcher::SyncDispatcher;
pub use recording::RecordingLocator;
pub use worker::{CallSyncWorker, SyncOutcome};
