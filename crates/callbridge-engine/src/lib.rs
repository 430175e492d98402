// SPDX-FileCopyrightText: 2026 Callbridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Call-session correlation for callbridge.
//!
//! Switch events (channel created, bridged, hung up) are folded into a
//! [`SessionTable`] by a single owning task; each terminated session with a
//! routable caller id yields one [`CallFact`](callbridge_core::CallFact).

pub mod direction;
pub mod engine;
pub mod phone;
pub mod runner;
pub mod table;

pub use direction::classify_direction;
pub use engine::{CallSessionEngine, EngineOptions};
pub use phone::{looks_like_extension, normalize_phone};
pub use runner::{EngineHandle, FactSink, spawn_engine};
pub use table::{BridgeResult, ChannelSession, SessionState, SessionTable};
