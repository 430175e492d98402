// SPDX-FileCopyrightText: 2026 Callbridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Asterisk Manager Interface adapter for callbridge.
//!
//! [`AmiClient`] logs in over TCP and turns `Newchannel`, `BridgeEnter` and
//! `Hangup` frames into [`SwitchEvent`](callbridge_core::SwitchEvent)s;
//! [`spawn_event_reader`] keeps it running and feeds the engine.

pub mod client;
pub mod frame;
pub mod runner;

pub use client::{AmiClient, AmiSettings};
pub use frame::{AmiFrame, FrameReader};
pub use runner::spawn_event_reader;
