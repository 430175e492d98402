// SPDX-FileCopyrightText: 2026 Callbridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the callbridge PBX-to-CRM bridge.
//!
//! This crate provides the error type, the call and token value types, and
//! the collaborator traits used throughout the callbridge workspace.

pub mod error;
pub mod traits;
pub mod types;

// Re-export key items at crate root for ergonomic imports.
pub use error::CallbridgeError;
pub use types::{CallFact, CallOutcome, Direction, HealthReport, SwitchEvent, TokenPair};

pub use traits::{EventSource, TokenPersistence};
