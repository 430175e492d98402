// SPDX-FileCopyrightText: 2026 Callbridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Owned table of live channel sessions keyed by switch unique id.
//!
//! A session enters the table on its creation event and leaves it on its
//! terminal event. The table has a single owner (the engine task), so no
//! interior locking is needed.

use std::collections::HashMap;

use callbridge_core::Direction;
use chrono::{DateTime, Utc};

/// Observable states of a tracked session.
///
/// `Terminated` is never stored: a terminated session is removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Created,
    Bridged,
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionState::Created => write!(f, "created"),
            SessionState::Bridged => write!(f, "bridged"),
        }
    }
}

/// One call leg tracked from creation to hangup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelSession {
    pub unique_id: String,
    /// Caller id exactly as reported by the switch.
    pub caller_id: String,
    pub channel: String,
    pub extension: String,
    pub context: String,
    pub started_at: DateTime<Utc>,
    /// Set once, on the first bridge.
    pub answered_at: Option<DateTime<Utc>>,
    /// Computed at creation, never changed.
    pub direction: Direction,
    pub connected: bool,
}

impl ChannelSession {
    pub fn state(&self) -> SessionState {
        if self.connected {
            SessionState::Bridged
        } else {
            SessionState::Created
        }
    }
}

/// Result of applying a bridge event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BridgeResult {
    /// The session moved from `Created` to `Bridged`.
    Bridged,
    /// The session was already bridged; nothing changed.
    AlreadyBridged,
    /// No session with that id is tracked.
    Unknown,
}

/// In-memory session table.
#[derive(Debug, Default)]
pub struct SessionTable {
    sessions: HashMap<String, ChannelSession>,
}

impl SessionTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a session, returning the one it replaced (last writer wins).
    pub fn create(&mut self, session: ChannelSession) -> Option<ChannelSession> {
        self.sessions.insert(session.unique_id.clone(), session)
    }

    /// Marks a session as bridged at `at`. Idempotent.
    pub fn bridge(&mut self, unique_id: &str, at: DateTime<Utc>) -> BridgeResult {
        match self.sessions.get_mut(unique_id) {
            None => BridgeResult::Unknown,
            Some(session) if session.connected => BridgeResult::AlreadyBridged,
            Some(session) => {
                session.connected = true;
                session.answered_at = Some(at);
                BridgeResult::Bridged
            }
        }
    }

    /// Removes and returns a session; used for terminal processing.
    pub fn retire(&mut self, unique_id: &str) -> Option<ChannelSession> {
        self.sessions.remove(unique_id)
    }

    pub fn get(&self, unique_id: &str) -> Option<&ChannelSession> {
        self.sessions.get(unique_id)
    }

    pub fn contains(&self, unique_id: &str) -> bool {
        self.sessions.contains_key(unique_id)
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}
