// SPDX-FileCopyrightText: 2026 Callbridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Common types shared by the session engine, the CRM client, and the gateway.

use chrono::{DateTime, Utc};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Direction of a call relative to the PBX.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Direction {
    Inbound,
    Outbound,
    Internal,
    Unknown,
}

/// Outcome of a completed call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CallOutcome {
    /// The call was bridged before hangup.
    Answered,
    /// The call ended without being bridged (no answer, busy, failed).
    NotAnswered,
}

impl CallOutcome {
    /// Maps a switch status string (`ANSWERED`, `NO ANSWER`, ...) to an outcome.
    pub fn from_status(status: &str) -> Self {
        if status.trim().eq_ignore_ascii_case("answered") {
            CallOutcome::Answered
        } else {
            CallOutcome::NotAnswered
        }
    }
}

/// A single completed call, produced once per session and consumed once.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallFact {
    /// Normalized digits-only phone number, at least 10 digits.
    pub phone: String,
    pub direction: Direction,
    /// Zero when never answered, otherwise hangup time minus answer time.
    pub duration_secs: u64,
    pub outcome: CallOutcome,
    /// Switch unique id, used for recording lookup and log correlation.
    pub unique_id: String,
    /// Session start time; used as the CRM note timestamp.
    pub occurred_at: DateTime<Utc>,
    /// Hangup cause text reported by the switch for unanswered calls.
    #[serde(default)]
    pub hangup_cause: Option<String>,
    /// The raw caller id looked like an internal extension.
    #[serde(default)]
    pub internal: bool,
}

/// A typed event from the telephony switch.
///
/// `at` is stamped by the event source when the frame is received.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SwitchEvent {
    NewChannel {
        unique_id: String,
        channel: String,
        caller_id: String,
        exten: String,
        context: String,
        at: DateTime<Utc>,
    },
    BridgeEnter {
        unique_id: String,
        at: DateTime<Utc>,
    },
    Hangup {
        unique_id: String,
        cause: Option<String>,
        cause_text: Option<String>,
        at: DateTime<Utc>,
    },
}

impl SwitchEvent {
    /// The unique id of the channel this event belongs to.
    pub fn unique_id(&self) -> &str {
        match self {
            SwitchEvent::NewChannel { unique_id, .. }
            | SwitchEvent::BridgeEnter { unique_id, .. }
            | SwitchEvent::Hangup { unique_id, .. } => unique_id,
        }
    }

    /// Receipt timestamp of the event.
    pub fn at(&self) -> DateTime<Utc> {
        match self {
            SwitchEvent::NewChannel { at, .. }
            | SwitchEvent::BridgeEnter { at, .. }
            | SwitchEvent::Hangup { at, .. } => *at,
        }
    }
}

/// OAuth2 access/refresh token pair.
///
/// Both secrets are always present; an unauthenticated store holds no pair
/// at all. Debug output omits the secrets.
pub struct TokenPair {
    pub access_token: SecretString,
    pub refresh_token: SecretString,
    pub updated_at: DateTime<Utc>,
}

impl TokenPair {
    pub fn new(access_token: String, refresh_token: String, updated_at: DateTime<Utc>) -> Self {
        Self {
            access_token: SecretString::from(access_token),
            refresh_token: SecretString::from(refresh_token),
            updated_at,
        }
    }

    /// Returns true when both tokens carry a non-empty value.
    pub fn is_complete(&self) -> bool {
        !self.access_token.expose_secret().is_empty()
            && !self.refresh_token.expose_secret().is_empty()
    }
}

impl std::fmt::Debug for TokenPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenPair")
            .field("access_token", &"[REDACTED]")
            .field("refresh_token", &"[REDACTED]")
            .field("updated_at", &self.updated_at)
            .finish()
    }
}

/// Snapshot returned to the HTTP listener's health endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HealthReport {
    /// A complete token pair is held.
    pub authenticated: bool,
    /// Sessions currently tracked by the correlation engine.
    pub active_sessions: usize,
}
