// SPDX-FileCopyrightText: 2026 Callbridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Session state machine: `Created -> Bridged -> Terminated`.
//!
//! The engine applies switch events in arrival order to its [`SessionTable`]
//! and produces exactly one [`CallFact`] per retired session whose caller id
//! resolves to a phone number. Events for untracked ids are ignored; the
//! switch replays hangups for channels created before this process started.

use callbridge_core::{CallFact, CallOutcome, SwitchEvent};
use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use crate::direction::classify_direction;
use crate::phone::{looks_like_extension, normalize_phone};
use crate::table::{BridgeResult, ChannelSession, SessionTable};

/// Behavior switches for the engine.
#[derive(Debug, Clone, Default)]
pub struct EngineOptions {
    /// Log session creation and termination at info level.
    pub detailed_logging: bool,
    /// Phone used in place of an unresolvable caller id. `None` drops such calls.
    pub unresolved_phone_substitute: Option<String>,
}

/// Correlates switch events into completed-call facts.
#[derive(Debug, Default)]
pub struct CallSessionEngine {
    table: SessionTable,
    options: EngineOptions,
}

impl CallSessionEngine {
    pub fn new(options: EngineOptions) -> Self {
        Self {
            table: SessionTable::new(),
            options,
        }
    }

    /// Read access to the live sessions.
    pub fn table(&self) -> &SessionTable {
        &self.table
    }

    pub fn active_sessions(&self) -> usize {
        self.table.len()
    }

    /// Applies one event. Returns a fact only for a hangup that completes a call.
    pub fn handle(&mut self, event: SwitchEvent) -> Option<CallFact> {
        match event {
            SwitchEvent::NewChannel {
                unique_id,
                channel,
                caller_id,
                exten,
                context,
                at,
            } => {
                let direction = classify_direction(&channel, &context);
                let session = ChannelSession {
                    unique_id,
                    caller_id,
                    channel,
                    extension: exten,
                    context,
                    started_at: at,
                    answered_at: None,
                    direction,
                    connected: false,
                };
                self.on_new_channel(session);
                None
            }
            SwitchEvent::BridgeEnter { unique_id, at } => {
                match self.table.bridge(&unique_id, at) {
                    BridgeResult::Bridged => debug!(unique_id, "session bridged"),
                    BridgeResult::AlreadyBridged => {
                        debug!(unique_id, "repeated bridge ignored")
                    }
                    BridgeResult::Unknown => {
                        debug!(unique_id, "bridge for untracked channel ignored")
                    }
                }
                None
            }
            SwitchEvent::Hangup {
                unique_id,
                cause,
                cause_text,
                at,
            } => self.on_hangup(&unique_id, cause_text.or(cause), at),
        }
    }

    fn on_new_channel(&mut self, session: ChannelSession) {
        if self.options.detailed_logging {
            info!(
                unique_id = %session.unique_id,
                channel = %session.channel,
                caller_id = %session.caller_id,
                exten = %session.extension,
                context = %session.context,
                direction = %session.direction,
                "new channel"
            );
        } else {
            debug!(
                unique_id = %session.unique_id,
                caller_id = %session.caller_id,
                direction = %session.direction,
                "new channel"
            );
        }

        if let Some(previous) = self.table.create(session) {
            warn!(
                unique_id = %previous.unique_id,
                "duplicate channel creation, replacing tracked session"
            );
        }
    }

    fn on_hangup(
        &mut self,
        unique_id: &str,
        cause: Option<String>,
        at: DateTime<Utc>,
    ) -> Option<CallFact> {
        let Some(session) = self.table.retire(unique_id) else {
            debug!(unique_id, "hangup for untracked channel ignored");
            return None;
        };

        let (duration_secs, outcome) = match session.answered_at {
            Some(answered_at) => (
                (at - answered_at).num_seconds().max(0) as u64,
                CallOutcome::Answered,
            ),
            None => (0, CallOutcome::NotAnswered),
        };

        if self.options.detailed_logging {
            info!(
                unique_id,
                caller_id = %session.caller_id,
                exten = %session.extension,
                direction = %session.direction,
                duration_secs,
                outcome = ?outcome,
                cause = cause.as_deref().unwrap_or("UNKNOWN"),
                "call ended"
            );
        }

        let phone = match normalize_phone(&session.caller_id) {
            Some(phone) => phone,
            None => match self.options.unresolved_phone_substitute.clone() {
                Some(substitute) => {
                    info!(
                        unique_id,
                        caller_id = %session.caller_id,
                        substitute = %substitute,
                        "caller id not routable, using substitute phone"
                    );
                    substitute
                }
                None => {
                    warn!(
                        unique_id,
                        caller_id = %session.caller_id,
                        exten = %session.extension,
                        "dropped call: caller id is not a routable phone number"
                    );
                    return None;
                }
            },
        };

        info!(unique_id, phone = %phone, duration_secs, outcome = ?outcome, "call completed");

        Some(CallFact {
            phone,
            direction: session.direction,
            duration_secs,
            outcome,
            unique_id: session.unique_id,
            occurred_at: session.started_at,
            hangup_cause: match outcome {
                CallOutcome::Answered => None,
                CallOutcome::NotAnswered => Some(cause.unwrap_or_else(|| "UNKNOWN".into())),
            },
            internal: looks_like_extension(&session.caller_id),
        })
    }
}
