// SPDX-FileCopyrightText: 2026 Callbridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The service boundary used by the HTTP gateway and the CLI.

use std::str::FromStr;
use std::sync::Arc;

use callbridge_core::{CallFact, CallOutcome, CallbridgeError, Direction, HealthReport};
use callbridge_crm::CredentialStore;
use callbridge_engine::{EngineHandle, FactSink, normalize_phone};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::info;

/// A call-completion notice posted by the PBX dialplan.
#[derive(Debug, Clone, Deserialize)]
pub struct CallCompletionNotice {
    pub phone: String,
    pub direction: String,
    #[serde(default)]
    pub duration: u64,
    /// Switch disposition: `ANSWERED`, `NO ANSWER`, `BUSY`, ...
    pub status: String,
    pub uniqueid: String,
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
}

impl CallCompletionNotice {
    /// Validates the notice and converts it into a [`CallFact`].
    pub fn into_fact(self) -> Result<CallFact, CallbridgeError> {
        let phone = normalize_phone(&self.phone).ok_or_else(|| {
            CallbridgeError::InvalidFact(format!("phone {:?} is not a routable number", self.phone))
        })?;
        let direction = Direction::from_str(self.direction.trim()).map_err(|_| {
            CallbridgeError::InvalidFact(format!("unknown direction {:?}", self.direction))
        })?;
        let unique_id = self.uniqueid.trim();
        if unique_id.is_empty() {
            return Err(CallbridgeError::InvalidFact("uniqueid is empty".into()));
        }

        let outcome = CallOutcome::from_status(&self.status);
        Ok(CallFact {
            phone,
            direction,
            duration_secs: match outcome {
                CallOutcome::Answered => self.duration,
                CallOutcome::NotAnswered => 0,
            },
            outcome,
            unique_id: unique_id.to_string(),
            occurred_at: self.timestamp.unwrap_or_else(Utc::now),
            hangup_cause: match outcome {
                CallOutcome::Answered => None,
                CallOutcome::NotAnswered => Some(self.status.trim().to_string()),
            },
            internal: false,
        })
    }
}

/// Facade over the credential store, the fact sink and the engine.
#[derive(Clone)]
pub struct CallBridge {
    credentials: Arc<CredentialStore>,
    sink: Arc<dyn FactSink>,
    engine: EngineHandle,
    test_phone: Option<String>,
}

impl std::fmt::Debug for CallBridge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CallBridge")
            .field("credentials", &self.credentials)
            .field("active_sessions", &self.engine.active_sessions())
            .field("test_phone", &self.test_phone)
            .finish_non_exhaustive()
    }
}

impl CallBridge {
    pub fn new(
        credentials: Arc<CredentialStore>,
        sink: Arc<dyn FactSink>,
        engine: EngineHandle,
    ) -> Self {
        Self {
            credentials,
            sink,
            engine,
            test_phone: None,
        }
    }

    /// Enables [`submit_test_call`](Self::submit_test_call) for `phone`.
    pub fn with_test_phone(mut self, phone: Option<String>) -> Self {
        self.test_phone = phone;
        self
    }

    pub fn test_phone(&self) -> Option<&str> {
        self.test_phone.as_deref()
    }

    pub fn authorization_url(&self) -> Result<String, CallbridgeError> {
        self.credentials.authorization_url()
    }

    /// Completes the OAuth2 flow with the code from the CRM redirect.
    pub async fn handle_authorization_callback(&self, code: &str) -> Result<(), CallbridgeError> {
        self.credentials.exchange_authorization_code(code).await?;
        Ok(())
    }

    /// Validates an externally reported call and queues it for sync.
    pub fn handle_call_completion_notice(
        &self,
        notice: CallCompletionNotice,
    ) -> Result<CallFact, CallbridgeError> {
        let fact = notice.into_fact()?;
        info!(
            phone = %fact.phone,
            unique_id = %fact.unique_id,
            direction = %fact.direction,
            "call completion notice accepted"
        );
        self.sink.submit(fact.clone());
        Ok(fact)
    }

    /// Queues a synthetic answered inbound call for the configured test phone.
    pub fn submit_test_call(&self) -> Result<CallFact, CallbridgeError> {
        let phone = self
            .test_phone
            .clone()
            .ok_or_else(|| CallbridgeError::Config("debug.test_phone is not set".into()))?;
        let now = Utc::now();
        self.handle_call_completion_notice(CallCompletionNotice {
            phone,
            direction: Direction::Inbound.to_string(),
            duration: 30,
            status: "ANSWERED".into(),
            uniqueid: format!("test-{}", now.timestamp()),
            timestamp: Some(now),
        })
    }

    pub async fn health_status(&self) -> HealthReport {
        HealthReport {
            authenticated: self.credentials.is_authenticated().await,
            active_sessions: self.engine.active_sessions(),
        }
    }
}
