// SPDX-FileCopyrightText: 2026 Callbridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the callbridge service.

use thiserror::Error;

/// The primary error type used across callbridge crates.
///
/// Authentication failures (`AuthExchange`, `AuthRefresh`, `CrmAuth`) need
/// operator action. CRM and fact errors are per-call and never fatal.
#[derive(Debug, Error)]
pub enum CallbridgeError {
    /// Configuration errors (invalid TOML, missing required fields, bad values).
    #[error("configuration error: {0}")]
    Config(String),

    /// The OAuth2 authorization-code exchange was rejected or failed.
    #[error("authorization code exchange failed: {message}")]
    AuthExchange {
        /// HTTP status returned by the identity endpoint, if a response arrived.
        status: Option<u16>,
        /// Server error body or transport failure description.
        message: String,
    },

    /// The OAuth2 refresh-token exchange failed or no refresh token is held.
    #[error("token refresh failed: {message}")]
    AuthRefresh { message: String },

    /// The CRM rejected the request with 401 even after a token refresh.
    #[error("CRM rejected credentials for {path} after refresh")]
    CrmAuth { path: String },

    /// The CRM answered with a non-success status.
    #[error("CRM API returned {status}: {body}")]
    CrmApi { status: u16, body: String },

    /// The CRM could not be reached (timeout, DNS, connection refused).
    #[error("CRM transport error: {message}")]
    CrmTransport {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// A call fact failed validation before any CRM call was made.
    #[error("invalid call fact: {0}")]
    InvalidFact(String),

    /// The switch event source is not connected.
    #[error("switch event source unavailable: {message}")]
    SourceUnavailable {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Token persistence failed (read, write, or permission change).
    #[error("persistence error: {source}")]
    Persistence {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl CallbridgeError {
    /// Returns true for failures that require the operator to re-authorize.
    pub fn is_auth_failure(&self) -> bool {
        matches!(
            self,
            CallbridgeError::AuthExchange { .. }
                | CallbridgeError::AuthRefresh { .. }
                | CallbridgeError::CrmAuth { .. }
        )
    }

    /// HTTP status attached to the error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            CallbridgeError::AuthExchange { status, .. } => *status,
            CallbridgeError::CrmApi { status, .. } => Some(*status),
            CallbridgeError::CrmAuth { .. } => Some(401),
            _ => None,
        }
    }
}
