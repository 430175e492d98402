// SPDX-FileCopyrightText: 2026 Callbridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP request handlers.
//!
//! Handles GET /oauth, POST /webhook/call, GET /health, GET /test-call.

use axum::{
    Json,
    extract::{Query, State, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use callbridge_sync::CallCompletionNotice;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{error, info, warn};

use crate::server::GatewayState;

/// Query string of the OAuth redirect.
#[derive(Debug, Deserialize)]
pub struct OAuthQuery {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
}

/// Response body for GET /health.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub authenticated: bool,
    /// `ok` when a token pair is held, `no_token` otherwise.
    pub crm: &'static str,
    pub active_sessions: usize,
    /// RFC 3339 timestamp.
    pub timestamp: String,
}

/// Error response body.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auth_url: Option<String>,
}

fn error_response(status: StatusCode, error: String, auth_url: Option<String>) -> Response {
    (status, Json(ErrorResponse { error, auth_url })).into_response()
}

/// GET /oauth
///
/// Completes the authorization-code flow.
pub async fn oauth_callback(
    State(state): State<GatewayState>,
    Query(query): Query<OAuthQuery>,
) -> Response {
    let Some(code) = query.code.filter(|c| !c.is_empty()) else {
        return error_response(
            StatusCode::BAD_REQUEST,
            "missing code parameter".into(),
            state.bridge.authorization_url().ok(),
        );
    };

    if let Some(received) = query.state.as_deref() {
        info!(state = received, "OAuth callback received");
    }

    match state.bridge.handle_authorization_callback(&code).await {
        Ok(()) => Json(json!({"success": true})).into_response(),
        Err(e) => {
            error!(error = %e, "authorization code exchange failed");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string(), None)
        }
    }
}

/// POST /webhook/call
///
/// Queues an externally reported completed call.
pub async fn post_call_webhook(
    State(state): State<GatewayState>,
    body: Result<Json<CallCompletionNotice>, JsonRejection>,
) -> Response {
    let notice = match body {
        Ok(Json(notice)) => notice,
        Err(rejection) => {
            warn!(error = %rejection.body_text(), "malformed call webhook");
            return error_response(StatusCode::BAD_REQUEST, rejection.body_text(), None);
        }
    };

    match state.bridge.handle_call_completion_notice(notice) {
        Ok(_) => (StatusCode::ACCEPTED, Json(json!({"accepted": true}))).into_response(),
        Err(e) => {
            warn!(error = %e, "call webhook rejected");
            error_response(StatusCode::BAD_REQUEST, e.to_string(), None)
        }
    }
}

/// GET /health
pub async fn get_health(State(state): State<GatewayState>) -> Json<HealthResponse> {
    let report = state.bridge.health_status().await;
    Json(HealthResponse {
        status: "ok",
        authenticated: report.authenticated,
        crm: if report.authenticated { "ok" } else { "no_token" },
        active_sessions: report.active_sessions,
        timestamp: chrono::Utc::now().to_rfc3339(),
    })
}

/// GET /test-call
///
/// Queues a synthetic answered inbound call for the configured test phone.
pub async fn get_test_call(State(state): State<GatewayState>) -> Response {
    match state.bridge.submit_test_call() {
        Ok(fact) => (
            StatusCode::ACCEPTED,
            Json(json!({
                "accepted": true,
                "phone": fact.phone,
                "uniqueid": fact.unique_id,
            })),
        )
            .into_response(),
        Err(e) => error_response(StatusCode::NOT_FOUND, e.to_string(), None),
    }
}
