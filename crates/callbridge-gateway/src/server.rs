// SPDX-FileCopyrightText: 2026 Callbridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Gateway HTTP server built on axum.

use axum::{
    Router, middleware as axum_middleware,
    routing::{get, post},
};
use callbridge_core::CallbridgeError;
use callbridge_sync::CallBridge;
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;

use crate::auth::{WebhookAuth, webhook_auth_middleware};
use crate::handlers;

/// Shared state for axum request handlers.
#[derive(Debug, Clone)]
pub struct GatewayState {
    pub bridge: CallBridge,
}

/// Listener configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Bearer token required by the call webhook (`None` = open).
    pub webhook_token: Option<String>,
}

/// Builds the router.
///
/// `/test-call` is only routed when the bridge has a test phone.
pub fn build_router(state: GatewayState, auth: WebhookAuth) -> Router {
    let webhook_routes = Router::new()
        .route("/webhook/call", post(handlers::post_call_webhook))
        .route_layer(axum_middleware::from_fn_with_state(
            auth,
            webhook_auth_middleware,
        ))
        .with_state(state.clone());

    let mut public_routes = Router::new()
        .route("/oauth", get(handlers::oauth_callback))
        .route("/health", get(handlers::get_health));
    if state.bridge.test_phone().is_some() {
        public_routes = public_routes.route("/test-call", get(handlers::get_test_call));
    }

    Router::new()
        .merge(public_routes.with_state(state))
        .merge(webhook_routes)
        .layer(TraceLayer::new_for_http())
}

/// Serves the gateway until `cancel` fires.
pub async fn start_server(
    config: &ServerConfig,
    state: GatewayState,
    cancel: CancellationToken,
) -> Result<(), CallbridgeError> {
    let app = build_router(
        state,
        WebhookAuth {
            bearer_token: config.webhook_token.clone(),
        },
    );

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| CallbridgeError::Internal(format!("failed to bind gateway to {addr}: {e}")))?;

    tracing::info!("gateway listening on {addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(cancel.cancelled_owned())
        .await
        .map_err(|e| CallbridgeError::Internal(format!("gateway server error: {e}")))?;

    tracing::info!("gateway stopped");
    Ok(())
}
