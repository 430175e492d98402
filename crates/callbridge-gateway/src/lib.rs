// SPDX-FileCopyrightText: 2026 Callbridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP gateway for callbridge.
//!
//! Routes:
//! - `GET /oauth?code=` completes CRM authorization
//! - `POST /webhook/call` accepts call-completion notices (optional bearer token)
//! - `GET /health` reports CRM authentication and tracked sessions
//! - `GET /test-call` queues a synthetic call (only with `debug.test_phone`)

pub mod auth;
pub mod handlers;
pub mod server;

pub use auth::WebhookAuth;
pub use server::{GatewayState, ServerConfig, build_router, start_server};
