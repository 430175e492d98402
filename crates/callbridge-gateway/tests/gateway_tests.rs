// SPDX-FileCopyrightText: 2026 Callbridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Router tests driven through `tower::ServiceExt::oneshot`.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use callbridge_core::CallFact;
use callbridge_crm::{CredentialStore, FileTokenStore, OAuthSettings};
use callbridge_engine::{EngineHandle, FactSink};
use callbridge_gateway::{GatewayState, WebhookAuth, build_router};
use callbridge_sync::CallBridge;
use secrecy::SecretString;
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[derive(Default)]
struct Recorder(Mutex<Vec<CallFact>>);

impl FactSink for Recorder {
    fn submit(&self, fact: CallFact) {
        self.0.lock().unwrap().push(fact);
    }
}

struct Harness {
    router: Router,
    recorder: Arc<Recorder>,
    credentials: Arc<CredentialStore>,
    tokens: TempDir,
}

async fn harness(crm_url: &str, token: Option<&str>, test_phone: Option<&str>) -> Harness {
    let tokens = tempfile::tempdir().unwrap();
    let settings = OAuthSettings {
        base_url: crm_url.to_string(),
        client_id: "cid".into(),
        client_secret: SecretString::from("csecret"),
        redirect_uri: "https://bridge.example.com/oauth".into(),
        state: "callbridge_auth".into(),
    };
    let credentials = Arc::new(
        CredentialStore::new(
            settings,
            Arc::new(FileTokenStore::new(tokens.path().join("tokens.json"))),
            Duration::from_secs(5),
        )
        .unwrap(),
    );
    let recorder = Arc::new(Recorder::default());
    let bridge = CallBridge::new(credentials.clone(), recorder.clone(), EngineHandle::default())
        .with_test_phone(test_phone.map(str::to_string));

    let router = build_router(
        GatewayState { bridge },
        WebhookAuth {
            bearer_token: token.map(str::to_string),
        },
    );
    Harness {
        router,
        recorder,
        credentials,
        tokens,
    }
}

async fn send(router: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), 1 << 20)
        .await
        .unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, body)
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn post_call(body: &str, bearer: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri("/webhook/call")
        .header("content-type", "application/json");
    if let Some(token) = bearer {
        builder = builder.header("authorization", format!("Bearer {token}"));
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

const NOTICE: &str = r#"{"phone":"89161234567","direction":"inbound","duration":42,"status":"ANSWERED","uniqueid":"1700000000.7"}"#;

#[tokio::test]
async fn health_reports_unauthenticated_store() {
    let h = harness("http://127.0.0.1:9", None, None).await;
    let (status, body) = send(&h.router, get("/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["authenticated"], false);
    assert_eq!(body["crm"], "no_token");
    assert_eq!(body["active_sessions"], 0);
    assert!(body["timestamp"].as_str().is_some());
}

#[tokio::test]
async fn oauth_without_code_returns_authorization_url() {
    let h = harness("https://crm.example.com", None, None).await;
    let (status, body) = send(&h.router, get("/oauth")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let url = body["auth_url"].as_str().unwrap();
    assert!(url.starts_with("https://crm.example.com/oauth?"));
    assert!(url.contains("client_id=cid"));
}

#[tokio::test]
async fn oauth_code_exchange_authenticates_and_persists() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/oauth2/access_token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "access_token": "a1",
            "refresh_token": "r1",
            "expires_in": 86400,
        })))
        .expect(1)
        .mount(&server)
        .await;

    let h = harness(&server.uri(), None, None).await;
    let (status, body) = send(&h.router, get("/oauth?code=abc&state=callbridge_auth")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert!(h.credentials.is_authenticated().await);
    assert!(h.tokens.path().join("tokens.json").exists());

    let (_, health) = send(&h.router, get("/health")).await;
    assert_eq!(health["crm"], "ok");
}

#[tokio::test]
async fn oauth_exchange_failure_is_server_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/oauth2/access_token"))
        .respond_with(ResponseTemplate::new(400).set_body_string("invalid_grant"))
        .mount(&server)
        .await;

    let h = harness(&server.uri(), None, None).await;
    let (status, body) = send(&h.router, get("/oauth?code=stale")).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body["error"].as_str().unwrap().contains("exchange failed"));
    assert!(!h.credentials.is_authenticated().await);
}

#[tokio::test]
async fn webhook_accepts_valid_notice() {
    let h = harness("http://127.0.0.1:9", None, None).await;
    let (status, body) = send(&h.router, post_call(NOTICE, None)).await;
    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(body["accepted"], true);

    let queued = h.recorder.0.lock().unwrap();
    assert_eq!(queued.len(), 1);
    assert_eq!(queued[0].phone, "79161234567");
    assert_eq!(queued[0].duration_secs, 42);
    assert_eq!(queued[0].unique_id, "1700000000.7");
}

#[tokio::test]
async fn webhook_rejects_invalid_notices() {
    let h = harness("http://127.0.0.1:9", None, None).await;

    let (status, body) = send(&h.router, post_call("{not json", None)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());

    let short_phone = NOTICE.replace("89161234567", "101");
    let (status, body) = send(&h.router, post_call(&short_phone, None)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("invalid call fact"));

    let bad_direction = NOTICE.replace("inbound", "sideways");
    let (status, _) = send(&h.router, post_call(&bad_direction, None)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    assert!(h.recorder.0.lock().unwrap().is_empty());
}

#[tokio::test]
async fn webhook_token_is_enforced() {
    let h = harness("http://127.0.0.1:9", Some("pbx-token"), None).await;

    let (status, _) = send(&h.router, post_call(NOTICE, None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    let (status, _) = send(&h.router, post_call(NOTICE, Some("wrong"))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    let (status, _) = send(&h.router, post_call(NOTICE, Some("pbx-token"))).await;
    assert_eq!(status, StatusCode::ACCEPTED);

    // Public routes stay open.
    let (status, _) = send(&h.router, get("/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(h.recorder.0.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn test_call_route_requires_test_phone() {
    let without = harness("http://127.0.0.1:9", None, None).await;
    let (status, _) = send(&without.router, get("/test-call")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let with = harness("http://127.0.0.1:9", None, Some("79990000000")).await;
    let (status, body) = send(&with.router, get("/test-call")).await;
    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(body["phone"], "79990000000");
    assert_eq!(with.recorder.0.lock().unwrap().len(), 1);
}
