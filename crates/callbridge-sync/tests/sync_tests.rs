// SPDX-FileCopyrightText: 2026 Callbridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! End-to-end call sync against a mock CRM and a temporary recording tree.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use callbridge_core::{CallFact, CallOutcome, CallbridgeError, Direction};
use callbridge_crm::{CredentialStore, CrmClient, FileTokenStore, OAuthSettings};
use callbridge_engine::{EngineHandle, FactSink};
use callbridge_sync::{
    CallBridge, CallCompletionNotice, CallSyncWorker, RecordingLocator, SyncDispatcher,
    SyncOutcome,
};
use chrono::Utc;
use secrecy::SecretString;
use tempfile::TempDir;
use wiremock::matchers::{method, path, path_regex};
use wiremock::{Mock, MockServer, ResponseTemplate};

struct Setup {
    worker: CallSyncWorker,
    credentials: Arc<CredentialStore>,
    recordings: TempDir,
    _tokens: TempDir,
}

async fn setup(server: &MockServer) -> Setup {
    let tokens = tempfile::tempdir().unwrap();
    let token_path = tokens.path().join("tokens.json");
    std::fs::write(
        &token_path,
        r#"{"access_token":"a0","refresh_token":"r0","updated_at":"2026-03-01T00:00:00Z"}"#,
    )
    .unwrap();

    let settings = OAuthSettings {
        base_url: server.uri(),
        client_id: "cid".into(),
        client_secret: SecretString::from("csecret"),
        redirect_uri: "https://bridge.example.com/oauth".into(),
        state: "callbridge_auth".into(),
    };
    let credentials = Arc::new(
        CredentialStore::new(
            settings,
            Arc::new(FileTokenStore::new(token_path)),
            Duration::from_secs(5),
        )
        .unwrap(),
    );
    assert!(credentials.load().await);

    let crm = CrmClient::new(credentials.clone(), "FreePBX".into(), Duration::from_secs(5)).unwrap();
    let recordings = tempfile::tempdir().unwrap();
    let locator = RecordingLocator::new(recordings.path(), &["wav".to_string(), "mp3".to_string()]);

    Setup {
        worker: CallSyncWorker::new(crm, locator),
        credentials,
        recordings,
        _tokens: tokens,
    }
}

fn fact(unique_id: &str) -> CallFact {
    CallFact {
        phone: "79161234567".into(),
        direction: Direction::Inbound,
        duration_secs: 30,
        outcome: CallOutcome::Answered,
        unique_id: unique_id.into(),
        occurred_at: Utc::now(),
        hangup_cause: None,
        internal: false,
    }
}

fn write_recording(root: &Path, name: &str) {
    let dir = root.join("2026/03/01");
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(dir.join(name), b"RIFF0000WAVEfmt ").unwrap();
}

async fn mount_contact(server: &MockServer, id: u64) {
    Mock::given(method("GET"))
        .and(path("/api/v4/contacts"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "_embedded": {"contacts": [{"id": id}]}
        })))
        .mount(server)
        .await;
}

#[tokio::test]
async fn known_contact_gets_note_and_recording() {
    let server = MockServer::start().await;
    mount_contact(&server, 11).await;
    Mock::given(method("POST"))
        .and(path("/api/v4/contacts/11/notes"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/v4/contacts/11/files"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/v4/leads/unsorted/forms"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let s = setup(&server).await;
    write_recording(s.recordings.path(), "in-79161234567-1700000000.42.wav");

    let outcome = s.worker.process(&fact("1700000000.42")).await.unwrap();
    assert_eq!(
        outcome,
        SyncOutcome::NoteAttached {
            contact_id: 11,
            recording_uploaded: true
        }
    );
}

#[tokio::test]
async fn unknown_caller_gets_unsorted_lead_only() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v4/contacts"))
        .respond_with(ResponseTemplate::new(204))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/v4/leads/unsorted/forms"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path_regex(r"^/api/v4/contacts/\d+/(notes|files)$"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let s = setup(&server).await;
    write_recording(s.recordings.path(), "1700000000.43.wav");

    let outcome = s.worker.process(&fact("1700000000.43")).await.unwrap();
    assert_eq!(outcome, SyncOutcome::LeadCreated);
}

#[tokio::test]
async fn missing_recording_still_attaches_note() {
    let server = MockServer::start().await;
    mount_contact(&server, 12).await;
    Mock::given(method("POST"))
        .and(path("/api/v4/contacts/12/notes"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/v4/contacts/12/files"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let s = setup(&server).await;
    let outcome = s.worker.process(&fact("1700000000.44")).await.unwrap();
    assert_eq!(
        outcome,
        SyncOutcome::NoteAttached {
            contact_id: 12,
            recording_uploaded: false
        }
    );
}

#[tokio::test]
async fn upload_failure_keeps_note() {
    let server = MockServer::start().await;
    mount_contact(&server, 13).await;
    Mock::given(method("POST"))
        .and(path("/api/v4/contacts/13/notes"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/v4/contacts/13/files"))
        .respond_with(ResponseTemplate::new(413).set_body_string("too large"))
        .expect(1)
        .mount(&server)
        .await;

    let s = setup(&server).await;
    write_recording(s.recordings.path(), "1700000000.45.mp3");

    let outcome = s.worker.process(&fact("1700000000.45")).await.unwrap();
    assert_eq!(
        outcome,
        SyncOutcome::NoteAttached {
            contact_id: 13,
            recording_uploaded: false
        }
    );
}

#[tokio::test]
async fn malformed_phone_never_reaches_crm() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let s = setup(&server).await;
    let mut bad = fact("1.1");
    bad.phone = "101".into();
    let err = s.worker.process(&bad).await.unwrap_err();
    assert!(matches!(err, CallbridgeError::InvalidFact(_)));
}

#[tokio::test]
async fn note_failure_is_reported() {
    let server = MockServer::start().await;
    mount_contact(&server, 14).await;
    Mock::given(method("POST"))
        .and(path("/api/v4/contacts/14/notes"))
        .respond_with(ResponseTemplate::new(400).set_body_string("bad note"))
        .mount(&server)
        .await;

    let s = setup(&server).await;
    let err = s.worker.process(&fact("1.2")).await.unwrap_err();
    assert_eq!(err.status(), Some(400));
}

#[tokio::test]
async fn dispatcher_drains_submitted_calls_on_shutdown() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v4/contacts"))
        .respond_with(ResponseTemplate::new(204).set_delay(Duration::from_millis(50)))
        .expect(3)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/v4/leads/unsorted/forms"))
        .respond_with(ResponseTemplate::new(200))
        .expect(3)
        .mount(&server)
        .await;

    let s = setup(&server).await;
    let dispatcher = SyncDispatcher::start(Arc::new(s.worker), 2, 8);
    for i in 0..3 {
        dispatcher.submit(fact(&format!("2.{i}")));
    }
    assert!(dispatcher.shutdown(Duration::from_secs(5)).await);

    // Closed dispatcher drops new calls instead of blocking.
    dispatcher.submit(fact("2.9"));
}

#[tracing_test::traced_test]
#[tokio::test]
async fn full_queue_drops_instead_of_blocking() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v4/contacts"))
        .respond_with(ResponseTemplate::new(204).set_delay(Duration::from_millis(300)))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/v4/leads/unsorted/forms"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let s = setup(&server).await;
    let dispatcher = SyncDispatcher::start(Arc::new(s.worker), 1, 1);
    for i in 0..5 {
        dispatcher.submit(fact(&format!("3.{i}")));
    }
    assert!(logs_contain("sync queue full, dropping call"));
    dispatcher.shutdown(Duration::from_secs(5)).await;
}

#[tokio::test]
async fn bridge_reports_health_and_queues_notices() {
    #[derive(Default)]
    struct Recorder(std::sync::Mutex<Vec<CallFact>>);
    impl FactSink for Recorder {
        fn submit(&self, fact: CallFact) {
            self.0.lock().unwrap().push(fact);
        }
    }

    let server = MockServer::start().await;
    let s = setup(&server).await;
    let recorder = Arc::new(Recorder::default());
    let bridge = CallBridge::new(s.credentials.clone(), recorder.clone(), EngineHandle::default())
        .with_test_phone(Some("79990000000".into()));

    let health = bridge.health_status().await;
    assert!(health.authenticated);
    assert_eq!(health.active_sessions, 0);

    let notice: CallCompletionNotice = serde_json::from_value(serde_json::json!({
        "phone": "+7 916 123 45 67",
        "direction": "inbound",
        "duration": 12,
        "status": "ANSWERED",
        "uniqueid": "4.1",
    }))
    .unwrap();
    bridge.handle_call_completion_notice(notice).unwrap();
    let test_fact = bridge.submit_test_call().unwrap();
    assert_eq!(test_fact.phone, "79990000000");

    let queued = recorder.0.lock().unwrap();
    assert_eq!(queued.len(), 2);
    assert_eq!(queued[0].phone, "79161234567");
    assert_eq!(queued[0].duration_secs, 12);
}

#[tokio::test]
async fn queued_counts_calls_waiting_for_a_worker() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v4/contacts"))
        .respond_with(ResponseTemplate::new(204).set_delay(Duration::from_millis(500)))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/v4/leads/unsorted/forms"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let s = setup(&server).await;
    let dispatcher = SyncDispatcher::start(Arc::new(s.worker), 1, 8);
    for i in 0..4 {
        dispatcher.submit(fact(&format!("5.{i}")));
    }
    tokio::time::sleep(Duration::from_millis(100)).await;

    // One call is syncing and the pump holds the next while it waits for a permit.
    assert_eq!(dispatcher.queued(), 2);
    assert!(dispatcher.shutdown(Duration::from_secs(10)).await);
    assert_eq!(dispatcher.queued(), 0);
}
