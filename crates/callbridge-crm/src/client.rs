// SPDX-FileCopyrightText: 2026 Callbridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP client for the amoCRM API v4.
//!
//! Provides [`CrmClient`] which attaches the bearer token, refreshes it once
//! on a 401 and maps failures onto [`CallbridgeError`].

use std::sync::Arc;
use std::time::Duration;

use callbridge_core::{CallFact, CallOutcome, CallbridgeError, Direction};
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use secrecy::ExposeSecret;
use serde_json::Value;
use tracing::{debug, warn};

use crate::credentials::CredentialStore;
use crate::types::{
    CallNote, CallNoteParams, Contact, ContactList, CustomFieldValues, FieldValue, UnsortedEmbedded,
    UnsortedForm, UnsortedLead,
};

/// A request is sent at most this many times: once, plus one retry after a refresh.
const MAX_ATTEMPTS: u32 = 2;

/// amoCRM call status for a completed conversation.
const CALL_STATUS_ANSWERED: u8 = 4;
/// amoCRM call status for a call nobody picked up.
const CALL_STATUS_NOT_ANSWERED: u8 = 6;

/// Stateless request executor for the CRM REST API.
#[derive(Debug, Clone)]
pub struct CrmClient {
    http: reqwest::Client,
    api_base: String,
    source_name: String,
    credentials: Arc<CredentialStore>,
}

impl CrmClient {
    /// Creates a client for the account behind `credentials`.
    pub fn new(
        credentials: Arc<CredentialStore>,
        source_name: String,
        timeout: Duration,
    ) -> Result<Self, CallbridgeError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| CallbridgeError::Internal(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            http,
            api_base: format!("{}/api/v4", credentials.settings().base_url),
            source_name,
            credentials,
        })
    }

    pub fn credentials(&self) -> &Arc<CredentialStore> {
        &self.credentials
    }

    /// Sends a JSON request to `path` (relative to `/api/v4/`).
    ///
    /// A 204 or empty body yields `Value::Null`.
    pub async fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
    ) -> Result<Value, CallbridgeError> {
        let url = format!("{}/{}", self.api_base, path.trim_start_matches('/'));
        let response = self
            .execute(path, |http| {
                let builder = http.request(method.clone(), &url);
                match body {
                    Some(body) => builder.json(body),
                    None => builder,
                }
            })
            .await?;

        let status = response.status();
        let text = response.text().await.map_err(|e| transport_error(path, e))?;
        if status == StatusCode::NO_CONTENT || text.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&text).map_err(|e| CallbridgeError::CrmApi {
            status: status.as_u16(),
            body: format!("unparseable response ({e}): {text}"),
        })
    }

    /// Runs the bounded attempt loop for one logical request.
    ///
    /// `build` is called once per attempt; the bearer token is attached here.
    async fn execute<F>(&self, path: &str, build: F) -> Result<Response, CallbridgeError>
    where
        F: Fn(&reqwest::Client) -> RequestBuilder,
    {
        let (mut tokens, mut generation) =
            self.credentials
                .current_with_generation()
                .await
                .ok_or_else(|| CallbridgeError::AuthRefresh {
                    message: "no CRM tokens held; authorization required".into(),
                })?;

        for attempt in 1..=MAX_ATTEMPTS {
            let response = build(&self.http)
                .bearer_auth(tokens.access_token.expose_secret())
                .send()
                .await
                .map_err(|e| transport_error(path, e))?;

            let status = response.status();
            debug!(path, status = %status, attempt, "CRM response received");

            if status == StatusCode::UNAUTHORIZED {
                if attempt < MAX_ATTEMPTS {
                    warn!(path, "CRM rejected access token, refreshing");
                    (tokens, generation) = self.credentials.refresh_if_stale(generation).await?;
                    continue;
                }
                return Err(CallbridgeError::CrmAuth {
                    path: path.to_string(),
                });
            }

            if status.is_client_error() || status.is_server_error() {
                let body = response.text().await.unwrap_or_default();
                return Err(CallbridgeError::CrmApi {
                    status: status.as_u16(),
                    body,
                });
            }

            return Ok(response);
        }

        Err(CallbridgeError::CrmAuth {
            path: path.to_string(),
        })
    }

    /// Looks up a contact by digits-only phone. The first match wins.
    pub async fn find_contact_by_phone(
        &self,
        phone: &str,
    ) -> Result<Option<Contact>, CallbridgeError> {
        let digits: String = phone.chars().filter(char::is_ascii_digit).collect();
        let value = self
            .request(Method::GET, &format!("contacts?query={digits}"), None)
            .await?;
        if value.is_null() {
            return Ok(None);
        }

        let list: ContactList = serde_json::from_value(value).map_err(|e| {
            CallbridgeError::CrmApi {
                status: 200,
                body: format!("unexpected contacts payload: {e}"),
            }
        })?;
        let mut contacts = list.embedded.contacts.into_iter();
        let first = contacts.next();
        if first.is_some() && contacts.next().is_some() {
            debug!(phone = %digits, "several contacts match, using the first");
        }
        Ok(first)
    }

    /// Creates an unsorted lead for a caller with no contact.
    pub async fn create_unsorted_lead(&self, phone: &str) -> Result<Value, CallbridgeError> {
        let form = UnsortedForm {
            source_name: self.source_name.clone(),
            source_uid: phone.to_string(),
            embedded: UnsortedEmbedded {
                leads: vec![UnsortedLead {
                    name: format!("Incoming call from {phone}"),
                    custom_fields_values: vec![CustomFieldValues {
                        field_code: "PHONE",
                        values: vec![FieldValue {
                            value: phone.to_string(),
                        }],
                    }],
                }],
            },
        };
        let body = to_body(&[form])?;
        self.request(Method::POST, "leads/unsorted/forms", Some(&body))
            .await
    }

    /// Adds a call note describing `fact` to a contact.
    pub async fn attach_call_note(
        &self,
        contact_id: u64,
        fact: &CallFact,
    ) -> Result<Value, CallbridgeError> {
        let body = to_body(&[call_note(contact_id, fact, &self.source_name)])?;
        self.request(
            Method::POST,
            &format!("contacts/{contact_id}/notes"),
            Some(&body),
        )
        .await
    }

    /// Uploads a recording to a contact as a multipart `file` part.
    pub async fn upload_recording(
        &self,
        contact_id: u64,
        bytes: Vec<u8>,
        file_name: &str,
    ) -> Result<(), CallbridgeError> {
        let path = format!("contacts/{contact_id}/files");
        let url = format!("{}/{path}", self.api_base);
        let mime = recording_mime(file_name);
        self.execute(&path, |http| {
            let part = reqwest::multipart::Part::bytes(bytes.clone())
                .file_name(file_name.to_string());
            let part = match part.mime_str(mime) {
                Ok(part) => part,
                Err(_) => reqwest::multipart::Part::bytes(bytes.clone())
                    .file_name(file_name.to_string()),
            };
            http.post(&url)
                .multipart(reqwest::multipart::Form::new().part("file", part))
        })
        .await?;

        debug!(contact_id, file_name, "recording uploaded");
        Ok(())
    }
}

fn transport_error(path: &str, e: reqwest::Error) -> CallbridgeError {
    CallbridgeError::CrmTransport {
        message: format!("{path}: {e}"),
        source: Some(Box::new(e)),
    }
}

fn to_body<T: serde::Serialize>(value: &T) -> Result<Value, CallbridgeError> {
    serde_json::to_value(value)
        .map_err(|e| CallbridgeError::Internal(format!("failed to encode CRM request: {e}")))
}

fn call_note(contact_id: u64, fact: &CallFact, source: &str) -> CallNote {
    let (call_status, call_result) = match fact.outcome {
        CallOutcome::Answered => (CALL_STATUS_ANSWERED, "Answered"),
        CallOutcome::NotAnswered => (CALL_STATUS_NOT_ANSWERED, "Not answered"),
    };
    CallNote {
        entity_id: contact_id,
        note_type: match fact.direction {
            Direction::Outbound => "call_out",
            Direction::Inbound | Direction::Internal | Direction::Unknown => "call_in",
        },
        created_at: fact.occurred_at.timestamp(),
        params: CallNoteParams {
            uniq: fact.unique_id.clone(),
            duration: fact.duration_secs,
            source: source.to_string(),
            phone: fact.phone.clone(),
            call_status,
            call_result,
        },
    }
}

/// Content type for a recording file name.
pub fn recording_mime(file_name: &str) -> &'static str {
    let ext = std::path::Path::new(file_name)
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);
    match ext.as_deref() {
        Some("wav") => "audio/wav",
        Some("mp3") => "audio/mpeg",
        Some("ogg") => "audio/ogg",
        _ => "application/octet-stream",
    }
}
