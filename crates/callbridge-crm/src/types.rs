// SPDX-FileCopyrightText: 2026 Callbridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Wire types for the amoCRM API v4 and OAuth2 endpoints.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Body of `POST /oauth2/access_token`.
#[derive(Debug, Serialize)]
pub(crate) struct TokenRequest<'a> {
    pub client_id: &'a str,
    pub client_secret: &'a str,
    pub grant_type: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<&'a str>,
    pub redirect_uri: &'a str,
}

/// Successful OAuth2 token response.
#[derive(Debug, Deserialize)]
pub(crate) struct TokenResponse {
    pub access_token: String,
    pub refresh_token: String,
    #[serde(default)]
    #[allow(dead_code)]
    pub expires_in: Option<u64>,
}

/// A contact as returned by `GET /api/v4/contacts`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Contact {
    pub id: u64,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ContactList {
    #[serde(rename = "_embedded", default)]
    pub embedded: ContactListEmbedded,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct ContactListEmbedded {
    #[serde(default)]
    pub contacts: Vec<Contact>,
}

/// One entry of `POST /api/v4/leads/unsorted/forms`.
#[derive(Debug, Serialize)]
pub(crate) struct UnsortedForm {
    pub source_name: String,
    pub source_uid: String,
    #[serde(rename = "_embedded")]
    pub embedded: UnsortedEmbedded,
}

#[derive(Debug, Serialize)]
pub(crate) struct UnsortedEmbedded {
    pub leads: Vec<UnsortedLead>,
}

#[derive(Debug, Serialize)]
pub(crate) struct UnsortedLead {
    pub name: String,
    pub custom_fields_values: Vec<CustomFieldValues>,
}

#[derive(Debug, Serialize)]
pub(crate) struct CustomFieldValues {
    pub field_code: &'static str,
    pub values: Vec<FieldValue>,
}

#[derive(Debug, Serialize)]
pub(crate) struct FieldValue {
    pub value: String,
}

/// One entry of `POST /api/v4/contacts/{id}/notes`.
#[derive(Debug, Serialize)]
pub(crate) struct CallNote {
    pub entity_id: u64,
    pub note_type: &'static str,
    pub created_at: i64,
    pub params: CallNoteParams,
}

#[derive(Debug, Serialize)]
pub(crate) struct CallNoteParams {
    pub uniq: String,
    pub duration: u64,
    pub source: String,
    pub phone: String,
    pub call_status: u8,
    pub call_result: &'static str,
}

/// On-disk shape of the token file.
#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct StoredTokens {
    #[serde(default)]
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: String,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}
