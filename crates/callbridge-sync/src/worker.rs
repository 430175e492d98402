// SPDX-FileCopyrightText: 2026 Callbridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Pushes one completed call into the CRM.

use callbridge_core::{CallFact, CallbridgeError};
use callbridge_crm::CrmClient;
use callbridge_engine::normalize_phone;
use tracing::{error, info, warn};

use crate::recording::RecordingLocator;

/// What a successful sync did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    /// No contact matched; an unsorted lead was created.
    LeadCreated,
    /// A call note was attached to an existing contact.
    NoteAttached {
        contact_id: u64,
        recording_uploaded: bool,
    },
}

/// Resolves the contact for a call and records the call against it.
#[derive(Debug, Clone)]
pub struct CallSyncWorker {
    crm: CrmClient,
    recordings: RecordingLocator,
}

impl CallSyncWorker {
    pub fn new(crm: CrmClient, recordings: RecordingLocator) -> Self {
        Self { crm, recordings }
    }

    /// Syncs `fact`. Failed calls are not retried.
    ///
    /// A recording upload failure is logged and reported as
    /// `recording_uploaded: false`; the note stays.
    pub async fn process(&self, fact: &CallFact) -> Result<SyncOutcome, CallbridgeError> {
        let Some(phone) = normalize_phone(&fact.phone) else {
            return Err(CallbridgeError::InvalidFact(format!(
                "phone {:?} is not a routable number",
                fact.phone
            )));
        };
        let unique_id = fact.unique_id.as_str();

        let contact = self
            .crm
            .find_contact_by_phone(&phone)
            .await
            .inspect_err(|e| {
                error!(phone = %phone, unique_id, error = %e, "contact lookup failed");
            })?;

        let Some(contact) = contact else {
            self.crm
                .create_unsorted_lead(&phone)
                .await
                .inspect_err(|e| {
                    error!(phone = %phone, unique_id, error = %e, "unsorted lead creation failed");
                })?;
            info!(phone = %phone, unique_id, "no contact found, unsorted lead created");
            return Ok(SyncOutcome::LeadCreated);
        };
        let contact_id = contact.id;

        let recording = self.recordings.locate(unique_id).await;

        self.crm
            .attach_call_note(contact_id, fact)
            .await
            .inspect_err(|e| {
                error!(phone = %phone, unique_id, contact_id, error = %e, "call note creation failed");
            })?;
        info!(phone = %phone, unique_id, contact_id, "call note attached");

        let Some(path) = recording else {
            return Ok(SyncOutcome::NoteAttached {
                contact_id,
                recording_uploaded: false,
            });
        };

        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| format!("{unique_id}.wav"));

        let uploaded = match tokio::fs::read(&path).await {
            Ok(bytes) => match self.crm.upload_recording(contact_id, bytes, &file_name).await {
                Ok(()) => {
                    info!(unique_id, contact_id, file = %file_name, "recording uploaded");
                    true
                }
                Err(e) => {
                    warn!(phone = %phone, unique_id, contact_id, error = %e, "recording upload failed");
                    false
                }
            },
            Err(e) => {
                warn!(unique_id, contact_id, path = %path.display(), error = %e, "recording unreadable");
                false
            }
        };

        Ok(SyncOutcome::NoteAttached {
            contact_id,
            recording_uploaded: uploaded,
        })
    }
}
