// SPDX-FileCopyrightText: 2026 Callbridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! amoCRM integration for callbridge.
//!
//! [`CredentialStore`] owns the OAuth2 token pair and its single-flight
//! refresh, [`CrmClient`] executes API requests against it, and
//! [`FileTokenStore`] persists the pair between restarts.

pub mod client;
pub mod credentials;
pub mod refresh;
pub mod token_file;
pub mod types;

pub use client::{CrmClient, recording_mime};
pub use credentials::{CredentialStore, OAuthSettings};
pub use refresh::spawn_refresh_timer;
pub use token_file::FileTokenStore;
pub use types::Contact;
