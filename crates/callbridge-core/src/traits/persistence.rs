// SPDX-FileCopyrightText: 2026 Callbridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Durable storage contract for the OAuth2 token pair.

use async_trait::async_trait;

use crate::error::CallbridgeError;
use crate::types::TokenPair;

/// Loads and saves the process-wide token pair.
///
/// Implementations must restrict read access to the persisted tokens.
#[async_trait]
pub trait TokenPersistence: Send + Sync + 'static {
    /// Returns the stored pair, or `None` if nothing has been persisted yet.
    async fn load(&self) -> Result<Option<TokenPair>, CallbridgeError>;

    /// Replaces the stored pair.
    async fn save(&self, tokens: &TokenPair) -> Result<(), CallbridgeError>;
}
