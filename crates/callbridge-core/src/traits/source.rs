// SPDX-FileCopyrightText: 2026 Callbridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Switch event source trait (AMI or any equivalent transport).

use async_trait::async_trait;

use crate::error::CallbridgeError;
use crate::types::SwitchEvent;

/// A connection delivering switch events in arrival order.
#[async_trait]
pub trait EventSource: Send + 'static {
    /// Returns the human-readable name of this source.
    fn name(&self) -> &str;

    /// Establishes the connection and authenticates.
    ///
    /// Fails with [`CallbridgeError::SourceUnavailable`] when the switch
    /// cannot be reached.
    async fn connect(&mut self) -> Result<(), CallbridgeError>;

    /// Receives the next relevant event.
    ///
    /// `Ok(None)` means the connection closed cleanly; errors mean it dropped.
    async fn next_event(&mut self) -> Result<Option<SwitchEvent>, CallbridgeError>;
}
