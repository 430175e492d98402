// SPDX-FileCopyrightText: 2026 Callbridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `callbridge auth-url` and `callbridge exchange-code`.

use std::sync::Arc;
use std::time::Duration;

use callbridge_config::CallbridgeConfig;
use callbridge_core::CallbridgeError;
use callbridge_crm::{CredentialStore, FileTokenStore, OAuthSettings};

/// Builds the credential store backed by the configured token file.
pub fn credential_store(config: &CallbridgeConfig) -> Result<CredentialStore, CallbridgeError> {
    let settings = OAuthSettings::from_config(&config.crm)?;
    CredentialStore::new(
        settings,
        Arc::new(FileTokenStore::new(&config.crm.token_file)),
        Duration::from_secs(config.crm.request_timeout_secs),
    )
}

/// Prints the URL an operator opens to authorize the integration.
pub fn run_auth_url(config: &CallbridgeConfig) -> Result<(), CallbridgeError> {
    let store = credential_store(config)?;
    println!("{}", store.authorization_url()?);
    Ok(())
}

/// Exchanges an authorization code and writes the token file.
pub async fn run_exchange_code(
    config: &CallbridgeConfig,
    code: &str,
) -> Result<(), CallbridgeError> {
    let store = credential_store(config)?;
    store.exchange_authorization_code(code).await?;
    // The exchange only warns when persisting fails.
    store.save().await?;
    println!(
        "callbridge: authorized, tokens written to {}",
        config.crm.token_file
    );
    Ok(())
}
