// SPDX-FileCopyrightText: 2026 Callbridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! JSON file persistence for the OAuth2 token pair.
//!
//! The file is written to a sibling temp file and renamed into place. On
//! Unix the temp file is created with mode 0600, so the secret is never
//! readable by other users.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use callbridge_core::{CallbridgeError, TokenPair, TokenPersistence};
use chrono::Utc;
use secrecy::ExposeSecret;
use tokio::io::AsyncWriteExt;
use tracing::debug;

use crate::types::StoredTokens;

/// Token persistence backed by a JSON file.
#[derive(Debug, Clone)]
pub struct FileTokenStore {
    path: PathBuf,
}

impl FileTokenStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn persistence_error(e: impl std::error::Error + Send + Sync + 'static) -> CallbridgeError {
    CallbridgeError::Persistence {
        source: Box::new(e),
    }
}

/// Creates `path` fresh, owner-only on Unix from the moment it exists.
async fn create_private(path: &Path) -> Result<tokio::fs::File, CallbridgeError> {
    // A leftover temp file would keep its old mode.
    match tokio::fs::remove_file(path).await {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => return Err(persistence_error(e)),
    }

    let mut options = tokio::fs::OpenOptions::new();
    options.write(true).create_new(true);
    #[cfg(unix)]
    options.mode(0o600);
    options.open(path).await.map_err(persistence_error)
}

#[async_trait]
impl TokenPersistence for FileTokenStore {
    async fn load(&self) -> Result<Option<TokenPair>, CallbridgeError> {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "no token file yet");
                return Ok(None);
            }
            Err(e) => return Err(persistence_error(e)),
        };

        let stored: StoredTokens = serde_json::from_str(&content).map_err(persistence_error)?;
        let pair = TokenPair::new(
            stored.access_token,
            stored.refresh_token,
            stored.updated_at.unwrap_or_else(Utc::now),
        );
        Ok(pair.is_complete().then_some(pair))
    }

    async fn save(&self, tokens: &TokenPair) -> Result<(), CallbridgeError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(persistence_error)?;
        }

        let stored = StoredTokens {
            access_token: tokens.access_token.expose_secret().to_string(),
            refresh_token: tokens.refresh_token.expose_secret().to_string(),
            updated_at: Some(tokens.updated_at),
        };
        let json = serde_json::to_string_pretty(&stored).map_err(persistence_error)?;

        let tmp = self.path.with_extension("json.tmp");
        let mut file = create_private(&tmp).await?;
        file.write_all(json.as_bytes())
            .await
            .map_err(persistence_error)?;
        file.sync_all().await.map_err(persistence_error)?;
        drop(file);
        tokio::fs::rename(&tmp, &self.path)
            .await
            .map_err(persistence_error)?;

        debug!(path = %self.path.display(), "token pair saved");
        Ok(())
    }
}
