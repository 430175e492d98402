// SPDX-FileCopyrightText: 2026 Callbridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! OAuth2 credential store for the CRM.
//!
//! Owns the process-wide [`TokenPair`]. Every replacement of the pair bumps a
//! generation number so a caller holding a rejected token can tell whether
//! someone else already refreshed it.
//!
//! Refreshes are single-flight: the exchange runs under an async mutex, and a
//! caller that waited while another attempt completed returns that attempt's
//! outcome instead of spending the (rotating) refresh token a second time.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use callbridge_config::model::CrmConfig;
use callbridge_core::{CallbridgeError, TokenPair, TokenPersistence};
use chrono::Utc;
use secrecy::{ExposeSecret, SecretString};
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};

use crate::types::{TokenRequest, TokenResponse};

/// OAuth2 integration settings.
#[derive(Debug, Clone)]
pub struct OAuthSettings {
    /// CRM account base URL without a trailing slash.
    pub base_url: String,
    pub client_id: String,
    pub client_secret: SecretString,
    pub redirect_uri: String,
    pub state: String,
}

impl OAuthSettings {
    /// Builds settings from the `[crm]` section; every OAuth field is required.
    pub fn from_config(config: &CrmConfig) -> Result<Self, CallbridgeError> {
        let require = |value: &Option<String>, key: &str| {
            value
                .as_deref()
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_string)
                .ok_or_else(|| CallbridgeError::Config(format!("crm.{key} is required")))
        };

        Ok(Self {
            base_url: config.resolved_base_url().ok_or_else(|| {
                CallbridgeError::Config("crm.subdomain or crm.base_url is required".into())
            })?,
            client_id: require(&config.client_id, "client_id")?,
            client_secret: SecretString::from(require(&config.client_secret, "client_secret")?),
            redirect_uri: require(&config.redirect_uri, "redirect_uri")?,
            state: config.oauth_state.clone(),
        })
    }
}

#[derive(Default)]
struct TokenSlot {
    pair: Option<Arc<TokenPair>>,
    generation: u64,
}

/// Outcome of the most recent refresh attempt, shared with waiters.
#[derive(Default)]
struct RefreshState {
    last: Option<Result<(Arc<TokenPair>, u64), String>>,
}

/// Holds the current token pair and performs OAuth2 exchanges.
pub struct CredentialStore {
    http: reqwest::Client,
    settings: OAuthSettings,
    slot: RwLock<TokenSlot>,
    refresh_guard: Mutex<RefreshState>,
    /// Completed refresh attempts, successful or not. Written under `refresh_guard`.
    refresh_attempts: AtomicU64,
    persistence: Arc<dyn TokenPersistence>,
}

impl std::fmt::Debug for CredentialStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialStore")
            .field("base_url", &self.settings.base_url)
            .field("client_id", &self.settings.client_id)
            .field(
                "refresh_attempts",
                &self.refresh_attempts.load(Ordering::Relaxed),
            )
            .finish_non_exhaustive()
    }
}

impl CredentialStore {
    pub fn new(
        settings: OAuthSettings,
        persistence: Arc<dyn TokenPersistence>,
        timeout: Duration,
    ) -> Result<Self, CallbridgeError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| CallbridgeError::Internal(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            http,
            settings,
            slot: RwLock::new(TokenSlot::default()),
            refresh_guard: Mutex::new(RefreshState::default()),
            refresh_attempts: AtomicU64::new(0),
            persistence,
        })
    }

    pub fn settings(&self) -> &OAuthSettings {
        &self.settings
    }

    /// The URL an operator opens to grant the integration access.
    pub fn authorization_url(&self) -> Result<String, CallbridgeError> {
        let url = reqwest::Url::parse_with_params(
            &format!("{}/oauth", self.settings.base_url),
            &[
                ("client_id", self.settings.client_id.as_str()),
                ("redirect_uri", self.settings.redirect_uri.as_str()),
                ("mode", "post_message"),
                ("state", self.settings.state.as_str()),
            ],
        )
        .map_err(|e| CallbridgeError::Config(format!("invalid CRM base URL: {e}")))?;
        Ok(url.to_string())
    }

    /// The current pair, or `None` while unauthenticated.
    pub async fn current(&self) -> Option<Arc<TokenPair>> {
        self.slot.read().await.pair.clone()
    }

    /// The current pair together with its generation.
    pub async fn current_with_generation(&self) -> Option<(Arc<TokenPair>, u64)> {
        let slot = self.slot.read().await;
        slot.pair.clone().map(|pair| (pair, slot.generation))
    }

    pub async fn is_authenticated(&self) -> bool {
        self.slot.read().await.pair.is_some()
    }

    /// Loads the persisted pair. Failures are logged and leave the store empty.
    pub async fn load(&self) -> bool {
        match self.persistence.load().await {
            Ok(Some(pair)) => {
                info!(updated_at = %pair.updated_at, "loaded persisted CRM tokens");
                self.replace(pair).await;
                true
            }
            Ok(None) => {
                info!("no persisted CRM tokens; authorization required");
                false
            }
            Err(e) => {
                warn!(error = %e, "failed to load persisted CRM tokens");
                false
            }
        }
    }

    /// Persists the current pair, if any.
    pub async fn save(&self) -> Result<(), CallbridgeError> {
        match self.current().await {
            Some(pair) => self.persistence.save(&pair).await,
            None => Ok(()),
        }
    }

    /// Exchanges an authorization code for a new token pair.
    pub async fn exchange_authorization_code(
        &self,
        code: &str,
    ) -> Result<Arc<TokenPair>, CallbridgeError> {
        // Serialize with refreshes so a stale refresh cannot overwrite the new pair.
        let _guard = self.refresh_guard.lock().await;

        let request = TokenRequest {
            client_id: &self.settings.client_id,
            client_secret: self.settings.client_secret.expose_secret(),
            grant_type: "authorization_code",
            code: Some(code),
            refresh_token: None,
            redirect_uri: &self.settings.redirect_uri,
        };

        let tokens = self
            .post_token_request(&request)
            .await
            .map_err(|(status, message)| CallbridgeError::AuthExchange { status, message })?;

        let (pair, generation) = self.install(tokens).await;
        info!(generation, "CRM authorization successful");
        Ok(pair)
    }

    /// Exchanges the refresh token for a new pair (single-flight).
    pub async fn refresh(&self) -> Result<Arc<TokenPair>, CallbridgeError> {
        self.refresh_inner(None).await.map(|(pair, _)| pair)
    }

    /// Refreshes unless the pair has already moved past `used_generation`.
    ///
    /// Returns the pair to retry with and its generation.
    pub async fn refresh_if_stale(
        &self,
        used_generation: u64,
    ) -> Result<(Arc<TokenPair>, u64), CallbridgeError> {
        self.refresh_inner(Some(used_generation)).await
    }

    async fn refresh_inner(
        &self,
        used_generation: Option<u64>,
    ) -> Result<(Arc<TokenPair>, u64), CallbridgeError> {
        let observed = self.refresh_attempts.load(Ordering::Acquire);
        let mut state = self.refresh_guard.lock().await;

        if let Some(used) = used_generation
            && let Some((pair, generation)) = self.current_with_generation().await
            && generation != used
        {
            debug!(used, generation, "token already replaced, skipping refresh");
            return Ok((pair, generation));
        }

        if self.refresh_attempts.load(Ordering::Acquire) != observed
            && let Some(last) = &state.last
        {
            debug!("joined in-flight token refresh");
            return last
                .clone()
                .map_err(|message| CallbridgeError::AuthRefresh { message });
        }

        let outcome = self.exchange_refresh_token().await;
        state.last = Some(match &outcome {
            Ok(installed) => Ok(installed.clone()),
            Err(e) => Err(refresh_message(e)),
        });
        self.refresh_attempts.fetch_add(1, Ordering::Release);
        outcome
    }

    async fn exchange_refresh_token(&self) -> Result<(Arc<TokenPair>, u64), CallbridgeError> {
        let Some(current) = self.current().await else {
            return Err(CallbridgeError::AuthRefresh {
                message: "no refresh token held; authorization required".into(),
            });
        };

        let request = TokenRequest {
            client_id: &self.settings.client_id,
            client_secret: self.settings.client_secret.expose_secret(),
            grant_type: "refresh_token",
            code: None,
            refresh_token: Some(current.refresh_token.expose_secret()),
            redirect_uri: &self.settings.redirect_uri,
        };

        let tokens = match self.post_token_request(&request).await {
            Ok(tokens) => tokens,
            Err((status, message)) => {
                warn!(status = ?status, "CRM token refresh failed");
                return Err(CallbridgeError::AuthRefresh {
                    message: match status {
                        Some(status) => format!("{status}: {message}"),
                        None => message,
                    },
                });
            }
        };

        let installed = self.install(tokens).await;
        info!(generation = installed.1, "CRM tokens refreshed");
        Ok(installed)
    }

    /// POSTs to the token endpoint. Errors carry the HTTP status (if any) and a message.
    async fn post_token_request(
        &self,
        request: &TokenRequest<'_>,
    ) -> Result<TokenResponse, (Option<u16>, String)> {
        let url = format!("{}/oauth2/access_token", self.settings.base_url);
        let response = self
            .http
            .post(&url)
            .json(request)
            .send()
            .await
            .map_err(|e| (None, format!("token request failed: {e}")))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| (Some(status.as_u16()), format!("failed to read body: {e}")))?;

        if !status.is_success() {
            return Err((Some(status.as_u16()), body));
        }

        let tokens: TokenResponse = serde_json::from_str(&body).map_err(|e| {
            (
                Some(status.as_u16()),
                format!("malformed token response: {e}"),
            )
        })?;
        if tokens.access_token.is_empty() || tokens.refresh_token.is_empty() {
            return Err((Some(status.as_u16()), "token response missing tokens".into()));
        }
        Ok(tokens)
    }

    /// Atomically replaces the pair and persists it (best effort).
    async fn install(&self, tokens: TokenResponse) -> (Arc<TokenPair>, u64) {
        let pair = TokenPair::new(tokens.access_token, tokens.refresh_token, Utc::now());
        let installed = self.replace(pair).await;
        if let Err(e) = self.persistence.save(&installed.0).await {
            warn!(error = %e, "failed to persist CRM tokens; keeping them in memory");
        }
        installed
    }

    async fn replace(&self, pair: TokenPair) -> (Arc<TokenPair>, u64) {
        let pair = Arc::new(pair);
        let mut slot = self.slot.write().await;
        slot.pair = Some(pair.clone());
        slot.generation += 1;
        (pair, slot.generation)
    }
}

fn refresh_message(error: &CallbridgeError) -> String {
    match error {
        CallbridgeError::AuthRefresh { message } => message.clone(),
        other => other.to_string(),
    }
}
