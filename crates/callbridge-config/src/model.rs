// SPDX-FileCopyrightText: 2026 Callbridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for callbridge.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use serde::{Deserialize, Serialize};

/// Top-level callbridge configuration.
///
/// Loaded from TOML files following XDG hierarchy, with environment variable overrides.
/// All sections are optional and default to sensible values.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct CallbridgeConfig {
    /// Service identity and logging.
    #[serde(default)]
    pub service: ServiceConfig,

    /// CRM API and OAuth2 settings.
    #[serde(default)]
    pub crm: CrmConfig,

    /// Asterisk Manager Interface connection.
    #[serde(default)]
    pub ami: AmiConfig,

    /// HTTP listener for OAuth callbacks and call webhooks.
    #[serde(default)]
    pub gateway: GatewayConfig,

    /// Call recording storage.
    #[serde(default)]
    pub recordings: RecordingsConfig,

    /// CRM sync worker pool.
    #[serde(default)]
    pub sync: SyncConfig,

    /// Troubleshooting switches. All off by default.
    #[serde(default)]
    pub debug: DebugConfig,
}

/// Service identity and logging configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ServiceConfig {
    /// Display name used in logs.
    #[serde(default = "default_service_name")]
    pub name: String,

    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Optional log file, written in addition to stderr.
    #[serde(default)]
    pub log_file: Option<String>,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            name: default_service_name(),
            log_level: default_log_level(),
            log_file: None,
        }
    }
}

fn default_service_name() -> String {
    "callbridge".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

/// CRM (amoCRM API v4) configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct CrmConfig {
    /// Account subdomain; the API lives at `https://<subdomain>.amocrm.ru`.
    #[serde(default)]
    pub subdomain: Option<String>,

    /// Full base URL. Takes precedence over `subdomain` when set.
    #[serde(default)]
    pub base_url: Option<String>,

    /// OAuth2 integration client id.
    #[serde(default)]
    pub client_id: Option<String>,

    /// OAuth2 integration client secret.
    #[serde(default)]
    pub client_secret: Option<String>,

    /// OAuth2 redirect URI registered with the integration.
    #[serde(default)]
    pub redirect_uri: Option<String>,

    /// `state` parameter used in the authorization URL.
    #[serde(default = "default_oauth_state")]
    pub oauth_state: String,

    /// Path of the persisted token pair.
    #[serde(default = "default_token_file")]
    pub token_file: String,

    /// Source name attached to unsorted leads.
    #[serde(default = "default_source_name")]
    pub source_name: String,

    /// Per-request timeout for CRM calls, in seconds.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Interval of the proactive token refresh, in seconds.
    #[serde(default = "default_token_refresh_interval_secs")]
    pub token_refresh_interval_secs: u64,
}

impl Default for CrmConfig {
    fn default() -> Self {
        Self {
            subdomain: None,
            base_url: None,
            client_id: None,
            client_secret: None,
            redirect_uri: None,
            oauth_state: default_oauth_state(),
            token_file: default_token_file(),
            source_name: default_source_name(),
            request_timeout_secs: default_request_timeout_secs(),
            token_refresh_interval_secs: default_token_refresh_interval_secs(),
        }
    }
}

impl CrmConfig {
    /// Resolves the CRM base URL from `base_url` or `subdomain`.
    pub fn resolved_base_url(&self) -> Option<String> {
        if let Some(url) = self.base_url.as_deref().filter(|u| !u.trim().is_empty()) {
            return Some(url.trim_end_matches('/').to_string());
        }
        self.subdomain
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .map(|s| format!("https://{}.amocrm.ru", s.trim()))
    }
}

fn default_oauth_state() -> String {
    "callbridge_auth".to_string()
}

fn default_token_file() -> String {
    dirs::data_dir()
        .map(|p| p.join("callbridge").join("tokens.json"))
        .unwrap_or_else(|| std::path::PathBuf::from("tokens.json"))
        .to_string_lossy()
        .into_owned()
}

fn default_source_name() -> String {
    "FreePBX".to_string()
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_token_refresh_interval_secs() -> u64 {
    3600
}

/// Asterisk Manager Interface configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AmiConfig {
    /// Connect to AMI at startup. When false the service runs webhook-only.
    #[serde(default = "default_ami_enabled")]
    pub enabled: bool,

    #[serde(default = "default_ami_host")]
    pub host: String,

    #[serde(default = "default_ami_port")]
    pub port: u16,

    /// AMI manager user.
    #[serde(default)]
    pub username: Option<String>,

    /// AMI manager secret.
    #[serde(default)]
    pub secret: Option<String>,

    /// TCP connect and login timeout, in seconds.
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,

    /// Delay before reconnecting after a drop. 0 disables reconnection.
    #[serde(default = "default_reconnect_delay_secs")]
    pub reconnect_delay_secs: u64,

    /// Idle time after which a `Ping` action is sent. 0 disables keepalive.
    #[serde(default = "default_ping_interval_secs")]
    pub ping_interval_secs: u64,

    /// How long to wait for any traffic after a `Ping` before the
    /// connection is treated as dead.
    #[serde(default = "default_ping_timeout_secs")]
    pub ping_timeout_secs: u64,
}

impl Default for AmiConfig {
    fn default() -> Self {
        Self {
            enabled: default_ami_enabled(),
            host: default_ami_host(),
            port: default_ami_port(),
            username: None,
            secret: None,
            connect_timeout_secs: default_connect_timeout_secs(),
            reconnect_delay_secs: default_reconnect_delay_secs(),
            ping_interval_secs: default_ping_interval_secs(),
            ping_timeout_secs: default_ping_timeout_secs(),
        }
    }
}

fn default_ami_enabled() -> bool {
    true
}

fn default_ami_host() -> String {
    "127.0.0.1".to_string()
}

fn default_ami_port() -> u16 {
    5038
}

fn default_connect_timeout_secs() -> u64 {
    10
}

fn default_reconnect_delay_secs() -> u64 {
    30
}

fn default_ping_interval_secs() -> u64 {
    10
}

fn default_ping_timeout_secs() -> u64 {
    5
}

/// HTTP listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct GatewayConfig {
    /// Host address to bind.
    #[serde(default = "default_gateway_host")]
    pub host: String,

    /// Port to bind.
    #[serde(default = "default_gateway_port")]
    pub port: u16,

    /// Bearer token required on `POST /webhook/call`. `None` leaves it open.
    #[serde(default)]
    pub webhook_token: Option<String>,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            host: default_gateway_host(),
            port: default_gateway_port(),
            webhook_token: None,
        }
    }
}

fn default_gateway_host() -> String {
    "0.0.0.0".to_string()
}

fn default_gateway_port() -> u16 {
    8080
}

/// Call recording storage configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RecordingsConfig {
    /// Root of the recording tree (FreePBX: `YYYY/MM/DD/` below it).
    #[serde(default = "default_recordings_root")]
    pub root: String,

    /// Accepted file extensions, compared case-insensitively.
    #[serde(default = "default_recording_extensions")]
    pub extensions: Vec<String>,
}

impl Default for RecordingsConfig {
    fn default() -> Self {
        Self {
            root: default_recordings_root(),
            extensions: default_recording_extensions(),
        }
    }
}

fn default_recordings_root() -> String {
    "/var/spool/asterisk/monitor".to_string()
}

fn default_recording_extensions() -> Vec<String> {
    vec!["wav".to_string(), "mp3".to_string()]
}

/// CRM sync worker pool configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct SyncConfig {
    /// Number of concurrent sync workers.
    #[serde(default = "default_workers")]
    pub workers: usize,

    /// Capacity of the pending call queue.
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,

    /// How long shutdown waits for in-flight syncs, in seconds.
    #[serde(default = "default_drain_timeout_secs")]
    pub drain_timeout_secs: u64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            workers: default_workers(),
            queue_capacity: default_queue_capacity(),
            drain_timeout_secs: default_drain_timeout_secs(),
        }
    }
}

fn default_workers() -> usize {
    4
}

fn default_queue_capacity() -> usize {
    256
}

fn default_drain_timeout_secs() -> u64 {
    30
}

/// Troubleshooting configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct DebugConfig {
    /// Log every tracked channel at info level.
    #[serde(default)]
    pub detailed_ami_logging: bool,

    /// Substitute `test_phone` when a hangup has no routable caller id.
    #[serde(default)]
    pub process_internal_calls: bool,

    /// Phone number used for internal-call substitution and `/test-call`.
    #[serde(default)]
    pub test_phone: Option<String>,
}
