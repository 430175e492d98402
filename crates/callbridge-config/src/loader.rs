// SPDX-FileCopyrightText: 2026 Callbridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Supports XDG hierarchy: `./callbridge.toml` > `~/.config/callbridge/callbridge.toml`
//! > `/etc/callbridge/callbridge.toml` with environment variable overrides via
//! the `CALLBRIDGE_` prefix.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::Path;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};

use crate::model::CallbridgeConfig;

/// System-wide configuration file.
pub const SYSTEM_CONFIG_PATH: &str = "/etc/callbridge/callbridge.toml";

/// Configuration file looked up in the working directory.
pub const LOCAL_CONFIG_FILE: &str = "callbridge.toml";

/// Top-level sections, used to map `CALLBRIDGE_<SECTION>_<KEY>` env vars.
const SECTIONS: &[&str] = &[
    "service",
    "crm",
    "ami",
    "gateway",
    "recordings",
    "sync",
    "debug",
];

/// Load configuration from the standard XDG hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/callbridge/callbridge.toml` (system-wide)
/// 3. `~/.config/callbridge/callbridge.toml` (user XDG config)
/// 4. `./callbridge.toml` (local directory)
/// 5. `CALLBRIDGE_*` environment variables
pub fn load_config() -> Result<CallbridgeConfig, figment::Error> {
    build_figment().extract()
}

/// Load configuration from a TOML string only (no XDG lookup, no env).
///
/// Used for testing and explicit configuration.
pub fn load_config_from_str(toml_content: &str) -> Result<CallbridgeConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(CallbridgeConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<CallbridgeConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(CallbridgeConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Build the Figment used internally for config loading.
///
/// Returns the Figment before extraction so callers can inspect metadata.
pub fn build_figment() -> Figment {
    Figment::new()
        .merge(Serialized::defaults(CallbridgeConfig::default()))
        .merge(Toml::file(SYSTEM_CONFIG_PATH))
        .merge(Toml::file(user_config_path().unwrap_or_default()))
        .merge(Toml::file(LOCAL_CONFIG_FILE))
        .merge(env_provider())
}

/// `~/.config/callbridge/callbridge.toml`, if a config dir exists.
pub fn user_config_path() -> Option<std::path::PathBuf> {
    dirs::config_dir().map(|d| d.join("callbridge").join(LOCAL_CONFIG_FILE))
}

/// Create the environment variable provider with explicit section mapping.
///
/// Only the first underscore after a known section name becomes a dot, so
/// `CALLBRIDGE_DEBUG_DETAILED_AMI_LOGGING` maps to `debug.detailed_ami_logging`.
fn env_provider() -> Env {
    Env::prefixed("CALLBRIDGE_").map(|key| map_env_key(key.as_str()).into())
}

/// Maps a prefix-stripped env var name to a lowercase dotted config key.
pub fn map_env_key(key: &str) -> String {
    let key = key.to_ascii_lowercase();
    for section in SECTIONS {
        if let Some(rest) = key
            .strip_prefix(section)
            .and_then(|r| r.strip_prefix('_'))
        {
            return format!("{section}.{rest}");
        }
    }
    key
}
