// SPDX-FileCopyrightText: 2026 Callbridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Checks semantic constraints serde cannot express. All problems are
//! collected; validation does not stop at the first one.

use crate::diagnostic::ConfigError;
use crate::model::CallbridgeConfig;

/// Validate a deserialized configuration for semantic correctness.
pub fn validate_config(config: &CallbridgeConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();
    let mut fail = |message: String| errors.push(ConfigError::Validation { message });

    if let Some(subdomain) = config.crm.subdomain.as_deref() {
        let subdomain = subdomain.trim();
        if subdomain.is_empty()
            || !subdomain
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-')
        {
            fail(format!(
                "crm.subdomain `{subdomain}` must be a non-empty DNS label (letters, digits, '-')"
            ));
        }
    }

    if let Some(url) = config.crm.base_url.as_deref()
        && !(url.starts_with("http://") || url.starts_with("https://"))
    {
        fail(format!("crm.base_url `{url}` must start with http:// or https://"));
    }

    if config.crm.request_timeout_secs == 0 {
        fail("crm.request_timeout_secs must be at least 1".to_string());
    }

    if config.crm.token_refresh_interval_secs < 60 {
        fail(format!(
            "crm.token_refresh_interval_secs must be at least 60, got {}",
            config.crm.token_refresh_interval_secs
        ));
    }

    if config.crm.token_file.trim().is_empty() {
        fail("crm.token_file must not be empty".to_string());
    }

    if config.ami.enabled {
        if config.ami.host.trim().is_empty() {
            fail("ami.host must not be empty when ami.enabled = true".to_string());
        }
        if config.ami.port == 0 {
            fail("ami.port must not be 0".to_string());
        }
        if config.ami.ping_interval_secs > 0 && config.ami.ping_timeout_secs == 0 {
            fail("ami.ping_timeout_secs must be at least 1 when keepalive is enabled".to_string());
        }
    }

    if config.gateway.host.trim().is_empty() {
        fail("gateway.host must not be empty".to_string());
    }

    if config.gateway.port == 0 {
        fail("gateway.port must not be 0".to_string());
    }

    if config.recordings.root.trim().is_empty() {
        fail("recordings.root must not be empty".to_string());
    }

    for ext in &config.recordings.extensions {
        if ext.is_empty() || ext.contains('.') {
            fail(format!(
                "recordings.extensions entry `{ext}` must be a bare extension such as `wav`"
            ));
        }
    }

    if config.sync.workers == 0 {
        fail("sync.workers must be at least 1".to_string());
    }

    if config.sync.queue_capacity == 0 {
        fail("sync.queue_capacity must be at least 1".to_string());
    }

    if let Some(phone) = config.debug.test_phone.as_deref()
        && phone.chars().filter(char::is_ascii_digit).count() < 10
    {
        fail(format!("debug.test_phone `{phone}` must contain at least 10 digits"));
    }

    if config.debug.process_internal_calls && config.debug.test_phone.is_none() {
        fail("debug.process_internal_calls requires debug.test_phone".to_string());
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn messages(config: &CallbridgeConfig) -> Vec<String> {
        match validate_config(config) {
            Ok(()) => Vec::new(),
            Err(errors) => errors.iter().map(|e| e.to_string()).collect(),
        }
    }

    #[test]
    fn defaults_are_valid() {
        assert!(validate_config(&CallbridgeConfig::default()).is_ok());
    }

    #[test]
    fn rejects_bad_subdomain() {
        let mut config = CallbridgeConfig::default();
        config.crm.subdomain = Some("acme.corp/x".into());
        let msgs = messages(&config);
        assert_eq!(msgs.len(), 1);
        assert!(msgs[0].contains("crm.subdomain"));
    }

    #[test]
    fn rejects_base_url_without_scheme() {
        let mut config = CallbridgeConfig::default();
        config.crm.base_url = Some("acme.amocrm.ru".into());
        assert!(messages(&config)[0].contains("crm.base_url"));
    }

    #[test]
    fn collects_all_errors() {
        let mut config = CallbridgeConfig::default();
        config.sync.workers = 0;
        config.sync.queue_capacity = 0;
        config.gateway.port = 0;
        assert_eq!(messages(&config).len(), 3);
    }

    #[test]
    fn ami_checks_skipped_when_disabled() {
        let mut config = CallbridgeConfig::default();
        config.ami.enabled = false;
        config.ami.port = 0;
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn internal_call_substitution_needs_test_phone() {
        let mut config = CallbridgeConfig::default();
        config.debug.process_internal_calls = true;
        assert!(messages(&config)[0].contains("debug.test_phone"));

        config.debug.test_phone = Some("+7 (999) 123-45-67".into());
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn short_test_phone_rejected() {
        let mut config = CallbridgeConfig::default();
        config.debug.test_phone = Some("101".into());
        assert!(messages(&config)[0].contains("at least 10 digits"));
    }

    #[test]
    fn dotted_extension_rejected() {
        let mut config = CallbridgeConfig::default();
        config.recordings.extensions = vec![".wav".into()];
        assert!(messages(&config)[0].contains("recordings.extensions"));
    }

    #[test]
    fn keepalive_needs_a_ping_timeout() {
        let mut config = CallbridgeConfig::default();
        config.ami.ping_timeout_secs = 0;
        assert!(messages(&config)[0].contains("ami.ping_timeout_secs"));

        config.ami.ping_interval_secs = 0;
        assert!(validate_config(&config).is_ok());
    }
}
