// SPDX-FileCopyrightText: 2026 Souk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Validates semantic constraints that cannot be expressed via serde
//! attributes, such as valid bind addresses and worker pool sizes.

use crate::diagnostic::ConfigError;
use crate::model::SoukConfig;

/// Minimum length for the shared auth secret when one is configured.
const MIN_SECRET_LEN: usize = 16;

/// Validate a deserialized configuration for semantic correctness.
///
/// Returns `Ok(())` if all validations pass, or `Err(Vec<ConfigError>)` with
/// all collected validation errors (does not fail fast).
pub fn validate_config(config: &SoukConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    let host = config.gateway.host.trim();
    if host.is_empty() {
        errors.push(ConfigError::Validation {
            message: "gateway.host must not be empty".to_string(),
        });
    } else {
        let is_valid_ip = host.parse::<std::net::IpAddr>().is_ok();
        let is_valid_hostname = host
            .chars()
            .all(|c| c.is_alphanumeric() || c == '.' || c == '-' || c == ':');
        if !is_valid_ip && !is_valid_hostname {
            errors.push(ConfigError::Validation {
                message: format!(
                    "gateway.host `{host}` is not a valid IP address or hostname"
                ),
            });
        }
    }

    if let Some(ref secret) = config.gateway.auth_secret
        && secret.len() < MIN_SECRET_LEN
    {
        errors.push(ConfigError::Validation {
            message: format!(
                "gateway.auth_secret must be at least {MIN_SECRET_LEN} bytes, got {}",
                secret.len()
            ),
        });
    }

    if config.storage.database_path.trim().is_empty() {
        errors.push(ConfigError::Validation {
            message: "storage.database_path must not be empty".to_string(),
        });
    }

    if config.service.instance_id.trim().is_empty() {
        errors.push(ConfigError::Validation {
            message: "service.instance_id must not be empty".to_string(),
        });
    }

    if config.push.workers == 0 {
        errors.push(ConfigError::Validation {
            message: "push.workers must be at least 1".to_string(),
        });
    }

    if config.push.poll_interval_ms == 0 {
        errors.push(ConfigError::Validation {
            message: "push.poll_interval_ms must be at least 1".to_string(),
        });
    }

    if let Some(ref endpoint) = config.push.endpoint
        && !(endpoint.starts_with("http://") || endpoint.starts_with("https://"))
    {
        errors.push(ConfigError::Validation {
            message: format!("push.endpoint `{endpoint}` must be an http(s) URL"),
        });
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
