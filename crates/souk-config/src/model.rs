// SPDX-FileCopyrightText: 2026 Souk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the souk chat gateway.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use serde::{Deserialize, Serialize};

/// Top-level souk configuration.
///
/// Loaded from TOML files following XDG hierarchy, with environment variable
/// overrides. All sections are optional and default to sensible values.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct SoukConfig {
    /// Process identity and logging.
    #[serde(default)]
    pub service: ServiceConfig,

    /// Connection gateway settings.
    #[serde(default)]
    pub gateway: GatewayConfig,

    /// Storage backend settings.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Push notification delivery settings.
    #[serde(default)]
    pub push: PushConfig,
}

/// Process identity and logging configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ServiceConfig {
    /// Display name of the service.
    #[serde(default = "default_service_name")]
    pub name: String,

    /// Identifier for this gateway instance within the fleet. Appears in
    /// presence locators; must differ between instances sharing a presence
    /// store.
    #[serde(default = "default_instance_id")]
    pub instance_id: String,

    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            name: default_service_name(),
            instance_id: default_instance_id(),
            log_level: default_log_level(),
        }
    }
}

fn default_service_name() -> String {
    "souk".to_string()
}

fn default_instance_id() -> String {
    format!("souk-{}", std::process::id())
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Connection gateway configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct GatewayConfig {
    /// Host address to bind.
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to bind.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Shared secret used to verify connection credentials. `None` means no
    /// auth is configured; `serve` refuses to start in that state
    /// (fail-closed).
    #[serde(default)]
    pub auth_secret: Option<String>,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            auth_secret: None,
        }
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8090
}

/// Storage backend configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// Enable WAL (Write-Ahead Logging) mode for SQLite.
    #[serde(default = "default_wal_mode")]
    pub wal_mode: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            wal_mode: default_wal_mode(),
        }
    }
}

fn default_database_path() -> String {
    dirs::data_dir()
        .map(|p| p.join("souk").join("souk.db"))
        .unwrap_or_else(|| std::path::PathBuf::from("souk.db"))
        .to_string_lossy()
        .into_owned()
}

fn default_wal_mode() -> bool {
    true
}

/// Push notification delivery configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct PushConfig {
    /// Push provider HTTP endpoint. `None` disables the delivery worker
    /// pool; jobs still accumulate in the queue.
    #[serde(default)]
    pub endpoint: Option<String>,

    /// API key sent to the push provider. `None` sends unauthenticated
    /// requests (local development providers).
    #[serde(default)]
    pub api_key: Option<String>,

    /// Number of concurrent delivery workers.
    #[serde(default = "default_workers")]
    pub workers: usize,

    /// Idle poll interval for the delivery workers, in milliseconds.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

impl Default for PushConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            api_key: None,
            workers: default_workers(),
            poll_interval_ms: default_poll_interval_ms(),
        }
    }
}

fn default_workers() -> usize {
    2
}

fn default_poll_interval_ms() -> u64 {
    500
}
