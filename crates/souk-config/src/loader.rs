// SPDX-FileCopyrightText: 2026 Souk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Supports XDG hierarchy: `./souk.toml` > `~/.config/souk/souk.toml` >
//! `/etc/souk/souk.toml` with environment variable overrides via the
//! `SOUK_` prefix.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::Path;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};

use crate::model::SoukConfig;

/// Load configuration from the standard XDG hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/souk/souk.toml` (system-wide)
/// 3. `~/.config/souk/souk.toml` (user XDG config)
/// 4. `./souk.toml` (local directory)
/// 5. `SOUK_*` environment variables
pub fn load_config() -> Result<SoukConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(SoukConfig::default()))
        .merge(Toml::file("/etc/souk/souk.toml"))
        .merge(Toml::file(
            dirs::config_dir()
                .map(|d| d.join("souk/souk.toml"))
                .unwrap_or_default(),
        ))
        .merge(Toml::file("souk.toml"))
        .merge(env_provider())
        .extract()
}

/// Load configuration from a TOML string only (no XDG lookup, no env).
///
/// Used for testing and explicit config specification.
pub fn load_config_from_str(toml_content: &str) -> Result<SoukConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(SoukConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<SoukConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(SoukConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Create the environment variable provider using explicit `map()` for
/// section-to-dot mapping.
///
/// Uses `Env::map()` NOT `Env::split("_")` to avoid ambiguity with
/// underscore-containing key names: `SOUK_GATEWAY_AUTH_SECRET` must map to
/// `gateway.auth_secret`, not `gateway.auth.secret`.
fn env_provider() -> Env {
    Env::prefixed("SOUK_").map(|key| {
        // `key` is the lowercased env var name with prefix stripped.
        // Example: SOUK_STORAGE_DATABASE_PATH -> "storage_database_path"
        let key_str = key.as_str();
        let mapped = key_str
            .replacen("service_", "service.", 1)
            .replacen("gateway_", "gateway.", 1)
            .replacen("storage_", "storage.", 1)
            .replacen("push_", "push.", 1);
        mapped.into()
    })
}
