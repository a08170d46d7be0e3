// SPDX-FileCopyrightText: 2026 Chowkidar Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Supports XDG hierarchy: `./chowkidar.toml` > `~/.config/chowkidar/chowkidar.toml`
//! > `/etc/chowkidar/chowkidar.toml`, with two environment layers:
//! `CHOWKIDAR_`-prefixed overrides and the bare deployment variables
//! (`MAX_CONCURRENT_SESSIONS`, `DATA_DIR`, ...).

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::Path;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};

use crate::model::ChowkidarConfig;

/// The bare deployment environment variables and the config keys they map to.
const DEPLOY_ENV_KEYS: &[(&str, &str)] = &[
    ("max_concurrent_sessions", "pipeline.max_concurrent_sessions"),
    ("session_idle_timeout_sec", "pipeline.session_idle_timeout_secs"),
    ("provider_timeout_sec", "pipeline.provider_timeout_secs"),
    ("action_timeout_sec", "pipeline.action_timeout_secs"),
    ("data_dir", "assets.data_dir"),
    ("reply_provider_key", "providers.reply_key"),
    ("disable_models", "providers.disable_models"),
];

/// Load configuration from the standard XDG hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/chowkidar/chowkidar.toml` (system-wide)
/// 3. `~/.config/chowkidar/chowkidar.toml` (user XDG config)
/// 4. `./chowkidar.toml` (local directory)
/// 5. `CHOWKIDAR_*` environment variables
/// 6. Bare deployment variables (`MAX_CONCURRENT_SESSIONS`, `DATA_DIR`, ...)
pub fn load_config() -> Result<ChowkidarConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(ChowkidarConfig::default()))
        .merge(Toml::file("/etc/chowkidar/chowkidar.toml"))
        .merge(Toml::file(
            dirs::config_dir()
                .map(|d| d.join("chowkidar/chowkidar.toml"))
                .unwrap_or_default(),
        ))
        .merge(Toml::file("chowkidar.toml"))
        .merge(prefixed_env_provider())
        .merge(deploy_env_provider())
        .extract()
}

/// Load configuration from inline TOML only (no XDG lookup, no env).
///
/// Used for testing and explicit config specification.
pub fn load_config_from_str(toml_content: &str) -> Result<ChowkidarConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(ChowkidarConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<ChowkidarConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(ChowkidarConfig::default()))
        .merge(Toml::file(path))
        .merge(prefixed_env_provider())
        .merge(deploy_env_provider())
        .extract()
}

/// `CHOWKIDAR_`-prefixed overrides using explicit `map()` for section-to-dot
/// mapping.
///
/// CRITICAL: uses `Env::map()` NOT `Env::split("_")` to avoid ambiguity with
/// underscore-containing key names. `CHOWKIDAR_PIPELINE_MAX_CONCURRENT_SESSIONS`
/// must map to `pipeline.max_concurrent_sessions`, not
/// `pipeline.max.concurrent.sessions`.
fn prefixed_env_provider() -> Env {
    Env::prefixed("CHOWKIDAR_").map(|key| {
        let key_str = key.as_str();
        let mapped = key_str
            .replacen("pipeline_", "pipeline.", 1)
            .replacen("assets_", "assets.", 1)
            .replacen("storage_", "storage.", 1)
            .replacen("gateway_", "gateway.", 1)
            .replacen("providers_", "providers.", 1)
            .replacen("tts_", "tts.", 1)
            .replacen("policy_", "policy.", 1)
            .replacen("vocab_", "vocab.", 1);
        mapped.into()
    })
}

/// Bare deployment variables mapped onto their config keys.
fn deploy_env_provider() -> Env {
    Env::raw()
        .only(&[
            "MAX_CONCURRENT_SESSIONS",
            "SESSION_IDLE_TIMEOUT_SEC",
            "PROVIDER_TIMEOUT_SEC",
            "ACTION_TIMEOUT_SEC",
            "DATA_DIR",
            "REPLY_PROVIDER_KEY",
            "DISABLE_MODELS",
        ])
        .map(|key| {
            let lowered = key.as_str().to_ascii_lowercase();
            for (bare, dotted) in DEPLOY_ENV_KEYS {
                if lowered == *bare {
                    return (*dotted).into();
                }
            }
            lowered.into()
        })
}
