// SPDX-FileCopyrightText: 2026 Chowkidar Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the chowkidar pipeline.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use std::time::Duration;

use serde::{Deserialize, Deserializer, Serialize};

/// Top-level chowkidar configuration.
///
/// Loaded from TOML files following XDG hierarchy, with environment variable
/// overrides. All sections are optional and default to sensible values.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ChowkidarConfig {
    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Pipeline scheduling and deadlines.
    #[serde(default)]
    pub pipeline: PipelineConfig,

    /// Data root for snapshots, TTS output, temp audio, logs, member photos.
    #[serde(default)]
    pub assets: AssetsConfig,

    /// SQLite storage settings.
    #[serde(default)]
    pub storage: StorageConfig,

    /// HTTP/WebSocket gateway settings.
    #[serde(default)]
    pub gateway: GatewayConfig,

    /// Injectable provider settings.
    #[serde(default)]
    pub providers: ProviderConfig,

    /// TTS engine invocation settings.
    #[serde(default)]
    pub tts: TtsConfig,

    /// Decision policy settings.
    #[serde(default)]
    pub policy: PolicyConfig,

    /// Keyword vocabulary overrides; compiled defaults apply when absent.
    #[serde(default)]
    pub vocab: VocabConfig,
}

impl Default for ChowkidarConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            pipeline: PipelineConfig::default(),
            assets: AssetsConfig::default(),
            storage: StorageConfig::default(),
            gateway: GatewayConfig::default(),
            providers: ProviderConfig::default(),
            tts: TtsConfig::default(),
            policy: PolicyConfig::default(),
            vocab: VocabConfig::default(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Pipeline scheduling and deadline configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct PipelineConfig {
    /// Maximum number of concurrently running pipeline tasks.
    #[serde(default = "default_max_concurrent_sessions")]
    pub max_concurrent_sessions: usize,

    /// Bounded depth of each per-session work queue.
    #[serde(default = "default_session_queue_depth")]
    pub session_queue_depth: usize,

    /// Seconds a drained session waits for a follow-up event before closing.
    #[serde(default = "default_session_idle_timeout_secs")]
    pub session_idle_timeout_secs: u64,

    /// Wall-time budget in seconds for perception and intelligence providers.
    #[serde(default = "default_provider_timeout_secs")]
    pub provider_timeout_secs: u64,

    /// Wall-time budget in seconds for the action stage.
    #[serde(default = "default_action_timeout_secs")]
    pub action_timeout_secs: u64,

    /// Seconds a queued pipeline task waits for a scheduler slot.
    #[serde(default = "default_semaphore_wait_secs")]
    pub semaphore_wait_secs: u64,

    /// Size of the bounded pool gating CPU-heavy provider work.
    #[serde(default = "default_worker_pool_size")]
    pub worker_pool_size: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_concurrent_sessions: default_max_concurrent_sessions(),
            session_queue_depth: default_session_queue_depth(),
            session_idle_timeout_secs: default_session_idle_timeout_secs(),
            provider_timeout_secs: default_provider_timeout_secs(),
            action_timeout_secs: default_action_timeout_secs(),
            semaphore_wait_secs: default_semaphore_wait_secs(),
            worker_pool_size: default_worker_pool_size(),
        }
    }
}

impl PipelineConfig {
    pub fn session_idle_timeout(&self) -> Duration {
        Duration::from_secs(self.session_idle_timeout_secs)
    }

    pub fn provider_timeout(&self) -> Duration {
        Duration::from_secs(self.provider_timeout_secs)
    }

    pub fn action_timeout(&self) -> Duration {
        Duration::from_secs(self.action_timeout_secs)
    }

    pub fn semaphore_wait(&self) -> Duration {
        Duration::from_secs(self.semaphore_wait_secs)
    }
}

fn default_max_concurrent_sessions() -> usize {
    2
}

fn default_session_queue_depth() -> usize {
    4
}

fn default_session_idle_timeout_secs() -> u64 {
    90
}

fn default_provider_timeout_secs() -> u64 {
    8
}

fn default_action_timeout_secs() -> u64 {
    10
}

fn default_semaphore_wait_secs() -> u64 {
    60
}

fn default_worker_pool_size() -> usize {
    2
}

/// Data root configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AssetsConfig {
    /// Root directory for all persisted files.
    #[serde(default = "default_data_dir")]
    pub data_dir: String,
}

impl Default for AssetsConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
        }
    }
}

fn default_data_dir() -> String {
    "./data".to_string()
}

/// SQLite storage configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Path to the SQLite database file. Defaults to `<data_dir>/db`.
    #[serde(default)]
    pub database_path: Option<String>,
}

impl StorageConfig {
    /// Resolve the database path against the data root.
    pub fn resolved_database_path(&self, data_dir: &str) -> String {
        self.database_path
            .clone()
            .unwrap_or_else(|| format!("{}/db", data_dir.trim_end_matches('/')))
    }
}

/// HTTP/WebSocket gateway configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct GatewayConfig {
    /// Host address to bind.
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to bind.
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8117
}

/// Injectable provider configuration.
///
/// `reply_key` is an opaque secret and is redacted from `Debug` output;
/// it must never be logged.
#[derive(Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ProviderConfig {
    /// Reply provider endpoint URL. `None` disables remote reply generation.
    #[serde(default)]
    pub reply_endpoint: Option<String>,

    /// Reply provider API key.
    #[serde(default)]
    pub reply_key: Option<String>,

    /// Short-circuit all providers to degraded mode (used in tests).
    #[serde(default, deserialize_with = "flexible_bool")]
    pub disable_models: bool,
}

impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("reply_endpoint", &self.reply_endpoint)
            .field(
                "reply_key",
                &self.reply_key.as_ref().map(|_| "[REDACTED]"),
            )
            .field("disable_models", &self.disable_models)
            .finish()
    }
}

/// Accept `true`/`false`, `0`/`1`, and their string forms for flags that
/// arrive via environment variables.
fn flexible_bool<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Flag {
        Bool(bool),
        Int(i64),
        Str(String),
    }

    match Flag::deserialize(deserializer)? {
        Flag::Bool(b) => Ok(b),
        Flag::Int(i) => Ok(i != 0),
        Flag::Str(s) => match s.trim() {
            "1" | "true" | "yes" => Ok(true),
            _ => Ok(false),
        },
    }
}

/// TTS engine configuration. The engine is invoked with an argument list,
/// never through a shell.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct TtsConfig {
    /// Synthesizer executable (espeak-compatible CLI).
    #[serde(default = "default_tts_program")]
    pub program: String,

    /// Voice argument for Latin-script text.
    #[serde(default = "default_english_voice")]
    pub english_voice: String,

    /// Voice argument for Devanagari text.
    #[serde(default = "default_hindi_voice")]
    pub hindi_voice: String,
}

impl Default for TtsConfig {
    fn default() -> Self {
        Self {
            program: default_tts_program(),
            english_voice: default_english_voice(),
            hindi_voice: default_hindi_voice(),
        }
    }
}

fn default_tts_program() -> String {
    "espeak".to_string()
}

fn default_english_voice() -> String {
    "en".to_string()
}

fn default_hindi_voice() -> String {
    "hi".to_string()
}

/// Decision policy configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct PolicyConfig {
    /// Devices permitted to auto-reply. `None` permits every device.
    #[serde(default)]
    pub auto_reply_devices: Option<Vec<String>>,
}

impl PolicyConfig {
    /// Whether low-risk auto-reply is permitted for the given device.
    pub fn auto_reply_permitted(&self, device_id: &str) -> bool {
        match &self.auto_reply_devices {
            None => true,
            Some(devices) => devices.iter().any(|d| d == device_id),
        }
    }
}

/// Keyword vocabulary overrides. Each list replaces the compiled default
/// for its category when present. Keywords are matched case-folded on
/// whole words or bigrams against the normalized transcript.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct VocabConfig {
    #[serde(default)]
    pub threat: Option<Vec<String>>,
    #[serde(default)]
    pub distress: Option<Vec<String>>,
    #[serde(default)]
    pub scam: Option<Vec<String>>,
    #[serde(default)]
    pub occupancy: Option<Vec<String>>,
    #[serde(default)]
    pub identity: Option<Vec<String>>,
    #[serde(default)]
    pub entry: Option<Vec<String>>,
    #[serde(default)]
    pub government: Option<Vec<String>>,
    #[serde(default)]
    pub staff: Option<Vec<String>>,
    #[serde(default)]
    pub donation: Option<Vec<String>>,
    #[serde(default)]
    pub sales: Option<Vec<String>>,
    #[serde(default)]
    pub child_elderly: Option<Vec<String>>,
    #[serde(default)]
    pub delivery: Option<Vec<String>>,
    #[serde(default)]
    pub visitor: Option<Vec<String>>,
    #[serde(default)]
    pub package_objects: Option<Vec<String>>,
}
