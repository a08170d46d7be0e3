// SPDX-FileCopyrightText: 2026 Chowkidar Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loading for the chowkidar pipeline.
//!
//! TOML files merged through the XDG hierarchy with two environment layers:
//! `CHOWKIDAR_`-prefixed overrides and the bare deployment variables.

pub mod loader;
pub mod model;

pub use loader::{load_config, load_config_from_path, load_config_from_str};
pub use model::{
    AssetsConfig, ChowkidarConfig, GatewayConfig, PipelineConfig, PolicyConfig, ProviderConfig,
    StorageConfig, TtsConfig, VocabConfig,
};
