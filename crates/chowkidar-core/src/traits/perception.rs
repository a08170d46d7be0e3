// SPDX-FileCopyrightText: 2026 Chowkidar Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Perception provider contract: vision + STT over a snapshot and audio clip.

use std::path::PathBuf;

use async_trait::async_trait;

use crate::error::ChowkidarError;
use crate::types::ObjectDetection;

/// Input handed to a perception provider.
#[derive(Debug, Clone)]
pub struct PerceptionInput {
    pub session_id: String,
    pub image_path: Option<PathBuf>,
    pub audio_path: Option<PathBuf>,
}

/// Raw provider output, before the pipeline computes normalization,
/// emotion, and the anti-spoof score.
#[derive(Debug, Clone, Default)]
pub struct Observation {
    pub person_detected: bool,
    pub objects: Vec<ObjectDetection>,
    pub vision_confidence: f64,
    pub transcript: String,
    pub stt_confidence: f64,
    pub weapon_detected: bool,
    pub weapon_confidence: f64,
    pub weapon_labels: Vec<String>,
}

impl Observation {
    /// The degraded observation: zeroed confidences and empty fields, used
    /// when the provider times out or models are disabled.
    pub fn degraded() -> Self {
        Self::default()
    }
}

/// Adapter for vision + STT inference over a ring's assets.
///
/// A provider may return a degraded observation (`person_detected=false`,
/// zero confidences) instead of failing. The orchestrator enforces the
/// wall-time budget and substitutes [`Observation::degraded`] on timeout.
#[async_trait]
pub trait PerceptionProvider: Send + Sync {
    async fn observe(&self, input: &PerceptionInput) -> Result<Observation, ChowkidarError>;
}
