// SPDX-FileCopyrightText: 2026 Chowkidar Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Standalone speech-to-text contract, used by the transcription endpoint.

use std::path::Path;

use async_trait::async_trait;

use crate::error::ChowkidarError;

/// A transcription result: the transcript text and a confidence in [0,1].
#[derive(Debug, Clone, Default)]
pub struct Transcription {
    pub transcript: String,
    pub confidence: f64,
}

/// Adapter for speech-to-text over a WAV file on disk.
#[async_trait]
pub trait SttProvider: Send + Sync {
    async fn transcribe(&self, audio_path: &Path) -> Result<Transcription, ChowkidarError>;
}
