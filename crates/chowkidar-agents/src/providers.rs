// SPDX-FileCopyrightText: 2026 Chowkidar Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Degraded provider implementations used when `DISABLE_MODELS=1` and in
//! tests. Real vision/STT backends plug in through the same traits.

use std::path::Path;

use async_trait::async_trait;

use chowkidar_core::traits::perception::{Observation, PerceptionInput, PerceptionProvider};
use chowkidar_core::traits::stt::{SttProvider, Transcription};
use chowkidar_core::ChowkidarError;

/// Perception short-circuited to the degraded observation.
pub struct DisabledPerception;

#[async_trait]
impl PerceptionProvider for DisabledPerception {
    async fn observe(&self, _input: &PerceptionInput) -> Result<Observation, ChowkidarError> {
        Ok(Observation::degraded())
    }
}

/// STT short-circuited to an empty transcript.
pub struct DisabledStt;

#[async_trait]
impl SttProvider for DisabledStt {
    async fn transcribe(&self, _audio_path: &Path) -> Result<Transcription, ChowkidarError> {
        Ok(Transcription::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn disabled_perception_degrades() {
        let provider = DisabledPerception;
        let observation = provider
            .observe(&PerceptionInput {
                session_id: "s".into(),
                image_path: None,
                audio_path: None,
            })
            .await
            .unwrap();
        assert!(!observation.person_detected);
        assert_eq!(observation.vision_confidence, 0.0);
    }

    #[tokio::test]
    async fn disabled_stt_is_silent() {
        let provider = DisabledStt;
        let result = provider.transcribe(Path::new("/tmp/a.wav")).await.unwrap();
        assert!(result.transcript.is_empty());
        assert_eq!(result.confidence, 0.0);
    }
}
