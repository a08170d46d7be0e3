// SPDX-FileCopyrightText: 2026 Chowkidar Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Perception stage: drives the vision+STT provider under its wall-time
//! budget and derives the rule-based fields (emotion, anti-spoof score).
//!
//! The stage never fails a session: a provider timeout or error degrades
//! to an empty observation and the pipeline continues.

use std::sync::Arc;
use std::time::Duration;

use tracing::warn;

use chowkidar_core::traits::perception::{Observation, PerceptionInput, PerceptionProvider};
use chowkidar_core::{Emotion, PerceptionReport};

use crate::gate::InferenceGate;
use crate::normalize::normalize_transcript;
use crate::vocab::{fold, VocabSet};

/// Compute the anti-spoof heuristic in [0,1].
///
/// No detected person dominates everything else; otherwise low vision
/// confidence, silent audio, and missing audio each add suspicion.
pub fn anti_spoof_score(
    person_detected: bool,
    vision_confidence: f64,
    audio_present: bool,
    transcript_empty: bool,
) -> f64 {
    if !person_detected {
        return 0.9;
    }
    let mut score: f64 = 0.0;
    if vision_confidence <= 0.5 {
        score += 0.3;
    }
    if audio_present && transcript_empty {
        score += 0.2;
    }
    if !audio_present {
        score += 0.1;
    }
    score.clamp(0.0, 1.0)
}

/// Rule-based emotion inference over the normalized transcript.
pub fn infer_emotion(vocab: &VocabSet, folded: &str) -> Emotion {
    if folded.trim().is_empty() {
        return Emotion::Neutral;
    }
    if vocab.matches(folded, &vocab.threat) {
        return Emotion::Aggressive;
    }
    if vocab.matches(folded, &vocab.distress) || vocab.matches(folded, &vocab.distress_soft) {
        return Emotion::Distressed;
    }
    Emotion::Neutral
}

/// Drives a [`PerceptionProvider`] and assembles the stored report.
pub struct PerceptionStage {
    provider: Arc<dyn PerceptionProvider>,
    vocab: Arc<VocabSet>,
    gate: Arc<InferenceGate>,
    timeout: Duration,
}

impl PerceptionStage {
    pub fn new(
        provider: Arc<dyn PerceptionProvider>,
        vocab: Arc<VocabSet>,
        gate: Arc<InferenceGate>,
        timeout: Duration,
    ) -> Self {
        Self {
            provider,
            vocab,
            gate,
            timeout,
        }
    }

    /// Run perception for one ring event. Infallible: provider failure or
    /// timeout yields a degraded report.
    pub async fn run(&self, input: &PerceptionInput, now: &str) -> PerceptionReport {
        let observation = {
            let _permit = self.gate.acquire().await;
            match tokio::time::timeout(self.timeout, self.provider.observe(input)).await {
                Ok(Ok(observation)) => observation,
                Ok(Err(e)) => {
                    warn!(
                        session_id = input.session_id.as_str(),
                        error = %e,
                        "perception provider failed, using degraded report"
                    );
                    Observation::degraded()
                }
                Err(_) => {
                    warn!(
                        session_id = input.session_id.as_str(),
                        timeout_secs = self.timeout.as_secs(),
                        "perception provider exceeded budget, using degraded report"
                    );
                    Observation::degraded()
                }
            }
        };

        self.assemble(input, observation, now)
    }

    fn assemble(
        &self,
        input: &PerceptionInput,
        observation: Observation,
        now: &str,
    ) -> PerceptionReport {
        let normalized = normalize_transcript(&observation.transcript);
        let folded = fold(&normalized);
        let emotion = infer_emotion(&self.vocab, &folded);
        let audio_present = input.audio_path.is_some();
        let anti_spoof = anti_spoof_score(
            observation.person_detected,
            observation.vision_confidence,
            audio_present,
            observation.transcript.trim().is_empty(),
        );

        PerceptionReport {
            session_id: input.session_id.clone(),
            person_detected: observation.person_detected,
            objects: observation.objects,
            vision_confidence: observation.vision_confidence,
            transcript: observation.transcript,
            stt_confidence: observation.stt_confidence,
            emotion,
            anti_spoof_score: anti_spoof,
            weapon_detected: observation.weapon_detected,
            weapon_confidence: observation.weapon_confidence,
            weapon_labels: observation.weapon_labels,
            image_path: input
                .image_path
                .as_ref()
                .map(|p| p.to_string_lossy().into_owned())
                .unwrap_or_default(),
            timestamp: now.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chowkidar_core::ChowkidarError;
    use std::path::PathBuf;

    struct ScriptedProvider(Observation);

    #[async_trait]
    impl PerceptionProvider for ScriptedProvider {
        async fn observe(&self, _input: &PerceptionInput) -> Result<Observation, ChowkidarError> {
            Ok(self.0.clone())
        }
    }

    struct HangingProvider;

    #[async_trait]
    impl PerceptionProvider for HangingProvider {
        async fn observe(&self, _input: &PerceptionInput) -> Result<Observation, ChowkidarError> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(Observation::degraded())
        }
    }

    fn stage(provider: Arc<dyn PerceptionProvider>, timeout: Duration) -> PerceptionStage {
        PerceptionStage::new(
            provider,
            Arc::new(VocabSet::default()),
            Arc::new(InferenceGate::new(2)),
            timeout,
        )
    }

    fn input(audio: bool) -> PerceptionInput {
        PerceptionInput {
            session_id: "s1".into(),
            image_path: Some(PathBuf::from("/data/snaps/s1.jpg")),
            audio_path: audio.then(|| PathBuf::from("/data/tmp/s1/0.wav")),
        }
    }

    #[test]
    fn anti_spoof_no_person_dominates() {
        assert_eq!(anti_spoof_score(false, 0.9, true, false), 0.9);
    }

    #[test]
    fn anti_spoof_silent_visitor_without_audio() {
        // Low confidence + missing audio: 0.3 + 0.1.
        let score = anti_spoof_score(true, 0.5, false, true);
        assert!((score - 0.4).abs() < 1e-9);
    }

    #[test]
    fn anti_spoof_audio_but_no_speech() {
        let score = anti_spoof_score(true, 0.8, true, true);
        assert!((score - 0.2).abs() < 1e-9);
    }

    #[test]
    fn anti_spoof_confident_talking_visitor_is_clean() {
        assert_eq!(anti_spoof_score(true, 0.88, true, false), 0.0);
    }

    #[test]
    fn emotion_threat_vocabulary_is_aggressive() {
        let vocab = VocabSet::default();
        assert_eq!(
            infer_emotion(&vocab, &fold("darwaza khol warna maar dunga")),
            Emotion::Aggressive
        );
    }

    #[test]
    fn emotion_distress_vocabulary_is_distressed() {
        let vocab = VocabSet::default();
        assert_eq!(infer_emotion(&vocab, &fold("help emergency")), Emotion::Distressed);
        assert_eq!(infer_emotion(&vocab, &fold("bachao")), Emotion::Distressed);
    }

    #[test]
    fn emotion_defaults_to_neutral() {
        let vocab = VocabSet::default();
        assert_eq!(infer_emotion(&vocab, &fold("good morning")), Emotion::Neutral);
        assert_eq!(infer_emotion(&vocab, ""), Emotion::Neutral);
    }

    #[tokio::test]
    async fn provider_output_is_assembled_into_report() {
        let observation = Observation {
            person_detected: true,
            objects: vec![],
            vision_confidence: 0.88,
            transcript: "I have a package delivery".into(),
            stt_confidence: 0.9,
            ..Observation::degraded()
        };
        let stage = stage(Arc::new(ScriptedProvider(observation)), Duration::from_secs(8));
        let report = stage.run(&input(true), "2026-01-01T00:00:00Z").await;

        assert!(report.person_detected);
        assert_eq!(report.emotion, Emotion::Neutral);
        assert_eq!(report.anti_spoof_score, 0.0);
        assert_eq!(report.transcript, "I have a package delivery");
        assert_eq!(report.image_path, "/data/snaps/s1.jpg");
    }

    #[tokio::test]
    async fn timeout_degrades_instead_of_failing() {
        let stage = stage(Arc::new(HangingProvider), Duration::from_millis(20));
        let report = stage.run(&input(false), "2026-01-01T00:00:00Z").await;

        assert!(!report.person_detected);
        assert_eq!(report.vision_confidence, 0.0);
        assert_eq!(report.anti_spoof_score, 0.9);
        assert!(report.transcript.is_empty());
    }
}
