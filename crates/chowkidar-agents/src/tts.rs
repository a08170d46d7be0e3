// SPDX-FileCopyrightText: 2026 Chowkidar Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! TTS synthesizer implementations.
//!
//! `CommandTts` drives an espeak-compatible CLI through an argument-list
//! interface only; text is never interpolated into a shell string.

use std::path::Path;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::debug;

use chowkidar_config::TtsConfig;
use chowkidar_core::traits::tts::{TtsSynthesizer, TtsVoice};
use chowkidar_core::ChowkidarError;

/// Synthesizes speech by invoking an external engine with an argv vector.
pub struct CommandTts {
    program: String,
    english_voice: String,
    hindi_voice: String,
}

impl CommandTts {
    pub fn new(config: &TtsConfig) -> Self {
        Self {
            program: config.program.clone(),
            english_voice: config.english_voice.clone(),
            hindi_voice: config.hindi_voice.clone(),
        }
    }

    fn voice_arg(&self, voice: TtsVoice) -> &str {
        match voice {
            TtsVoice::English => &self.english_voice,
            TtsVoice::Hindi => &self.hindi_voice,
        }
    }
}

#[async_trait]
impl TtsSynthesizer for CommandTts {
    async fn synthesize(
        &self,
        text: &str,
        voice: TtsVoice,
        out_path: &Path,
    ) -> Result<(), ChowkidarError> {
        let output = Command::new(&self.program)
            .arg("-v")
            .arg(self.voice_arg(voice))
            .arg("-w")
            .arg(out_path)
            .arg(text)
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| ChowkidarError::TransientProvider {
                message: format!("failed to launch TTS engine '{}': {e}", self.program),
                source: Some(Box::new(e)),
            })?;

        if !output.status.success() {
            return Err(ChowkidarError::TransientProvider {
                message: format!(
                    "TTS engine exited with {}: {}",
                    output.status,
                    String::from_utf8_lossy(&output.stderr).trim()
                ),
                source: None,
            });
        }

        debug!(path = %out_path.display(), "TTS audio synthesized");
        Ok(())
    }
}

/// TTS stand-in for tests and `DISABLE_MODELS=1`: produces no audio and
/// always succeeds.
pub struct NullTts;

#[async_trait]
impl TtsSynthesizer for NullTts {
    async fn synthesize(
        &self,
        _text: &str,
        _voice: TtsVoice,
        _out_path: &Path,
    ) -> Result<(), ChowkidarError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn voice_args_come_from_config() {
        let tts = CommandTts::new(&TtsConfig {
            program: "espeak".into(),
            english_voice: "en-in".into(),
            hindi_voice: "hi".into(),
        });
        assert_eq!(tts.voice_arg(TtsVoice::English), "en-in");
        assert_eq!(tts.voice_arg(TtsVoice::Hindi), "hi");
    }

    #[tokio::test]
    async fn null_tts_always_succeeds() {
        let tts = NullTts;
        tts.synthesize("hello", TtsVoice::English, Path::new("/nonexistent/out.wav"))
            .await
            .unwrap();
    }
}
