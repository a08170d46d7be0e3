// SPDX-FileCopyrightText: 2026 Chowkidar Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Text-to-speech synthesis contract.

use std::path::Path;

use async_trait::async_trait;

use crate::error::ChowkidarError;

/// Voice selected by script detection: Devanagari content selects the
/// Hindi voice, everything else the English one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TtsVoice {
    English,
    Hindi,
}

/// Detect the voice for a piece of text by scanning for Devanagari
/// codepoints (U+0900..U+097F).
pub fn detect_voice(text: &str) -> TtsVoice {
    if text.chars().any(|c| ('\u{0900}'..='\u{097F}').contains(&c)) {
        TtsVoice::Hindi
    } else {
        TtsVoice::English
    }
}

/// Adapter for audio synthesis of a sanitized reply.
///
/// Implementations must invoke any external engine via an argument-list
/// interface only, never a shell string. The action executor enforces the
/// synthesis timeout.
#[async_trait]
pub trait TtsSynthesizer: Send + Sync {
    async fn synthesize(
        &self,
        text: &str,
        voice: TtsVoice,
        out_path: &Path,
    ) -> Result<(), ChowkidarError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn latin_text_selects_english_voice() {
        assert_eq!(detect_voice("Please wait at the door"), TtsVoice::English);
    }

    #[test]
    fn devanagari_text_selects_hindi_voice() {
        assert_eq!(detect_voice("कृपया प्रतीक्षा करें"), TtsVoice::Hindi);
    }

    #[test]
    fn mixed_text_selects_hindi_voice() {
        assert_eq!(detect_voice("owner को bulao"), TtsVoice::Hindi);
    }
}
