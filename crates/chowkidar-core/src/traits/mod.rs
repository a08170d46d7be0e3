// SPDX-FileCopyrightText: 2026 Chowkidar Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Capability traits for injectable providers.
//!
//! The pipeline treats vision+STT, reply generation, standalone STT, and TTS
//! synthesis as narrow injectable contracts. Swapping providers does not
//! change the pipeline; deadlines are enforced by the orchestrator, not by
//! the provider itself.

pub mod perception;
pub mod reply;
pub mod stt;
pub mod tts;

pub use perception::{Observation, PerceptionInput, PerceptionProvider};
pub use reply::{ReplyContext, ReplyProvider};
pub use stt::SttProvider;
pub use tts::{TtsSynthesizer, TtsVoice};
