// SPDX-FileCopyrightText: 2026 Chowkidar Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The four reasoning stages of the chowkidar pipeline and their supporting
//! machinery: transcript normalization, keyword vocabularies, canned replies
//! with safety screening, TTS synthesis, and the HTTP reply provider.
//!
//! Stage engines are stateless between calls and never call back into the
//! orchestrator; results flow forward and events flow out over the bus.

pub mod action;
pub mod decision;
pub mod gate;
pub mod intelligence;
pub mod normalize;
pub mod perception;
pub mod providers;
pub mod replies;
pub mod reply_http;
pub mod tts;
pub mod vocab;

pub use action::{sanitize_reply, ActionExecutor};
pub use decision::DecisionEngine;
pub use gate::InferenceGate;
pub use intelligence::{Assessment, IntelligenceEngine, IntelligenceOutcome};
pub use normalize::normalize_transcript;
pub use perception::PerceptionStage;
pub use providers::{DisabledPerception, DisabledStt};
pub use replies::{canned_reply, screen_reply, OCCUPANCY_LINE, SECURITY_LINE};
pub use reply_http::HttpReplyProvider;
pub use tts::{CommandTts, NullTts};
pub use vocab::VocabSet;
