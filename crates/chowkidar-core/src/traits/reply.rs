// SPDX-FileCopyrightText: 2026 Chowkidar Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Reply provider contract: LLM-backed visitor reply generation.

use async_trait::async_trait;

use crate::error::ChowkidarError;
use crate::types::TranscriptRole;

/// Bounded context handed to a reply provider: a system prompt, the last
/// two transcript turns at most, and a one-line perception summary.
#[derive(Debug, Clone)]
pub struct ReplyContext {
    pub system_prompt: String,
    pub turns: Vec<(TranscriptRole, String)>,
    pub perception_summary: String,
}

/// Adapter for remote reply generation.
///
/// Any failure is recovered by the caller with a canned reply for the
/// classified intent; generated text is screened before use.
#[async_trait]
pub trait ReplyProvider: Send + Sync {
    async fn generate(&self, context: &ReplyContext) -> Result<String, ChowkidarError>;
}
