// SPDX-FileCopyrightText: 2026 Chowkidar Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Action stage: executes a directive without deciding anything.
//!
//! `auto_reply` sanitizes and speaks the reply; `notify_owner` and
//! `escalate` produce the owner-facing payload the orchestrator audits and
//! publishes. Failures are logged and returned as `failed`; the executor
//! never retries autonomously.

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use tracing::warn;

use chowkidar_assets::DataDir;
use chowkidar_core::traits::tts::{detect_voice, TtsSynthesizer};
use chowkidar_core::{
    ActionResult, ActionStatus, Directive, FinalAction, IntelligenceReport, PerceptionReport,
};

use crate::gate::InferenceGate;

/// Maximum characters spoken by TTS.
const MAX_REPLY_CHARS: usize = 240;

/// Strip control characters, cap the length, and neutralize double quotes.
pub fn sanitize_reply(text: &str) -> String {
    let safe: String = text.chars().filter(|c| !c.is_control()).collect();
    safe.replace('"', "'").chars().take(MAX_REPLY_CHARS).collect()
}

/// Executes directives against the filesystem and the TTS engine.
pub struct ActionExecutor {
    data: DataDir,
    tts: Arc<dyn TtsSynthesizer>,
    gate: Arc<InferenceGate>,
    timeout: Duration,
}

impl ActionExecutor {
    pub fn new(
        data: DataDir,
        tts: Arc<dyn TtsSynthesizer>,
        gate: Arc<InferenceGate>,
        timeout: Duration,
    ) -> Self {
        Self {
            data,
            tts,
            gate,
            timeout,
        }
    }

    /// Execute one directive. Infallible: failures come back as
    /// `status=failed` with the error in the payload.
    pub async fn execute(
        &self,
        directive: &Directive,
        intelligence: &IntelligenceReport,
        perception: &PerceptionReport,
        now: &str,
    ) -> ActionResult {
        match directive.final_action {
            FinalAction::AutoReply => self.auto_reply(directive, intelligence, now).await,
            FinalAction::NotifyOwner => self.notify(directive, intelligence, perception, false, now),
            FinalAction::Escalate => {
                // Speak the canned security line to the visitor as well; a
                // synthesis failure must not block the escalation itself.
                if let Err(e) = self.speak(&directive.session_id, &intelligence.reply_text).await {
                    warn!(
                        session_id = directive.session_id.as_str(),
                        error = %e,
                        "escalation TTS failed"
                    );
                }
                self.notify(directive, intelligence, perception, true, now)
            }
            FinalAction::Ignore => ActionResult {
                session_id: directive.session_id.clone(),
                status: ActionStatus::Ignored,
                action_type: directive.final_action,
                payload: json!({}),
                timestamp: now.to_string(),
            },
        }
    }

    async fn auto_reply(
        &self,
        directive: &Directive,
        intelligence: &IntelligenceReport,
        now: &str,
    ) -> ActionResult {
        match self.speak(&directive.session_id, &intelligence.reply_text).await {
            Ok(payload) => ActionResult {
                session_id: directive.session_id.clone(),
                status: ActionStatus::Played,
                action_type: directive.final_action,
                payload,
                timestamp: now.to_string(),
            },
            Err(e) => {
                warn!(
                    session_id = directive.session_id.as_str(),
                    error = %e,
                    "auto-reply TTS failed"
                );
                ActionResult {
                    session_id: directive.session_id.clone(),
                    status: ActionStatus::Failed,
                    action_type: directive.final_action,
                    payload: json!({ "error": e.to_string() }),
                    timestamp: now.to_string(),
                }
            }
        }
    }

    /// Sanitize, write the text preview, and synthesize within the budget.
    async fn speak(
        &self,
        session_id: &str,
        reply_text: &str,
    ) -> Result<serde_json::Value, chowkidar_core::ChowkidarError> {
        let text = sanitize_reply(reply_text);
        let preview_path = self.data.tts_preview_path(session_id);
        self.data
            .write_atomic(&preview_path, text.as_bytes())
            .await?;

        let audio_path = self.data.tts_audio_path(session_id);
        let voice = detect_voice(&text);
        {
            let _permit = self.gate.acquire().await;
            tokio::time::timeout(self.timeout, self.tts.synthesize(&text, voice, &audio_path))
                .await
                .map_err(|_| chowkidar_core::ChowkidarError::Timeout {
                    duration: self.timeout,
                })??;
        }

        Ok(json!({
            "tts_text": preview_path.to_string_lossy(),
            "tts_audio": audio_path.to_string_lossy(),
        }))
    }

    fn notify(
        &self,
        directive: &Directive,
        intelligence: &IntelligenceReport,
        perception: &PerceptionReport,
        urgent: bool,
        now: &str,
    ) -> ActionResult {
        let mut payload = json!({
            "message": intelligence.reply_text,
            "risk_score": intelligence.risk_score,
            "image_path": perception.image_path,
        });
        if urgent {
            payload["urgency"] = json!("high");
        }
        ActionResult {
            session_id: directive.session_id.clone(),
            status: ActionStatus::Queued,
            action_type: directive.final_action,
            payload,
            timestamp: now.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tts::NullTts;
    use chowkidar_core::{Dispatch, Emotion, Intent};
    use tempfile::tempdir;

    fn directive(final_action: FinalAction) -> Directive {
        Directive {
            session_id: "s1".into(),
            final_action,
            reason: "R2".into(),
            dispatch: Dispatch::default(),
            timestamp: "t".into(),
        }
    }

    fn intel(reply: &str) -> IntelligenceReport {
        IntelligenceReport {
            session_id: "s1".into(),
            intent: Intent::Delivery,
            reply_text: reply.into(),
            risk_score: 0.0,
            escalation_required: false,
            tags: vec![],
            timestamp: "t".into(),
        }
    }

    fn perception() -> PerceptionReport {
        PerceptionReport {
            session_id: "s1".into(),
            person_detected: true,
            objects: vec![],
            vision_confidence: 0.9,
            transcript: String::new(),
            stt_confidence: 0.0,
            emotion: Emotion::Neutral,
            anti_spoof_score: 0.0,
            weapon_detected: false,
            weapon_confidence: 0.0,
            weapon_labels: vec![],
            image_path: "/data/snaps/s1.jpg".into(),
            timestamp: "t".into(),
        }
    }

    async fn executor() -> (ActionExecutor, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let data = DataDir::new(dir.path());
        data.ensure().await.unwrap();
        let executor = ActionExecutor::new(
            data,
            Arc::new(NullTts),
            Arc::new(InferenceGate::new(2)),
            Duration::from_secs(10),
        );
        (executor, dir)
    }

    #[test]
    fn sanitize_strips_controls_and_caps_length() {
        assert_eq!(sanitize_reply("hi\u{7}\nthere"), "hithere");
        assert_eq!(sanitize_reply("say \"hello\""), "say 'hello'");
        let long = "x".repeat(500);
        assert_eq!(sanitize_reply(&long).chars().count(), 240);
    }

    #[tokio::test]
    async fn auto_reply_writes_preview_and_plays() {
        let (executor, dir) = executor().await;
        let result = executor
            .execute(
                &directive(FinalAction::AutoReply),
                &intel("Please leave the package at the doorstep."),
                &perception(),
                "t",
            )
            .await;

        assert_eq!(result.status, ActionStatus::Played);
        let preview = dir.path().join("tts/s1.txt");
        let content = tokio::fs::read_to_string(&preview).await.unwrap();
        assert_eq!(content, "Please leave the package at the doorstep.");
    }

    #[tokio::test]
    async fn notify_owner_queues_with_payload() {
        let (executor, _dir) = executor().await;
        let result = executor
            .execute(
                &directive(FinalAction::NotifyOwner),
                &intel("Someone is at the door."),
                &perception(),
                "t",
            )
            .await;

        assert_eq!(result.status, ActionStatus::Queued);
        assert_eq!(result.payload["message"], "Someone is at the door.");
        assert_eq!(result.payload["image_path"], "/data/snaps/s1.jpg");
        assert!(result.payload.get("urgency").is_none());
    }

    #[tokio::test]
    async fn escalate_queues_with_urgency_flag() {
        let (executor, dir) = executor().await;
        let result = executor
            .execute(
                &directive(FinalAction::Escalate),
                &intel("I have notified the owner and the security guard."),
                &perception(),
                "t",
            )
            .await;

        assert_eq!(result.status, ActionStatus::Queued);
        assert_eq!(result.payload["urgency"], "high");
        // The security line was also written for the visitor.
        assert!(dir.path().join("tts/s1.txt").exists());
    }

    #[tokio::test]
    async fn ignore_is_ignored() {
        let (executor, _dir) = executor().await;
        let result = executor
            .execute(&directive(FinalAction::Ignore), &intel(""), &perception(), "t")
            .await;
        assert_eq!(result.status, ActionStatus::Ignored);
    }
}
