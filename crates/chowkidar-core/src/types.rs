// SPDX-FileCopyrightText: 2026 Chowkidar Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Domain types shared across the pipeline.
//!
//! Statuses, intents, actions, and emotions are closed enumerations. They
//! derive `strum` Display/EnumString and snake_case serde so that strings
//! appear only at the external JSON boundary.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Lifecycle status of a session. Advances monotonically; `Error` is
/// terminal from any non-terminal state, `Completed` is terminal.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Queued,
    Processing,
    PerceptionDone,
    IntelligenceDone,
    DecisionDone,
    Completed,
    Error,
}

impl SessionStatus {
    /// Pipeline rank used to enforce monotonic transitions.
    /// `Error` has no rank; it is reachable from any non-terminal state.
    pub fn rank(self) -> Option<u8> {
        match self {
            SessionStatus::Queued => Some(0),
            SessionStatus::Processing => Some(1),
            SessionStatus::PerceptionDone => Some(2),
            SessionStatus::IntelligenceDone => Some(3),
            SessionStatus::DecisionDone => Some(4),
            SessionStatus::Completed => Some(5),
            SessionStatus::Error => None,
        }
    }

    /// True for `Completed` and `Error`.
    pub fn is_terminal(self) -> bool {
        matches!(self, SessionStatus::Completed | SessionStatus::Error)
    }

    /// Whether a transition from `self` to `next` is legal.
    pub fn allows_transition_to(self, next: SessionStatus) -> bool {
        if self.is_terminal() {
            return false;
        }
        if next == SessionStatus::Error {
            return true;
        }
        match (self.rank(), next.rank()) {
            (Some(from), Some(to)) => to > from,
            _ => false,
        }
    }
}

/// Closed set of visitor intents, in classification priority order.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    Aggression,
    Help,
    ScamAttempt,
    OccupancyProbe,
    IdentityClaim,
    EntryRequest,
    GovernmentClaim,
    DomesticStaff,
    ReligiousDonation,
    SalesMarketing,
    ChildElderly,
    Delivery,
    Visitor,
    Unknown,
}

/// Inferred emotional register of the visitor's speech.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Emotion {
    Neutral,
    Aggressive,
    Distressed,
}

impl Emotion {
    /// Weight used in the risk base formula.
    pub fn risk_weight(self) -> f64 {
        match self {
            Emotion::Neutral => 0.2,
            Emotion::Distressed => 0.4,
            Emotion::Aggressive => 0.6,
        }
    }
}

/// The final action chosen by the decision engine.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum FinalAction {
    AutoReply,
    NotifyOwner,
    Escalate,
    Ignore,
}

/// Outcome status of an executed action.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ActionStatus {
    Played,
    Queued,
    Ignored,
    Failed,
}

/// Speaker role in the per-session conversation log.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum TranscriptRole {
    Visitor,
    Doorbell,
}

/// The spine of the pipeline: one ring event from ingress to terminal status.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    /// Opaque identifier, stable for the session lifetime.
    pub id: String,
    /// Source doorbell identifier.
    pub device_id: String,
    pub status: SessionStatus,
    /// In [0,1]; set when intelligence completes, 0 otherwise.
    pub risk_score: f64,
    /// Set when the decision stage completes.
    pub final_action: Option<FinalAction>,
    /// RFC 3339 creation timestamp.
    pub created_at: String,
    /// RFC 3339 last-update timestamp.
    pub last_updated_at: String,
}

/// Ingress record for a ring. Not persisted as-is; bytes are written to the
/// filesystem before the event is enqueued.
#[derive(Debug, Clone, Default)]
pub struct RingEvent {
    /// Caller-chosen session id; minted by the orchestrator when absent.
    pub session_id: Option<String>,
    pub device_id: String,
    /// RFC 3339 timestamp supplied by the device.
    pub timestamp: String,
    pub image_bytes: Option<Vec<u8>>,
    pub audio_bytes: Option<Vec<u8>>,
    pub metadata: Option<serde_json::Value>,
}

/// One detected object with its confidence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObjectDetection {
    pub label: String,
    pub confidence: f64,
}

/// Output of the perception stage. Produced once per session; immutable
/// once stored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PerceptionReport {
    pub session_id: String,
    pub person_detected: bool,
    pub objects: Vec<ObjectDetection>,
    pub vision_confidence: f64,
    pub transcript: String,
    pub stt_confidence: f64,
    pub emotion: Emotion,
    pub anti_spoof_score: f64,
    pub weapon_detected: bool,
    pub weapon_confidence: f64,
    pub weapon_labels: Vec<String>,
    pub image_path: String,
    pub timestamp: String,
}

impl PerceptionReport {
    /// True when any detected object label matches a package-like label.
    pub fn has_object(&self, labels: &[String]) -> bool {
        self.objects
            .iter()
            .any(|o| labels.iter().any(|l| o.label.eq_ignore_ascii_case(l)))
    }
}

/// Output of the intelligence stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntelligenceReport {
    pub session_id: String,
    pub intent: Intent,
    pub reply_text: String,
    pub risk_score: f64,
    pub escalation_required: bool,
    pub tags: Vec<String>,
    pub timestamp: String,
}

/// Dispatch flags attached to a directive.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct Dispatch {
    pub tts: bool,
    pub notify_owner: bool,
    pub escalate: bool,
}

/// Output of the decision stage: the final action plus dispatch flags.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Directive {
    pub session_id: String,
    pub final_action: FinalAction,
    /// The id of the matched rule (R1..R4).
    pub reason: String,
    pub dispatch: Dispatch,
    pub timestamp: String,
}

/// Output of the action stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionResult {
    pub session_id: String,
    pub status: ActionStatus,
    pub action_type: FinalAction,
    pub payload: serde_json::Value,
    pub timestamp: String,
}

/// Append-only per-session conversation log entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptEntry {
    pub session_id: String,
    pub role: TranscriptRole,
    pub content: String,
    pub timestamp: String,
}

/// Append-only audit row written on every stage transition and every
/// externally observable side effect. Never modified.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditRow {
    /// Row id, assigned by the store on append; 0 before insertion.
    #[serde(default)]
    pub id: i64,
    pub session_id: String,
    /// Which agent emitted the row (orchestrator, perception, ...).
    pub agent: String,
    pub action_type: String,
    pub payload: serde_json::Value,
    pub status: String,
    pub short_reason: String,
    pub timestamp: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_transitions_are_monotonic() {
        use SessionStatus::*;
        assert!(Queued.allows_transition_to(Processing));
        assert!(Processing.allows_transition_to(PerceptionDone));
        assert!(Queued.allows_transition_to(Completed));
        assert!(!Processing.allows_transition_to(Queued));
        assert!(!Processing.allows_transition_to(Processing));
    }

    #[test]
    fn error_is_reachable_from_any_non_terminal_state() {
        use SessionStatus::*;
        for status in [Queued, Processing, PerceptionDone, IntelligenceDone, DecisionDone] {
            assert!(status.allows_transition_to(Error));
        }
        assert!(!Completed.allows_transition_to(Error));
        assert!(!Error.allows_transition_to(Error));
    }

    #[test]
    fn terminal_states_allow_nothing() {
        use SessionStatus::*;
        for next in [Queued, Processing, Completed, Error] {
            assert!(!Completed.allows_transition_to(next));
            assert!(!Error.allows_transition_to(next));
        }
    }

    #[test]
    fn emotion_weights_match_policy() {
        assert_eq!(Emotion::Neutral.risk_weight(), 0.2);
        assert_eq!(Emotion::Distressed.risk_weight(), 0.4);
        assert_eq!(Emotion::Aggressive.risk_weight(), 0.6);
    }

    #[test]
    fn has_object_is_case_insensitive() {
        let report = PerceptionReport {
            session_id: "s".into(),
            person_detected: true,
            objects: vec![ObjectDetection {
                label: "Package".into(),
                confidence: 0.78,
            }],
            vision_confidence: 0.88,
            transcript: String::new(),
            stt_confidence: 0.0,
            emotion: Emotion::Neutral,
            anti_spoof_score: 0.0,
            weapon_detected: false,
            weapon_confidence: 0.0,
            weapon_labels: vec![],
            image_path: String::new(),
            timestamp: String::new(),
        };
        assert!(report.has_object(&["package".to_string()]));
        assert!(!report.has_object(&["knife".to_string()]));
    }
}
