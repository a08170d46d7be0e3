// SPDX-FileCopyrightText: 2026 Chowkidar Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Event types published on the in-process event bus.
//!
//! Events serialize with a `type` discriminator for WebSocket delivery.
//! Delivery is at-most-once and best-effort; reliability comes from polling
//! the store.

use serde::Serialize;

use crate::types::SessionStatus;

/// A session lifecycle event, published on the `owner` channel and on the
/// per-session channel.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BusEvent {
    /// A new session was created for a ring.
    NewRing {
        session_id: String,
        device_id: String,
        image_url: Option<String>,
    },
    /// A status transition. Carries the doorbell greeting once the
    /// intelligence stage has produced it.
    PipelineStage {
        session_id: String,
        status: SessionStatus,
        risk_score: Option<f64>,
        greeting: Option<String>,
    },
    /// Published the moment a perception report with a weapon is stored,
    /// strictly before the `perception_done` stage event.
    WeaponAlert {
        session_id: String,
        labels: Vec<String>,
        confidence: f64,
    },
    /// The session reached a terminal state.
    SessionEnded { session_id: String, reason: String },
    /// The owner sent a message to the visitor.
    OwnerReply { session_id: String, message: String },
}

impl BusEvent {
    /// The session this event concerns.
    pub fn session_id(&self) -> &str {
        match self {
            BusEvent::NewRing { session_id, .. }
            | BusEvent::PipelineStage { session_id, .. }
            | BusEvent::WeaponAlert { session_id, .. }
            | BusEvent::SessionEnded { session_id, .. }
            | BusEvent::OwnerReply { session_id, .. } => session_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn events_serialize_with_type_discriminator() {
        let event = BusEvent::WeaponAlert {
            session_id: "s1".into(),
            labels: vec!["knife".into()],
            confidence: 0.82,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "weapon_alert");
        assert_eq!(json["session_id"], "s1");
    }

    #[test]
    fn pipeline_stage_serializes_status_snake_case() {
        let event = BusEvent::PipelineStage {
            session_id: "s1".into(),
            status: SessionStatus::PerceptionDone,
            risk_score: None,
            greeting: None,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["status"], "perception_done");
    }
}
