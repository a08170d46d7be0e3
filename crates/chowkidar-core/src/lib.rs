// SPDX-FileCopyrightText: 2026 Chowkidar Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the chowkidar doorbell pipeline.
//!
//! This crate provides the error taxonomy, domain types, bus event types,
//! and the capability traits implemented by injectable providers. All other
//! workspace crates depend on it; it depends on none of them.

pub mod error;
pub mod events;
pub mod traits;
pub mod types;

// Re-export key items at crate root for ergonomic imports.
pub use error::ChowkidarError;
pub use events::BusEvent;
pub use types::{
    ActionResult, ActionStatus, AuditRow, Directive, Dispatch, Emotion, FinalAction, Intent,
    IntelligenceReport, ObjectDetection, PerceptionReport, RingEvent, Session, SessionStatus,
    TranscriptEntry, TranscriptRole,
};

// Re-export the capability traits.
pub use traits::{PerceptionProvider, ReplyProvider, SttProvider, TtsSynthesizer};

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn chowkidar_error_has_all_variants() {
        // Verify every variant of the taxonomy can be constructed.
        let _config = ChowkidarError::Config("test".into());
        let _store = ChowkidarError::Store {
            source: Box::new(std::io::Error::other("test")),
        };
        let _provider = ChowkidarError::TransientProvider {
            message: "test".into(),
            source: None,
        };
        let _contract = ChowkidarError::ContractViolation {
            message: "test".into(),
        };
        let _pressure = ChowkidarError::BackPressure {
            session_id: "s1".into(),
        };
        let _cancelled = ChowkidarError::Cancelled;
        let _security = ChowkidarError::SecurityContract {
            message: "test".into(),
        };
        let _timeout = ChowkidarError::Timeout {
            duration: std::time::Duration::from_secs(8),
        };
        let _internal = ChowkidarError::Internal("test".into());
    }

    #[test]
    fn session_status_roundtrips_through_strings() {
        let all = [
            SessionStatus::Queued,
            SessionStatus::Processing,
            SessionStatus::PerceptionDone,
            SessionStatus::IntelligenceDone,
            SessionStatus::DecisionDone,
            SessionStatus::Completed,
            SessionStatus::Error,
        ];
        for status in &all {
            let s = status.to_string();
            let parsed = SessionStatus::from_str(&s).expect("should parse back");
            assert_eq!(*status, parsed);
        }
    }

    #[test]
    fn intent_serializes_snake_case() {
        let json = serde_json::to_string(&Intent::ScamAttempt).unwrap();
        assert_eq!(json, "\"scam_attempt\"");
        let parsed: Intent = serde_json::from_str("\"occupancy_probe\"").unwrap();
        assert_eq!(parsed, Intent::OccupancyProbe);
    }
}
