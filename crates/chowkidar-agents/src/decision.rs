// SPDX-FileCopyrightText: 2026 Chowkidar Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Decision stage: pure rule evaluation, no IO.
//!
//! Rules are evaluated in order and the first match wins, except that
//! escalation always wins over any other match. The directive's `reason`
//! records the matched rule id.

use chowkidar_config::PolicyConfig;
use chowkidar_core::{Directive, Dispatch, FinalAction, IntelligenceReport};

/// Risk at or above which a session escalates.
pub const ESCALATE_THRESHOLD: f64 = 0.70;

/// Risk below which auto-reply is considered.
pub const AUTO_REPLY_THRESHOLD: f64 = 0.40;

/// Pure rule evaluator over an intelligence report.
#[derive(Debug, Clone)]
pub struct DecisionEngine {
    policy: PolicyConfig,
}

impl DecisionEngine {
    pub fn new(policy: PolicyConfig) -> Self {
        Self { policy }
    }

    /// Evaluate the rule table for one session.
    pub fn decide(
        &self,
        intelligence: &IntelligenceReport,
        device_id: &str,
        now: &str,
    ) -> Directive {
        let risk = intelligence.risk_score;

        // R1: escalation dominates everything.
        if intelligence.escalation_required || risk >= ESCALATE_THRESHOLD {
            return self.directive(
                intelligence,
                FinalAction::Escalate,
                "R1",
                Dispatch {
                    tts: true,
                    notify_owner: true,
                    escalate: true,
                },
                now,
            );
        }

        // R2: low risk, device permitted to speak for itself.
        if risk < AUTO_REPLY_THRESHOLD && self.policy.auto_reply_permitted(device_id) {
            return self.directive(
                intelligence,
                FinalAction::AutoReply,
                "R2",
                Dispatch {
                    tts: true,
                    notify_owner: false,
                    escalate: false,
                },
                now,
            );
        }

        // R3: medium band notifies the owner without speaking.
        if (AUTO_REPLY_THRESHOLD..ESCALATE_THRESHOLD).contains(&risk) {
            return self.directive(
                intelligence,
                FinalAction::NotifyOwner,
                "R3",
                Dispatch {
                    tts: false,
                    notify_owner: true,
                    escalate: false,
                },
                now,
            );
        }

        // R4: default (low risk but auto-reply not permitted).
        self.directive(
            intelligence,
            FinalAction::NotifyOwner,
            "R4",
            Dispatch {
                tts: false,
                notify_owner: true,
                escalate: false,
            },
            now,
        )
    }

    fn directive(
        &self,
        intelligence: &IntelligenceReport,
        final_action: FinalAction,
        reason: &str,
        dispatch: Dispatch,
        now: &str,
    ) -> Directive {
        Directive {
            session_id: intelligence.session_id.clone(),
            final_action,
            reason: reason.to_string(),
            dispatch,
            timestamp: now.to_string(),
        }
    }
}
