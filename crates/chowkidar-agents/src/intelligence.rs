// SPDX-FileCopyrightText: 2026 Chowkidar Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Intelligence stage: intent classification, risk scoring, escalation, and
//! reply selection.
//!
//! Deterministic except for the optional provider-backed reply, which is
//! bounded by a deadline and two retries and always falls back to the
//! canned template for the classified intent.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use chowkidar_core::traits::reply::{ReplyContext, ReplyProvider};
use chowkidar_core::{ChowkidarError, Intent, IntelligenceReport, PerceptionReport, TranscriptRole};

use crate::normalize::normalize_transcript;
use crate::replies::{
    canned_reply, screen_reply, FOLLOW_UP_FALLBACK, OCCUPANCY_LINE, SECURITY_LINE,
};
use crate::vocab::{fold, VocabSet};

/// Backoff schedule between reply provider retries.
const RETRY_BACKOFF: [Duration; 2] = [Duration::from_millis(500), Duration::from_secs(1)];

/// Deterministic part of the stage output.
#[derive(Debug, Clone)]
pub struct Assessment {
    pub intent: Intent,
    pub risk_score: f64,
    pub escalation_required: bool,
    pub tags: Vec<String>,
}

/// Full stage output: the report plus any reply-safety incident that was
/// recovered by substituting a canned line.
#[derive(Debug, Clone)]
pub struct IntelligenceOutcome {
    pub report: IntelligenceReport,
    pub safety_incident: Option<&'static str>,
}

/// The intelligence engine. Stateless between calls; the local wall-clock
/// hour is injected so night scoring stays testable.
pub struct IntelligenceEngine {
    vocab: Arc<VocabSet>,
    provider: Option<Arc<dyn ReplyProvider>>,
    provider_timeout: Duration,
}

impl IntelligenceEngine {
    pub fn new(
        vocab: Arc<VocabSet>,
        provider: Option<Arc<dyn ReplyProvider>>,
        provider_timeout: Duration,
    ) -> Self {
        Self {
            vocab,
            provider,
            provider_timeout,
        }
    }

    /// First matching class wins; evaluation order is fixed.
    pub fn classify_intent(&self, folded: &str, package_detected: bool) -> Intent {
        let v = &self.vocab;
        if v.matches(folded, &v.threat) {
            return Intent::Aggression;
        }
        if v.matches(folded, &v.distress) {
            return Intent::Help;
        }
        if v.matches(folded, &v.scam) {
            return Intent::ScamAttempt;
        }
        if v.matches(folded, &v.occupancy) {
            return Intent::OccupancyProbe;
        }
        if v.matches(folded, &v.identity) {
            return Intent::IdentityClaim;
        }
        if v.matches(folded, &v.entry) {
            return Intent::EntryRequest;
        }
        if v.matches(folded, &v.government) {
            return Intent::GovernmentClaim;
        }
        if v.matches(folded, &v.staff) {
            return Intent::DomesticStaff;
        }
        if v.matches(folded, &v.donation) {
            return Intent::ReligiousDonation;
        }
        // Delivery wins over sales when a package object is also detected.
        let delivery = v.matches(folded, &v.delivery);
        if v.matches(folded, &v.sales) && !(delivery && package_detected) {
            return Intent::SalesMarketing;
        }
        if v.matches(folded, &v.child_elderly)
            && (v.matches(folded, &v.distress_soft) || v.matches(folded, &v.hydration))
        {
            return Intent::ChildElderly;
        }
        if delivery {
            return Intent::Delivery;
        }
        if v.matches(folded, &v.visitor) {
            return Intent::Visitor;
        }
        Intent::Unknown
    }

    /// Deterministic assessment: intent, composite risk, escalation.
    pub fn assess(&self, report: &PerceptionReport, local_hour: u32) -> Assessment {
        let normalized = normalize_transcript(&report.transcript);
        let folded = fold(&normalized);
        let package_detected = report.has_object(&self.vocab.package_objects);
        let intent = self.classify_intent(&folded, package_detected);

        let mut risk = 0.5 * (1.0 - report.vision_confidence)
            + 0.3 * report.anti_spoof_score
            + 0.2 * report.emotion.risk_weight();
        risk += intent_adjustment(intent, package_detected);

        let mut escalation_required = false;
        let mut tags = vec![intent.to_string()];

        if report.weapon_detected {
            risk = risk.max(0.75);
            escalation_required = true;
            tags.push("weapon_detected".into());
        }
        if is_night_hour(local_hour) {
            risk += 0.30;
            tags.push("night_hours".into());
        }
        if self.vocab.matches(&folded, &self.vocab.entry) {
            risk += 0.20;
            escalation_required = true;
            tags.push("entry_request".into());
        }

        let risk_score = round3(risk.clamp(0.0, 1.0));
        if risk_score >= 0.7 {
            escalation_required = true;
        }

        Assessment {
            intent,
            risk_score,
            escalation_required,
            tags,
        }
    }

    /// Produce the stage report. Infallible: provider failure falls back to
    /// the canned reply for the classified intent.
    pub async fn process(
        &self,
        report: &PerceptionReport,
        local_hour: u32,
        now: &str,
    ) -> IntelligenceOutcome {
        let assessment = self.assess(report, local_hour);
        let mut safety_incident = None;

        let reply_text = if assessment.escalation_required {
            SECURITY_LINE.to_string()
        } else if assessment.intent == Intent::OccupancyProbe {
            OCCUPANCY_LINE.to_string()
        } else if matches!(assessment.intent, Intent::Unknown | Intent::Visitor)
            && self.provider.is_some()
        {
            // Ambiguous or conversational: ask the provider, screened.
            let context = ReplyContext {
                system_prompt: doorbell_system_prompt(),
                turns: transcript_turn(report),
                perception_summary: perception_summary(report),
            };
            match self.generate_with_retry(&context).await {
                Ok(text) => match screen_reply(&text) {
                    Ok(()) => text,
                    Err(label) => {
                        warn!(
                            session_id = report.session_id.as_str(),
                            violation = label,
                            "generated reply failed safety screen, using canned line"
                        );
                        safety_incident = Some(label);
                        canned_reply(assessment.intent).to_string()
                    }
                },
                Err(e) => {
                    warn!(
                        session_id = report.session_id.as_str(),
                        error = %e,
                        "reply provider failed, using canned line"
                    );
                    canned_reply(assessment.intent).to_string()
                }
            }
        } else {
            canned_reply(assessment.intent).to_string()
        };

        debug!(
            session_id = report.session_id.as_str(),
            intent = %assessment.intent,
            risk_score = assessment.risk_score,
            escalation = assessment.escalation_required,
            "intelligence assessment complete"
        );

        IntelligenceOutcome {
            report: IntelligenceReport {
                session_id: report.session_id.clone(),
                intent: assessment.intent,
                reply_text,
                risk_score: assessment.risk_score,
                escalation_required: assessment.escalation_required,
                tags: assessment.tags,
                timestamp: now.to_string(),
            },
            safety_incident,
        }
    }

    /// Generate a reply for a conversational follow-up turn with bounded
    /// context (last two transcript turns at most). Always returns a safe
    /// string; failures fall back to the canned acknowledgement.
    pub async fn converse(
        &self,
        session_id: &str,
        history: &[(TranscriptRole, String)],
        perception_summary: String,
    ) -> (String, Option<&'static str>) {
        let Some(_) = self.provider.as_ref() else {
            return (FOLLOW_UP_FALLBACK.to_string(), None);
        };

        let turns: Vec<(TranscriptRole, String)> =
            history.iter().rev().take(2).rev().cloned().collect();
        let context = ReplyContext {
            system_prompt: doorbell_system_prompt(),
            turns,
            perception_summary,
        };

        match self.generate_with_retry(&context).await {
            Ok(text) => match screen_reply(&text) {
                Ok(()) => (text, None),
                Err(label) => {
                    warn!(
                        session_id,
                        violation = label,
                        "follow-up reply failed safety screen, using fallback"
                    );
                    (FOLLOW_UP_FALLBACK.to_string(), Some(label))
                }
            },
            Err(e) => {
                warn!(session_id, error = %e, "follow-up reply generation failed");
                (FOLLOW_UP_FALLBACK.to_string(), None)
            }
        }
    }

    /// One initial attempt plus two retries with exponential backoff, each
    /// attempt bounded by the provider deadline.
    async fn generate_with_retry(
        &self,
        context: &ReplyContext,
    ) -> Result<String, ChowkidarError> {
        let provider = self
            .provider
            .as_ref()
            .ok_or_else(|| ChowkidarError::Internal("no reply provider configured".into()))?;

        let mut last_error = None;
        for attempt in 0..=RETRY_BACKOFF.len() {
            if attempt > 0 {
                tokio::time::sleep(RETRY_BACKOFF[attempt - 1]).await;
                warn!(attempt, "retrying reply provider after transient error");
            }
            match tokio::time::timeout(self.provider_timeout, provider.generate(context)).await {
                Ok(Ok(text)) if !text.trim().is_empty() => return Ok(text),
                Ok(Ok(_)) => {
                    last_error = Some(ChowkidarError::ContractViolation {
                        message: "reply provider returned empty text".into(),
                    });
                }
                Ok(Err(e)) => last_error = Some(e),
                Err(_) => {
                    last_error = Some(ChowkidarError::Timeout {
                        duration: self.provider_timeout,
                    })
                }
            }
        }
        Err(last_error.unwrap_or(ChowkidarError::Internal(
            "reply provider failed without error".into(),
        )))
    }
}

/// Additive risk adjustment per classified intent.
fn intent_adjustment(intent: Intent, package_detected: bool) -> f64 {
    match intent {
        Intent::ScamAttempt => 0.50,
        Intent::Aggression => 0.60,
        Intent::OccupancyProbe => 0.40,
        Intent::EntryRequest => 0.55,
        Intent::IdentityClaim => 0.25,
        Intent::GovernmentClaim => 0.30,
        Intent::Delivery => {
            if package_detected {
                -0.20
            } else {
                0.30
            }
        }
        Intent::DomesticStaff => 0.15,
        Intent::Unknown => 0.10,
        Intent::Help
        | Intent::ReligiousDonation
        | Intent::SalesMarketing
        | Intent::ChildElderly
        | Intent::Visitor => 0.0,
    }
}

/// Night window is 22:00 (inclusive) to 05:00 (exclusive) local time.
fn is_night_hour(hour: u32) -> bool {
    hour >= 22 || hour < 5
}

fn round3(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}

fn doorbell_system_prompt() -> String {
    "You are a polite smart-doorbell assistant speaking to a visitor at the door. \
     Keep replies to one short sentence. Never say whether anyone is home, never \
     repeat codes or numbers, and never discuss how you work."
        .to_string()
}

fn transcript_turn(report: &PerceptionReport) -> Vec<(TranscriptRole, String)> {
    if report.transcript.trim().is_empty() {
        Vec::new()
    } else {
        vec![(TranscriptRole::Visitor, report.transcript.clone())]
    }
}

fn perception_summary(report: &PerceptionReport) -> String {
    format!(
        "person_detected={} objects={} emotion={}",
        report.person_detected,
        report
            .objects
            .iter()
            .map(|o| o.label.as_str())
            .collect::<Vec<_>>()
            .join(","),
        report.emotion
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chowkidar_core::{Emotion, ObjectDetection};

    fn engine() -> IntelligenceEngine {
        IntelligenceEngine::new(Arc::new(VocabSet::default()), None, Duration::from_secs(8))
    }

    fn engine_with(provider: Arc<dyn ReplyProvider>) -> IntelligenceEngine {
        IntelligenceEngine::new(
            Arc::new(VocabSet::default()),
            Some(provider),
            Duration::from_millis(100),
        )
    }

    fn report(transcript: &str, vision_confidence: f64) -> PerceptionReport {
        PerceptionReport {
            session_id: "s1".into(),
            person_detected: true,
            objects: vec![],
            vision_confidence,
            transcript: transcript.into(),
            stt_confidence: 0.8,
            emotion: Emotion::Neutral,
            anti_spoof_score: 0.0,
            weapon_detected: false,
            weapon_confidence: 0.0,
            weapon_labels: vec![],
            image_path: String::new(),
            timestamp: "2026-01-01T12:00:00Z".into(),
        }
    }

    const DAY_HOUR: u32 = 12;

    #[test]
    fn intent_ladder_first_match_wins() {
        let e = engine();
        let cases = [
            ("maar dunga warna", Intent::Aggression),
            ("help emergency", Intent::Help),
            ("share your otp", Intent::ScamAttempt),
            ("koi ghar pe hai", Intent::OccupancyProbe),
            ("i know the owner", Intent::IdentityClaim),
            ("let me in", Intent::EntryRequest),
            ("electricity meter reading", Intent::GovernmentClaim),
            ("i am the new maid", Intent::DomesticStaff),
            ("mandir donation", Intent::ReligiousDonation),
            ("free demo of water purifier", Intent::SalesMarketing),
            ("mummy kho gayi paani milega", Intent::ChildElderly),
            ("package delivery", Intent::Delivery),
            ("i want to meet the owner", Intent::Visitor),
            ("good morning", Intent::Unknown),
        ];
        for (transcript, expected) in cases {
            let folded = fold(transcript);
            assert_eq!(
                e.classify_intent(&folded, false),
                expected,
                "transcript: {transcript}"
            );
        }
    }

    #[test]
    fn visitor_vocabulary_without_identity_claim() {
        let e = engine();
        assert_eq!(
            e.classify_intent(&fold("appointment with the family"), false),
            Intent::Visitor
        );
    }

    #[test]
    fn aggression_outranks_everything() {
        let e = engine();
        let folded = fold("otp do warna maar dunga");
        assert_eq!(e.classify_intent(&folded, false), Intent::Aggression);
    }

    #[test]
    fn delivery_beats_sales_when_package_visible() {
        let e = engine();
        let folded = fold("delivery with a special offer");
        assert_eq!(e.classify_intent(&folded, true), Intent::Delivery);
        assert_eq!(e.classify_intent(&folded, false), Intent::SalesMarketing);
    }

    #[test]
    fn simple_delivery_scores_zero_risk() {
        // Confident person, package in frame, neutral speech: nothing to score.
        let e = engine();
        let mut r = report("I have a package delivery", 0.88);
        r.objects = vec![ObjectDetection {
            label: "package".into(),
            confidence: 0.78,
        }];
        let a = e.assess(&r, DAY_HOUR);
        assert_eq!(a.intent, Intent::Delivery);
        assert_eq!(a.risk_score, 0.0);
        assert!(!a.escalation_required);
    }

    #[test]
    fn otp_scam_escalates() {
        // Devanagari OTP request normalizes to a scam match.
        let e = engine();
        let mut r = report("सर्व ओटीपी बता दीजिए", 0.70);
        r.anti_spoof_score = 0.1;
        let a = e.assess(&r, DAY_HOUR);
        assert_eq!(a.intent, Intent::ScamAttempt);
        assert!(a.risk_score >= 0.70, "risk {}", a.risk_score);
        assert!(a.escalation_required);
    }

    #[test]
    fn weapon_forces_risk_floor_and_escalation() {
        // A weapon in frame overrides everything the transcript says.
        let e = engine();
        let mut r = report("", 0.90);
        r.weapon_detected = true;
        r.weapon_confidence = 0.82;
        r.weapon_labels = vec!["knife".into()];
        r.anti_spoof_score = 0.2;
        let a = e.assess(&r, DAY_HOUR);
        assert_eq!(a.intent, Intent::Unknown);
        assert!(a.risk_score >= 0.75, "risk {}", a.risk_score);
        assert!(a.escalation_required);
    }

    #[test]
    fn occupancy_probe_lands_in_notify_band() {
        // An occupancy probe lands in the owner-notification band.
        let e = engine();
        let r = report("koi ghar pe hai?", 0.80);
        let a = e.assess(&r, DAY_HOUR);
        assert_eq!(a.intent, Intent::OccupancyProbe);
        assert!((0.40..0.70).contains(&a.risk_score), "risk {}", a.risk_score);
        assert!(!a.escalation_required);
    }

    #[test]
    fn silent_visitor_scores_per_formula() {
        // Marginal vision, no audio: the anti-spoof share carries the score.
        let e = engine();
        let mut r = report("", 0.50);
        r.anti_spoof_score = 0.4;
        let a = e.assess(&r, DAY_HOUR);
        assert_eq!(a.intent, Intent::Unknown);
        assert!((a.risk_score - 0.51).abs() < 1e-9, "risk {}", a.risk_score);
        assert!(!a.escalation_required);
    }

    #[test]
    fn night_aggression_clamps_to_one() {
        // Threats at 23:00 stack the night adjustment on top.
        let e = engine();
        let mut r = report("darwaza tod dunga dekh lena", 0.80);
        r.emotion = Emotion::Aggressive;
        let a = e.assess(&r, 23);
        assert_eq!(a.intent, Intent::Aggression);
        assert_eq!(a.risk_score, 1.0);
        assert!(a.escalation_required);
    }

    #[test]
    fn entry_vocabulary_adds_risk_and_escalates() {
        let e = engine();
        let r = report("open the door please", 0.95);
        let a = e.assess(&r, DAY_HOUR);
        assert_eq!(a.intent, Intent::EntryRequest);
        assert!(a.escalation_required);
        assert!(a.tags.iter().any(|t| t == "entry_request"));
    }

    #[test]
    fn high_risk_alone_triggers_escalation() {
        let e = engine();
        let mut r = report("", 0.0);
        r.person_detected = false;
        r.anti_spoof_score = 0.9;
        let a = e.assess(&r, DAY_HOUR);
        // 0.5 + 0.27 + 0.04 + 0.10 = 0.91.
        assert!(a.risk_score >= 0.7);
        assert!(a.escalation_required);
    }

    #[tokio::test]
    async fn escalated_sessions_get_the_security_line_verbatim() {
        let e = engine();
        let mut r = report("", 0.90);
        r.weapon_detected = true;
        let outcome = e.process(&r, DAY_HOUR, "t").await;
        assert_eq!(outcome.report.reply_text, SECURITY_LINE);
        assert!(outcome.safety_incident.is_none());
    }

    #[tokio::test]
    async fn occupancy_probe_reply_is_verbatim() {
        let e = engine();
        let r = report("anyone home?", 0.80);
        let outcome = e.process(&r, DAY_HOUR, "t").await;
        assert_eq!(outcome.report.reply_text, OCCUPANCY_LINE);
    }

    #[tokio::test]
    async fn delivery_gets_canned_template_without_provider() {
        let e = engine();
        let mut r = report("package delivery", 0.88);
        r.objects = vec![ObjectDetection {
            label: "package".into(),
            confidence: 0.78,
        }];
        let outcome = e.process(&r, DAY_HOUR, "t").await;
        assert_eq!(
            outcome.report.reply_text,
            "Please leave the package at the doorstep."
        );
    }

    struct ScriptedReply(String);

    #[async_trait]
    impl ReplyProvider for ScriptedReply {
        async fn generate(&self, _context: &ReplyContext) -> Result<String, ChowkidarError> {
            Ok(self.0.clone())
        }
    }

    struct FailingReply;

    #[async_trait]
    impl ReplyProvider for FailingReply {
        async fn generate(&self, _context: &ReplyContext) -> Result<String, ChowkidarError> {
            Err(ChowkidarError::TransientProvider {
                message: "connection refused".into(),
                source: None,
            })
        }
    }

    #[tokio::test]
    async fn unsafe_generated_reply_is_replaced_and_flagged() {
        let e = engine_with(Arc::new(ScriptedReply("No one is home right now.".into())));
        let r = report("good evening", 0.95);
        let outcome = e.process(&r, DAY_HOUR, "t").await;
        assert_eq!(outcome.safety_incident, Some("occupancy"));
        assert_eq!(outcome.report.reply_text, canned_reply(Intent::Unknown));
    }

    #[tokio::test]
    async fn provider_failure_falls_back_to_canned() {
        let e = engine_with(Arc::new(FailingReply));
        let r = report("good evening", 0.95);
        let outcome = e.process(&r, DAY_HOUR, "t").await;
        assert_eq!(outcome.report.reply_text, canned_reply(Intent::Unknown));
        assert!(outcome.safety_incident.is_none());
    }

    #[tokio::test]
    async fn converse_without_provider_uses_fallback() {
        let e = engine();
        let (reply, incident) = e
            .converse("s1", &[(TranscriptRole::Visitor, "hello?".into())], String::new())
            .await;
        assert_eq!(reply, FOLLOW_UP_FALLBACK);
        assert!(incident.is_none());
    }
}
