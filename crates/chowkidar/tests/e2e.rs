// SPDX-FileCopyrightText: 2026 Chowkidar Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! End-to-end tests for the complete doorbell pipeline.
//!
//! Each test creates an isolated harness with temp SQLite, a temp data
//! root, and mock providers. Tests are independent and order-insensitive.

use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;

use chowkidar_core::{BusEvent, ChowkidarError, FinalAction, SessionStatus, TranscriptRole};
use chowkidar_test_utils::{
    observation_delivery, observation_scam, observation_weapon, CountingPerception, TestHarness,
};

const DEADLINE: Duration = Duration::from_secs(10);

// ---- Scenario S1: simple delivery ----

#[tokio::test]
async fn delivery_ring_completes_with_auto_reply() {
    let harness = TestHarness::builder()
        .with_observation(observation_delivery())
        .build()
        .await
        .unwrap();

    let accepted = harness.ring("front-door").await.unwrap();
    assert_eq!(accepted.status, SessionStatus::Queued);

    let session = harness
        .wait_for_terminal(&accepted.session_id, DEADLINE)
        .await
        .unwrap();
    assert_eq!(session.status, SessionStatus::Completed);
    assert_eq!(session.final_action, Some(FinalAction::AutoReply));
    assert_eq!(session.risk_score, 0.0);

    let detail = harness
        .orchestrator
        .session_detail(&accepted.session_id)
        .await
        .unwrap()
        .unwrap();
    let perception = detail.perception.unwrap();
    assert!(perception.person_detected);
    let intelligence = detail.intelligence.unwrap();
    assert_eq!(
        intelligence.reply_text,
        "Please leave the package at the doorstep."
    );
    let directive = detail.decision.unwrap();
    assert_eq!(directive.reason, "R2");

    // Visitor utterance then doorbell reply, in order.
    assert_eq!(detail.transcripts.len(), 2);
    assert_eq!(detail.transcripts[0].role, TranscriptRole::Visitor);
    assert_eq!(detail.transcripts[0].content, "I have a package delivery");
    assert_eq!(detail.transcripts[1].role, TranscriptRole::Doorbell);

    // The sanitized preview landed under the permitted tts/ subdirectory.
    let preview = harness.data.tts_preview_path(&accepted.session_id);
    assert!(preview.exists());
}

// ---- Scenario S2: OTP scam in Devanagari ----

#[tokio::test]
async fn scam_ring_escalates_with_security_line() {
    let harness = TestHarness::builder()
        .with_observation(observation_scam())
        .build()
        .await
        .unwrap();

    let mut events = harness.bus.subscribe(chowkidar_bus::OWNER_CHANNEL);
    let accepted = harness.ring("front-door").await.unwrap();

    let session = harness
        .wait_for_terminal(&accepted.session_id, DEADLINE)
        .await
        .unwrap();
    assert_eq!(session.status, SessionStatus::Completed);
    assert_eq!(session.final_action, Some(FinalAction::Escalate));

    let detail = harness
        .orchestrator
        .session_detail(&accepted.session_id)
        .await
        .unwrap()
        .unwrap();
    let intelligence = detail.intelligence.unwrap();
    assert!(intelligence.escalation_required);
    assert_eq!(
        intelligence.reply_text,
        "I have notified the owner and the security guard."
    );

    // No weapon in frame: no weapon_alert on the wire.
    let events = drain_events(&mut events).await;
    assert!(!events
        .iter()
        .any(|e| matches!(e, BusEvent::WeaponAlert { .. })));
}

// ---- Scenario S3: weapon detected ----

#[tokio::test]
async fn weapon_alert_precedes_perception_done() {
    let harness = TestHarness::builder()
        .with_observation(observation_weapon())
        .build()
        .await
        .unwrap();

    let mut events = harness.bus.subscribe(chowkidar_bus::OWNER_CHANNEL);
    let accepted = harness.ring("front-door").await.unwrap();

    let session = harness
        .wait_for_terminal(&accepted.session_id, DEADLINE)
        .await
        .unwrap();
    assert_eq!(session.status, SessionStatus::Completed);
    assert_eq!(session.final_action, Some(FinalAction::Escalate));
    assert!(session.risk_score >= 0.75);

    let events = drain_events(&mut events).await;
    let alert_index = events
        .iter()
        .position(|e| matches!(e, BusEvent::WeaponAlert { .. }))
        .expect("weapon_alert published");
    let perception_done_index = events
        .iter()
        .position(|e| {
            matches!(
                e,
                BusEvent::PipelineStage {
                    status: SessionStatus::PerceptionDone,
                    ..
                }
            )
        })
        .expect("perception_done published");
    let ended_index = events
        .iter()
        .position(|e| matches!(e, BusEvent::SessionEnded { reason, .. } if reason == "completed"))
        .expect("session_ended published");

    assert!(alert_index < perception_done_index);
    assert!(alert_index < ended_index);
}

// ---- Invariants: monotonic status + audit completeness ----

#[tokio::test]
async fn audit_trail_records_every_transition_in_order() {
    let harness = TestHarness::builder()
        .with_observation(observation_delivery())
        .build()
        .await
        .unwrap();

    let accepted = harness.ring("front-door").await.unwrap();
    harness
        .wait_for_terminal(&accepted.session_id, DEADLINE)
        .await
        .unwrap();

    let detail = harness
        .orchestrator
        .session_detail(&accepted.session_id)
        .await
        .unwrap()
        .unwrap();

    let stage_rows: Vec<&str> = detail
        .actions
        .iter()
        .filter(|row| row.action_type == "pipeline_stage")
        .map(|row| row.status.as_str())
        .collect();
    assert_eq!(
        stage_rows,
        vec![
            "processing",
            "perception_done",
            "intelligence_done",
            "decision_done",
            "completed",
        ]
    );

    // Timestamps never move backwards; insertion order breaks ties.
    let timestamps: Vec<&String> = detail.actions.iter().map(|row| &row.timestamp).collect();
    for pair in timestamps.windows(2) {
        assert!(pair[0] <= pair[1], "audit timestamps regressed: {pair:?}");
    }

    // Exactly one ring audit row for a single ring.
    assert_eq!(
        detail
            .actions
            .iter()
            .filter(|row| row.action_type == "ring_received")
            .count(),
        1
    );
}

// ---- Idempotent reports across re-rings ----

#[tokio::test]
async fn second_ring_on_finished_session_does_not_replay_the_pipeline() {
    let harness = TestHarness::builder()
        .with_observation(observation_delivery())
        .build()
        .await
        .unwrap();

    let accepted = harness
        .ring_session("front-door", Some("sess-fixed"))
        .await
        .unwrap();
    harness
        .wait_for_terminal(&accepted.session_id, DEADLINE)
        .await
        .unwrap();

    // Ring again on the same (now completed) session.
    harness
        .ring_session("front-door", Some("sess-fixed"))
        .await
        .unwrap();

    // Wait until the follow-up has been audited as skipped.
    let deadline = tokio::time::Instant::now() + DEADLINE;
    loop {
        let detail = harness
            .orchestrator
            .session_detail("sess-fixed")
            .await
            .unwrap()
            .unwrap();
        if detail
            .actions
            .iter()
            .any(|row| row.action_type == "ring_skipped")
        {
            // Still exactly one set of stage transitions and one report.
            assert_eq!(
                detail
                    .actions
                    .iter()
                    .filter(|row| row.action_type == "pipeline_stage"
                        && row.status == "completed")
                    .count(),
                1
            );
            assert!(detail.perception.is_some());
            break;
        }
        if tokio::time::Instant::now() > deadline {
            panic!("follow-up ring was never audited");
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
}

// ---- Back-pressure on a full session queue ----

#[tokio::test]
async fn flooding_one_session_surfaces_back_pressure() {
    let (provider, _max) =
        CountingPerception::new(observation_delivery(), Duration::from_millis(800));
    let harness = TestHarness::builder()
        .with_perception(Arc::new(provider))
        .build()
        .await
        .unwrap();

    let mut saw_back_pressure = false;
    for _ in 0..8 {
        match harness.ring_session("front-door", Some("busy")).await {
            Ok(_) => {}
            Err(ChowkidarError::BackPressure { session_id }) => {
                assert_eq!(session_id, "busy");
                saw_back_pressure = true;
            }
            Err(other) => panic!("unexpected error: {other}"),
        }
    }
    assert!(saw_back_pressure, "queue never filled");
}

// ---- Concurrency cap across sessions ----

#[tokio::test]
async fn concurrent_sessions_respect_the_scheduler_cap() {
    let (provider, max_in_flight) =
        CountingPerception::new(observation_delivery(), Duration::from_millis(200));
    let harness = TestHarness::builder()
        .with_perception(Arc::new(provider))
        .build()
        .await
        .unwrap();

    let mut ids = Vec::new();
    for i in 0..6 {
        let accepted = harness
            .ring_session("front-door", Some(&format!("cap-{i}")))
            .await
            .unwrap();
        ids.push(accepted.session_id);
    }
    for id in &ids {
        let session = harness.wait_for_terminal(id, DEADLINE).await.unwrap();
        assert_eq!(session.status, SessionStatus::Completed);
    }

    let observed = max_in_flight.load(std::sync::atomic::Ordering::SeqCst);
    assert!(
        observed <= 2,
        "scheduler allowed {observed} concurrent pipelines"
    );
}

// ---- Conversation follow-ups ----

#[tokio::test]
async fn owner_reply_is_published_and_transcribed() {
    let harness = TestHarness::builder()
        .with_observation(observation_delivery())
        .build()
        .await
        .unwrap();

    let accepted = harness.ring("front-door").await.unwrap();
    harness
        .wait_for_terminal(&accepted.session_id, DEADLINE)
        .await
        .unwrap();

    let mut events = harness.bus.subscribe(&accepted.session_id);
    harness
        .orchestrator
        .owner_reply(&accepted.session_id, "Leave it with the guard")
        .await
        .unwrap();

    let event = tokio::time::timeout(Duration::from_secs(1), events.next())
        .await
        .expect("owner_reply event")
        .unwrap()
        .unwrap();
    match event {
        BusEvent::OwnerReply { message, .. } => assert_eq!(message, "Leave it with the guard"),
        other => panic!("unexpected event: {other:?}"),
    }

    let detail = harness
        .orchestrator
        .session_detail(&accepted.session_id)
        .await
        .unwrap()
        .unwrap();
    let last = detail.transcripts.last().unwrap();
    assert_eq!(last.role, TranscriptRole::Doorbell);
    assert!(last.content.starts_with("[owner] "));
}

#[tokio::test]
async fn visitor_follow_up_gets_a_reply_without_a_provider() {
    let harness = TestHarness::builder()
        .with_observation(observation_delivery())
        .build()
        .await
        .unwrap();

    let accepted = harness.ring("front-door").await.unwrap();
    harness
        .wait_for_terminal(&accepted.session_id, DEADLINE)
        .await
        .unwrap();

    let reply = harness
        .orchestrator
        .conversation_reply(&accepted.session_id, "When will someone come?")
        .await
        .unwrap();
    assert!(!reply.is_empty());

    let detail = harness
        .orchestrator
        .session_detail(&accepted.session_id)
        .await
        .unwrap()
        .unwrap();
    let roles: Vec<TranscriptRole> = detail.transcripts.iter().map(|t| t.role).collect();
    // Ring pair + follow-up pair.
    assert_eq!(
        roles,
        vec![
            TranscriptRole::Visitor,
            TranscriptRole::Doorbell,
            TranscriptRole::Visitor,
            TranscriptRole::Doorbell,
        ]
    );
}

// ---- Helpers ----

async fn drain_events(
    stream: &mut tokio_stream::wrappers::BroadcastStream<BusEvent>,
) -> Vec<BusEvent> {
    let mut events = Vec::new();
    while let Ok(Some(item)) =
        tokio::time::timeout(Duration::from_millis(300), stream.next()).await
    {
        if let Ok(event) = item {
            events.push(event);
        }
    }
    events
}
