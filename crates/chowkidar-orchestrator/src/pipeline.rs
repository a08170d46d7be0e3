// SPDX-FileCopyrightText: 2026 Chowkidar Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The per-session pipeline task.
//!
//! Each task acquires one scheduler slot, drains its session's queue,
//! drives each ring through Perception → Intelligence → Decision → Action,
//! and closes after the idle window. Every transition writes exactly one
//! audit row and publishes one `pipeline_stage` event; a `weapon_alert` is
//! always published before the `perception_done` event of the same session.

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{error, info};

use chowkidar_core::traits::perception::PerceptionInput;
use chowkidar_core::{
    AuditRow, BusEvent, ChowkidarError, SessionStatus, TranscriptEntry, TranscriptRole,
};
use chowkidar_store::queries::{audit, reports, sessions, transcripts};
use chowkidar_store::{ReportKind, StatusFields};

use crate::{now_rfc3339, Inner, Orchestrator, RingJob};

/// Entry point of one session's pipeline task.
pub(crate) async fn run_session(
    inner: Arc<Inner>,
    session_id: String,
    mut queue: mpsc::Receiver<RingJob>,
) {
    // A scheduler slot must free up within the wait budget, or the session
    // fails without ever starting a stage.
    let permit = tokio::select! {
        acquired = tokio::time::timeout(
            inner.config.semaphore_wait(),
            inner.semaphore.clone().acquire_owned(),
        ) => match acquired {
            Ok(Ok(permit)) => permit,
            _ => {
                fail_session(&inner, &session_id, "timed out waiting for a scheduler slot").await;
                drop(queue);
                cleanup(&inner, &session_id);
                return;
            }
        },
        _ = inner.cancel.cancelled() => {
            cancel_session(&inner, &session_id).await;
            drop(queue);
            cleanup(&inner, &session_id);
            return;
        }
    };

    info!(session_id = session_id.as_str(), "pipeline task started");

    loop {
        tokio::select! {
            _ = inner.cancel.cancelled() => {
                cancel_session(&inner, &session_id).await;
                break;
            }
            job = queue.recv() => {
                let Some(job) = job else { break };
                let outcome = tokio::select! {
                    result = process_event(&inner, &session_id, job) => result,
                    _ = inner.cancel.cancelled() => Err(ChowkidarError::Cancelled),
                };
                match outcome {
                    Ok(()) => {}
                    Err(ChowkidarError::Cancelled) => {
                        cancel_session(&inner, &session_id).await;
                        break;
                    }
                    Err(e) => {
                        // This session fails; others are unaffected.
                        fail_session(&inner, &session_id, &e.to_string()).await;
                        break;
                    }
                }
            }
            _ = tokio::time::sleep(inner.config.session_idle_timeout()) => {
                inner.bus.publish_session(
                    &session_id,
                    BusEvent::SessionEnded {
                        session_id: session_id.clone(),
                        reason: "inactive".into(),
                    },
                );
                break;
            }
        }
    }

    // Close the receiver first so cleanup sees the sender as closed and a
    // concurrent ring can safely start a fresh queue.
    drop(queue);
    cleanup(&inner, &session_id);
    drop(permit);
    info!(session_id = session_id.as_str(), "pipeline task finished");
}

/// Drive one ring through the four stages.
async fn process_event(
    inner: &Arc<Inner>,
    session_id: &str,
    job: RingJob,
) -> Result<(), ChowkidarError> {
    let session = sessions::get_session(&inner.db, session_id)
        .await?
        .ok_or_else(|| ChowkidarError::Internal(format!("session {session_id} vanished")))?;
    if session.status.is_terminal() {
        // Follow-up ring after a terminal state: record it, do not replay
        // the pipeline (status is monotonic).
        audit::append_audit(
            &inner.db,
            &AuditRow {
                id: 0,
                session_id: session_id.to_string(),
                agent: "orchestrator".into(),
                action_type: "ring_skipped".into(),
                payload: serde_json::json!({ "device_id": job.device_id }),
                status: "ignored".into(),
                short_reason: format!("session already {}", session.status),
                timestamp: now_rfc3339(),
            },
        )
        .await?;
        return Ok(());
    }

    transition(inner, session_id, SessionStatus::Processing, StatusFields::default(), None).await?;

    // --- Perception (degrades on timeout, never fails) ---
    let input = PerceptionInput {
        session_id: session_id.to_string(),
        image_path: job.image_path.clone(),
        audio_path: job.audio_path.clone(),
    };
    let perception = inner.stages.perception.run(&input, &now_rfc3339()).await;

    let stored_at = now_rfc3339();
    with_store_retry(|| {
        reports::put_report(
            &inner.db,
            ReportKind::Perception,
            session_id,
            &perception,
            &stored_at,
        )
    })
    .await?;

    // Weapon alert goes out strictly before the perception_done event.
    if perception.weapon_detected {
        inner.bus.publish_session(
            session_id,
            BusEvent::WeaponAlert {
                session_id: session_id.to_string(),
                labels: perception.weapon_labels.clone(),
                confidence: perception.weapon_confidence,
            },
        );
    }

    if !perception.transcript.trim().is_empty() {
        transcripts::append_transcript(
            &inner.db,
            &TranscriptEntry {
                session_id: session_id.to_string(),
                role: TranscriptRole::Visitor,
                content: perception.transcript.clone(),
                timestamp: now_rfc3339(),
            },
        )
        .await?;
    }

    audit::append_audit(
        &inner.db,
        &AuditRow {
            id: 0,
            session_id: session_id.to_string(),
            agent: "perception".into(),
            action_type: "perception".into(),
            payload: serde_json::json!({
                "person_detected": perception.person_detected,
                "vision_confidence": perception.vision_confidence,
                "weapon_detected": perception.weapon_detected,
                "emotion": perception.emotion,
            }),
            status: "done".into(),
            short_reason: "perception complete".into(),
            timestamp: now_rfc3339(),
        },
    )
    .await?;

    transition(inner, session_id, SessionStatus::PerceptionDone, StatusFields::default(), None)
        .await?;

    // --- Intelligence (canned fallback on provider failure) ---
    let outcome = inner
        .stages
        .intelligence
        .process(&perception, Orchestrator::local_hour(), &now_rfc3339())
        .await;
    let intelligence = outcome.report;

    if let Some(label) = outcome.safety_incident {
        audit::append_audit(
            &inner.db,
            &AuditRow {
                id: 0,
                session_id: session_id.to_string(),
                agent: "intelligence".into(),
                action_type: "reply_safety".into(),
                payload: serde_json::json!({ "violation": label }),
                status: "replaced".into(),
                short_reason: "generated reply failed safety screen".into(),
                timestamp: now_rfc3339(),
            },
        )
        .await?;
    }

    let stored_at = now_rfc3339();
    with_store_retry(|| {
        reports::put_report(
            &inner.db,
            ReportKind::Intelligence,
            session_id,
            &intelligence,
            &stored_at,
        )
    })
    .await?;

    transcripts::append_transcript(
        &inner.db,
        &TranscriptEntry {
            session_id: session_id.to_string(),
            role: TranscriptRole::Doorbell,
            content: intelligence.reply_text.clone(),
            timestamp: now_rfc3339(),
        },
    )
    .await?;

    audit::append_audit(
        &inner.db,
        &AuditRow {
            id: 0,
            session_id: session_id.to_string(),
            agent: "intelligence".into(),
            action_type: "intelligence".into(),
            payload: serde_json::json!({
                "intent": intelligence.intent,
                "risk_score": intelligence.risk_score,
                "escalation_required": intelligence.escalation_required,
            }),
            status: "done".into(),
            short_reason: "assessment complete".into(),
            timestamp: now_rfc3339(),
        },
    )
    .await?;

    transition(
        inner,
        session_id,
        SessionStatus::IntelligenceDone,
        StatusFields {
            risk_score: Some(intelligence.risk_score),
            final_action: None,
        },
        Some(intelligence.reply_text.clone()),
    )
    .await?;

    // --- Decision (synchronous, pure) ---
    let directive = inner
        .stages
        .decision
        .decide(&intelligence, &job.device_id, &now_rfc3339());

    let stored_at = now_rfc3339();
    with_store_retry(|| {
        reports::put_report(
            &inner.db,
            ReportKind::Decision,
            session_id,
            &directive,
            &stored_at,
        )
    })
    .await?;

    transition(
        inner,
        session_id,
        SessionStatus::DecisionDone,
        StatusFields {
            risk_score: None,
            final_action: Some(directive.final_action),
        },
        None,
    )
    .await?;

    // --- Action ---
    let result = inner
        .stages
        .action
        .execute(&directive, &intelligence, &perception, &now_rfc3339())
        .await;

    audit::append_audit(
        &inner.db,
        &AuditRow {
            id: 0,
            session_id: session_id.to_string(),
            agent: "action".into(),
            action_type: directive.final_action.to_string(),
            payload: serde_json::to_value(&result)
                .unwrap_or(serde_json::Value::Null),
            status: result.status.to_string(),
            short_reason: directive.reason.clone(),
            timestamp: now_rfc3339(),
        },
    )
    .await?;

    transition(inner, session_id, SessionStatus::Completed, StatusFields::default(), None).await?;

    inner.bus.publish_session(
        session_id,
        BusEvent::SessionEnded {
            session_id: session_id.to_string(),
            reason: "completed".into(),
        },
    );

    Ok(())
}

/// One status transition: store write (retried once on store errors), one
/// audit row, one `pipeline_stage` event.
async fn transition(
    inner: &Arc<Inner>,
    session_id: &str,
    status: SessionStatus,
    fields: StatusFields,
    greeting: Option<String>,
) -> Result<(), ChowkidarError> {
    let now = now_rfc3339();
    with_store_retry(|| sessions::update_session_status(&inner.db, session_id, status, fields, &now))
        .await?;

    audit::append_audit(
        &inner.db,
        &AuditRow {
            id: 0,
            session_id: session_id.to_string(),
            agent: "orchestrator".into(),
            action_type: "pipeline_stage".into(),
            payload: serde_json::json!({}),
            status: status.to_string(),
            short_reason: String::new(),
            timestamp: now,
        },
    )
    .await?;

    inner.bus.publish_session(
        session_id,
        BusEvent::PipelineStage {
            session_id: session_id.to_string(),
            status,
            risk_score: fields.risk_score,
            greeting,
        },
    );
    Ok(())
}

/// Retry a store write once with a fresh call; anything else propagates.
async fn with_store_retry<T, F, Fut>(operation: F) -> Result<T, ChowkidarError>
where
    F: Fn() -> Fut,
    Fut: std::future::Future<Output = Result<T, ChowkidarError>>,
{
    match operation().await {
        Err(ChowkidarError::Store { source }) => {
            tracing::warn!(error = %source, "store write failed, retrying once");
            operation().await
        }
        other => other,
    }
}

/// Mark the session failed: status, audit row with the truncated error,
/// `session_ended` event, and a line in the orchestrator's error log.
async fn fail_session(inner: &Arc<Inner>, session_id: &str, reason: &str) {
    error!(session_id, reason, "pipeline failed");
    let truncated: String = reason.chars().take(512).collect();
    let now = now_rfc3339();

    let _ = sessions::update_session_status(
        &inner.db,
        session_id,
        SessionStatus::Error,
        StatusFields::default(),
        &now,
    )
    .await;
    let _ = audit::append_audit(
        &inner.db,
        &AuditRow {
            id: 0,
            session_id: session_id.to_string(),
            agent: "orchestrator".into(),
            action_type: "pipeline_stage".into(),
            payload: serde_json::json!({ "error": truncated }),
            status: SessionStatus::Error.to_string(),
            short_reason: "pipeline failure".into(),
            timestamp: now.clone(),
        },
    )
    .await;

    let log_line = serde_json::json!({
        "session_id": session_id,
        "timestamp": now,
        "error": truncated,
    })
    .to_string();
    let log_path = inner.data.log_path("orchestrator");
    let _ = inner.data.append_line(&log_path, &log_line).await;

    inner.bus.publish_session(
        session_id,
        BusEvent::SessionEnded {
            session_id: session_id.to_string(),
            reason: "error".into(),
        },
    );
}

/// Cooperative cancellation: the session moves to `error` with a
/// `cancelled` audit row. No persisted row is deleted.
async fn cancel_session(inner: &Arc<Inner>, session_id: &str) {
    let now = now_rfc3339();
    let _ = sessions::update_session_status(
        &inner.db,
        session_id,
        SessionStatus::Error,
        StatusFields::default(),
        &now,
    )
    .await;
    let _ = audit::append_audit(
        &inner.db,
        &AuditRow {
            id: 0,
            session_id: session_id.to_string(),
            agent: "orchestrator".into(),
            action_type: "cancelled".into(),
            payload: serde_json::json!({}),
            status: SessionStatus::Error.to_string(),
            short_reason: "cancelled".into(),
            timestamp: now,
        },
    )
    .await;
    inner.bus.publish_session(
        session_id,
        BusEvent::SessionEnded {
            session_id: session_id.to_string(),
            reason: "cancelled".into(),
        },
    );
}

fn cleanup(inner: &Arc<Inner>, session_id: &str) {
    // Only remove the queue entry this task owned; a newer task may have
    // already replaced it.
    inner
        .queues
        .remove_if(session_id, |_, sender| sender.is_closed());
    inner.tasks.remove(session_id);
}
