// SPDX-FileCopyrightText: 2026 Chowkidar Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The orchestrator: session registry, bounded scheduler, and pipeline
//! driver.
//!
//! Holds a global semaphore of `max_concurrent_sessions` slots, one bounded
//! work queue and at most one running task per session, and injected
//! references to every stage. Components never call back into the
//! orchestrator; events flow one way over the bus.

pub mod pipeline;

use std::sync::Arc;

use chrono::{SecondsFormat, Timelike, Utc};
use dashmap::DashMap;
use serde::Serialize;
use tokio::sync::{mpsc, Semaphore};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use chowkidar_agents::{ActionExecutor, DecisionEngine, IntelligenceEngine, PerceptionStage};
use chowkidar_assets::DataDir;
use chowkidar_bus::EventBus;
use chowkidar_config::PipelineConfig;
use chowkidar_core::{
    AuditRow, BusEvent, ChowkidarError, Directive, IntelligenceReport, PerceptionReport,
    RingEvent, Session, SessionStatus, TranscriptEntry, TranscriptRole,
};
use chowkidar_store::queries::{audit, reports, sessions, transcripts};
use chowkidar_store::Database;

/// RFC 3339 timestamp with millisecond precision.
pub fn now_rfc3339() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Mint a session id for a ring that arrived without one.
fn mint_session_id() -> String {
    let hex = uuid::Uuid::new_v4().simple().to_string();
    format!("visitor_{}", &hex[..8])
}

/// The four injected stage engines.
pub struct Stages {
    pub perception: PerceptionStage,
    pub intelligence: IntelligenceEngine,
    pub decision: DecisionEngine,
    pub action: ActionExecutor,
}

/// One unit of per-session work: a ring with its persisted assets.
#[derive(Debug)]
pub(crate) struct RingJob {
    pub device_id: String,
    pub image_path: Option<std::path::PathBuf>,
    pub audio_path: Option<std::path::PathBuf>,
}

/// Immediate response to an accepted ring; the greeting follows on the bus.
#[derive(Debug, Clone, Serialize)]
pub struct RingAccepted {
    pub session_id: String,
    pub status: SessionStatus,
    pub image_url: Option<String>,
}

/// Full session view for the detail endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct SessionDetail {
    pub session: Session,
    pub perception: Option<PerceptionReport>,
    pub intelligence: Option<IntelligenceReport>,
    pub decision: Option<Directive>,
    pub transcripts: Vec<TranscriptEntry>,
    pub actions: Vec<AuditRow>,
}

/// Recent activity for the dashboard log view.
#[derive(Debug, Clone, Serialize)]
pub struct LogsSnapshot {
    pub sessions: Vec<Session>,
    pub transcripts: Vec<TranscriptEntry>,
    pub actions: Vec<AuditRow>,
}

pub(crate) struct Inner {
    pub db: Database,
    pub bus: EventBus,
    pub data: DataDir,
    pub stages: Stages,
    pub config: PipelineConfig,
    pub semaphore: Arc<Semaphore>,
    pub queues: DashMap<String, mpsc::Sender<RingJob>>,
    pub tasks: DashMap<String, JoinHandle<()>>,
    pub cancel: CancellationToken,
}

/// The pipeline orchestrator. Cheap to clone; all state lives in `Inner`.
#[derive(Clone)]
pub struct Orchestrator {
    inner: Arc<Inner>,
}

impl Orchestrator {
    pub fn new(
        db: Database,
        bus: EventBus,
        data: DataDir,
        stages: Stages,
        config: PipelineConfig,
    ) -> Self {
        let semaphore = Arc::new(Semaphore::new(config.max_concurrent_sessions.max(1)));
        Self {
            inner: Arc::new(Inner {
                db,
                bus,
                data,
                stages,
                config,
                semaphore,
                queues: DashMap::new(),
                tasks: DashMap::new(),
                cancel: CancellationToken::new(),
            }),
        }
    }

    pub fn bus(&self) -> &EventBus {
        &self.inner.bus
    }

    pub fn db(&self) -> &Database {
        &self.inner.db
    }

    pub fn data(&self) -> &DataDir {
        &self.inner.data
    }

    /// True once shutdown has begun; ingress refuses new rings.
    pub fn is_shutting_down(&self) -> bool {
        self.inner.cancel.is_cancelled()
    }

    /// Ingress: validate, persist assets, create the session, and enqueue
    /// the pipeline job. Returns immediately; the greeting follows on the
    /// bus once intelligence produces it.
    pub async fn ring(&self, event: RingEvent) -> Result<RingAccepted, ChowkidarError> {
        if self.inner.cancel.is_cancelled() {
            return Err(ChowkidarError::Cancelled);
        }
        if event.device_id.trim().is_empty() {
            return Err(ChowkidarError::ContractViolation {
                message: "ring event missing device_id".into(),
            });
        }

        let session_id = event
            .session_id
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .map(str::to_string)
            .unwrap_or_else(mint_session_id);
        let now = now_rfc3339();

        let image_path = match &event.image_bytes {
            Some(bytes) if !bytes.is_empty() => {
                let path = self.inner.data.snapshot_path(&session_id);
                self.inner.data.write_atomic(&path, bytes).await?;
                Some(path)
            }
            _ => None,
        };
        let audio_path = match &event.audio_bytes {
            Some(bytes) if !bytes.is_empty() => {
                let stamp = Utc::now().timestamp_millis().to_string();
                let path = self.inner.data.tmp_audio_path(&session_id, &stamp);
                self.inner.data.write_atomic(&path, bytes).await?;
                Some(path)
            }
            _ => None,
        };

        let is_new = sessions::get_session(&self.inner.db, &session_id)
            .await?
            .is_none();
        if is_new {
            sessions::create_session(
                &self.inner.db,
                &Session {
                    id: session_id.clone(),
                    device_id: event.device_id.clone(),
                    status: SessionStatus::Queued,
                    risk_score: 0.0,
                    final_action: None,
                    created_at: now.clone(),
                    last_updated_at: now.clone(),
                },
            )
            .await?;
        }

        audit::append_audit(
            &self.inner.db,
            &AuditRow {
                id: 0,
                session_id: session_id.clone(),
                agent: "orchestrator".into(),
                action_type: "ring_received".into(),
                payload: serde_json::json!({
                    "device_id": event.device_id.clone(),
                    "metadata": event.metadata,
                }),
                status: "queued".into(),
                short_reason: "ring event queued".into(),
                timestamp: now.clone(),
            },
        )
        .await?;

        let image_url = image_path
            .is_some()
            .then(|| format!("/static/snaps/{session_id}.jpg"));
        if is_new {
            self.inner.bus.publish_session(
                &session_id,
                BusEvent::NewRing {
                    session_id: session_id.clone(),
                    device_id: event.device_id.clone(),
                    image_url: image_url.clone(),
                },
            );
        }

        let job = RingJob {
            device_id: event.device_id,
            image_path,
            audio_path,
        };
        self.enqueue(&session_id, job)?;

        Ok(RingAccepted {
            session_id,
            status: SessionStatus::Queued,
            image_url,
        })
    }

    /// Route a job to the session's queue, spawning the pipeline task when
    /// none is running. A full queue surfaces back-pressure to the caller.
    fn enqueue(&self, session_id: &str, job: RingJob) -> Result<(), ChowkidarError> {
        if let Some(sender) = self.inner.queues.get(session_id) {
            match sender.try_send(job) {
                Ok(()) => return Ok(()),
                Err(mpsc::error::TrySendError::Full(_)) => {
                    warn!(session_id, "session queue full, rejecting ring");
                    return Err(ChowkidarError::BackPressure {
                        session_id: session_id.to_string(),
                    });
                }
                Err(mpsc::error::TrySendError::Closed(returned)) => {
                    // The previous task wound down between lookup and send;
                    // fall through and start a fresh queue.
                    drop(sender);
                    self.inner.queues.remove(session_id);
                    return self.spawn_session(session_id, returned);
                }
            }
        }
        self.spawn_session(session_id, job)
    }

    fn spawn_session(&self, session_id: &str, job: RingJob) -> Result<(), ChowkidarError> {
        let (tx, rx) = mpsc::channel(self.inner.config.session_queue_depth.max(1));
        tx.try_send(job)
            .map_err(|_| ChowkidarError::Internal("fresh session queue rejected job".into()))?;
        self.inner.queues.insert(session_id.to_string(), tx);

        let inner = self.inner.clone();
        let id = session_id.to_string();
        let handle = tokio::spawn(pipeline::run_session(inner, id.clone(), rx));
        self.inner.tasks.insert(id, handle);
        Ok(())
    }

    /// Session status summary for the status endpoint.
    pub async fn session_status(&self, session_id: &str) -> Result<Option<Session>, ChowkidarError> {
        sessions::get_session(&self.inner.db, session_id).await
    }

    /// Full reports + transcripts + audit rows for one session.
    pub async fn session_detail(
        &self,
        session_id: &str,
    ) -> Result<Option<SessionDetail>, ChowkidarError> {
        let Some(session) = sessions::get_session(&self.inner.db, session_id).await? else {
            return Ok(None);
        };
        Ok(Some(SessionDetail {
            perception: reports::get_perception(&self.inner.db, session_id).await?,
            intelligence: reports::get_intelligence(&self.inner.db, session_id).await?,
            decision: reports::get_decision(&self.inner.db, session_id).await?,
            transcripts: transcripts::list_transcripts(&self.inner.db, session_id).await?,
            actions: audit::list_actions(&self.inner.db, session_id).await?,
            session,
        }))
    }

    /// Recent sessions with transcripts and audit rows for the dashboard.
    pub async fn logs(&self, limit: usize) -> Result<LogsSnapshot, ChowkidarError> {
        Ok(LogsSnapshot {
            sessions: sessions::list_sessions(&self.inner.db, limit, None).await?,
            transcripts: transcripts::recent_transcripts(&self.inner.db, limit).await?,
            actions: audit::recent_actions(&self.inner.db, limit).await?,
        })
    }

    /// Visitor follow-up turn: append the visitor transcript, generate a
    /// bounded-context reply, append and return it.
    pub async fn conversation_reply(
        &self,
        session_id: &str,
        message: &str,
    ) -> Result<String, ChowkidarError> {
        let now = now_rfc3339();
        transcripts::append_transcript(
            &self.inner.db,
            &TranscriptEntry {
                session_id: session_id.to_string(),
                role: TranscriptRole::Visitor,
                content: message.to_string(),
                timestamp: now.clone(),
            },
        )
        .await?;

        let history: Vec<(TranscriptRole, String)> =
            transcripts::list_transcripts(&self.inner.db, session_id)
                .await?
                .into_iter()
                .map(|t| (t.role, t.content))
                .collect();
        let summary = match reports::get_perception(&self.inner.db, session_id).await? {
            Some(p) => format!("person_detected={} emotion={}", p.person_detected, p.emotion),
            None => String::new(),
        };

        let (reply, incident) = self
            .inner
            .stages
            .intelligence
            .converse(session_id, &history, summary)
            .await;
        if let Some(label) = incident {
            audit::append_audit(
                &self.inner.db,
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

        transcripts::append_transcript(
            &self.inner.db,
            &TranscriptEntry {
                session_id: session_id.to_string(),
                role: TranscriptRole::Doorbell,
                content: reply.clone(),
                timestamp: now_rfc3339(),
            },
        )
        .await?;

        Ok(reply)
    }

    /// Owner reply: append the doorbell-role transcript with the owner
    /// marker and publish on the session channel.
    pub async fn owner_reply(
        &self,
        session_id: &str,
        message: &str,
    ) -> Result<(), ChowkidarError> {
        let now = now_rfc3339();
        transcripts::append_transcript(
            &self.inner.db,
            &TranscriptEntry {
                session_id: session_id.to_string(),
                role: TranscriptRole::Doorbell,
                content: format!("[owner] {message}"),
                timestamp: now.clone(),
            },
        )
        .await?;
        audit::append_audit(
            &self.inner.db,
            &AuditRow {
                id: 0,
                session_id: session_id.to_string(),
                agent: "orchestrator".into(),
                action_type: "owner_reply".into(),
                payload: serde_json::json!({ "message": message }),
                status: "queued".into(),
                short_reason: "owner manual reply".into(),
                timestamp: now,
            },
        )
        .await?;
        self.inner.bus.publish(
            session_id,
            BusEvent::OwnerReply {
                session_id: session_id.to_string(),
                message: message.to_string(),
            },
        );
        Ok(())
    }

    /// Begin cooperative shutdown: cancel all pipeline tasks and wait for
    /// them to wind down.
    pub async fn shutdown(&self) {
        info!("orchestrator shutting down");
        self.inner.cancel.cancel();

        let ids: Vec<String> = self.inner.tasks.iter().map(|e| e.key().clone()).collect();
        for id in ids {
            if let Some((_, handle)) = self.inner.tasks.remove(&id) {
                if let Err(e) =
                    tokio::time::timeout(std::time::Duration::from_secs(5), handle).await
                {
                    warn!(session_id = id.as_str(), error = %e, "pipeline task did not wind down");
                }
            }
        }
    }

    /// The local wall-clock hour used for night-time risk scoring.
    pub fn local_hour() -> u32 {
        chrono::Local::now().hour()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minted_ids_have_the_visitor_prefix() {
        let id = mint_session_id();
        assert!(id.starts_with("visitor_"));
        assert_eq!(id.len(), "visitor_".len() + 8);
    }

    #[test]
    fn timestamps_are_rfc3339_with_millis() {
        let ts = now_rfc3339();
        assert!(ts.ends_with('Z'));
        assert!(ts.contains('.'));
    }
}
