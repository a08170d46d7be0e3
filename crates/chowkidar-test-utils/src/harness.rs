// SPDX-FileCopyrightText: 2026 Chowkidar Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test harness for end-to-end pipeline testing.
//!
//! `TestHarness` assembles a complete orchestrator over a temp data root
//! and temp SQLite database, with mock providers and short deadlines, and
//! provides helpers to ring the doorbell and await terminal status.

use std::sync::Arc;
use std::time::Duration;

use chowkidar_agents::{
    ActionExecutor, DecisionEngine, InferenceGate, IntelligenceEngine, NullTts, PerceptionStage,
    VocabSet,
};
use chowkidar_assets::DataDir;
use chowkidar_bus::EventBus;
use chowkidar_config::{PipelineConfig, PolicyConfig};
use chowkidar_core::traits::perception::{Observation, PerceptionProvider};
use chowkidar_core::traits::reply::ReplyProvider;
use chowkidar_core::{ChowkidarError, RingEvent, Session, SessionStatus};
use chowkidar_orchestrator::{Orchestrator, RingAccepted, Stages};
use chowkidar_store::Database;

use crate::mocks::{observation_delivery, MockPerception};

/// Builder for a test orchestrator with configurable providers.
pub struct TestHarnessBuilder {
    perception: Option<Arc<dyn PerceptionProvider>>,
    reply: Option<Arc<dyn ReplyProvider>>,
    config: PipelineConfig,
    policy: PolicyConfig,
}

impl TestHarnessBuilder {
    fn new() -> Self {
        Self {
            perception: None,
            reply: None,
            config: PipelineConfig {
                // Short deadlines and a tight idle window keep tests fast.
                provider_timeout_secs: 2,
                action_timeout_secs: 2,
                session_idle_timeout_secs: 1,
                worker_pool_size: 8,
                ..PipelineConfig::default()
            },
            policy: PolicyConfig::default(),
        }
    }

    /// Use a scripted observation for every ring.
    pub fn with_observation(mut self, observation: Observation) -> Self {
        self.perception = Some(Arc::new(MockPerception::new(observation)));
        self
    }

    /// Use a custom perception provider.
    pub fn with_perception(mut self, provider: Arc<dyn PerceptionProvider>) -> Self {
        self.perception = Some(provider);
        self
    }

    /// Use a reply provider for conversational intents.
    pub fn with_reply_provider(mut self, provider: Arc<dyn ReplyProvider>) -> Self {
        self.reply = Some(provider);
        self
    }

    /// Override the pipeline configuration.
    pub fn with_config(mut self, config: PipelineConfig) -> Self {
        self.config = config;
        self
    }

    /// Override the decision policy.
    pub fn with_policy(mut self, policy: PolicyConfig) -> Self {
        self.policy = policy;
        self
    }

    /// Assemble the orchestrator over temp storage.
    pub async fn build(self) -> Result<TestHarness, ChowkidarError> {
        let temp_dir = tempfile::TempDir::new().map_err(|e| ChowkidarError::Store {
            source: e.into(),
        })?;

        let data = DataDir::new(temp_dir.path().join("data"));
        data.ensure().await?;

        let db_path = temp_dir.path().join("data/db");
        let db = Database::open(&db_path.to_string_lossy()).await?;
        let bus = EventBus::new();

        let vocab = Arc::new(VocabSet::default());
        let gate = Arc::new(InferenceGate::new(self.config.worker_pool_size));
        let perception_provider = self
            .perception
            .unwrap_or_else(|| Arc::new(MockPerception::new(observation_delivery())));

        let stages = Stages {
            perception: PerceptionStage::new(
                perception_provider,
                vocab.clone(),
                gate.clone(),
                self.config.provider_timeout(),
            ),
            intelligence: IntelligenceEngine::new(
                vocab,
                self.reply,
                self.config.provider_timeout(),
            ),
            decision: DecisionEngine::new(self.policy),
            action: ActionExecutor::new(
                data.clone(),
                Arc::new(NullTts),
                gate,
                self.config.action_timeout(),
            ),
        };

        let orchestrator = Orchestrator::new(db.clone(), bus.clone(), data.clone(), stages, self.config);

        Ok(TestHarness {
            orchestrator,
            db,
            bus,
            data,
            _temp_dir: temp_dir,
        })
    }
}

/// A fully wired pipeline over temp storage.
pub struct TestHarness {
    pub orchestrator: Orchestrator,
    pub db: Database,
    pub bus: EventBus,
    pub data: DataDir,
    _temp_dir: tempfile::TempDir,
}

impl TestHarness {
    pub fn builder() -> TestHarnessBuilder {
        TestHarnessBuilder::new()
    }

    /// Ring the doorbell with a snapshot and audio clip attached.
    pub async fn ring(&self, device_id: &str) -> Result<RingAccepted, ChowkidarError> {
        self.ring_session(device_id, None).await
    }

    /// Ring with an explicit session id.
    pub async fn ring_session(
        &self,
        device_id: &str,
        session_id: Option<&str>,
    ) -> Result<RingAccepted, ChowkidarError> {
        self.orchestrator
            .ring(RingEvent {
                session_id: session_id.map(str::to_string),
                device_id: device_id.to_string(),
                timestamp: chowkidar_orchestrator::now_rfc3339(),
                image_bytes: Some(vec![0xff, 0xd8, 0xff, 0xe0]),
                audio_bytes: Some(vec![0x52, 0x49, 0x46, 0x46]),
                metadata: None,
            })
            .await
    }

    /// Poll until the session reaches a terminal status or the deadline
    /// passes.
    pub async fn wait_for_terminal(
        &self,
        session_id: &str,
        deadline: Duration,
    ) -> Result<Session, ChowkidarError> {
        let started = tokio::time::Instant::now();
        loop {
            if let Some(session) = self.orchestrator.session_status(session_id).await? {
                if session.status.is_terminal() {
                    return Ok(session);
                }
            }
            if started.elapsed() > deadline {
                return Err(ChowkidarError::Timeout { duration: deadline });
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }

    /// Poll until the session reaches exactly the given status.
    pub async fn wait_for_status(
        &self,
        session_id: &str,
        status: SessionStatus,
        deadline: Duration,
    ) -> Result<Session, ChowkidarError> {
        let started = tokio::time::Instant::now();
        loop {
            if let Some(session) = self.orchestrator.session_status(session_id).await? {
                if session.status == status {
                    return Ok(session);
                }
            }
            if started.elapsed() > deadline {
                return Err(ChowkidarError::Timeout { duration: deadline });
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }
}
