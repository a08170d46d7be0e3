// SPDX-FileCopyrightText: 2026 Chowkidar Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock providers for pipeline tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use chowkidar_core::traits::perception::{Observation, PerceptionInput, PerceptionProvider};
use chowkidar_core::traits::reply::{ReplyContext, ReplyProvider};
use chowkidar_core::{ChowkidarError, ObjectDetection};

/// Perception provider returning one scripted observation for every ring.
pub struct MockPerception {
    observation: Observation,
}

impl MockPerception {
    pub fn new(observation: Observation) -> Self {
        Self { observation }
    }
}

#[async_trait]
impl PerceptionProvider for MockPerception {
    async fn observe(&self, _input: &PerceptionInput) -> Result<Observation, ChowkidarError> {
        Ok(self.observation.clone())
    }
}

/// Perception provider that sleeps before answering and tracks how many
/// observations were in flight at once.
pub struct CountingPerception {
    observation: Observation,
    delay: Duration,
    in_flight: AtomicUsize,
    max_in_flight: Arc<AtomicUsize>,
}

impl CountingPerception {
    pub fn new(observation: Observation, delay: Duration) -> (Self, Arc<AtomicUsize>) {
        let max = Arc::new(AtomicUsize::new(0));
        (
            Self {
                observation,
                delay,
                in_flight: AtomicUsize::new(0),
                max_in_flight: max.clone(),
            },
            max,
        )
    }
}

#[async_trait]
impl PerceptionProvider for CountingPerception {
    async fn observe(&self, _input: &PerceptionInput) -> Result<Observation, ChowkidarError> {
        let active = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(active, Ordering::SeqCst);
        tokio::time::sleep(self.delay).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        Ok(self.observation.clone())
    }
}

/// Reply provider returning scripted text.
pub struct MockReply {
    reply: String,
}

impl MockReply {
    pub fn new(reply: impl Into<String>) -> Self {
        Self {
            reply: reply.into(),
        }
    }
}

#[async_trait]
impl ReplyProvider for MockReply {
    async fn generate(&self, _context: &ReplyContext) -> Result<String, ChowkidarError> {
        Ok(self.reply.clone())
    }
}

/// A confident daytime delivery visit.
pub fn observation_delivery() -> Observation {
    Observation {
        person_detected: true,
        objects: vec![ObjectDetection {
            label: "package".into(),
            confidence: 0.78,
        }],
        vision_confidence: 0.88,
        transcript: "I have a package delivery".into(),
        stt_confidence: 0.9,
        weapon_detected: false,
        weapon_confidence: 0.0,
        weapon_labels: vec![],
    }
}

/// A knife in frame with nothing said.
pub fn observation_weapon() -> Observation {
    Observation {
        person_detected: true,
        objects: vec![ObjectDetection {
            label: "person".into(),
            confidence: 0.90,
        }],
        vision_confidence: 0.90,
        transcript: String::new(),
        stt_confidence: 0.0,
        weapon_detected: true,
        weapon_confidence: 0.82,
        weapon_labels: vec!["knife".into()],
    }
}

/// An OTP scam opener in Devanagari.
pub fn observation_scam() -> Observation {
    Observation {
        person_detected: true,
        objects: vec![],
        vision_confidence: 0.65,
        transcript: "ओटीपी बता दीजिए".into(),
        stt_confidence: 0.8,
        weapon_detected: false,
        weapon_confidence: 0.0,
        weapon_labels: vec![],
    }
}
