// SPDX-FileCopyrightText: 2026 Chowkidar Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-process event fan-out keyed by channel.
//!
//! Channels are `owner` (global) plus one per session id. Each channel is a
//! `tokio::sync::broadcast` of capacity 64: publishing never blocks the
//! producer, and a subscriber that falls behind loses the oldest events
//! rather than stalling anyone. Delivery is at-most-once and best-effort;
//! reliability comes from polling the store.

use dashmap::DashMap;
use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;
use tracing::trace;

use chowkidar_core::BusEvent;

/// The global channel the owner dashboard subscribes to.
pub const OWNER_CHANNEL: &str = "owner";

/// Per-subscriber buffer depth; the oldest events are dropped on overflow.
const CHANNEL_CAPACITY: usize = 64;

/// Fan-out hub for session lifecycle events.
#[derive(Clone, Default)]
pub struct EventBus {
    channels: std::sync::Arc<DashMap<String, broadcast::Sender<BusEvent>>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Publish an event on a channel. Non-blocking; a channel with no
    /// subscribers silently drops the event.
    pub fn publish(&self, channel: &str, event: BusEvent) {
        let sender = self.sender(channel);
        let delivered = sender.send(event).unwrap_or(0);
        trace!(channel, delivered, "event published");
    }

    /// Publish on the session channel and mirror to the owner channel.
    pub fn publish_session(&self, session_id: &str, event: BusEvent) {
        self.publish(session_id, event.clone());
        self.publish(OWNER_CHANNEL, event);
    }

    /// Subscribe to a channel. The stream closes when the subscriber is
    /// dropped; events published before subscription are not replayed.
    pub fn subscribe(&self, channel: &str) -> BroadcastStream<BusEvent> {
        BroadcastStream::new(self.sender(channel).subscribe())
    }

    /// Number of live subscribers on a channel.
    pub fn subscriber_count(&self, channel: &str) -> usize {
        self.channels
            .get(channel)
            .map(|s| s.receiver_count())
            .unwrap_or(0)
    }

    fn sender(&self, channel: &str) -> broadcast::Sender<BusEvent> {
        self.channels
            .entry(channel.to_string())
            .or_insert_with(|| broadcast::channel(CHANNEL_CAPACITY).0)
            .clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chowkidar_core::SessionStatus;
    use futures::StreamExt;

    fn stage_event(session_id: &str, status: SessionStatus) -> BusEvent {
        BusEvent::PipelineStage {
            session_id: session_id.into(),
            status,
            risk_score: None,
            greeting: None,
        }
    }

    #[tokio::test]
    async fn subscriber_receives_events_in_publish_order() {
        let bus = EventBus::new();
        let mut stream = bus.subscribe("s1");

        bus.publish("s1", stage_event("s1", SessionStatus::Processing));
        bus.publish("s1", stage_event("s1", SessionStatus::PerceptionDone));

        let first = stream.next().await.unwrap().unwrap();
        let second = stream.next().await.unwrap().unwrap();
        match (first, second) {
            (
                BusEvent::PipelineStage { status: a, .. },
                BusEvent::PipelineStage { status: b, .. },
            ) => {
                assert_eq!(a, SessionStatus::Processing);
                assert_eq!(b, SessionStatus::PerceptionDone);
            }
            other => panic!("unexpected events: {other:?}"),
        }
    }

    #[tokio::test]
    async fn publish_without_subscribers_does_not_fail() {
        let bus = EventBus::new();
        bus.publish("nobody-listening", stage_event("x", SessionStatus::Queued));
    }

    #[tokio::test]
    async fn session_publish_mirrors_to_owner_channel() {
        let bus = EventBus::new();
        let mut owner = bus.subscribe(OWNER_CHANNEL);
        let mut session = bus.subscribe("s1");

        bus.publish_session("s1", stage_event("s1", SessionStatus::Completed));

        assert!(owner.next().await.unwrap().is_ok());
        assert!(session.next().await.unwrap().is_ok());
    }

    #[tokio::test]
    async fn slow_subscriber_drops_from_the_tail() {
        let bus = EventBus::new();
        let mut stream = bus.subscribe("s1");

        // Overflow the 64-slot buffer without draining.
        for i in 0..80u64 {
            bus.publish("s1", stage_event(&format!("s1-{i}"), SessionStatus::Queued));
        }

        // The first poll reports the lag, subsequent polls resume from the
        // oldest retained event.
        let mut seen = 0;
        let mut lagged = false;
        while let Ok(Some(item)) =
            tokio::time::timeout(std::time::Duration::from_millis(50), stream.next()).await
        {
            match item {
                Ok(_) => seen += 1,
                Err(_) => lagged = true,
            }
        }
        assert!(lagged, "expected a lag notification");
        assert!(seen <= 64, "retained no more than the buffer capacity");
        assert!(seen > 0);
    }
}
