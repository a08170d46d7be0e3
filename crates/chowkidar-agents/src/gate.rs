// SPDX-FileCopyrightText: 2026 Chowkidar Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Bounded gate for CPU-heavy provider work.
//!
//! Vision inference, STT decoding, and TTS synthesis share one small pool
//! so I/O-bound stages keep interleaving without starving the ingress path.

use tokio::sync::{Semaphore, SemaphorePermit};

/// A semaphore-bounded gate; acquire a permit around each inference call.
#[derive(Debug)]
pub struct InferenceGate {
    permits: Semaphore,
}

impl InferenceGate {
    pub fn new(size: usize) -> Self {
        Self {
            permits: Semaphore::new(size.max(1)),
        }
    }

    pub async fn acquire(&self) -> SemaphorePermit<'_> {
        // The semaphore is never closed, so acquire cannot fail.
        self.permits
            .acquire()
            .await
            .expect("inference gate semaphore closed")
    }

    /// Permits currently available (test observability).
    pub fn available(&self) -> usize {
        self.permits.available_permits()
    }
}
