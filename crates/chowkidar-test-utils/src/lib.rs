// SPDX-FileCopyrightText: 2026 Chowkidar Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities: mock providers and an end-to-end harness that wires the
//! full pipeline over temp storage.

pub mod harness;
pub mod mocks;

pub use harness::{TestHarness, TestHarnessBuilder};
pub use mocks::{
    observation_delivery, observation_scam, observation_weapon, CountingPerception,
    MockPerception, MockReply,
};
