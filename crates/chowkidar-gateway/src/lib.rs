// SPDX-FileCopyrightText: 2026 Chowkidar Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP/WebSocket transport shell for the chowkidar pipeline.
//!
//! The gateway translates between the wire and the orchestrator: JSON in,
//! session ids and status out, live events over WebSocket. It holds no
//! pipeline state of its own.

pub mod auth;
pub mod handlers;
pub mod server;
pub mod ws;

pub use server::{start_server, GatewayState, ServerConfig};
