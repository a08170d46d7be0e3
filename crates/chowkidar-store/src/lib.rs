// SPDX-FileCopyrightText: 2026 Chowkidar Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite persistence layer for the chowkidar pipeline.
//!
//! Provides WAL-mode SQLite storage with embedded migrations, a single-writer
//! concurrency model via `tokio-rusqlite`, and typed operations for sessions
//! (monotonic status), idempotent stage reports, append-only transcripts and
//! audit rows, and the owner/member/token side tables.

pub mod database;
pub mod migrations;
pub mod models;
pub mod queries;

pub use database::Database;
pub use models::{Member, MemberUpdate, Owner};
pub use queries::reports::ReportKind;
pub use queries::sessions::StatusFields;
