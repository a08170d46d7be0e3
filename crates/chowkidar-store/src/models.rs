// SPDX-FileCopyrightText: 2026 Chowkidar Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Storage-only row types.
//!
//! Pipeline entities (sessions, reports, transcripts, audit rows) use the
//! canonical types from `chowkidar-core`; the rows here back the owner
//! auth and member directory side tables.

use serde::{Deserialize, Serialize};

/// A registered owner account.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Owner {
    pub id: i64,
    pub username: String,
    pub name: String,
}

/// A household member known to the directory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Member {
    pub id: i64,
    pub owner_id: i64,
    pub name: String,
    pub phone: String,
    pub role: String,
    pub photo_path: String,
    pub permitted: bool,
    pub created_at: String,
}

/// Partial update for a member row; `None` fields are left unchanged.
#[derive(Debug, Clone, Default)]
pub struct MemberUpdate {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub role: Option<String>,
    pub photo_path: Option<String>,
    pub permitted: Option<bool>,
}
