// SPDX-FileCopyrightText: 2026 Chowkidar Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Append-only audit trail.
//!
//! One row per stage transition and per externally observable side effect.
//! Rows are never modified; insertion order breaks timestamp ties.

use rusqlite::params;

use chowkidar_core::{AuditRow, ChowkidarError};

use crate::database::{map_tr_err, Database};

/// Append an audit row; returns the assigned row id.
pub async fn append_audit(db: &Database, row: &AuditRow) -> Result<i64, ChowkidarError> {
    let row = row.clone();
    let payload = row.payload.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO actions (session_id, agent, action_type, payload, status, short_reason, timestamp)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    row.session_id,
                    row.agent,
                    row.action_type,
                    payload,
                    row.status,
                    row.short_reason,
                    row.timestamp,
                ],
            )?;
            Ok(conn.last_insert_rowid())
        })
        .await
        .map_err(map_tr_err)
}

/// List a session's audit rows in insertion order.
pub async fn list_actions(
    db: &Database,
    session_id: &str,
) -> Result<Vec<AuditRow>, ChowkidarError> {
    let session_id = session_id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, session_id, agent, action_type, payload, status, short_reason, timestamp
                 FROM actions WHERE session_id = ?1 ORDER BY id",
            )?;
            let rows = stmt.query_map(params![session_id], row_to_audit)?;
            let mut out = Vec::new();
            for row in rows {
                out.push(row?);
            }
            Ok(out)
        })
        .await
        .map_err(map_tr_err)
}

/// Most recent audit rows across all sessions, newest first.
pub async fn recent_actions(db: &Database, limit: usize) -> Result<Vec<AuditRow>, ChowkidarError> {
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, session_id, agent, action_type, payload, status, short_reason, timestamp
                 FROM actions ORDER BY id DESC LIMIT ?1",
            )?;
            let rows = stmt.query_map(params![limit as i64], row_to_audit)?;
            let mut out = Vec::new();
            for row in rows {
                out.push(row?);
            }
            Ok(out)
        })
        .await
        .map_err(map_tr_err)
}

fn row_to_audit(row: &rusqlite::Row<'_>) -> rusqlite::Result<AuditRow> {
    let payload: String = row.get(4)?;
    Ok(AuditRow {
        id: row.get(0)?,
        session_id: row.get(1)?,
        agent: row.get(2)?,
        action_type: row.get(3)?,
        payload: serde_json::from_str(&payload).unwrap_or(serde_json::Value::Null),
        status: row.get(5)?,
        short_reason: row.get(6)?,
        timestamp: row.get(7)?,
    })
}
