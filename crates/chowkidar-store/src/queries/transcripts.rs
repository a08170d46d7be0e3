// SPDX-FileCopyrightText: 2026 Chowkidar Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Append-only per-session conversation log.

use std::str::FromStr;

use rusqlite::params;

use chowkidar_core::{ChowkidarError, TranscriptEntry, TranscriptRole};

use crate::database::{map_tr_err, Database};

/// Append a transcript entry.
pub async fn append_transcript(
    db: &Database,
    entry: &TranscriptEntry,
) -> Result<(), ChowkidarError> {
    let entry = entry.clone();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO transcripts (session_id, role, content, timestamp)
                 VALUES (?1, ?2, ?3, ?4)",
                params![
                    entry.session_id,
                    entry.role.to_string(),
                    entry.content,
                    entry.timestamp,
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// List a session's transcript in insertion order.
pub async fn list_transcripts(
    db: &Database,
    session_id: &str,
) -> Result<Vec<TranscriptEntry>, ChowkidarError> {
    let session_id = session_id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT session_id, role, content, timestamp
                 FROM transcripts WHERE session_id = ?1 ORDER BY id",
            )?;
            let rows = stmt.query_map(params![session_id], row_to_entry)?;
            let mut entries = Vec::new();
            for row in rows {
                entries.push(row?);
            }
            Ok(entries)
        })
        .await
        .map_err(map_tr_err)
}

/// Most recent transcript entries across all sessions, newest first.
pub async fn recent_transcripts(
    db: &Database,
    limit: usize,
) -> Result<Vec<TranscriptEntry>, ChowkidarError> {
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT session_id, role, content, timestamp
                 FROM transcripts ORDER BY id DESC LIMIT ?1",
            )?;
            let rows = stmt.query_map(params![limit as i64], row_to_entry)?;
            let mut entries = Vec::new();
            for row in rows {
                entries.push(row?);
            }
            Ok(entries)
        })
        .await
        .map_err(map_tr_err)
}

fn row_to_entry(row: &rusqlite::Row<'_>) -> rusqlite::Result<TranscriptEntry> {
    let role: String = row.get(1)?;
    Ok(TranscriptEntry {
        session_id: row.get(0)?,
        role: TranscriptRole::from_str(&role).unwrap_or(TranscriptRole::Visitor),
        content: row.get(2)?,
        timestamp: row.get(3)?,
    })
}
