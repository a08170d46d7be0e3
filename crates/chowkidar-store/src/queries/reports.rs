// SPDX-FileCopyrightText: 2026 Chowkidar Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Stage report storage, idempotent per (kind, session_id).
//!
//! Reports are owned by their producing stage and never mutated after
//! insert; a second write for the same key is a no-op returning the
//! existing row.

use rusqlite::params;
use serde::de::DeserializeOwned;
use serde::Serialize;

use chowkidar_core::{ChowkidarError, Directive, IntelligenceReport, PerceptionReport};

use crate::database::{domain_err, map_tr_err, Database};

/// Which stage produced the report; doubles as the idempotency key prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportKind {
    Perception,
    Intelligence,
    Decision,
}

impl ReportKind {
    fn table(self) -> &'static str {
        match self {
            ReportKind::Perception => "perception_reports",
            ReportKind::Intelligence => "intelligence_reports",
            ReportKind::Decision => "decisions",
        }
    }
}

/// Store a report for `(kind, session_id)`. Returns `true` when the row was
/// inserted, `false` when a report already existed (no-op).
pub async fn put_report<T: Serialize>(
    db: &Database,
    kind: ReportKind,
    session_id: &str,
    report: &T,
    now: &str,
) -> Result<bool, ChowkidarError> {
    let payload = serde_json::to_string(report).map_err(|e| ChowkidarError::Internal(format!(
        "report serialization failed: {e}"
    )))?;
    let session_id = session_id.to_string();
    let now = now.to_string();
    let table = kind.table();

    db.connection()
        .call(move |conn| {
            let sql = format!(
                "INSERT OR IGNORE INTO {table} (session_id, payload, created_at) VALUES (?1, ?2, ?3)"
            );
            let inserted = conn.execute(&sql, params![session_id, payload, now])?;
            Ok(inserted > 0)
        })
        .await
        .map_err(map_tr_err)
}

/// Fetch a report for `(kind, session_id)`, deserializing the stored payload.
pub async fn get_report<T: DeserializeOwned + Send + 'static>(
    db: &Database,
    kind: ReportKind,
    session_id: &str,
) -> Result<Option<T>, ChowkidarError> {
    let session_id = session_id.to_string();
    let table = kind.table();

    db.connection()
        .call(move |conn| {
            let sql = format!("SELECT payload FROM {table} WHERE session_id = ?1");
            let result: Result<String, _> =
                conn.query_row(&sql, params![session_id], |row| row.get(0));
            match result {
                Ok(payload) => {
                    let parsed = serde_json::from_str(&payload).map_err(|e| {
                        domain_err(ChowkidarError::Internal(format!(
                            "corrupt {table} payload for {session_id}: {e}"
                        )))
                    })?;
                    Ok(Some(parsed))
                }
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e.into()),
            }
        })
        .await
        .map_err(map_tr_err)
}

/// Typed convenience wrappers used by the pipeline and the gateway.
pub async fn get_perception(
    db: &Database,
    session_id: &str,
) -> Result<Option<PerceptionReport>, ChowkidarError> {
    get_report(db, ReportKind::Perception, session_id).await
}

pub async fn get_intelligence(
    db: &Database,
    session_id: &str,
) -> Result<Option<IntelligenceReport>, ChowkidarError> {
    get_report(db, ReportKind::Intelligence, session_id).await
}

pub async fn get_decision(
    db: &Database,
    session_id: &str,
) -> Result<Option<Directive>, ChowkidarError> {
    get_report(db, ReportKind::Decision, session_id).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use chowkidar_core::Emotion;
    use tempfile::tempdir;

    async fn setup_db() -> (Database, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let db = Database::open(dir.path().join("test.db").to_str().unwrap())
            .await
            .unwrap();
        (db, dir)
    }

    fn make_report(session_id: &str, vision_confidence: f64) -> PerceptionReport {
        PerceptionReport {
            session_id: session_id.to_string(),
            person_detected: true,
            objects: vec![],
            vision_confidence,
            transcript: String::new(),
            stt_confidence: 0.0,
            emotion: Emotion::Neutral,
            anti_spoof_score: 0.0,
            weapon_detected: false,
            weapon_confidence: 0.0,
            weapon_labels: vec![],
            image_path: String::new(),
            timestamp: "2026-01-01T00:00:00Z".to_string(),
        }
    }

    #[tokio::test]
    async fn second_write_is_a_noop_returning_existing() {
        let (db, _dir) = setup_db().await;

        let first = make_report("s1", 0.9);
        let second = make_report("s1", 0.1);

        assert!(put_report(&db, ReportKind::Perception, "s1", &first, "t1")
            .await
            .unwrap());
        assert!(!put_report(&db, ReportKind::Perception, "s1", &second, "t2")
            .await
            .unwrap());

        // The stored row is still the first write.
        let stored = get_perception(&db, "s1").await.unwrap().unwrap();
        assert_eq!(stored.vision_confidence, 0.9);

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn kinds_are_independent_keys() {
        let (db, _dir) = setup_db().await;
        let report = make_report("s1", 0.5);

        assert!(put_report(&db, ReportKind::Perception, "s1", &report, "t")
            .await
            .unwrap());
        // Same session, different kind: still inserts.
        assert!(put_report(&db, ReportKind::Intelligence, "s1", &report, "t")
            .await
            .unwrap());

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn missing_report_reads_none() {
        let (db, _dir) = setup_db().await;
        let stored = get_perception(&db, "absent").await.unwrap();
        assert!(stored.is_none());
        db.close().await.unwrap();
    }
}
