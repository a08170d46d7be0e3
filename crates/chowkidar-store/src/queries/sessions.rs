// SPDX-FileCopyrightText: 2026 Chowkidar Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Session CRUD with monotonic status enforcement.

use std::str::FromStr;

use rusqlite::params;

use chowkidar_core::{ChowkidarError, FinalAction, Session, SessionStatus};

use crate::database::{domain_err, map_tr_err, Database};

/// Optional fields written together with a status transition.
#[derive(Debug, Clone, Copy, Default)]
pub struct StatusFields {
    pub risk_score: Option<f64>,
    pub final_action: Option<FinalAction>,
}

/// Create a new session. Rejects a duplicate id.
pub async fn create_session(db: &Database, session: &Session) -> Result<(), ChowkidarError> {
    let session = session.clone();
    db.connection()
        .call(move |conn| {
            let existing: Option<String> = conn
                .query_row(
                    "SELECT id FROM sessions WHERE id = ?1",
                    params![session.id],
                    |row| row.get(0),
                )
                .ok();
            if existing.is_some() {
                return Err(domain_err(ChowkidarError::ContractViolation {
                    message: format!("duplicate session id {}", session.id),
                }));
            }
            conn.execute(
                "INSERT INTO sessions (id, device_id, status, risk_score, final_action, created_at, last_updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    session.id,
                    session.device_id,
                    session.status.to_string(),
                    session.risk_score,
                    session.final_action.map(|a| a.to_string()),
                    session.created_at,
                    session.last_updated_at,
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Transition a session's status, refusing non-monotonic transitions except
/// to `error`. The check and the update run in one transaction.
pub async fn update_session_status(
    db: &Database,
    id: &str,
    new_status: SessionStatus,
    fields: StatusFields,
    now: &str,
) -> Result<(), ChowkidarError> {
    let id = id.to_string();
    let now = now.to_string();
    db.connection()
        .call(move |conn| {
            let tx = conn.transaction()?;

            let current: String = tx
                .query_row(
                    "SELECT status FROM sessions WHERE id = ?1",
                    params![id],
                    |row| row.get(0),
                )
                .map_err(|_| {
                    domain_err(ChowkidarError::ContractViolation {
                        message: format!("unknown session {id}"),
                    })
                })?;

            let current = SessionStatus::from_str(&current).map_err(|_| {
                domain_err(ChowkidarError::Internal(format!(
                    "corrupt status value '{current}' for session {id}"
                )))
            })?;

            if !current.allows_transition_to(new_status) {
                return Err(domain_err(ChowkidarError::ContractViolation {
                    message: format!(
                        "refused status transition {current} -> {new_status} for session {id}"
                    ),
                }));
            }

            tx.execute(
                "UPDATE sessions SET status = ?1, last_updated_at = ?2,
                        risk_score = COALESCE(?3, risk_score),
                        final_action = COALESCE(?4, final_action)
                 WHERE id = ?5",
                params![
                    new_status.to_string(),
                    now,
                    fields.risk_score,
                    fields.final_action.map(|a| a.to_string()),
                    id,
                ],
            )?;
            tx.commit()?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Get a session by id.
pub async fn get_session(db: &Database, id: &str) -> Result<Option<Session>, ChowkidarError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, device_id, status, risk_score, final_action, created_at, last_updated_at
                 FROM sessions WHERE id = ?1",
            )?;
            let result = stmt.query_row(params![id], row_to_session);
            match result {
                Ok(session) => Ok(Some(session)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e.into()),
            }
        })
        .await
        .map_err(map_tr_err)
}

/// List sessions, newest first, optionally filtered by status.
pub async fn list_sessions(
    db: &Database,
    limit: usize,
    status: Option<SessionStatus>,
) -> Result<Vec<Session>, ChowkidarError> {
    let status = status.map(|s| s.to_string());
    db.connection()
        .call(move |conn| {
            let mut sessions = Vec::new();
            match &status {
                Some(filter) => {
                    let mut stmt = conn.prepare(
                        "SELECT id, device_id, status, risk_score, final_action, created_at, last_updated_at
                         FROM sessions WHERE status = ?1 ORDER BY created_at DESC LIMIT ?2",
                    )?;
                    let rows = stmt.query_map(params![filter, limit as i64], row_to_session)?;
                    for row in rows {
                        sessions.push(row?);
                    }
                }
                None => {
                    let mut stmt = conn.prepare(
                        "SELECT id, device_id, status, risk_score, final_action, created_at, last_updated_at
                         FROM sessions ORDER BY created_at DESC LIMIT ?1",
                    )?;
                    let rows = stmt.query_map(params![limit as i64], row_to_session)?;
                    for row in rows {
                        sessions.push(row?);
                    }
                }
            }
            Ok(sessions)
        })
        .await
        .map_err(map_tr_err)
}

fn row_to_session(row: &rusqlite::Row<'_>) -> rusqlite::Result<Session> {
    let status: String = row.get(2)?;
    let final_action: Option<String> = row.get(4)?;
    Ok(Session {
        id: row.get(0)?,
        device_id: row.get(1)?,
        status: SessionStatus::from_str(&status).unwrap_or(SessionStatus::Error),
        risk_score: row.get(3)?,
        final_action: final_action.and_then(|a| FinalAction::from_str(&a).ok()),
        created_at: row.get(5)?,
        last_updated_at: row.get(6)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    async fn setup_db() -> (Database, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("test.db");
        let db = Database::open(db_path.to_str().unwrap()).await.unwrap();
        (db, dir)
    }

    fn make_session(id: &str) -> Session {
        Session {
            id: id.to_string(),
            device_id: "front-door".to_string(),
            status: SessionStatus::Queued,
            risk_score: 0.0,
            final_action: None,
            created_at: "2026-01-01T00:00:00.000Z".to_string(),
            last_updated_at: "2026-01-01T00:00:00.000Z".to_string(),
        }
    }

    #[tokio::test]
    async fn create_and_get_session_roundtrips() {
        let (db, _dir) = setup_db().await;
        create_session(&db, &make_session("sess-1")).await.unwrap();

        let retrieved = get_session(&db, "sess-1").await.unwrap().unwrap();
        assert_eq!(retrieved.id, "sess-1");
        assert_eq!(retrieved.device_id, "front-door");
        assert_eq!(retrieved.status, SessionStatus::Queued);
        assert!(retrieved.final_action.is_none());

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn duplicate_session_is_rejected() {
        let (db, _dir) = setup_db().await;
        create_session(&db, &make_session("dup")).await.unwrap();
        let err = create_session(&db, &make_session("dup")).await.unwrap_err();
        assert!(matches!(err, ChowkidarError::ContractViolation { .. }));
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn status_advances_monotonically() {
        let (db, _dir) = setup_db().await;
        create_session(&db, &make_session("s")).await.unwrap();

        update_session_status(&db, "s", SessionStatus::Processing, StatusFields::default(), "t1")
            .await
            .unwrap();
        update_session_status(
            &db,
            "s",
            SessionStatus::IntelligenceDone,
            StatusFields {
                risk_score: Some(0.42),
                final_action: None,
            },
            "t2",
        )
        .await
        .unwrap();

        let session = get_session(&db, "s").await.unwrap().unwrap();
        assert_eq!(session.status, SessionStatus::IntelligenceDone);
        assert_eq!(session.risk_score, 0.42);

        // Regression to an earlier status is refused.
        let err = update_session_status(
            &db,
            "s",
            SessionStatus::Processing,
            StatusFields::default(),
            "t3",
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ChowkidarError::ContractViolation { .. }));

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn error_is_reachable_but_terminal() {
        let (db, _dir) = setup_db().await;
        create_session(&db, &make_session("s")).await.unwrap();

        update_session_status(&db, "s", SessionStatus::Error, StatusFields::default(), "t1")
            .await
            .unwrap();
        let err = update_session_status(
            &db,
            "s",
            SessionStatus::Completed,
            StatusFields::default(),
            "t2",
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ChowkidarError::ContractViolation { .. }));

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn list_sessions_filters_by_status() {
        let (db, _dir) = setup_db().await;
        create_session(&db, &make_session("a")).await.unwrap();
        create_session(&db, &make_session("b")).await.unwrap();
        update_session_status(&db, "b", SessionStatus::Completed, StatusFields::default(), "t")
            .await
            .unwrap();

        let all = list_sessions(&db, 50, None).await.unwrap();
        assert_eq!(all.len(), 2);

        let queued = list_sessions(&db, 50, Some(SessionStatus::Queued)).await.unwrap();
        assert_eq!(queued.len(), 1);
        assert_eq!(queued[0].id, "a");

        db.close().await.unwrap();
    }
}
