// SPDX-FileCopyrightText: 2026 Chowkidar Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Database connection management with PRAGMA setup, WAL mode, and lifecycle.
//!
//! All writes are serialized through tokio-rusqlite's single background
//! thread. The `Database` struct IS the single writer; query modules accept
//! `&Database` and call through `connection().call()`. Do NOT create
//! additional Connection instances for writes.

use std::path::Path;

use tokio_rusqlite::Connection;
use tracing::info;

use chowkidar_core::ChowkidarError;

use crate::migrations;

/// Handle to the single-writer SQLite connection.
#[derive(Clone)]
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open (or create) the database at `path`, apply PRAGMAs, and run all
    /// pending migrations.
    pub async fn open(path: &str) -> Result<Self, ChowkidarError> {
        if let Some(parent) = Path::new(path).parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| ChowkidarError::Store {
                    source: Box::new(e),
                })?;
            }
        }

        let conn = Connection::open(path).await.map_err(map_tr_err)?;

        conn.call(|conn| {
            conn.pragma_update(None, "journal_mode", "WAL")?;
            conn.pragma_update(None, "foreign_keys", "ON")?;
            conn.pragma_update(None, "busy_timeout", 5000)?;
            migrations::run_migrations(conn)
                .map_err(|e| tokio_rusqlite::Error::Other(Box::new(e)))?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)?;

        info!(path, "database opened");
        Ok(Self { conn })
    }

    /// The underlying tokio-rusqlite connection, for query modules.
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Run SQLite's integrity check. Returns `Ok(())` only when the database
    /// reports `ok`; used at startup to detect corruption.
    pub async fn integrity_check(&self) -> Result<(), ChowkidarError> {
        let verdict: String = self
            .conn
            .call(|conn| {
                let v = conn.query_row("PRAGMA integrity_check", [], |row| row.get(0))?;
                Ok(v)
            })
            .await
            .map_err(map_tr_err)?;

        if verdict == "ok" {
            Ok(())
        } else {
            Err(ChowkidarError::Store {
                source: format!("integrity check failed: {verdict}").into(),
            })
        }
    }

    /// Close the connection, flushing WAL.
    pub async fn close(self) -> Result<(), ChowkidarError> {
        self.conn
            .close()
            .await
            .map_err(|e| ChowkidarError::Store {
                source: Box::new(e),
            })
    }
}

/// Map a tokio-rusqlite error into the store taxonomy, unwrapping domain
/// errors smuggled through `Error::Other` by query closures.
pub fn map_tr_err(e: tokio_rusqlite::Error) -> ChowkidarError {
    match e {
        tokio_rusqlite::Error::Other(inner) => match inner.downcast::<ChowkidarError>() {
            Ok(domain) => *domain,
            Err(other) => ChowkidarError::Store { source: other },
        },
        other => ChowkidarError::Store {
            source: Box::new(other),
        },
    }
}

/// Wrap a domain error so it survives the trip through a query closure.
pub fn domain_err(e: ChowkidarError) -> tokio_rusqlite::Error {
    tokio_rusqlite::Error::Other(Box::new(e))
}
