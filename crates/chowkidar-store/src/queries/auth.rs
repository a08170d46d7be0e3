// SPDX-FileCopyrightText: 2026 Chowkidar Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Owner accounts and bearer tokens.
//!
//! Passwords are stored as PBKDF2-HMAC-SHA256 with a per-row salt; tokens
//! are opaque random strings handed to the gateway's auth middleware.

use pbkdf2::pbkdf2_hmac;
use rand::RngCore;
use rusqlite::params;
use sha2::Sha256;

use chowkidar_core::ChowkidarError;

use crate::database::{map_tr_err, Database};
use crate::models::Owner;

const PBKDF2_ROUNDS: u32 = 100_000;

fn hash_password(password: &str, salt: &str) -> String {
    let mut out = [0u8; 32];
    pbkdf2_hmac::<Sha256>(password.as_bytes(), salt.as_bytes(), PBKDF2_ROUNDS, &mut out);
    hex::encode(out)
}

fn random_hex(bytes: usize) -> String {
    let mut buf = vec![0u8; bytes];
    rand::thread_rng().fill_bytes(&mut buf);
    hex::encode(buf)
}

/// Register a new owner. Returns `None` when the username is taken.
pub async fn register_owner(
    db: &Database,
    username: &str,
    password: &str,
    name: &str,
    now: &str,
) -> Result<Option<Owner>, ChowkidarError> {
    let salt = random_hex(16);
    let password_hash = hash_password(password, &salt);
    let username = username.to_string();
    let name = name.to_string();
    let now = now.to_string();

    db.connection()
        .call(move |conn| {
            let inserted = conn.execute(
                "INSERT OR IGNORE INTO owners (username, password_hash, salt, name, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![username, password_hash, salt, name, now],
            )?;
            if inserted == 0 {
                return Ok(None);
            }
            let id = conn.last_insert_rowid();
            Ok(Some(Owner { id, username, name }))
        })
        .await
        .map_err(map_tr_err)
}

/// Verify a username/password pair. Returns the owner on success.
pub async fn verify_owner(
    db: &Database,
    username: &str,
    password: &str,
) -> Result<Option<Owner>, ChowkidarError> {
    let username = username.to_string();
    let password = password.to_string();

    db.connection()
        .call(move |conn| {
            let result = conn.query_row(
                "SELECT id, username, name, password_hash, salt FROM owners WHERE username = ?1",
                params![username],
                |row| {
                    Ok((
                        Owner {
                            id: row.get(0)?,
                            username: row.get(1)?,
                            name: row.get(2)?,
                        },
                        row.get::<_, String>(3)?,
                        row.get::<_, String>(4)?,
                    ))
                },
            );
            match result {
                Ok((owner, stored_hash, salt)) => {
                    if hash_password(&password, &salt) == stored_hash {
                        Ok(Some(owner))
                    } else {
                        Ok(None)
                    }
                }
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e.into()),
            }
        })
        .await
        .map_err(map_tr_err)
}

/// Mint a bearer token for an owner.
pub async fn create_token(
    db: &Database,
    owner_id: i64,
    now: &str,
) -> Result<String, ChowkidarError> {
    let token = random_hex(32);
    let stored = token.clone();
    let now = now.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO tokens (token, owner_id, created_at) VALUES (?1, ?2, ?3)",
                params![stored, owner_id, now],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)?;
    Ok(token)
}

/// Resolve a bearer token to its owner.
pub async fn verify_token(db: &Database, token: &str) -> Result<Option<Owner>, ChowkidarError> {
    let token = token.to_string();
    db.connection()
        .call(move |conn| {
            let result = conn.query_row(
                "SELECT o.id, o.username, o.name FROM tokens t
                 JOIN owners o ON t.owner_id = o.id WHERE t.token = ?1",
                params![token],
                |row| {
                    Ok(Owner {
                        id: row.get(0)?,
                        username: row.get(1)?,
                        name: row.get(2)?,
                    })
                },
            );
            match result {
                Ok(owner) => Ok(Some(owner)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e.into()),
            }
        })
        .await
        .map_err(map_tr_err)
}

/// Invalidate a bearer token.
pub async fn delete_token(db: &Database, token: &str) -> Result<(), ChowkidarError> {
    let token = token.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute("DELETE FROM tokens WHERE token = ?1", params![token])?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}
