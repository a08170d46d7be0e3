// SPDX-FileCopyrightText: 2026 Chowkidar Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Household member directory, scoped per owner.

use rusqlite::params;

use chowkidar_core::ChowkidarError;

use crate::database::{map_tr_err, Database};
use crate::models::{Member, MemberUpdate};

/// Add a member under an owner.
pub async fn add_member(
    db: &Database,
    owner_id: i64,
    name: &str,
    phone: &str,
    role: &str,
    photo_path: &str,
    now: &str,
) -> Result<Member, ChowkidarError> {
    let name = name.to_string();
    let phone = phone.to_string();
    let role = role.to_string();
    let photo_path = photo_path.to_string();
    let now = now.to_string();

    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO members (owner_id, name, phone, role, photo_path, permitted, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, 1, ?6)",
                params![owner_id, name, phone, role, photo_path, now],
            )?;
            Ok(Member {
                id: conn.last_insert_rowid(),
                owner_id,
                name,
                phone,
                role,
                photo_path,
                permitted: true,
                created_at: now,
            })
        })
        .await
        .map_err(map_tr_err)
}

/// List an owner's members, newest first.
pub async fn list_members(db: &Database, owner_id: i64) -> Result<Vec<Member>, ChowkidarError> {
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, owner_id, name, phone, role, photo_path, permitted, created_at
                 FROM members WHERE owner_id = ?1 ORDER BY created_at DESC",
            )?;
            let rows = stmt.query_map(params![owner_id], |row| {
                Ok(Member {
                    id: row.get(0)?,
                    owner_id: row.get(1)?,
                    name: row.get(2)?,
                    phone: row.get(3)?,
                    role: row.get(4)?,
                    photo_path: row.get(5)?,
                    permitted: row.get::<_, i64>(6)? != 0,
                    created_at: row.get(7)?,
                })
            })?;
            let mut members = Vec::new();
            for row in rows {
                members.push(row?);
            }
            Ok(members)
        })
        .await
        .map_err(map_tr_err)
}

/// Apply a partial update to a member the owner holds. Returns `false` when
/// no matching row exists or the update is empty.
pub async fn update_member(
    db: &Database,
    member_id: i64,
    owner_id: i64,
    update: MemberUpdate,
) -> Result<bool, ChowkidarError> {
    db.connection()
        .call(move |conn| {
            let mut clauses: Vec<&str> = Vec::new();
            let mut values: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

            if let Some(name) = update.name {
                clauses.push("name = ?");
                values.push(Box::new(name));
            }
            if let Some(phone) = update.phone {
                clauses.push("phone = ?");
                values.push(Box::new(phone));
            }
            if let Some(role) = update.role {
                clauses.push("role = ?");
                values.push(Box::new(role));
            }
            if let Some(photo_path) = update.photo_path {
                clauses.push("photo_path = ?");
                values.push(Box::new(photo_path));
            }
            if let Some(permitted) = update.permitted {
                clauses.push("permitted = ?");
                values.push(Box::new(permitted as i64));
            }
            if clauses.is_empty() {
                return Ok(false);
            }

            values.push(Box::new(member_id));
            values.push(Box::new(owner_id));
            let sql = format!(
                "UPDATE members SET {} WHERE id = ? AND owner_id = ?",
                clauses.join(", ")
            );
            let updated = conn.execute(
                &sql,
                rusqlite::params_from_iter(values.iter().map(|v| v.as_ref())),
            )?;
            Ok(updated > 0)
        })
        .await
        .map_err(map_tr_err)
}

/// Remove a member the owner holds. Returns `false` when nothing matched.
pub async fn delete_member(
    db: &Database,
    member_id: i64,
    owner_id: i64,
) -> Result<bool, ChowkidarError> {
    db.connection()
        .call(move |conn| {
            let deleted = conn.execute(
                "DELETE FROM members WHERE id = ?1 AND owner_id = ?2",
                params![member_id, owner_id],
            )?;
            Ok(deleted > 0)
        })
        .await
        .map_err(map_tr_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queries::auth::register_owner;
    use tempfile::tempdir;

    async fn setup() -> (Database, i64, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let db = Database::open(dir.path().join("test.db").to_str().unwrap())
            .await
            .unwrap();
        let owner = register_owner(&db, "asha", "pw", "", "t0")
            .await
            .unwrap()
            .unwrap();
        (db, owner.id, dir)
    }

    #[tokio::test]
    async fn member_crud_roundtrip() {
        let (db, owner_id, _dir) = setup().await;

        let member = add_member(&db, owner_id, "Ravi", "555", "driver", "", "t1")
            .await
            .unwrap();
        assert!(member.permitted);

        let listed = list_members(&db, owner_id).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].name, "Ravi");

        let changed = update_member(
            &db,
            member.id,
            owner_id,
            MemberUpdate {
                permitted: Some(false),
                ..MemberUpdate::default()
            },
        )
        .await
        .unwrap();
        assert!(changed);
        assert!(!list_members(&db, owner_id).await.unwrap()[0].permitted);

        assert!(delete_member(&db, member.id, owner_id).await.unwrap());
        assert!(list_members(&db, owner_id).await.unwrap().is_empty());

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn updates_are_owner_scoped() {
        let (db, owner_id, _dir) = setup().await;
        let member = add_member(&db, owner_id, "Ravi", "", "family", "", "t1")
            .await
            .unwrap();

        // A different owner id cannot touch the row.
        let changed = update_member(
            &db,
            member.id,
            owner_id + 1,
            MemberUpdate {
                name: Some("Mallory".into()),
                ..MemberUpdate::default()
            },
        )
        .await
        .unwrap();
        assert!(!changed);
        assert!(!delete_member(&db, member.id, owner_id + 1).await.unwrap());

        db.close().await.unwrap();
    }
}
