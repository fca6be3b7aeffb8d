// SPDX-FileCopyrightText: 2026 Souk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! User-directory slice: push token lookup and registration.

use rusqlite::params;
use souk_core::{SoukError, UserId};

use crate::database::{map_tr_err, Database};

/// The push token registered for a user, if any. A user row without a token
/// and a missing user row both read as `None`.
pub async fn push_token_of(db: &Database, user_id: &UserId) -> Result<Option<String>, SoukError> {
    let user_id = user_id.to_string();
    db.connection()
        .call(move |conn| {
            let result = conn.query_row(
                "SELECT push_token FROM users WHERE id = ?1",
                params![user_id],
                |row| row.get::<_, Option<String>>(0),
            );
            match result {
                Ok(token) => Ok(token),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e),
            }
        })
        .await
        .map_err(map_tr_err)
}

/// Register (or replace) a user's push token. `None` clears it.
pub async fn upsert_push_token(
    db: &Database,
    user_id: &UserId,
    token: Option<&str>,
) -> Result<(), SoukError> {
    let user_id = user_id.to_string();
    let token = token.map(|t| t.to_string());
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO users (id, push_token) VALUES (?1, ?2)
                 ON CONFLICT (id) DO UPDATE SET push_token = excluded.push_token",
                params![user_id, token],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    async fn setup_db() -> (Database, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("test.db");
        let db = Database::open(db_path.to_str().unwrap(), true).await.unwrap();
        (db, dir)
    }

    #[tokio::test]
    async fn unknown_user_has_no_token() {
        let (db, _dir) = setup_db().await;
        assert!(push_token_of(&db, &UserId::new()).await.unwrap().is_none());
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn upsert_then_lookup_round_trips() {
        let (db, _dir) = setup_db().await;
        let user = UserId::new();

        upsert_push_token(&db, &user, Some("tok-1")).await.unwrap();
        assert_eq!(
            push_token_of(&db, &user).await.unwrap().as_deref(),
            Some("tok-1")
        );

        upsert_push_token(&db, &user, Some("tok-2")).await.unwrap();
        assert_eq!(
            push_token_of(&db, &user).await.unwrap().as_deref(),
            Some("tok-2")
        );

        upsert_push_token(&db, &user, None).await.unwrap();
        assert!(push_token_of(&db, &user).await.unwrap().is_none());

        db.close().await.unwrap();
    }
}
