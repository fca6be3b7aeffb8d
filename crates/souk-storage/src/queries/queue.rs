// SPDX-FileCopyrightText: 2026 Souk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Push queue operations for crash-safe delivery.
//!
//! Jobs are serialized as JSON payloads. Dequeue atomically claims the
//! oldest pending row; ack deletes it, fail returns it to pending until the
//! attempt budget runs out.

use rusqlite::params;
use souk_core::{OutboundNotificationJob, QueuedJob, SoukError};

use crate::database::{map_tr_err, Database};

/// Enqueue a push job. Returns the auto-generated queue entry id.
pub async fn enqueue(db: &Database, job: &OutboundNotificationJob) -> Result<i64, SoukError> {
    let payload = serde_json::to_string(job).map_err(SoukError::store)?;
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO push_queue (payload) VALUES (?1)",
                params![payload],
            )?;
            Ok(conn.last_insert_rowid())
        })
        .await
        .map_err(map_tr_err)
}

/// Dequeue the next pending job.
///
/// Atomically selects the oldest pending row and marks it "processing" with
/// a 5-minute lock timeout. Returns `None` if the queue is empty.
pub async fn dequeue(db: &Database) -> Result<Option<QueuedJob>, SoukError> {
    let claimed = db
        .connection()
        .call(move |conn| {
            // Transaction to atomically find + claim the next pending row.
            let tx = conn.transaction()?;

            let row = {
                let mut stmt = tx.prepare(
                    "SELECT id, payload, attempts FROM push_queue
                     WHERE status = 'pending'
                     ORDER BY id ASC
                     LIMIT 1",
                )?;
                stmt.query_row([], |row| {
                    Ok((
                        row.get::<_, i64>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, i32>(2)?,
                    ))
                })
            };

            match row {
                Ok((id, payload, attempts)) => {
                    tx.execute(
                        "UPDATE push_queue SET status = 'processing',
                         locked_until = strftime('%Y-%m-%dT%H:%M:%fZ', 'now', '+5 minutes'),
                         updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                         WHERE id = ?1",
                        params![id],
                    )?;
                    tx.commit()?;
                    Ok(Some((id, payload, attempts)))
                }
                Err(rusqlite::Error::QueryReturnedNoRows) => {
                    tx.commit()?;
                    Ok(None)
                }
                Err(e) => Err(e),
            }
        })
        .await
        .map_err(map_tr_err)?;

    match claimed {
        Some((id, payload, attempts)) => {
            let job: OutboundNotificationJob =
                serde_json::from_str(&payload).map_err(SoukError::store)?;
            Ok(Some(QueuedJob { id, job, attempts }))
        }
        None => Ok(None),
    }
}

/// Acknowledge a processed job: the queue owns jobs only until they are
/// consumed, so the row is deleted.
pub async fn ack(db: &Database, id: i64) -> Result<(), SoukError> {
    db.connection()
        .call(move |conn| {
            conn.execute("DELETE FROM push_queue WHERE id = ?1", params![id])?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Record a transient failure.
///
/// Increments attempts. If attempts >= max_attempts, parks the row as
/// "failed"; otherwise resets to "pending" for retry and clears the lock.
pub async fn fail(db: &Database, id: i64) -> Result<(), SoukError> {
    db.connection()
        .call(move |conn| {
            let (attempts, max_attempts): (i32, i32) = conn.query_row(
                "SELECT attempts, max_attempts FROM push_queue WHERE id = ?1",
                params![id],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )?;

            let new_attempts = attempts + 1;
            let status = if new_attempts >= max_attempts {
                "failed"
            } else {
                "pending"
            };
            conn.execute(
                "UPDATE push_queue SET status = ?1, attempts = ?2,
                 locked_until = NULL,
                 updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                 WHERE id = ?3",
                params![status, new_attempts, id],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Number of rows currently in the given status. Used by tests and the
/// health endpoint.
pub async fn count_with_status(db: &Database, status: &str) -> Result<i64, SoukError> {
    let status = status.to_string();
    db.connection()
        .call(move |conn| {
            let n = conn.query_row(
                "SELECT COUNT(*) FROM push_queue WHERE status = ?1",
                params![status],
                |row| row.get(0),
            )?;
            Ok(n)
        })
        .await
        .map_err(map_tr_err)
}
