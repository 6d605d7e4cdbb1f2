//! Durable room mirror with TTL-style expiry on `expire_at`.

use anyhow::Result;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::db::models::RoomRecord;

pub async fn upsert(db: &PgPool, record: &RoomRecord) -> Result<()> {
    sqlx::query(
        r#"INSERT INTO rooms
               (code, status, winner, player_count, created_at, finished_at, expire_at)
           VALUES ($1, $2, $3, $4, $5, $6, $7)
           ON CONFLICT (code) DO UPDATE
              SET status       = EXCLUDED.status,
                  winner       = EXCLUDED.winner,
                  player_count = EXCLUDED.player_count,
                  finished_at  = EXCLUDED.finished_at,
                  expire_at    = EXCLUDED.expire_at"#,
    )
    .bind(&record.code)
    .bind(&record.status)
    .bind(&record.winner)
    .bind(record.player_count)
    .bind(record.created_at)
    .bind(record.finished_at)
    .bind(record.expire_at)
    .execute(db)
    .await?;
    Ok(())
}

/// TTL-equivalent delete: every record whose deadline has passed.
/// Idempotent; running it twice deletes nothing the second time.
pub async fn delete_expired(db: &PgPool, now: DateTime<Utc>) -> Result<u64> {
    let res = sqlx::query("DELETE FROM rooms WHERE expire_at IS NOT NULL AND expire_at <= $1")
        .bind(now)
        .execute(db)
        .await?;
    Ok(res.rows_affected())
}

/// Defense-in-depth duplicate of the TTL delete, keyed on status and
/// finish time instead of the deadline column.
pub async fn delete_stale_finished(db: &PgPool, cutoff: DateTime<Utc>) -> Result<u64> {
    let res = sqlx::query("DELETE FROM rooms WHERE status = 'finished' AND finished_at < $1")
        .bind(cutoff)
        .execute(db)
        .await?;
    Ok(res.rows_affected())
}
