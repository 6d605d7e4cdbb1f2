//! Durable account store. Unique constraints on handle and email are
//! enforced by the schema; callers surface conflicts as `InvalidInput`.

use anyhow::Result;
use sqlx::PgPool;
use uuid::Uuid;

use crate::db::models::{Account, MatchHistoryEntry};

pub async fn create(
    db: &PgPool,
    handle: &str,
    email: &str,
    password_hash: &str,
) -> Result<Account> {
    let account = sqlx::query_as::<_, Account>(
        r#"INSERT INTO accounts (id, handle, email, password_hash)
           VALUES ($1, $2, $3, $4)
           RETURNING *"#,
    )
    .bind(Uuid::new_v4())
    .bind(handle)
    .bind(email)
    .bind(password_hash)
    .fetch_one(db)
    .await?;
    Ok(account)
}

pub async fn find_by_id(db: &PgPool, id: Uuid) -> Result<Option<Account>> {
    let account = sqlx::query_as::<_, Account>("SELECT * FROM accounts WHERE id = $1")
        .bind(id)
        .fetch_optional(db)
        .await?;
    Ok(account)
}

pub async fn find_by_email(db: &PgPool, email: &str) -> Result<Option<Account>> {
    let account = sqlx::query_as::<_, Account>("SELECT * FROM accounts WHERE email = $1")
        .bind(email)
        .fetch_optional(db)
        .await?;
    Ok(account)
}

pub async fn find_by_email_or_handle(db: &PgPool, needle: &str) -> Result<Option<Account>> {
    let account =
        sqlx::query_as::<_, Account>("SELECT * FROM accounts WHERE email = $1 OR handle = $1")
            .bind(needle)
            .fetch_optional(db)
            .await?;
    Ok(account)
}

pub async fn set_email_verified(db: &PgPool, id: Uuid) -> Result<()> {
    sqlx::query("UPDATE accounts SET email_verified = TRUE WHERE id = $1")
        .bind(id)
        .execute(db)
        .await?;
    Ok(())
}

pub async fn set_current_room(db: &PgPool, id: Uuid, code: Option<&str>) -> Result<()> {
    sqlx::query("UPDATE accounts SET current_room = $2 WHERE id = $1")
        .bind(id)
        .bind(code)
        .execute(db)
        .await?;
    Ok(())
}

/// Bump games-played and, when `won`, games-won. Called exactly once per
/// account per finished room (idempotence is guarded upstream by the
/// registry's finish flag).
pub async fn update_stats(db: &PgPool, id: Uuid, won: bool) -> Result<()> {
    sqlx::query(
        r#"UPDATE accounts
              SET games_played = games_played + 1,
                  games_won = games_won + CASE WHEN $2 THEN 1 ELSE 0 END,
                  current_room = NULL
            WHERE id = $1"#,
    )
    .bind(id)
    .bind(won)
    .execute(db)
    .await?;
    Ok(())
}

pub async fn append_match_history(db: &PgPool, entry: &MatchHistoryEntry) -> Result<()> {
    sqlx::query(
        r#"INSERT INTO match_history
               (account_id, room_code, team, role, traitor, won,
                duration_secs, player_count, finished_at)
           VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
           ON CONFLICT (account_id, room_code) DO NOTHING"#,
    )
    .bind(entry.account_id)
    .bind(&entry.room_code)
    .bind(&entry.team)
    .bind(&entry.role)
    .bind(entry.traitor)
    .bind(entry.won)
    .bind(entry.duration_secs)
    .bind(entry.player_count)
    .bind(entry.finished_at)
    .execute(db)
    .await?;
    Ok(())
}

pub async fn match_history(db: &PgPool, id: Uuid) -> Result<Vec<MatchHistoryEntry>> {
    let rows = sqlx::query_as::<_, MatchHistoryEntry>(
        r#"SELECT account_id, room_code, team, role, traitor, won,
                  duration_secs, player_count, finished_at
             FROM match_history
            WHERE account_id = $1
            ORDER BY finished_at DESC
            LIMIT 100"#,
    )
    .bind(id)
    .fetch_all(db)
    .await?;
    Ok(rows)
}
