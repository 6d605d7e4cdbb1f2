use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

/// Persistent identity. Never hard-deleted by this server.
#[derive(Debug, Clone, FromRow)]
pub struct Account {
    pub id: Uuid,
    pub handle: String,
    pub email: String,
    pub password_hash: String,
    pub email_verified: bool,
    pub games_played: i32,
    pub games_won: i32,
    /// At most one live room the account is currently playing in.
    pub current_room: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Account {
    /// What clients are allowed to see. The hash never leaves the server.
    pub fn projection(&self) -> AccountProjection {
        AccountProjection {
            id: self.id,
            handle: self.handle.clone(),
            email: self.email.clone(),
            email_verified: self.email_verified,
            games_played: self.games_played,
            games_won: self.games_won,
            current_room: self.current_room.clone(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct AccountProjection {
    pub id: Uuid,
    pub handle: String,
    pub email: String,
    pub email_verified: bool,
    pub games_played: i32,
    pub games_won: i32,
    pub current_room: Option<String>,
}

/// Immutable once appended; one row per finished room per participant
/// account.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct MatchHistoryEntry {
    pub account_id: Uuid,
    pub room_code: String,
    pub team: String,
    pub role: String,
    pub traitor: bool,
    pub won: bool,
    pub duration_secs: i64,
    pub player_count: i32,
    pub finished_at: DateTime<Utc>,
}

/// Durable mirror of a room, written best-effort after mutations and
/// deleted by TTL once `expire_at` passes.
#[derive(Debug, Clone, FromRow)]
pub struct RoomRecord {
    pub code: String,
    pub status: String,
    pub winner: Option<String>,
    pub player_count: i32,
    pub created_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub expire_at: Option<DateTime<Utc>>,
}
