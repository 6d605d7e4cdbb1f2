use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::settings;

/// The two visible camps.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Team {
    Bleu,
    Rouge,
}

impl Team {
    pub fn label(&self) -> &'static str {
        match self {
            Team::Bleu => "BLEU",
            Team::Rouge => "ROUGE",
        }
    }
}

/// Room life-cycle.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum Phase {
    Waiting,
    Playing,
    Finished,
}

/// One participant of one room.
#[derive(Debug, Clone)]
pub struct Player {
    /// Stable for the lifetime of the WS connection.
    pub conn_id: Uuid,
    pub handle: String,
    pub descriptor: String,
    pub team: Team,
    pub traitor: bool,
    /// Catalog key; populated exactly once at the WAITING→PLAYING transition.
    pub role: Option<&'static str>,
    pub alive: bool,
    /// Remaining kills this period, for roles that can kill.
    pub kills_left: u8,
}

impl Player {
    pub fn new(conn_id: Uuid, handle: String, descriptor: String, team: Team) -> Self {
        Self {
            conn_id,
            handle,
            descriptor,
            team,
            traitor: false,
            role: None,
            alive: true,
            kills_left: 0,
        }
    }
}

/// Authoritative in-memory state of one room. Owned exclusively by the
/// registry; mutated only under the per-room lock.
#[derive(Debug, Clone)]
pub struct RoomSession {
    pub code: String,
    /// Insertion order = join order; index 0 is the host.
    pub players: Vec<Player>,
    pub phase: Phase,
    pub created_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub winner: Option<String>,
    pub expire_at: Option<DateTime<Utc>>,
}

impl RoomSession {
    pub fn new(code: String, host: Player) -> Self {
        Self {
            code,
            players: vec![host],
            phase: Phase::Waiting,
            created_at: Utc::now(),
            finished_at: None,
            winner: None,
            expire_at: None,
        }
    }

    pub fn host(&self) -> &Player {
        &self.players[0]
    }

    pub fn is_member(&self, conn_id: Uuid) -> bool {
        self.players.iter().any(|p| p.conn_id == conn_id)
    }

    pub fn member_ids(&self) -> Vec<Uuid> {
        self.players.iter().map(|p| p.conn_id).collect()
    }

    /// Seal the room. Returns false when it was already finished.
    pub fn finish(&mut self, winner: String) -> bool {
        if self.phase == Phase::Finished {
            return false;
        }
        let now = Utc::now();
        self.phase = Phase::Finished;
        self.winner = Some(winner);
        self.finished_at = Some(now);
        self.expire_at = Some(now + Duration::seconds(settings().room_ttl as i64));
        true
    }

    pub fn snapshot(&self) -> RoomSnapshot {
        RoomSnapshot {
            code: self.code.clone(),
            phase: self.phase,
            winner: self.winner.clone(),
            players: self
                .players
                .iter()
                .map(|p| PlayerPublic {
                    handle: p.handle.clone(),
                    descriptor: p.descriptor.clone(),
                    team: p.team,
                    alive: p.alive,
                })
                .collect(),
        }
    }
}

/// Public projection broadcast to every member. Roles are withheld by
/// construction, not by filtering.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct RoomSnapshot {
    pub code: String,
    pub phase: Phase,
    pub winner: Option<String>,
    pub players: Vec<PlayerPublic>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct PlayerPublic {
    pub handle: String,
    pub descriptor: String,
    pub team: Team,
    pub alive: bool,
}

/// Terminal record echoed by `end_game` and mirrored to durable storage.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct FinishedRoom {
    pub code: String,
    pub winner: String,
    pub finished_at: DateTime<Utc>,
    pub deletion_deadline: DateTime<Utc>,
    pub player_count: usize,
    pub duration_secs: i64,
}

/// One participant's view of a finished room, used for stats and
/// match-history reconciliation.
#[derive(Debug, Clone)]
pub struct ParticipantResult {
    pub handle: String,
    pub team: Team,
    pub role: Option<&'static str>,
    pub traitor: bool,
    pub won: bool,
}
