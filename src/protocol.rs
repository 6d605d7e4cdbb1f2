//! Wire-protocol shared by clients, the WS handler and the room registry.

use crate::game::types::{RoomSnapshot, Team};
use serde::{Deserialize, Serialize};

// ---------- client → server ----------
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMsg {
    CreateGame {
        handle: String,
        descriptor: String,
    },
    JoinGame {
        code: String,
        handle: String,
        descriptor: String,
    },
    StartGame {
        code: String,
    },
}

impl ClientMsg {
    /// Action label used as the rate-limiter bucket key.
    pub fn action(&self) -> &'static str {
        match self {
            ClientMsg::CreateGame { .. } => "create_game",
            ClientMsg::JoinGame { .. } => "join_game",
            ClientMsg::StartGame { .. } => "start_game",
        }
    }
}

// ---------- server → client ----------
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMsg {
    GameCreated {
        code: String,
    },
    GameJoined {
        code: String,
    },
    /// Private per-player payload sent once at the WAITING→PLAYING
    /// transition. Never broadcast.
    YourRole {
        role: RoleCard,
    },
    /// Public room state pushed to every member on any change.
    UpdateRoom {
        room: RoomSnapshot,
    },
    /// Action rejection, distinct from state updates.
    Error {
        kind: String,
        message: String,
    },
}

/// What one player is allowed to know about their own role.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct RoleCard {
    pub key: String,
    pub name: String,
    pub team: Team,
    pub traitor: bool,
    pub can_kill: bool,
    pub kills_left: u8,
    pub reveals_team_on_use: bool,
}
