//! Authoritative room state: one lock per room, no global lock.
//!
//! Every mutation happens synchronously under the room's mutex; durable
//! persistence is the caller's fire-and-forget concern and never blocks
//! the reply path.

use std::sync::Arc;

use chrono::Utc;
use dashmap::{mapref::entry::Entry, DashMap};
use rand::seq::IteratorRandom;
use rand::Rng;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::config::settings;
use crate::error::GameError;
use crate::game::types::{
    FinishedRoom, ParticipantResult, Phase, Player, RoomSession, RoomSnapshot, Team,
};
use crate::protocol::RoleCard;
use crate::roles::{assign, catalog};
use crate::validation;

/// How the traitor subset is chosen at start. The policy is an explicit
/// input rather than a hidden default.
#[derive(Debug, Clone)]
pub enum TraitorSelection {
    /// One traitor per four players, drawn uniformly.
    Auto,
    /// Exactly `0..=players` traitors, drawn uniformly.
    Count(usize),
    /// Caller-chosen connection ids (must all be members).
    Explicit(Vec<Uuid>),
}

#[derive(Debug)]
pub struct CreateOutcome {
    pub code: String,
    pub snapshot: RoomSnapshot,
}

#[derive(Debug)]
pub struct JoinOutcome {
    pub snapshot: RoomSnapshot,
    /// Everyone currently in the room, joiner included.
    pub recipients: Vec<Uuid>,
}

#[derive(Debug)]
pub struct StartOutcome {
    /// One private card per player.
    pub cards: Vec<(Uuid, RoleCard)>,
    pub snapshot: RoomSnapshot,
    pub recipients: Vec<Uuid>,
}

#[derive(Debug)]
pub struct FinishOutcome {
    pub record: FinishedRoom,
    /// True on the second and later calls; callers must then skip
    /// stat updates.
    pub already_finished: bool,
    pub participants: Vec<ParticipantResult>,
    pub snapshot: RoomSnapshot,
    pub recipients: Vec<Uuid>,
}

/// Registry of live rooms, keyed by code. Codes are unique among
/// non-purged rooms by construction (vacant-entry insertion).
#[derive(Default)]
pub struct RoomRegistry {
    rooms: DashMap<String, Arc<Mutex<RoomSession>>>,
}

impl RoomRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.rooms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rooms.is_empty()
    }

    fn room(&self, code: &str) -> Result<Arc<Mutex<RoomSession>>, GameError> {
        self.rooms
            .get(code)
            .map(|e| e.value().clone())
            .ok_or(GameError::NotFound)
    }

    /// Create a room in WAITING with the caller as host.
    ///
    /// Retries code generation a bounded number of times on collision,
    /// then fails with `ResourceExhausted`.
    pub fn create_room(
        &self,
        conn_id: Uuid,
        handle: &str,
        descriptor: &str,
    ) -> Result<CreateOutcome, GameError> {
        let handle = validation::sanitize_handle(handle)?;
        let descriptor = validation::sanitize_descriptor(descriptor)?;

        let mut rng = rand::rng();
        for _ in 0..settings().code_retries {
            let code = generate_code(&mut rng);
            match self.rooms.entry(code.clone()) {
                Entry::Occupied(_) => continue,
                Entry::Vacant(slot) => {
                    let host = Player::new(conn_id, handle, descriptor, Team::Bleu);
                    let room = RoomSession::new(code.clone(), host);
                    let snapshot = room.snapshot();
                    slot.insert(Arc::new(Mutex::new(room)));
                    return Ok(CreateOutcome { code, snapshot });
                }
            }
        }
        Err(GameError::ResourceExhausted)
    }

    /// Append a player to a WAITING room. Teams alternate by join order
    /// so the camps stay balanced.
    pub async fn join_room(
        &self,
        code: &str,
        conn_id: Uuid,
        handle: &str,
        descriptor: &str,
    ) -> Result<JoinOutcome, GameError> {
        let code = validation::normalize_code(code)?;
        let handle = validation::sanitize_handle(handle)?;
        let descriptor = validation::sanitize_descriptor(descriptor)?;

        let room = self.room(&code)?;
        let mut room = room.lock().await;
        if room.phase != Phase::Waiting {
            return Err(GameError::InvalidPhase { expected: "WAITING" });
        }
        let team = if room.players.len() % 2 == 0 {
            Team::Bleu
        } else {
            Team::Rouge
        };
        room.players
            .push(Player::new(conn_id, handle, descriptor, team));

        Ok(JoinOutcome {
            snapshot: room.snapshot(),
            recipients: room.member_ids(),
        })
    }

    /// WAITING→PLAYING: select traitors, deal roles, emit private cards.
    ///
    /// The room lock is held across the whole transition, so no join can
    /// interleave mid-assignment.
    pub async fn start_game(
        &self,
        code: &str,
        requester: Uuid,
        selection: TraitorSelection,
    ) -> Result<StartOutcome, GameError> {
        let code = validation::normalize_code(code)?;
        let room = self.room(&code)?;
        let mut room = room.lock().await;

        if room.host().conn_id != requester {
            return Err(GameError::Forbidden);
        }
        if room.phase != Phase::Waiting {
            return Err(GameError::InvalidPhase { expected: "WAITING" });
        }
        let n = room.players.len();
        if n < settings().min_players {
            return Err(GameError::InsufficientPlayers {
                needed: settings().min_players,
                got: n,
            });
        }

        let mut rng = rand::rng();
        let traitor_ids = select_traitors(&room, &selection, &mut rng)?;
        assign::assign_roles(&mut room.players, &traitor_ids, &mut rng);
        room.phase = Phase::Playing;

        let cards = room
            .players
            .iter()
            .map(|p| (p.conn_id, role_card(p)))
            .collect();

        Ok(StartOutcome {
            cards,
            snapshot: room.snapshot(),
            recipients: room.member_ids(),
        })
    }

    /// Seal a room. Idempotent: a second call returns the identical
    /// finished record and flags it so no stat is counted twice.
    pub async fn finish_game(&self, code: &str, winner: &str) -> Result<FinishOutcome, GameError> {
        let code = validation::normalize_code(code)?;
        let room = self.room(&code)?;
        let mut room = room.lock().await;

        let already_finished = !room.finish(winner.to_string());
        let winner = room.winner.clone().unwrap_or_default();
        let finished_at = room.finished_at.unwrap_or_else(Utc::now);
        let record = FinishedRoom {
            code: room.code.clone(),
            winner: winner.clone(),
            finished_at,
            deletion_deadline: room.expire_at.unwrap_or(finished_at),
            player_count: room.players.len(),
            duration_secs: (finished_at - room.created_at).num_seconds(),
        };
        let participants = room
            .players
            .iter()
            .map(|p| ParticipantResult {
                handle: p.handle.clone(),
                team: p.team,
                role: p.role,
                traitor: p.traitor,
                won: p.team.label() == winner,
            })
            .collect();

        Ok(FinishOutcome {
            record,
            already_finished,
            participants,
            snapshot: room.snapshot(),
            recipients: room.member_ids(),
        })
    }

    /// Alive-flag contract for elimination mechanics handled elsewhere.
    pub async fn mark_eliminated(
        &self,
        code: &str,
        target: Uuid,
    ) -> Result<RoomSnapshot, GameError> {
        let code = validation::normalize_code(code)?;
        let room = self.room(&code)?;
        let mut room = room.lock().await;
        if room.phase != Phase::Playing {
            return Err(GameError::InvalidPhase { expected: "PLAYING" });
        }
        let player = room
            .players
            .iter_mut()
            .find(|p| p.conn_id == target)
            .ok_or(GameError::NotFound)?;
        player.alive = false;
        Ok(room.snapshot())
    }

    pub async fn snapshot(&self, code: &str) -> Result<RoomSnapshot, GameError> {
        let code = validation::normalize_code(code)?;
        let room = self.room(&code)?;
        let room = room.lock().await;
        Ok(room.snapshot())
    }

    /// Drop rooms past their deletion deadline (and any room that somehow
    /// lost all its players). Safe to run redundantly.
    pub fn purge_expired(&self, now: chrono::DateTime<Utc>) -> usize {
        let before = self.rooms.len();
        self.rooms.retain(|_, room| match room.try_lock() {
            Ok(room) => {
                let expired = room.expire_at.is_some_and(|t| t <= now);
                !expired && !room.players.is_empty()
            }
            // A locked room is in active use; never purge it mid-flight.
            Err(_) => true,
        });
        before - self.rooms.len()
    }
}

fn generate_code<R: Rng + ?Sized>(rng: &mut R) -> String {
    (0..validation::CODE_LEN)
        .map(|_| rng.random_range(b'A'..=b'Z') as char)
        .collect()
}

fn select_traitors<R: Rng + ?Sized>(
    room: &RoomSession,
    selection: &TraitorSelection,
    rng: &mut R,
) -> Result<Vec<Uuid>, GameError> {
    let n = room.players.len();
    match selection {
        TraitorSelection::Auto => Ok(draw(room, n / 4, rng)),
        TraitorSelection::Count(k) => {
            if *k > n {
                return Err(GameError::InvalidInput("traitor count exceeds players".into()));
            }
            Ok(draw(room, *k, rng))
        }
        TraitorSelection::Explicit(ids) => {
            let mut seen = Vec::with_capacity(ids.len());
            for id in ids {
                if !room.is_member(*id) {
                    return Err(GameError::InvalidInput("traitor is not a member".into()));
                }
                if !seen.contains(id) {
                    seen.push(*id);
                }
            }
            Ok(seen)
        }
    }
}

fn draw<R: Rng + ?Sized>(room: &RoomSession, k: usize, rng: &mut R) -> Vec<Uuid> {
    room.players
        .iter()
        .map(|p| p.conn_id)
        .choose_multiple(rng, k)
}

fn role_card(p: &Player) -> RoleCard {
    let def = p.role.and_then(catalog::role);
    RoleCard {
        key: p.role.unwrap_or(catalog::FALLBACK_ROLE).to_string(),
        name: def.map(|d| d.name).unwrap_or("Lambda").to_string(),
        team: p.team,
        traitor: p.traitor,
        can_kill: def.map(|d| d.powers.can_kill).unwrap_or(false),
        kills_left: p.kills_left,
        reveals_team_on_use: def.map(|d| d.powers.reveals_team_on_use).unwrap_or(false),
    }
}
