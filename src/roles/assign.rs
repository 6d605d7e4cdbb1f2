//! Constrained-random role distribution.
//!
//! Each team draws from its own independently-built pool, so both sides
//! get a comparable power mix no matter how the traitor load falls.
//! Traitor-only roles never enter the pools; they are dealt separately
//! and only when at least two traitors exist.

use rand::seq::SliceRandom;
use rand::Rng;
use uuid::Uuid;

use crate::game::types::{Player, Team};
use crate::roles::catalog::{self, Affinity, FALLBACK_ROLE};

/// Populate `role` and power counters on every player.
///
/// `traitor_ids` is the already-selected traitor subset; membership of the
/// `players` slice and each player's team are never mutated. Terminates in
/// O(players + catalog).
pub fn assign_roles<R: Rng + ?Sized>(players: &mut [Player], traitor_ids: &[Uuid], rng: &mut R) {
    let total = players.len();
    let traitors = traitor_ids.len();

    let mut blue_pool = build_pool(Team::Bleu, total, traitors);
    let mut red_pool = build_pool(Team::Rouge, total, traitors);
    blue_pool.shuffle(rng);
    red_pool.shuffle(rng);

    // Non-traitor players draw from their team's pool in join order;
    // once a pool runs dry the rest fall back to lambda. Over-full
    // pools simply leave roles undealt.
    for p in players.iter_mut() {
        if traitor_ids.contains(&p.conn_id) {
            continue;
        }
        let pool = match p.team {
            Team::Bleu => &mut blue_pool,
            Team::Rouge => &mut red_pool,
        };
        give(p, pool.pop().unwrap_or(FALLBACK_ROLE));
    }

    // Traitors are dealt exclusively here: the first two (input order)
    // get the two highest-priority traitor-only roles, the rest lambda.
    // With fewer than two traitors nobody learns a traitor role exists.
    let traitor_deck: Vec<&'static str> = if traitors >= 2 {
        catalog::traitor_roles().iter().map(|r| r.key).collect()
    } else {
        Vec::new()
    };
    let mut dealt = 0usize;
    for id in traitor_ids {
        let role = traitor_deck.get(dealt).copied().unwrap_or(FALLBACK_ROLE);
        dealt += 1;
        if let Some(p) = players.iter_mut().find(|p| p.conn_id == *id) {
            p.traitor = true;
            give(p, role);
        }
    }
}

/// Evaluate every pooled catalog entry for one team.
fn build_pool(team: Team, total_players: usize, traitor_count: usize) -> Vec<&'static str> {
    let mut pool = Vec::new();
    for def in catalog::CATALOG.iter() {
        if def.key == FALLBACK_ROLE || def.affinity == Affinity::TraitorOnly {
            continue;
        }
        if !catalog::pools_for(def).contains(&team) {
            continue;
        }
        let n = def.count.evaluate(total_players, traitor_count);
        for _ in 0..n {
            pool.push(def.key);
        }
    }
    pool
}

fn give(p: &mut Player, key: &'static str) {
    p.role = Some(key);
    if let Some(def) = catalog::role(key) {
        p.kills_left = def.powers.kills_per_period;
    }
}
