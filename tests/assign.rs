//! Property-style checks for the role-distribution algorithm.

use rand::rngs::StdRng;
use rand::SeedableRng;
use uuid::Uuid;

use traque_server::game::types::{Player, Team};
use traque_server::roles::assign::assign_roles;
use traque_server::roles::catalog::{self, Affinity, FALLBACK_ROLE};

fn lobby(n: usize) -> Vec<Player> {
    (0..n)
        .map(|i| {
            let team = if i % 2 == 0 { Team::Bleu } else { Team::Rouge };
            Player::new(Uuid::new_v4(), format!("joueur{i}"), "Terminale 2".into(), team)
        })
        .collect()
}

#[test]
fn every_player_gets_a_catalog_role() {
    for n in 4..=16 {
        for t in 0..=n {
            let mut players = lobby(n);
            let traitors: Vec<Uuid> = players.iter().take(t).map(|p| p.conn_id).collect();
            let mut rng = StdRng::seed_from_u64((n * 31 + t) as u64);

            assign_roles(&mut players, &traitors, &mut rng);

            assert_eq!(players.len(), n);
            for p in &players {
                let key = p.role.expect("role must be populated");
                assert!(
                    catalog::role(key).is_some(),
                    "unknown role key {key} for {n} players, {t} traitors"
                );
            }
        }
    }
}

#[test]
fn traitor_roles_require_two_traitors() {
    for t in 0..=1 {
        let mut players = lobby(8);
        let traitors: Vec<Uuid> = players.iter().take(t).map(|p| p.conn_id).collect();
        let mut rng = StdRng::seed_from_u64(7);

        assign_roles(&mut players, &traitors, &mut rng);

        for p in &players {
            let def = catalog::role(p.role.unwrap()).unwrap();
            assert_ne!(
                def.affinity,
                Affinity::TraitorOnly,
                "traitor-only role dealt with only {t} traitors"
            );
        }
        // A lone traitor falls back to lambda.
        for id in &traitors {
            let p = players.iter().find(|p| p.conn_id == *id).unwrap();
            assert_eq!(p.role, Some(FALLBACK_ROLE));
        }
    }
}

#[test]
fn first_two_traitors_get_priority_roles() {
    let mut players = lobby(8);
    let traitors: Vec<Uuid> = players.iter().take(3).map(|p| p.conn_id).collect();
    let mut rng = StdRng::seed_from_u64(11);

    assign_roles(&mut players, &traitors, &mut rng);

    let role_of = |id: Uuid| {
        players
            .iter()
            .find(|p| p.conn_id == id)
            .and_then(|p| p.role)
            .unwrap()
    };
    assert_eq!(role_of(traitors[0]), "traitre");
    assert_eq!(role_of(traitors[1]), "complice");
    assert_eq!(role_of(traitors[2]), FALLBACK_ROLE);

    for id in &traitors {
        let p = players.iter().find(|p| p.conn_id == *id).unwrap();
        assert!(p.traitor, "traitor flag must be set");
    }
}

#[test]
fn teams_are_never_mutated() {
    let mut players = lobby(10);
    let before: Vec<Team> = players.iter().map(|p| p.team).collect();
    let traitors: Vec<Uuid> = players.iter().take(2).map(|p| p.conn_id).collect();
    let mut rng = StdRng::seed_from_u64(3);

    assign_roles(&mut players, &traitors, &mut rng);

    let after: Vec<Team> = players.iter().map(|p| p.team).collect();
    assert_eq!(before, after);
}

#[test]
fn killers_start_with_their_kill_counter() {
    let mut players = lobby(6);
    let traitors: Vec<Uuid> = players.iter().take(2).map(|p| p.conn_id).collect();
    let mut rng = StdRng::seed_from_u64(5);

    assign_roles(&mut players, &traitors, &mut rng);

    for p in &players {
        let def = catalog::role(p.role.unwrap()).unwrap();
        assert_eq!(p.kills_left, def.powers.kills_per_period);
    }
}

#[test]
fn all_traitor_teams_still_assign() {
    // Both per-team pools end up empty of eligible players; the walk
    // must be harmless and traitors still get dealt.
    let mut players = lobby(4);
    let traitors: Vec<Uuid> = players.iter().map(|p| p.conn_id).collect();
    let mut rng = StdRng::seed_from_u64(13);

    assign_roles(&mut players, &traitors, &mut rng);

    assert!(players.iter().all(|p| p.role.is_some()));
    assert_eq!(
        players.iter().filter(|p| p.traitor).count(),
        4,
        "every player was a traitor"
    );
}
