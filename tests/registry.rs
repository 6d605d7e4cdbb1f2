//! Room life-cycle tests against the in-memory registry.

use chrono::{Duration, Utc};
use uuid::Uuid;

use traque_server::error::GameError;
use traque_server::game::registry::{RoomRegistry, TraitorSelection};
use traque_server::game::types::Phase;

fn conn() -> Uuid {
    Uuid::new_v4()
}

#[tokio::test]
async fn create_then_fetch_round_trip() {
    let registry = RoomRegistry::new();
    let host = conn();
    let outcome = registry.create_room(host, "Alice", "Terminale 2").unwrap();

    assert_eq!(outcome.code.len(), 4);
    assert!(outcome.code.bytes().all(|b| b.is_ascii_uppercase()));

    let snap = registry.snapshot(&outcome.code).await.unwrap();
    assert_eq!(snap.phase, Phase::Waiting);
    assert_eq!(snap.players.len(), 1);
    assert_eq!(snap.players[0].handle, "Alice");
}

#[test]
fn ten_thousand_codes_never_collide() {
    let registry = RoomRegistry::new();
    for i in 0..10_000 {
        registry
            .create_room(conn(), &format!("h{i}"), "d")
            .expect("collision must trigger regeneration, not failure");
    }
    // Map keys are the codes, so uniqueness is implied by the count.
    assert_eq!(registry.len(), 10_000);
}

#[test]
fn invalid_handle_is_rejected_at_the_perimeter() {
    let registry = RoomRegistry::new();
    let err = registry.create_room(conn(), "   ", "desc").unwrap_err();
    assert!(matches!(err, GameError::InvalidInput(_)));
    assert!(registry.is_empty(), "no partial mutation on rejection");
}

#[tokio::test]
async fn join_broadcast_reaches_every_member() {
    let registry = RoomRegistry::new();
    let host = conn();
    let code = registry.create_room(host, "Alice", "Terminale 2").unwrap().code;

    let bob = conn();
    let outcome = registry.join_room(&code, bob, "Bob", "d").await.unwrap();
    assert_eq!(outcome.recipients, vec![host, bob]);

    let caro = conn();
    let outcome = registry.join_room(&code, caro, "Caro", "d").await.unwrap();
    // Everyone currently in the room, joiner included, in join order.
    assert_eq!(outcome.recipients, vec![host, bob, caro]);
    assert_eq!(outcome.snapshot.players.len(), 3);

    let dana = conn();
    registry.join_room(&code, dana, "Dana", "d").await.unwrap();
    let outcome = registry
        .start_game(&code, host, TraitorSelection::Auto)
        .await
        .unwrap();
    assert_eq!(outcome.recipients, vec![host, bob, caro, dana]);
}

#[tokio::test]
async fn codes_are_accepted_case_insensitively() {
    let registry = RoomRegistry::new();
    let host = conn();
    let code = registry.create_room(host, "Alice", "d").unwrap().code;
    let lower = code.to_ascii_lowercase();

    let bob = conn();
    registry.join_room(&lower, bob, "Bob", "d").await.unwrap();
    assert_eq!(registry.snapshot(&lower).await.unwrap().players.len(), 2);

    for name in ["Caro", "Dana"] {
        registry.join_room(&code, conn(), name, "d").await.unwrap();
    }
    registry
        .start_game(&lower, host, TraitorSelection::Auto)
        .await
        .unwrap();
    let snap = registry.mark_eliminated(&lower, bob).await.unwrap();
    assert!(!snap.players.iter().find(|p| p.handle == "Bob").unwrap().alive);
}

#[tokio::test]
async fn join_unknown_room_is_not_found() {
    let registry = RoomRegistry::new();
    let err = registry
        .join_room("ZZZZ", conn(), "Bob", "d")
        .await
        .unwrap_err();
    assert!(matches!(err, GameError::NotFound));
}

#[tokio::test]
async fn start_requires_host_and_four_players() {
    let registry = RoomRegistry::new();
    let host = conn();
    let code = registry.create_room(host, "Alice", "Terminale 2").unwrap().code;

    let bob = conn();
    registry.join_room(&code, bob, "Bob", "d").await.unwrap();
    registry.join_room(&code, conn(), "Caro", "d").await.unwrap();

    // Non-host cannot start.
    let err = registry
        .start_game(&code, bob, TraitorSelection::Auto)
        .await
        .unwrap_err();
    assert!(matches!(err, GameError::Forbidden));

    // Three players is one short.
    let err = registry
        .start_game(&code, host, TraitorSelection::Auto)
        .await
        .unwrap_err();
    assert!(matches!(err, GameError::InsufficientPlayers { got: 3, .. }));

    registry.join_room(&code, conn(), "Dana", "d").await.unwrap();
    let outcome = registry
        .start_game(&code, host, TraitorSelection::Auto)
        .await
        .unwrap();

    // Every player gets a private card; the public snapshot shows teams
    // but carries no role information at all.
    assert_eq!(outcome.cards.len(), 4);
    assert_eq!(outcome.snapshot.phase, Phase::Playing);
    assert_eq!(outcome.snapshot.players.len(), 4);
    let public = serde_json::to_string(&outcome.snapshot).unwrap();
    assert!(!public.contains("role"));
}

#[tokio::test]
async fn join_after_start_is_invalid_phase() {
    let registry = RoomRegistry::new();
    let host = conn();
    let code = registry.create_room(host, "Alice", "d").unwrap().code;
    for name in ["Bob", "Caro", "Dana"] {
        registry.join_room(&code, conn(), name, "d").await.unwrap();
    }
    registry
        .start_game(&code, host, TraitorSelection::Count(0))
        .await
        .unwrap();

    let err = registry
        .join_room(&code, conn(), "Eve", "d")
        .await
        .unwrap_err();
    assert!(matches!(err, GameError::InvalidPhase { .. }));
}

#[tokio::test]
async fn explicit_traitor_selection_is_honored() {
    let registry = RoomRegistry::new();
    let host = conn();
    let code = registry.create_room(host, "Alice", "d").unwrap().code;
    let bob = conn();
    registry.join_room(&code, bob, "Bob", "d").await.unwrap();
    for name in ["Caro", "Dana"] {
        registry.join_room(&code, conn(), name, "d").await.unwrap();
    }

    let outcome = registry
        .start_game(&code, host, TraitorSelection::Explicit(vec![host, bob]))
        .await
        .unwrap();

    let card_of = |id: Uuid| {
        outcome
            .cards
            .iter()
            .find(|(c, _)| *c == id)
            .map(|(_, card)| card.clone())
            .unwrap()
    };
    assert!(card_of(host).traitor);
    assert!(card_of(bob).traitor);
    assert_eq!(card_of(host).key, "traitre");
    assert_eq!(card_of(bob).key, "complice");
}

#[tokio::test]
async fn finish_is_idempotent_with_identical_records() {
    let registry = RoomRegistry::new();
    let host = conn();
    let code = registry.create_room(host, "Alice", "d").unwrap().code;
    for name in ["Bob", "Caro", "Dana"] {
        registry.join_room(&code, conn(), name, "d").await.unwrap();
    }
    registry
        .start_game(&code, host, TraitorSelection::Auto)
        .await
        .unwrap();

    let first = registry.finish_game(&code, "BLEU").await.unwrap();
    assert!(!first.already_finished);
    assert_eq!(
        first.record.deletion_deadline,
        first.record.finished_at + Duration::hours(24)
    );

    let second = registry.finish_game(&code, "BLEU").await.unwrap();
    assert!(second.already_finished);
    assert_eq!(first.record, second.record);

    // Winner side is reflected on the participants.
    for p in &first.participants {
        assert_eq!(p.won, p.team.label() == "BLEU");
    }
}

#[tokio::test]
async fn finish_unknown_room_is_not_found() {
    let registry = RoomRegistry::new();
    let err = registry.finish_game("QQQQ", "BLEU").await.unwrap_err();
    assert!(matches!(err, GameError::NotFound));
}

#[tokio::test]
async fn expired_rooms_are_purged_after_their_deadline() {
    let registry = RoomRegistry::new();
    let host = conn();
    let code = registry.create_room(host, "Alice", "d").unwrap().code;
    registry.finish_game(&code, "ROUGE").await.unwrap();

    // Still inside the TTL: nothing to purge.
    assert_eq!(registry.purge_expired(Utc::now()), 0);
    assert!(registry.snapshot(&code).await.is_ok());

    let purged = registry.purge_expired(Utc::now() + Duration::hours(25));
    assert_eq!(purged, 1);
    assert!(matches!(
        registry.snapshot(&code).await.unwrap_err(),
        GameError::NotFound
    ));
}

#[tokio::test]
async fn elimination_flips_the_alive_flag() {
    let registry = RoomRegistry::new();
    let host = conn();
    let code = registry.create_room(host, "Alice", "d").unwrap().code;
    let bob = conn();
    registry.join_room(&code, bob, "Bob", "d").await.unwrap();
    for name in ["Caro", "Dana"] {
        registry.join_room(&code, conn(), name, "d").await.unwrap();
    }

    // Only meaningful once the round is live.
    let err = registry.mark_eliminated(&code, bob).await.unwrap_err();
    assert!(matches!(err, GameError::InvalidPhase { .. }));

    registry
        .start_game(&code, host, TraitorSelection::Auto)
        .await
        .unwrap();
    let snap = registry.mark_eliminated(&code, bob).await.unwrap();
    let bob_pub = snap.players.iter().find(|p| p.handle == "Bob").unwrap();
    assert!(!bob_pub.alive);
}
