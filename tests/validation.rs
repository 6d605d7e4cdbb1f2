//! Perimeter tests: sanitizers and the sliding-window rate limiter.

use std::time::Duration;

use uuid::Uuid;

use traque_server::error::GameError;
use traque_server::validation::{
    normalize_code, normalize_email, sanitize_descriptor, sanitize_handle, RateLimiter,
};

#[test]
fn handle_is_trimmed_and_bounded() {
    assert_eq!(sanitize_handle("  Alice  ").unwrap(), "Alice");
    assert_eq!(sanitize_handle("Jean-Luc").unwrap(), "Jean-Luc");
    assert_eq!(sanitize_handle("Émile").unwrap(), "Émile");

    assert!(sanitize_handle("").is_err());
    assert!(sanitize_handle("   ").is_err());
    assert!(sanitize_handle(&"a".repeat(21)).is_err());
    assert!(sanitize_handle("<script>").is_err());
}

#[test]
fn control_characters_are_stripped_before_checking() {
    assert_eq!(sanitize_handle("Al\u{0000}ice").unwrap(), "Alice");
    assert_eq!(sanitize_descriptor("Terminale\u{0007} 2").unwrap(), "Terminale 2");
}

#[test]
fn descriptor_allows_light_punctuation() {
    assert_eq!(sanitize_descriptor("Terminale 2").unwrap(), "Terminale 2");
    assert_eq!(
        sanitize_descriptor("Prof d'anglais, 3e").unwrap(),
        "Prof d'anglais, 3e"
    );
    assert!(sanitize_descriptor(&"x".repeat(41)).is_err());
}

#[test]
fn room_codes_normalize_to_four_uppercase_letters() {
    assert_eq!(normalize_code("abcd").unwrap(), "ABCD");
    assert_eq!(normalize_code(" KXQZ ").unwrap(), "KXQZ");

    assert!(normalize_code("ABC").is_err());
    assert!(normalize_code("ABCDE").is_err());
    assert!(normalize_code("AB1D").is_err());
}

#[test]
fn emails_normalize_and_reject_garbage() {
    assert_eq!(normalize_email(" Alice@Example.COM ").unwrap(), "alice@example.com");
    assert!(normalize_email("not-an-email").is_err());
    assert!(normalize_email("@nope").is_err());
    assert!(normalize_email("a b@c.d").is_err());
}

#[test]
fn nth_plus_one_action_in_window_is_rejected() {
    let limiter = RateLimiter::new(Duration::from_secs(60), 5);
    let conn = Uuid::new_v4();

    for _ in 0..5 {
        limiter.check(conn, "join_game").unwrap();
    }
    let err = limiter.check(conn, "join_game").unwrap_err();
    match err {
        GameError::RateLimited { retry_after } => assert!(retry_after >= 1),
        other => panic!("expected RateLimited, got {other:?}"),
    }

    // Other actions and other connections have their own windows.
    limiter.check(conn, "create_game").unwrap();
    limiter.check(Uuid::new_v4(), "join_game").unwrap();
}

#[test]
fn window_expiry_readmits_the_connection() {
    let limiter = RateLimiter::new(Duration::from_millis(50), 2);
    let conn = Uuid::new_v4();

    limiter.check(conn, "start_game").unwrap();
    limiter.check(conn, "start_game").unwrap();
    assert!(limiter.check(conn, "start_game").is_err());

    std::thread::sleep(Duration::from_millis(60));
    limiter.check(conn, "start_game").unwrap();
}

#[test]
fn sweep_drops_stale_buckets() {
    let limiter = RateLimiter::new(Duration::from_millis(10), 3);
    let conn = Uuid::new_v4();
    limiter.check(conn, "join_game").unwrap();

    std::thread::sleep(Duration::from_millis(20));
    limiter.sweep();
    // Fresh window after the sweep.
    for _ in 0..3 {
        limiter.check(conn, "join_game").unwrap();
    }
}
