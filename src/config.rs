//! Runtime configuration for the Traque server.

use once_cell::sync::Lazy;
use std::env;

#[derive(Debug)]
pub struct Settings {
    /// Minimum players before a host may start a round.
    pub min_players: usize,
    /// Attempts at generating an unused room code before giving up.
    pub code_retries: u32,
    /// Seconds a finished room survives before it may be purged.
    pub room_ttl: u64,
    /// Sliding-window size for the per-connection rate limiter (seconds).
    pub rate_window: u64,
    /// Actions of one type allowed per connection inside the window.
    pub rate_max: u32,
    /// Interval between reconciler sweeps (seconds).
    pub sweep_interval: u64,
    /// Access-token lifetime (minutes).
    pub token_ttl_mins: i64,
    /// Redis TTL for pending email-verification codes (seconds).
    pub verify_code_ttl: u64,
}

impl Settings {
    fn from_env() -> Self {
        fn var<T: std::str::FromStr>(key: &str, default: T) -> T {
            env::var(key)
                .ok()
                .and_then(|v| v.parse::<T>().ok())
                .unwrap_or(default)
        }

        Settings {
            min_players: var("MIN_PLAYERS", 4),
            code_retries: var("CODE_RETRIES", 32),
            room_ttl: var("ROOM_TTL", 24 * 3_600),
            rate_window: var("RATE_WINDOW", 10),
            rate_max: var("RATE_MAX", 20),
            sweep_interval: var("SWEEP_INTERVAL", 6 * 3_600),
            token_ttl_mins: var("TOKEN_TTL_MINS", 60),
            verify_code_ttl: var("VERIFY_CODE_TTL", 15 * 60),
        }
    }
}

static SETTINGS: Lazy<Settings> = Lazy::new(Settings::from_env);

pub fn settings() -> &'static Settings {
    &SETTINGS
}
