//! Input perimeter: field sanitizers plus the per-connection rate limiter.
//!
//! Every field arriving on the WS or HTTP boundary passes through here
//! before any room state is touched, so a rejection never leaves a
//! partial mutation behind.

use std::time::{Duration, Instant};

use dashmap::DashMap;
use uuid::Uuid;

use crate::config::settings;
use crate::error::GameError;

const HANDLE_MAX: usize = 20;
const DESCRIPTOR_MAX: usize = 40;
const EMAIL_MAX: usize = 120;
pub const CODE_LEN: usize = 4;

fn clean(raw: &str) -> String {
    raw.trim()
        .chars()
        .filter(|c| !c.is_control())
        .collect::<String>()
}

fn charset_ok(s: &str, extra: &str) -> bool {
    s.chars()
        .all(|c| c.is_alphanumeric() || c == ' ' || extra.contains(c))
}

/// Player display name: 1..=20 chars, letters/digits/space/`-'_`.
pub fn sanitize_handle(raw: &str) -> Result<String, GameError> {
    let s = clean(raw);
    if s.is_empty() || s.chars().count() > HANDLE_MAX {
        return Err(GameError::InvalidInput("handle length".into()));
    }
    if !charset_ok(&s, "-'_") {
        return Err(GameError::InvalidInput("handle charset".into()));
    }
    Ok(s)
}

/// Free-text "real life" descriptor: 1..=40 chars, slightly wider charset.
pub fn sanitize_descriptor(raw: &str) -> Result<String, GameError> {
    let s = clean(raw);
    if s.is_empty() || s.chars().count() > DESCRIPTOR_MAX {
        return Err(GameError::InvalidInput("descriptor length".into()));
    }
    if !charset_ok(&s, "-'_.,") {
        return Err(GameError::InvalidInput("descriptor charset".into()));
    }
    Ok(s)
}

/// Room code: exactly four ASCII letters, normalized to uppercase.
pub fn normalize_code(raw: &str) -> Result<String, GameError> {
    let s = clean(raw).to_ascii_uppercase();
    if s.len() != CODE_LEN || !s.bytes().all(|b| b.is_ascii_uppercase()) {
        return Err(GameError::InvalidInput("malformed room code".into()));
    }
    Ok(s)
}

/// Lowercased, trimmed email with a minimal shape check.
pub fn normalize_email(raw: &str) -> Result<String, GameError> {
    let s = clean(raw).to_lowercase();
    let at = s.find('@');
    match at {
        Some(i) if i > 0 && i + 1 < s.len() && s.len() <= EMAIL_MAX && !s.contains(' ') => Ok(s),
        _ => Err(GameError::InvalidInput("malformed email".into())),
    }
}

//////////////////////////////////////////////////
// Sliding-window rate limiter
//////////////////////////////////////////////////

/// Per `(connection, action)` sliding window over hit timestamps.
///
/// Process-scoped and dependency-injected (no global singleton); the
/// buckets are the only cross-request mutable state outside room locks.
pub struct RateLimiter {
    window: Duration,
    max: u32,
    hits: DashMap<(Uuid, &'static str), Vec<Instant>>,
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(
            Duration::from_secs(settings().rate_window),
            settings().rate_max,
        )
    }
}

impl RateLimiter {
    pub fn new(window: Duration, max: u32) -> Self {
        Self {
            window,
            max,
            hits: DashMap::new(),
        }
    }

    /// Record one hit; rejects with a retry-after hint once the window
    /// already holds `max` hits.
    pub fn check(&self, conn: Uuid, action: &'static str) -> Result<(), GameError> {
        let now = Instant::now();
        let mut bucket = self.hits.entry((conn, action)).or_default();
        bucket.retain(|t| now.duration_since(*t) < self.window);

        if bucket.len() >= self.max as usize {
            let retry_after = bucket
                .first()
                .map(|oldest| {
                    self.window
                        .saturating_sub(now.duration_since(*oldest))
                        .as_secs()
                })
                .unwrap_or(self.window.as_secs())
                .max(1);
            return Err(GameError::RateLimited { retry_after });
        }
        bucket.push(now);
        Ok(())
    }

    /// Drop buckets whose last hit fell out of the window. Bounds memory;
    /// safe to run concurrently with `check`.
    pub fn sweep(&self) {
        let now = Instant::now();
        let window = self.window;
        self.hits
            .retain(|_, bucket| bucket.last().is_some_and(|t| now.duration_since(*t) < window));
    }

    /// Spawn the periodic sweeper for a process-lifetime limiter.
    pub fn start_sweeper(limiter: std::sync::Arc<Self>) {
        tokio::spawn(async move {
            loop {
                tokio::time::sleep(limiter.window * 4).await;
                limiter.sweep();
            }
        });
    }
}
