//! Background sweep: purge expired in-memory rooms and delete their
//! durable mirrors once the deletion deadline passes.
//!
//! Both durable deletes are idempotent, so the sweep is safe to run
//! redundantly alongside any storage-level TTL.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use sqlx::PgPool;
use tokio::time::sleep;

use crate::config::settings;
use crate::db::room_repo;
use crate::game::registry::RoomRegistry;

/// Spawn the infinite reconciliation loop as a Tokio task.
pub fn start(db: PgPool, registry: Arc<RoomRegistry>) {
    tokio::spawn(async move {
        loop {
            sleep(Duration::from_secs(settings().sweep_interval)).await;
            if let Err(e) = tick(&db, &registry).await {
                log::error!("reconciler tick failed: {e:?}");
            }
        }
    });
}

/// One sweep: in-memory purge, TTL-equivalent delete, then the
/// defense-in-depth delete keyed on finish time.
pub async fn tick(db: &PgPool, registry: &RoomRegistry) -> anyhow::Result<()> {
    let now = Utc::now();

    let purged = registry.purge_expired(now);
    if purged > 0 {
        log::info!("purged {purged} expired rooms from memory");
    }

    let ttl = room_repo::delete_expired(db, now).await?;
    let cutoff = now - chrono::Duration::seconds(settings().room_ttl as i64);
    let stale = room_repo::delete_stale_finished(db, cutoff).await?;
    if ttl + stale > 0 {
        log::info!("deleted {ttl} expired and {stale} stale room records");
    }
    Ok(())
}
