//! Real-time fan-out over Redis pub/sub.
//!
//! Each WebSocket connection subscribes to `conn:{id}:events`; anything
//! published there reaches exactly that client. Broadcast is a loop over
//! the room's member connections, so membership stays the registry's
//! single source of truth.

use redis::{AsyncCommands, Client as RedisClient};
use uuid::Uuid;

use crate::protocol::ServerMsg;

pub fn channel(conn_id: Uuid) -> String {
    format!("conn:{conn_id}:events")
}

/// Deliver one message to one connection. Best-effort: a dead Redis
/// connection is logged, never propagated to the gameplay path.
pub async fn send(redis: &RedisClient, conn_id: Uuid, msg: &ServerMsg) {
    let payload = match serde_json::to_string(msg) {
        Ok(p) => p,
        Err(e) => {
            log::error!("unserializable server message: {e}");
            return;
        }
    };
    match redis.get_multiplexed_async_connection().await {
        Ok(mut conn) => {
            let _: () = conn.publish(channel(conn_id), payload).await.unwrap_or(());
        }
        Err(e) => log::warn!("publish to {conn_id} failed: {e}"),
    }
}

/// Deliver one message to every listed connection.
pub async fn broadcast(redis: &RedisClient, recipients: &[Uuid], msg: &ServerMsg) {
    for conn_id in recipients {
        send(redis, *conn_id, msg).await;
    }
}
