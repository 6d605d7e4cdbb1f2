//! WebSocket endpoint: perimeter checks, then registry dispatch, then
//! Redis fan-out.
//!
//! Each connection gets a fresh `conn_id`, stable until the socket
//! closes, and is subscribed to its private event channel. A disconnect
//! never destroys a room; the session simply stops listening.

use actix_web::{web, Error, HttpRequest, HttpResponse};
use actix_ws::{handle, Message};
use chrono::Utc;
use futures::StreamExt;
use redis::Client as RedisClient;
use sqlx::PgPool;
use uuid::Uuid;

use crate::db::models::RoomRecord;
use crate::db::room_repo;
use crate::error::GameError;
use crate::game::registry::{RoomRegistry, TraitorSelection};
use crate::game::types::{Phase, RoomSnapshot};
use crate::protocol::{ClientMsg, ServerMsg};
use crate::transport;
use crate::validation::RateLimiter;

pub async fn ws_index(
    req: HttpRequest,
    body: web::Payload,
    db_pool: web::Data<PgPool>,
    redis: web::Data<RedisClient>,
    registry: web::Data<RoomRegistry>,
    limiter: web::Data<RateLimiter>,
) -> Result<HttpResponse, Error> {
    let conn_id = Uuid::new_v4();

    // Optional bearer token query param links the connection to an
    // account so its active-room pointer can be maintained.
    let account_id = req
        .query_string()
        .split('&')
        .find_map(|kv| kv.strip_prefix("token="))
        .and_then(crate::http::auth::account_from_token);

    let (response, mut session, mut ws_stream) = handle(&req, body)?;

    let mut pubsub = redis
        .get_async_pubsub()
        .await
        .map_err(|_| actix_web::error::ErrorInternalServerError("redis subscribe"))?;
    pubsub
        .subscribe(transport::channel(conn_id))
        .await
        .map_err(|_| actix_web::error::ErrorInternalServerError("redis subscribe"))?;

    let db = db_pool.get_ref().clone();
    let redis_client = redis.get_ref().clone();
    let registry = registry.clone();
    let limiter = limiter.clone();

    actix::spawn(async move {
        let mut redis_stream = pubsub.on_message();

        loop {
            tokio::select! {
                // client → server
                Some(frame) = ws_stream.next() => {
                    match frame {
                        Ok(Message::Text(text)) => {
                            let reply = match serde_json::from_str::<ClientMsg>(&text) {
                                Ok(cmsg) => dispatch(
                                    registry.get_ref(),
                                    &db,
                                    &redis_client,
                                    limiter.get_ref(),
                                    conn_id,
                                    account_id,
                                    cmsg,
                                )
                                .await
                                .err(),
                                Err(_) => Some(GameError::InvalidInput("unparseable event".into())),
                            };
                            if let Some(err) = reply {
                                let msg = ServerMsg::Error {
                                    kind: err.kind().to_string(),
                                    message: err.to_string(),
                                };
                                transport::send(&redis_client, conn_id, &msg).await;
                            }
                        }
                        Ok(Message::Close(_)) | Err(_) => break,
                        _ => {}
                    }
                }
                // redis → client
                Some(msg) = redis_stream.next() => {
                    if let Ok(json) = msg.get_payload::<String>() {
                        if let Err(e) = session.text(json).await {
                            log::warn!("WS send failed for {conn_id}: {e:?}");
                            break;
                        }
                    }
                }
                else => break,
            }
        }

        log::info!("WS closed for connection {conn_id}");
    });

    Ok(response)
}

/// Rate-limit, mutate the registry, publish the outcome. A returned
/// error means nothing was mutated.
async fn dispatch(
    registry: &RoomRegistry,
    db: &PgPool,
    redis: &RedisClient,
    limiter: &RateLimiter,
    conn_id: Uuid,
    account_id: Option<Uuid>,
    msg: ClientMsg,
) -> Result<(), GameError> {
    limiter.check(conn_id, msg.action())?;

    match msg {
        ClientMsg::CreateGame { handle, descriptor } => {
            let outcome = registry.create_room(conn_id, &handle, &descriptor)?;
            point_account_at(db, account_id, &outcome.code);
            transport::send(
                redis,
                conn_id,
                &ServerMsg::GameCreated {
                    code: outcome.code.clone(),
                },
            )
            .await;
            transport::send(
                redis,
                conn_id,
                &ServerMsg::UpdateRoom {
                    room: outcome.snapshot.clone(),
                },
            )
            .await;
            mirror(db.clone(), outcome.snapshot);
        }
        ClientMsg::JoinGame {
            code,
            handle,
            descriptor,
        } => {
            let outcome = registry.join_room(&code, conn_id, &handle, &descriptor).await?;
            point_account_at(db, account_id, &outcome.snapshot.code);
            transport::send(
                redis,
                conn_id,
                &ServerMsg::GameJoined {
                    code: outcome.snapshot.code.clone(),
                },
            )
            .await;
            transport::broadcast(
                redis,
                &outcome.recipients,
                &ServerMsg::UpdateRoom {
                    room: outcome.snapshot.clone(),
                },
            )
            .await;
            mirror(db.clone(), outcome.snapshot);
        }
        ClientMsg::StartGame { code } => {
            let outcome = registry
                .start_game(&code, conn_id, TraitorSelection::Auto)
                .await?;
            for (member, card) in &outcome.cards {
                transport::send(redis, *member, &ServerMsg::YourRole { role: card.clone() }).await;
            }
            transport::broadcast(
                redis,
                &outcome.recipients,
                &ServerMsg::UpdateRoom {
                    room: outcome.snapshot.clone(),
                },
            )
            .await;
            mirror(db.clone(), outcome.snapshot);
        }
    }
    Ok(())
}

/// Point an authenticated account's active-room pointer at a code,
/// best-effort.
fn point_account_at(db: &PgPool, account_id: Option<Uuid>, code: &str) {
    let Some(account_id) = account_id else { return };
    let db = db.clone();
    let code = code.to_string();
    tokio::spawn(async move {
        if let Err(e) = crate::db::account_repo::set_current_room(&db, account_id, Some(&code)).await
        {
            log::warn!("current_room update for {account_id} failed: {e:?}");
        }
    });
}

/// Best-effort durable mirror of a room mutation, off the reply path.
fn mirror(db: PgPool, snapshot: RoomSnapshot) {
    tokio::spawn(async move {
        let record = RoomRecord {
            code: snapshot.code.clone(),
            status: match snapshot.phase {
                Phase::Waiting => "waiting",
                Phase::Playing => "playing",
                Phase::Finished => "finished",
            }
            .into(),
            winner: snapshot.winner.clone(),
            player_count: snapshot.players.len() as i32,
            created_at: Utc::now(),
            finished_at: None,
            expire_at: None,
        };
        if let Err(e) = room_repo::upsert(&db, &record).await {
            log::warn!("room {} mirror failed: {e:?}", record.code);
        }
    });
}
