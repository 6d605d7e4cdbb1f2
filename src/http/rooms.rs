//! Room endpoints: terminal `end_game` transition and snapshot lookup.

use actix_web::{get, post, web, HttpResponse};
use redis::Client as RedisClient;
use serde::Deserialize;
use sqlx::PgPool;
use tokio_retry::{strategy::ExponentialBackoff, Retry};

use crate::db::models::{MatchHistoryEntry, RoomRecord};
use crate::db::{account_repo, room_repo};
use crate::error::GameError;
use crate::game::registry::{FinishOutcome, RoomRegistry};
use crate::http::auth::JwtAuth;
use crate::protocol::ServerMsg;
use crate::transport;

#[derive(Deserialize)]
pub struct EndGameRequest {
    pub winner: String,
}

/// POST /api/rooms/{code}/end
///
/// Idempotent: a repeated call returns the identical finished record and
/// triggers no second stat update. The in-memory transition is the
/// authoritative one; the durable mirror is written best-effort off the
/// response path.
#[post("/rooms/{code}/end")]
pub async fn end_game(
    path: web::Path<String>,
    info: web::Json<EndGameRequest>,
    registry: web::Data<RoomRegistry>,
    db: web::Data<PgPool>,
    redis: web::Data<RedisClient>,
    auth: Option<JwtAuth>,
) -> Result<HttpResponse, GameError> {
    let code = path.into_inner();
    let outcome = registry.finish_game(&code, &info.winner).await?;

    if !outcome.already_finished {
        let msg = ServerMsg::UpdateRoom {
            room: outcome.snapshot.clone(),
        };
        let redis = redis.get_ref().clone();
        let recipients = outcome.recipients.clone();
        tokio::spawn(async move {
            transport::broadcast(&redis, &recipients, &msg).await;
        });

        reconcile(db.get_ref().clone(), &outcome, auth.map(|a| a.account_id));
    }

    Ok(HttpResponse::Ok().json(&outcome.record))
}

/// Mirror the finished room durably and settle the requester's stats.
/// Spawned fire-and-forget; store hiccups are retried with backoff and
/// never delay the gameplay response.
fn reconcile(db: PgPool, outcome: &FinishOutcome, account_id: Option<uuid::Uuid>) {
    let record = RoomRecord {
        code: outcome.record.code.clone(),
        status: "finished".into(),
        winner: Some(outcome.record.winner.clone()),
        player_count: outcome.record.player_count as i32,
        created_at: outcome.record.finished_at
            - chrono::Duration::seconds(outcome.record.duration_secs),
        finished_at: Some(outcome.record.finished_at),
        expire_at: Some(outcome.record.deletion_deadline),
    };
    let participants = outcome.participants.clone();
    let finished_at = outcome.record.finished_at;
    let duration_secs = outcome.record.duration_secs;
    let player_count = outcome.record.player_count as i32;

    tokio::spawn(async move {
        let strategy = ExponentialBackoff::from_millis(200).take(4);
        let res = Retry::spawn(strategy, || room_repo::upsert(&db, &record)).await;
        if let Err(e) = res {
            log::error!("room {} durable mirror failed: {e:?}", record.code);
        }

        let Some(account_id) = account_id else { return };
        let Ok(Some(account)) = account_repo::find_by_id(&db, account_id).await else {
            return;
        };
        // An account settles only the game it actually played in.
        let Some(part) = participants.iter().find(|p| p.handle == account.handle) else {
            return;
        };

        if let Err(e) = account_repo::update_stats(&db, account_id, part.won).await {
            log::error!("stat update for {account_id} failed: {e:?}");
        }
        let entry = MatchHistoryEntry {
            account_id,
            room_code: record.code.clone(),
            team: part.team.label().to_string(),
            role: part.role.unwrap_or("lambda").to_string(),
            traitor: part.traitor,
            won: part.won,
            duration_secs,
            player_count,
            finished_at,
        };
        if let Err(e) = account_repo::append_match_history(&db, &entry).await {
            log::error!("match history for {account_id} failed: {e:?}");
        }
    });
}

/// GET /api/history — the bearer's finished games, newest first.
#[get("/history")]
pub async fn history(auth: JwtAuth, db: web::Data<PgPool>) -> Result<HttpResponse, GameError> {
    let rows = account_repo::match_history(&db, auth.account_id)
        .await
        .map_err(|e| GameError::Internal(e.to_string()))?;
    Ok(HttpResponse::Ok().json(rows))
}

/// GET /api/rooms/{code}
#[get("/rooms/{code}")]
pub async fn room_snapshot(
    path: web::Path<String>,
    registry: web::Data<RoomRegistry>,
) -> Result<HttpResponse, GameError> {
    let snapshot = registry.snapshot(&path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(snapshot))
}

pub fn init_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(end_game).service(history).service(room_snapshot);
}
