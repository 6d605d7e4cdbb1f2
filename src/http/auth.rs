//! Credential endpoints (register / login / logout / verify / profile)
//! plus the Bearer-JWT extractor and the revocation set.

use actix_web::{get, post, web, HttpResponse};
use argon2::password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use chrono::{Duration, Utc};
use dashmap::DashMap;
use jsonwebtoken::{encode, EncodingKey, Header};
use once_cell::sync::Lazy;
use rand::Rng;
use redis::{AsyncCommands, Client as RedisClient};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use std::env;
use uuid::Uuid;

use crate::config::settings;
use crate::db::account_repo;
use crate::error::GameError;
use crate::validation;

//////////////////////////////////////////////////
// Data structs
//////////////////////////////////////////////////

#[derive(Deserialize)]
pub struct RegisterRequest {
    pub handle: String,
    pub email: String,
    pub password: String,
}

#[derive(Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Deserialize)]
pub struct VerifyRequest {
    pub email: String,
    pub code: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    sub: String, // account_id
    exp: usize,
}

#[derive(Serialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub expires_in: i64,
}

//////////////////////////////////////////////////
// Revocation set
//////////////////////////////////////////////////

/// Logged-out tokens, kept until their own `exp` passes. Process-scoped
/// and injected through app data rather than a global.
#[derive(Default)]
pub struct TokenBlacklist {
    revoked: DashMap<String, i64>,
}

impl TokenBlacklist {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn revoke(&self, token: &str, exp: i64) {
        self.revoked.insert(token.to_string(), exp);
    }

    pub fn contains(&self, token: &str) -> bool {
        self.revoked.contains_key(token)
    }

    /// Drop entries whose token has expired on its own.
    pub fn sweep(&self, now: i64) {
        self.revoked.retain(|_, exp| *exp > now);
    }
}

//////////////////////////////////////////////////
// ─────────────  JwtAuth extractor  ─────────────
//////////////////////////////////////////////////

pub mod extractor {
    use super::{Claims, TokenBlacklist};
    use actix_web::{
        dev::Payload, error::ErrorUnauthorized, web, FromRequest, HttpRequest,
        Result as ActixResult,
    };
    use futures_util::future::{ready, Ready};
    use jsonwebtoken::{decode, DecodingKey, Validation};
    use std::env;
    use uuid::Uuid;

    /// Extracts and validates a Bearer-JWT, exposing the account UUID.
    #[derive(Debug, Clone)]
    pub struct JwtAuth {
        pub account_id: Uuid,
        pub token: String,
        pub expires_at: i64,
    }

    impl FromRequest for JwtAuth {
        type Error = actix_web::Error;
        type Future = Ready<ActixResult<Self, Self::Error>>;

        fn from_request(req: &HttpRequest, _pl: &mut Payload) -> Self::Future {
            let res = (|| {
                // Expect:  Authorization: Bearer <JWT>
                let hdr = req
                    .headers()
                    .get("Authorization")
                    .and_then(|v| v.to_str().ok())
                    .ok_or_else(|| ErrorUnauthorized("missing Authorization header"))?;

                let token = hdr
                    .strip_prefix("Bearer ")
                    .ok_or_else(|| ErrorUnauthorized("malformed Authorization header"))?;

                if let Some(blacklist) = req.app_data::<web::Data<TokenBlacklist>>() {
                    if blacklist.contains(token) {
                        return Err(ErrorUnauthorized("revoked token"));
                    }
                }

                let secret =
                    env::var("JWT_SECRET").map_err(|_| ErrorUnauthorized("server mis-config"))?;
                let data = decode::<Claims>(
                    token,
                    &DecodingKey::from_secret(secret.as_bytes()),
                    &Validation::default(),
                )
                .map_err(|_| ErrorUnauthorized("invalid / expired token"))?;

                let account_id =
                    Uuid::parse_str(&data.claims.sub).map_err(|_| ErrorUnauthorized("bad sub"))?;

                Ok(JwtAuth {
                    account_id,
                    token: token.to_string(),
                    expires_at: data.claims.exp as i64,
                })
            })();

            ready(res)
        }
    }
}
pub use extractor::JwtAuth;

//////////////////////////////////////////////////
// Password hashing (argon2, timing-safe verify)
//////////////////////////////////////////////////

/// Verified against whenever no account matches, so the not-found path
/// costs the same as a real wrong-password check.
static DUMMY_HASH: Lazy<String> =
    Lazy::new(|| hash_password("traque-dummy-credential").expect("dummy hash"));

pub fn hash_password(password: &str) -> Result<String, GameError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|h| h.to_string())
        .map_err(|e| GameError::Internal(format!("hash failure: {e}")))
}

/// Constant-shape credential check: the argon2 verification always runs,
/// whether or not an account was found.
pub fn check_password(stored: Option<&str>, supplied: &str) -> bool {
    let reference = stored.unwrap_or(DUMMY_HASH.as_str());
    let parsed = match PasswordHash::new(reference) {
        Ok(p) => p,
        Err(_) => return false,
    };
    let ok = Argon2::default()
        .verify_password(supplied.as_bytes(), &parsed)
        .is_ok();
    ok && stored.is_some()
}

/// Resolve a bearer token to its account id, if valid. Used by the WS
/// handshake where authentication is optional.
pub fn account_from_token(token: &str) -> Option<Uuid> {
    use jsonwebtoken::{decode, DecodingKey, Validation};
    let secret = env::var("JWT_SECRET").ok()?;
    let data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .ok()?;
    Uuid::parse_str(&data.claims.sub).ok()
}

fn issue_token(account_id: Uuid) -> Result<TokenResponse, GameError> {
    let secret =
        env::var("JWT_SECRET").map_err(|_| GameError::Internal("JWT_SECRET unset".into()))?;
    let ttl = settings().token_ttl_mins;
    let exp = Utc::now()
        .checked_add_signed(Duration::minutes(ttl))
        .ok_or_else(|| GameError::Internal("clock overflow".into()))?
        .timestamp() as usize;
    let claims = Claims {
        sub: account_id.to_string(),
        exp,
    };
    let access_token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| GameError::Internal(format!("JWT encode: {e}")))?;
    Ok(TokenResponse {
        access_token,
        expires_in: ttl * 60,
    })
}

//////////////////////////////////////////////////
// POST /api/auth/register
//////////////////////////////////////////////////
#[post("/auth/register")]
pub async fn register(
    info: web::Json<RegisterRequest>,
    db: web::Data<PgPool>,
    redis: web::Data<RedisClient>,
) -> Result<HttpResponse, GameError> {
    let handle = validation::sanitize_handle(&info.handle)?;
    let email = validation::normalize_email(&info.email)?;
    if info.password.len() < 8 {
        return Err(GameError::InvalidInput("password too short".into()));
    }

    if account_repo::find_by_email_or_handle(&db, &email)
        .await
        .map_err(|e| GameError::Internal(e.to_string()))?
        .is_some()
    {
        return Err(GameError::InvalidInput("handle or email already taken".into()));
    }

    let hash = hash_password(&info.password)?;
    let account = account_repo::create(&db, &handle, &email, &hash)
        .await
        .map_err(|_| GameError::InvalidInput("handle or email already taken".into()))?;

    // Fire-and-forget verification code; delivery failure must never
    // block registration.
    let redis = redis.get_ref().clone();
    let mail_to = account.email.clone();
    tokio::spawn(async move {
        send_verification_code(&redis, &mail_to).await;
    });

    let token = issue_token(account.id)?;
    Ok(HttpResponse::Created().json(serde_json::json!({
        "account": account.projection(),
        "token": token,
    })))
}

/// Stores a 6-digit code under `verify:{email}` and hands it to the
/// outbound channel (stdout log stands in for the mailer here).
async fn send_verification_code(redis: &RedisClient, email: &str) {
    let code: u32 = rand::rng().random_range(100_000..1_000_000);
    match redis.get_multiplexed_async_connection().await {
        Ok(mut conn) => {
            let key = format!("verify:{email}");
            let _: () = conn
                .set_ex(&key, code.to_string(), settings().verify_code_ttl)
                .await
                .unwrap_or(());
            log::info!("verification code for {email}: {code}");
        }
        Err(e) => log::warn!("could not store verification code for {email}: {e}"),
    }
}

//////////////////////////////////////////////////
// POST /api/auth/login
//////////////////////////////////////////////////
#[post("/auth/login")]
pub async fn login(
    info: web::Json<LoginRequest>,
    db: web::Data<PgPool>,
) -> Result<HttpResponse, GameError> {
    let email = validation::normalize_email(&info.email)?;
    let account = account_repo::find_by_email(&db, &email)
        .await
        .map_err(|e| GameError::Internal(e.to_string()))?;

    // The hash check runs on both the found and not-found paths, and the
    // rejection is identical either way.
    let stored = account.as_ref().map(|a| a.password_hash.as_str());
    let ok = check_password(stored, &info.password);
    let account = match account {
        Some(a) if ok => a,
        _ => return Err(GameError::Forbidden),
    };

    let token = issue_token(account.id)?;
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "account": account.projection(),
        "token": token,
    })))
}

//////////////////////////////////////////////////
// POST /api/auth/verify
//////////////////////////////////////////////////
#[post("/auth/verify")]
pub async fn verify(
    info: web::Json<VerifyRequest>,
    db: web::Data<PgPool>,
    redis: web::Data<RedisClient>,
) -> Result<HttpResponse, GameError> {
    let email = validation::normalize_email(&info.email)?;
    let key = format!("verify:{email}");

    let mut conn = redis
        .get_multiplexed_async_connection()
        .await
        .map_err(|e| GameError::Internal(e.to_string()))?;
    let stored: Option<String> = conn
        .get(&key)
        .await
        .map_err(|e| GameError::Internal(e.to_string()))?;

    match stored {
        Some(code) if code == info.code => {
            let _: () = conn.del(&key).await.unwrap_or(());
            let account = account_repo::find_by_email(&db, &email)
                .await
                .map_err(|e| GameError::Internal(e.to_string()))?
                .ok_or(GameError::NotFound)?;
            account_repo::set_email_verified(&db, account.id)
                .await
                .map_err(|e| GameError::Internal(e.to_string()))?;
            Ok(HttpResponse::Ok().json(serde_json::json!({ "verified": true })))
        }
        _ => Err(GameError::InvalidInput("invalid or expired code".into())),
    }
}

//////////////////////////////////////////////////
// POST /api/auth/logout
//////////////////////////////////////////////////
#[post("/auth/logout")]
pub async fn logout(
    auth: JwtAuth,
    blacklist: web::Data<TokenBlacklist>,
) -> Result<HttpResponse, GameError> {
    blacklist.revoke(&auth.token, auth.expires_at);
    Ok(HttpResponse::Ok().json(serde_json::json!({ "logged_out": true })))
}

//////////////////////////////////////////////////
// GET /api/auth/profile
//////////////////////////////////////////////////
#[get("/auth/profile")]
pub async fn profile(auth: JwtAuth, db: web::Data<PgPool>) -> Result<HttpResponse, GameError> {
    let account = account_repo::find_by_id(&db, auth.account_id)
        .await
        .map_err(|e| GameError::Internal(e.to_string()))?
        .ok_or(GameError::NotFound)?;
    Ok(HttpResponse::Ok().json(account.projection()))
}

//////////////////////////////////////////////////
// Mount
//////////////////////////////////////////////////
pub fn init_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(register)
        .service(login)
        .service(verify)
        .service(logout)
        .service(profile);
}

/// Periodic blacklist sweep, spawned once at startup.
pub fn start_blacklist_sweeper(blacklist: web::Data<TokenBlacklist>) {
    tokio::spawn(async move {
        loop {
            tokio::time::sleep(std::time::Duration::from_secs(
                settings().token_ttl_mins as u64 * 60,
            ))
            .await;
            blacklist.sweep(Utc::now().timestamp());
        }
    });
}
