//! Authentication service.
//!
//! Exchanges credentials for bearer tokens, with a second factor for
//! admins and accounts that opted in.
//!
//! ## Login Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  POST /login {username, password}                                      │
//! │       │                                                                 │
//! │       ├── unknown / inactive / wrong password ──► 401 (same message)   │
//! │       │                                                                 │
//! │       ├── requires_mfa() ──► challenge + code ──► {mfa_required: true} │
//! │       │                                                                 │
//! │       └── otherwise ──────► token ──────────────► {mfa_required: false}│
//! │                                                                         │
//! │  POST /login/mfa {challenge_id, code}                                  │
//! │       ├── dead challenge / too many attempts / wrong code ──► 401      │
//! │       └── ok ──► consume challenge ──► token (mfa: true)               │
//! │                                                                         │
//! │  POST /login/mfa/resend {challenge_id}                                 │
//! │       ├── within cooldown ──► 429                                      │
//! │       └── ok ──► new code, attempts and expiry reset                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};
use stockadoodle_core::User;
use stockadoodle_db::MfaChallenge;
use tracing::{info, warn};

use crate::auth::{generate_mfa_code, hash_password, verify_password, DUMMY_PASSWORD_HASH};
use crate::error::{ApiError, ApiResult};
use crate::extract::ApiJson;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct MfaVerifyRequest {
    pub challenge_id: String,
    pub code: String,
}

#[derive(Debug, Deserialize)]
pub struct MfaResendRequest {
    pub challenge_id: String,
}

/// Issued token.
#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub mfa_required: bool,
    pub access_token: String,
    pub token_type: &'static str,
    pub expires_in: i64,
    pub user: User,
}

/// A second factor is pending. No token yet.
#[derive(Debug, Serialize)]
pub struct MfaChallengeResponse {
    pub mfa_required: bool,
    pub challenge_id: String,
    pub username: String,
    pub email: Option<String>,
    pub expires_in: i64,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum LoginResponse {
    Token(TokenResponse),
    MfaRequired(MfaChallengeResponse),
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/login", post(login))
        .route("/login/mfa", post(verify_mfa))
        .route("/login/mfa/resend", post(resend_mfa))
}

async fn login(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<LoginRequest>,
) -> ApiResult<Json<LoginResponse>> {
    let credentials = state.db.users().find_credentials(&req.username).await?;

    let Some(credentials) = credentials else {
        // Same argon2 work as a wrong password, so timing does not reveal the username.
        verify_password(&req.password, DUMMY_PASSWORD_HASH);
        warn!(username = %req.username, "Login rejected: unknown or inactive user");
        return Err(ApiError::invalid_credentials());
    };

    if !verify_password(&req.password, &credentials.password_hash) {
        warn!(username = %req.username, "Login rejected: wrong password");
        return Err(ApiError::invalid_credentials());
    }

    let user = credentials.user;

    if user.requires_mfa() {
        let challenge = start_challenge(&state, &user).await?;
        return Ok(Json(LoginResponse::MfaRequired(challenge)));
    }

    info!(user_id = %user.id, role = %user.role, "Login succeeded");
    Ok(Json(LoginResponse::Token(issue_token(&state, user, false)?)))
}

async fn verify_mfa(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<MfaVerifyRequest>,
) -> ApiResult<Json<TokenResponse>> {
    let challenge = live_challenge(&state, &req.challenge_id).await?;

    let claimed = state
        .db
        .mfa()
        .claim_attempt(&challenge.id, state.config.mfa_max_attempts)
        .await?;
    let Some(attempts) = claimed else {
        warn!(challenge_id = %challenge.id, "MFA rejected: too many attempts");
        return Err(ApiError::auth("Too many attempts, log in again"));
    };

    if !verify_password(req.code.trim(), &challenge.code_hash) {
        warn!(challenge_id = %challenge.id, attempts, "MFA rejected: wrong code");
        return Err(ApiError::auth("Invalid or expired code"));
    }

    // A concurrent verify may have won the race.
    if !state.db.mfa().consume(&challenge.id).await? {
        return Err(ApiError::auth("Invalid or expired code"));
    }

    let user = state
        .db
        .users()
        .get_by_id(&challenge.user_id)
        .await?
        .ok_or_else(|| ApiError::auth("Account is not active"))?;

    info!(user_id = %user.id, role = %user.role, "MFA login succeeded");
    Ok(Json(issue_token(&state, user, true)?))
}

async fn resend_mfa(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<MfaResendRequest>,
) -> ApiResult<Json<MfaChallengeResponse>> {
    let challenge = live_challenge(&state, &req.challenge_id).await?;

    let cooldown = Duration::seconds(state.config.mfa_resend_cooldown_secs);
    let wait = challenge.resend_wait(Utc::now(), cooldown);
    if wait > 0 {
        return Err(ApiError::rate_limited(format!(
            "Wait {} seconds before requesting a new code",
            wait
        )));
    }

    let user = state
        .db
        .users()
        .get_by_id(&challenge.user_id)
        .await?
        .ok_or_else(|| ApiError::auth("Account is not active"))?;

    let code = generate_mfa_code();
    let code_hash = hash_password(&code)?;
    let lifetime = Duration::seconds(state.config.mfa_code_lifetime_secs);
    let challenge = state
        .db
        .mfa()
        .reissue(&challenge.id, &code_hash, lifetime)
        .await?;

    state.mfa_delivery.deliver(&user, &code);
    info!(user_id = %user.id, challenge_id = %challenge.id, "MFA code resent");

    Ok(Json(MfaChallengeResponse {
        mfa_required: true,
        challenge_id: challenge.id,
        username: user.username,
        email: user.email,
        expires_in: state.config.mfa_code_lifetime_secs,
    }))
}

/// Creates a challenge and delivers its code.
async fn start_challenge(state: &AppState, user: &User) -> ApiResult<MfaChallengeResponse> {
    if user.email.as_deref().map_or(true, |e| e.trim().is_empty()) {
        warn!(user_id = %user.id, "Login rejected: MFA account has no e-mail");
        return Err(ApiError::invalid_credentials());
    }

    let removed = state.db.mfa().purge_stale(Utc::now()).await?;
    if removed > 0 {
        info!(removed, "Purged stale MFA challenges");
    }

    let code = generate_mfa_code();
    let code_hash = hash_password(&code)?;
    let lifetime = Duration::seconds(state.config.mfa_code_lifetime_secs);
    let challenge = state.db.mfa().create(&user.id, &code_hash, lifetime).await?;

    state.mfa_delivery.deliver(user, &code);
    info!(user_id = %user.id, challenge_id = %challenge.id, "MFA challenge issued");

    Ok(MfaChallengeResponse {
        mfa_required: true,
        challenge_id: challenge.id,
        username: user.username.clone(),
        email: user.email.clone(),
        expires_in: state.config.mfa_code_lifetime_secs,
    })
}

/// Loads a challenge that is neither consumed nor expired.
async fn live_challenge(state: &AppState, id: &str) -> ApiResult<MfaChallenge> {
    state
        .db
        .mfa()
        .get(id)
        .await?
        .filter(|c| c.is_live(Utc::now()))
        .ok_or_else(|| {
            warn!(challenge_id = %id, "MFA rejected: unknown or expired challenge");
            ApiError::auth("Invalid or expired code")
        })
}

fn issue_token(state: &AppState, user: User, mfa: bool) -> ApiResult<TokenResponse> {
    let access_token = state.jwt.generate_access_token(&user, mfa)?;
    Ok(TokenResponse {
        mfa_required: false,
        access_token,
        token_type: "Bearer",
        expires_in: state.jwt.access_lifetime_secs(),
        user,
    })
}
