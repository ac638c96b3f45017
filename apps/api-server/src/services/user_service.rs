//! User management service.
//!
//! Account administration needs `ManageUsers`; `/users/me` routes are open
//! to any authenticated caller.

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, put};
use axum::{Json, Router};
use serde::Deserialize;
use stockadoodle_core::validation::{validate_new_user, validate_password, validate_user_changes};
use stockadoodle_core::{NewUser, Permission, User, UserChanges};
use tracing::{info, warn};

use crate::auth::{hash_password, verify_password};
use crate::error::{ApiError, ApiResult};
use crate::extract::{ApiJson, ApiPath};
use crate::middleware::AuthUser;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/users", get(list_users).post(create_user))
        .route("/users/me", get(me))
        .route("/users/me/password", put(change_own_password))
        .route(
            "/users/:id",
            get(get_user).put(update_user).delete(delete_user),
        )
}

async fn list_users(State(state): State<AppState>, auth: AuthUser) -> ApiResult<Json<Vec<User>>> {
    auth.require(Permission::ManageUsers)?;

    let users = state.db.users().list_active().await?;
    Ok(Json(users))
}

async fn create_user(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiJson(input): ApiJson<NewUser>,
) -> ApiResult<(StatusCode, Json<User>)> {
    auth.require(Permission::ManageUsers)?;
    validate_new_user(&input)?;

    let hash = hash_password(&input.password)?;
    let user = state.db.users().create(&input, &hash, Some(auth.id())).await?;

    info!(user_id = %user.id, username = %user.username, role = %user.role, actor = %auth.id(), "User created");
    Ok((StatusCode::CREATED, Json(user)))
}

async fn get_user(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiPath(id): ApiPath<String>,
) -> ApiResult<Json<User>> {
    auth.require(Permission::ManageUsers)?;

    let user = state
        .db
        .users()
        .get_by_id(&id)
        .await?
        .ok_or_else(|| ApiError::not_found("User", &id))?;
    Ok(Json(user))
}

async fn update_user(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiPath(id): ApiPath<String>,
    ApiJson(changes): ApiJson<UserChanges>,
) -> ApiResult<Json<User>> {
    auth.require(Permission::ManageUsers)?;

    let current = state
        .db
        .users()
        .get_by_id(&id)
        .await?
        .ok_or_else(|| ApiError::not_found("User", &id))?;

    // Role changes to one's own account are refused.
    if current.id == auth.id() && changes.role.is_some_and(|r| r != current.role) {
        return Err(ApiError::validation("You cannot change your own role"));
    }

    validate_user_changes(
        &changes,
        current.role,
        current.mfa_enabled,
        current.email.as_deref(),
    )?;

    let new_hash = changes.password.as_deref().map(hash_password).transpose()?;
    let user = state
        .db
        .users()
        .update(&id, &changes, new_hash.as_deref(), Some(auth.id()))
        .await?;

    info!(user_id = %user.id, actor = %auth.id(), "User updated");
    Ok(Json(user))
}

async fn delete_user(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiPath(id): ApiPath<String>,
) -> ApiResult<StatusCode> {
    auth.require(Permission::ManageUsers)?;

    if id == auth.id() {
        return Err(ApiError::validation("You cannot delete your own account"));
    }

    state.db.users().deactivate(&id, Some(auth.id())).await?;

    info!(user_id = %id, actor = %auth.id(), "User deactivated");
    Ok(StatusCode::NO_CONTENT)
}

async fn me(auth: AuthUser) -> Json<User> {
    Json(auth.user)
}

async fn change_own_password(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiJson(req): ApiJson<ChangePasswordRequest>,
) -> ApiResult<StatusCode> {
    let current_hash = state
        .db
        .users()
        .password_hash(auth.id())
        .await?
        .ok_or_else(|| ApiError::auth("Account is not active"))?;

    if !verify_password(&req.current_password, &current_hash) {
        warn!(user_id = %auth.id(), "Password change rejected: wrong current password");
        return Err(ApiError::auth("Current password is incorrect"));
    }

    validate_password(&req.new_password)?;
    let new_hash = hash_password(&req.new_password)?;
    state.db.users().set_password(auth.id(), &new_hash).await?;

    info!(user_id = %auth.id(), "Password changed");
    Ok(StatusCode::NO_CONTENT)
}
