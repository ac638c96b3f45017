//! # Authentication Middleware
//!
//! Guards every route except health and login.
//!
//! ```text
//! Request ──► Authorization: Bearer <jwt>
//!               │
//!               ├── missing / bad / expired ───────────► 401 AUTH_ERROR
//!               ▼
//!           reload user by `sub`
//!               │
//!               ├── unknown / deactivated ─────────────► 401 AUTH_ERROR
//!               ├── admin without `mfa: true` ─────────► 401 AUTH_ERROR
//!               ▼
//!           extensions.insert(AuthUser) ──► handler
//! ```
//!
//! The stored role is what handlers see. A token minted before a role
//! change carries the old role in its claims, and that claim is ignored.

use axum::async_trait;
use axum::body::Body;
use axum::extract::{FromRequestParts, State};
use axum::http::request::Parts;
use axum::http::{header, Request};
use axum::middleware::Next;
use axum::response::Response;
use stockadoodle_core::{Permission, Role, User};
use tracing::{debug, warn};

use crate::auth::extract_bearer_token;
use crate::error::ApiError;
use crate::AppState;

/// The caller of an authenticated request.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user: User,
}

impl AuthUser {
    /// Caller's user id.
    pub fn id(&self) -> &str {
        &self.user.id
    }

    /// Caller's stored role.
    pub fn role(&self) -> Role {
        self.user.role
    }

    /// Whether the caller's role grants `permission`.
    pub fn can(&self, permission: Permission) -> bool {
        self.user.role.can(permission)
    }

    /// Fails with `FORBIDDEN` unless the caller's role grants `permission`.
    pub fn require(&self, permission: Permission) -> Result<(), ApiError> {
        if self.can(permission) {
            Ok(())
        } else {
            debug!(
                user_id = %self.user.id,
                role = %self.user.role,
                permission = %permission,
                "Permission denied"
            );
            Err(ApiError::forbidden(format!(
                "Role {} is not allowed to {}",
                self.user.role, permission
            )))
        }
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthUser>()
            .cloned()
            .ok_or_else(|| ApiError::auth("Authentication required"))
    }
}

/// Validates the bearer token and attaches the caller as [`AuthUser`].
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Result<Response, ApiError> {
    let token = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(extract_bearer_token)
        .ok_or_else(|| ApiError::auth("Missing bearer token"))?;

    let claims = state.jwt.validate_access_token(token)?;

    let user = state
        .db
        .users()
        .get_by_id(&claims.sub)
        .await?
        .ok_or_else(|| {
            warn!(user_id = %claims.sub, "Token for unknown or deactivated user");
            ApiError::auth("Account is not active")
        })?;

    if user.role == Role::Admin && !claims.mfa {
        warn!(user_id = %user.id, "Admin token without verified MFA rejected");
        return Err(ApiError::auth("Multi-factor authentication required"));
    }

    req.extensions_mut().insert(AuthUser { user });
    Ok(next.run(req).await)
}
