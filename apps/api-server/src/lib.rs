//! # StockaDoodle API
//!
//! JSON-over-HTTP server for inventory, sales, users and reports.
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                           API Services                                  │
//! │                                                                         │
//! │  ┌────────────────┐  ┌────────────────┐  ┌────────────────────────────┐│
//! │  │  auth_service  │  │ product_service│  │  sale_service              ││
//! │  │  (public)      │  │                │  │                            ││
//! │  │ • login        │  │ • list / get   │  │ • record sale              ││
//! │  │ • login/mfa    │  │ • create / put │  │ • list / get               ││
//! │  │ • mfa/resend   │  │ • delete/stock │  │                            ││
//! │  └────────────────┘  └────────────────┘  └────────────────────────────┘│
//! │                                                                         │
//! │  ┌───────────────┐ ┌───────────────┐ ┌───────────────┐ ┌───────────────┐│
//! │  │ user_service  │ │ category_svc  │ │ report_service│ │ health_service││
//! │  │               │ │               │ │               │ │ (public)      ││
//! │  │ • CRUD, me    │ │ • CRUD        │ │ • 7 reports   │ │ • db + schema ││
//! │  └───────────────┘ └───────────────┘ └───────────────┘ └───────────────┘│
//! │                                                                         │
//! │  ┌──────────────────────────────────────────────────────────────────┐  │
//! │  │                      Infrastructure                               │  │
//! │  │                                                                   │  │
//! │  │  ┌──────────────┐  ┌──────────────┐  ┌──────────────────────────┐│  │
//! │  │  │  SQLite      │  │ auth layer   │  │    JWT + argon2          ││  │
//! │  │  │ (stockadoodle│  │ (middleware) │  │                          ││  │
//! │  │  │   -db)       │  │              │  │ Tokens, MFA codes        ││  │
//! │  │  └──────────────┘  └──────────────┘  └──────────────────────────┘│  │
//! │  └──────────────────────────────────────────────────────────────────┘  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration
//! Environment variables (see [`config::ApiConfig`]):
//! - `BIND_ADDR`, `HTTP_PORT` - listener (default: 127.0.0.1:5000)
//! - `DATABASE_PATH` - SQLite file (default: ./stockadoodle.db)
//! - `JWT_SECRET` - Secret for JWT signing
//! - `JWT_ACCESS_LIFETIME_SECS` - Access token lifetime (default: 3600)
//! - `MFA_*`, `DAILY_QUOTA_CENTS`, `ALERT_DAYS_AHEAD`, `BOOTSTRAP_ADMIN_*`

pub mod auth;
pub mod bootstrap;
pub mod config;
pub mod error;
pub mod extract;
pub mod middleware;
pub mod services;

use std::sync::Arc;

use axum::Router;
use stockadoodle_db::Database;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::auth::{JwtManager, MfaDelivery};

// Re-exports
pub use config::ApiConfig;
pub use error::{ApiError, ApiResult, ErrorCode};

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub config: Arc<ApiConfig>,
    pub jwt: Arc<JwtManager>,
    pub mfa_delivery: Arc<dyn MfaDelivery>,
}

impl AppState {
    /// Builds the state, deriving the JWT manager from `config`.
    pub fn new(db: Database, config: ApiConfig, mfa_delivery: Arc<dyn MfaDelivery>) -> Self {
        let jwt = JwtManager::new(config.jwt_secret.clone(), config.jwt_access_lifetime_secs);
        AppState {
            db,
            config: Arc::new(config),
            jwt: Arc::new(jwt),
            mfa_delivery,
        }
    }
}

/// Builds the full `/api/v1` router.
pub fn build_router(state: AppState) -> Router {
    let public = Router::new()
        .merge(services::health_service::routes())
        .merge(services::auth_service::routes());

    let protected = Router::new()
        .merge(services::product_service::routes())
        .merge(services::category_service::routes())
        .merge(services::user_service::routes())
        .merge(services::sale_service::routes())
        .merge(services::report_service::routes())
        .route_layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::auth_middleware,
        ));

    Router::new()
        .nest("/api/v1", public.merge(protected))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
