//! API server configuration module.
//!
//! Configuration is loaded from environment variables with fallback to defaults.

use serde::{Deserialize, Serialize};
use std::env;
use std::str::FromStr;

use stockadoodle_core::validation::MAX_ALERT_DAYS_AHEAD;

/// Secret used when `JWT_SECRET` is not set. Never use it in production.
pub const DEV_JWT_SECRET: &str = "stockadoodle-dev-secret-change-in-production";

/// Credentials for the first admin, created when the user table is empty.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BootstrapAdmin {
    pub username: String,
    pub password: String,
    pub email: String,
}

/// API server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Interface to listen on
    pub bind_addr: String,

    /// HTTP server port
    pub http_port: u16,

    /// SQLite database file
    pub database_path: String,

    /// Upper bound of the connection pool
    pub db_max_connections: u32,

    /// JWT secret key for signing tokens
    pub jwt_secret: String,

    /// JWT access token lifetime in seconds
    pub jwt_access_lifetime_secs: i64,

    /// How long an MFA code stays valid
    pub mfa_code_lifetime_secs: i64,

    /// Wrong codes allowed before a challenge is dead
    pub mfa_max_attempts: i64,

    /// Minimum gap between two codes for the same challenge
    pub mfa_resend_cooldown_secs: i64,

    /// Daily sales target per retailer, in cents
    pub daily_quota_cents: i64,

    /// Default look-ahead for expiration alerts
    pub alert_days_ahead: i64,

    /// First admin account (optional)
    pub bootstrap_admin: Option<BootstrapAdmin>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        ApiConfig {
            bind_addr: "127.0.0.1".to_string(),
            http_port: 5000,
            database_path: "./stockadoodle.db".to_string(),
            db_max_connections: 5,
            jwt_secret: DEV_JWT_SECRET.to_string(),
            jwt_access_lifetime_secs: 3600,
            mfa_code_lifetime_secs: 300,
            mfa_max_attempts: 5,
            mfa_resend_cooldown_secs: 60,
            daily_quota_cents: 100_000,
            alert_days_ahead: 7,
            bootstrap_admin: None,
        }
    }
}

impl ApiConfig {
    /// Load configuration from environment variables.
    pub fn load() -> Result<Self, ConfigError> {
        let defaults = ApiConfig::default();

        let config = ApiConfig {
            bind_addr: env::var("BIND_ADDR").unwrap_or(defaults.bind_addr),
            http_port: parse_var("HTTP_PORT", defaults.http_port)?,
            database_path: env::var("DATABASE_PATH").unwrap_or(defaults.database_path),
            db_max_connections: parse_var("DB_MAX_CONNECTIONS", defaults.db_max_connections)?,
            jwt_secret: env::var("JWT_SECRET").unwrap_or(defaults.jwt_secret),
            jwt_access_lifetime_secs: parse_var(
                "JWT_ACCESS_LIFETIME_SECS",
                defaults.jwt_access_lifetime_secs,
            )?,
            mfa_code_lifetime_secs: parse_var(
                "MFA_CODE_LIFETIME_SECS",
                defaults.mfa_code_lifetime_secs,
            )?,
            mfa_max_attempts: parse_var("MFA_MAX_ATTEMPTS", defaults.mfa_max_attempts)?,
            mfa_resend_cooldown_secs: parse_var(
                "MFA_RESEND_COOLDOWN_SECS",
                defaults.mfa_resend_cooldown_secs,
            )?,
            daily_quota_cents: parse_var("DAILY_QUOTA_CENTS", defaults.daily_quota_cents)?,
            alert_days_ahead: parse_var("ALERT_DAYS_AHEAD", defaults.alert_days_ahead)?,
            bootstrap_admin: load_bootstrap_admin()?,
        };

        config.validate()?;
        Ok(config)
    }

    /// Checks ranges that a successful parse does not guarantee.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.db_max_connections == 0 {
            return Err(ConfigError::InvalidValue("DB_MAX_CONNECTIONS".to_string()));
        }
        if self.jwt_secret.is_empty() {
            return Err(ConfigError::InvalidValue("JWT_SECRET".to_string()));
        }
        if self.jwt_access_lifetime_secs <= 0 {
            return Err(ConfigError::InvalidValue("JWT_ACCESS_LIFETIME_SECS".to_string()));
        }
        if self.mfa_code_lifetime_secs <= 0 {
            return Err(ConfigError::InvalidValue("MFA_CODE_LIFETIME_SECS".to_string()));
        }
        if self.mfa_max_attempts <= 0 {
            return Err(ConfigError::InvalidValue("MFA_MAX_ATTEMPTS".to_string()));
        }
        if self.mfa_resend_cooldown_secs < 0 {
            return Err(ConfigError::InvalidValue("MFA_RESEND_COOLDOWN_SECS".to_string()));
        }
        if self.daily_quota_cents < 0 {
            return Err(ConfigError::InvalidValue("DAILY_QUOTA_CENTS".to_string()));
        }
        if !(0..=MAX_ALERT_DAYS_AHEAD).contains(&self.alert_days_ahead) {
            return Err(ConfigError::InvalidValue("ALERT_DAYS_AHEAD".to_string()));
        }
        Ok(())
    }

    /// Whether the signing secret is still the development default.
    pub fn uses_dev_secret(&self) -> bool {
        self.jwt_secret == DEV_JWT_SECRET
    }

    /// `host:port` string for the listener.
    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.bind_addr, self.http_port)
    }
}

fn parse_var<T: FromStr>(key: &str, default: T) -> Result<T, ConfigError> {
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidValue(key.to_string())),
        Err(_) => Ok(default),
    }
}

/// Username and password come as a pair; e-mail is required because admins always use MFA.
fn load_bootstrap_admin() -> Result<Option<BootstrapAdmin>, ConfigError> {
    let username = env::var("BOOTSTRAP_ADMIN_USERNAME").ok();
    let password = env::var("BOOTSTRAP_ADMIN_PASSWORD").ok();

    match (username, password) {
        (None, None) => Ok(None),
        (Some(username), Some(password)) => {
            let email = env::var("BOOTSTRAP_ADMIN_EMAIL")
                .map_err(|_| ConfigError::MissingRequired("BOOTSTRAP_ADMIN_EMAIL".to_string()))?;
            Ok(Some(BootstrapAdmin {
                username,
                password,
                email,
            }))
        }
        (Some(_), None) => Err(ConfigError::MissingRequired(
            "BOOTSTRAP_ADMIN_PASSWORD".to_string(),
        )),
        (None, Some(_)) => Err(ConfigError::MissingRequired(
            "BOOTSTRAP_ADMIN_USERNAME".to_string(),
        )),
    }
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {0}")]
    InvalidValue(String),

    #[error("Missing required configuration: {0}")]
    MissingRequired(String),
}
