//! # MFA Challenge Repository
//!
//! Pending second-factor logins.
//!
//! ```text
//! login ok ──► create() ──► code delivered
//!                  │
//!                  ├── any attempt ──► claim_attempt()   (attempts + 1, capped)
//!                  ├── resend      ──► reissue()          (new code, attempts = 0)
//!                  └── right code  ──► consume()          (single use)
//! ```
//!
//! Only an argon2 hash of the code is stored.

use chrono::{DateTime, Duration, Utc};
use sqlx::SqlitePool;
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};

/// A second-factor challenge issued at login.
#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct MfaChallenge {
    pub id: String,
    pub user_id: String,
    pub code_hash: String,
    pub attempts: i64,
    pub expires_at: DateTime<Utc>,
    pub last_sent_at: DateTime<Utc>,
    pub consumed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl MfaChallenge {
    /// Not yet used and not yet expired.
    pub fn is_live(&self, now: DateTime<Utc>) -> bool {
        self.consumed_at.is_none() && self.expires_at > now
    }

    /// Seconds left before a new code may be sent.
    pub fn resend_wait(&self, now: DateTime<Utc>, cooldown: Duration) -> i64 {
        let ready_at = self.last_sent_at + cooldown;
        (ready_at - now).num_seconds().max(0)
    }
}

/// Repository for MFA challenges.
#[derive(Debug, Clone)]
pub struct MfaRepository {
    pool: SqlitePool,
}

impl MfaRepository {
    /// Creates a new MfaRepository.
    pub fn new(pool: SqlitePool) -> Self {
        MfaRepository { pool }
    }

    /// Stores a new challenge for `user_id`.
    pub async fn create(
        &self,
        user_id: &str,
        code_hash: &str,
        lifetime: Duration,
    ) -> DbResult<MfaChallenge> {
        let now = Utc::now();
        let challenge = MfaChallenge {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            code_hash: code_hash.to_string(),
            attempts: 0,
            expires_at: now + lifetime,
            last_sent_at: now,
            consumed_at: None,
            created_at: now,
        };

        debug!(id = %challenge.id, user_id = %user_id, "Creating MFA challenge");

        sqlx::query(
            r#"
            INSERT INTO mfa_challenges (
                id, user_id, code_hash, attempts, expires_at, last_sent_at, consumed_at, created_at
            ) VALUES (?1, ?2, ?3, 0, ?4, ?5, NULL, ?6)
            "#,
        )
        .bind(&challenge.id)
        .bind(&challenge.user_id)
        .bind(&challenge.code_hash)
        .bind(challenge.expires_at)
        .bind(challenge.last_sent_at)
        .bind(challenge.created_at)
        .execute(&self.pool)
        .await?;

        Ok(challenge)
    }

    /// Gets a challenge by ID, whatever its state.
    pub async fn get(&self, id: &str) -> DbResult<Option<MfaChallenge>> {
        let challenge = sqlx::query_as::<_, MfaChallenge>(
            r#"
            SELECT id, user_id, code_hash, attempts, expires_at, last_sent_at, consumed_at, created_at
            FROM mfa_challenges
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(challenge)
    }

    /// Counts one verification attempt against an unconsumed challenge.
    ///
    /// The check and the increment are one statement, so concurrent
    /// requests can never use more than `max_attempts` between them.
    /// Returns the new count, or `None` once the limit is reached.
    pub async fn claim_attempt(&self, id: &str, max_attempts: i64) -> DbResult<Option<i64>> {
        let attempts: Option<i64> = sqlx::query_scalar(
            r#"
            UPDATE mfa_challenges
            SET attempts = attempts + 1
            WHERE id = ?1 AND attempts < ?2 AND consumed_at IS NULL
            RETURNING attempts
            "#,
        )
        .bind(id)
        .bind(max_attempts)
        .fetch_optional(&self.pool)
        .await?;

        Ok(attempts)
    }

    /// Marks the challenge used. Returns false if it was already consumed.
    pub async fn consume(&self, id: &str) -> DbResult<bool> {
        let result = sqlx::query(
            "UPDATE mfa_challenges SET consumed_at = ?2 WHERE id = ?1 AND consumed_at IS NULL",
        )
        .bind(id)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    /// Replaces the code of a live challenge and restarts its lifetime and attempts.
    pub async fn reissue(
        &self,
        id: &str,
        code_hash: &str,
        lifetime: Duration,
    ) -> DbResult<MfaChallenge> {
        let now = Utc::now();
        let result = sqlx::query(
            r#"
            UPDATE mfa_challenges
            SET code_hash = ?2, attempts = 0, expires_at = ?3, last_sent_at = ?4
            WHERE id = ?1 AND consumed_at IS NULL
            "#,
        )
        .bind(id)
        .bind(code_hash)
        .bind(now + lifetime)
        .bind(now)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("MFA challenge", id));
        }

        self.get(id)
            .await?
            .ok_or_else(|| DbError::not_found("MFA challenge", id))
    }

    /// Deletes consumed challenges and those that expired before `now`.
    pub async fn purge_stale(&self, now: DateTime<Utc>) -> DbResult<u64> {
        let result = sqlx::query(
            "DELETE FROM mfa_challenges WHERE consumed_at IS NOT NULL OR expires_at < ?1",
        )
        .bind(now)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() > 0 {
            debug!(removed = result.rows_affected(), "Purged stale MFA challenges");
        }
        Ok(result.rows_affected())
    }
}
