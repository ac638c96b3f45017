//! # User Repository
//!
//! Accounts, roles and stored credentials.
//!
//! The password hash is stored next to the account but is only ever read
//! through [`UserCredentials`]; the [`User`] record has no field for it, so
//! it cannot end up in a response by accident.

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use crate::repository::activity;
use stockadoodle_core::{ActivityAction, NewActivity, NewUser, Role, User, UserChanges};

const USER_COLUMNS: &str = r#"
    id, username, full_name, email, role, mfa_enabled, is_active, created_at, updated_at
"#;

/// An active account together with its password hash, used only at login.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct UserCredentials {
    #[sqlx(flatten)]
    pub user: User,
    pub password_hash: String,
}

/// Repository for user database operations.
#[derive(Debug, Clone)]
pub struct UserRepository {
    pool: SqlitePool,
}

impl UserRepository {
    /// Creates a new UserRepository.
    pub fn new(pool: SqlitePool) -> Self {
        UserRepository { pool }
    }

    /// Creates an account. Input must be validated and the password already hashed.
    ///
    /// ## Errors
    /// - `UniqueViolation` if the username is taken (case-insensitive),
    ///   including by a deactivated account
    pub async fn create(
        &self,
        input: &NewUser,
        password_hash: &str,
        actor_id: Option<&str>,
    ) -> DbResult<User> {
        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4().to_string(),
            username: input.username.trim().to_string(),
            full_name: input.full_name.trim().to_string(),
            email: normalize_email(input.email.as_deref()),
            role: input.role,
            mfa_enabled: input.mfa_enabled,
            is_active: true,
            created_at: now,
            updated_at: now,
        };

        debug!(id = %user.id, username = %user.username, role = %user.role, "Creating user");

        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO users (
                id, username, full_name, email, password_hash,
                role, mfa_enabled, is_active, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, 1, ?8, ?9)
            "#,
        )
        .bind(&user.id)
        .bind(&user.username)
        .bind(&user.full_name)
        .bind(&user.email)
        .bind(password_hash)
        .bind(user.role)
        .bind(user.mfa_enabled)
        .bind(user.created_at)
        .bind(user.updated_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| match DbError::from(e) {
            DbError::UniqueViolation { .. } => DbError::duplicate("username", &user.username),
            other => other,
        })?;

        if let Some(actor_id) = actor_id {
            let entry = NewActivity::new(
                actor_id,
                ActivityAction::UserCreated,
                format!("Created {} account '{}'", user.role, user.username),
            );
            activity::insert_with(&mut tx, entry).await?;
        }

        tx.commit().await?;
        Ok(user)
    }

    /// Gets an active user by ID. Deactivated users are `None`.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1 AND is_active = 1");
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    /// Looks up an active account and its password hash by username (case-insensitive).
    pub async fn find_credentials(&self, username: &str) -> DbResult<Option<UserCredentials>> {
        let sql = format!(
            "SELECT {USER_COLUMNS}, password_hash FROM users WHERE username = ?1 AND is_active = 1"
        );
        let credentials = sqlx::query_as::<_, UserCredentials>(&sql)
            .bind(username.trim())
            .fetch_optional(&self.pool)
            .await?;
        Ok(credentials)
    }

    /// Password hash of an active user.
    pub async fn password_hash(&self, id: &str) -> DbResult<Option<String>> {
        let hash: Option<String> =
            sqlx::query_scalar("SELECT password_hash FROM users WHERE id = ?1 AND is_active = 1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(hash)
    }

    /// Active users ordered by username.
    pub async fn list_active(&self) -> DbResult<Vec<User>> {
        let sql = format!(
            "SELECT {USER_COLUMNS} FROM users WHERE is_active = 1 ORDER BY username COLLATE NOCASE"
        );
        let users = sqlx::query_as::<_, User>(&sql).fetch_all(&self.pool).await?;
        Ok(users)
    }

    /// Every account, including deactivated ones, ordered by full name.
    pub async fn list_all(&self) -> DbResult<Vec<User>> {
        let sql = format!(
            "SELECT {USER_COLUMNS} FROM users ORDER BY full_name COLLATE NOCASE, username"
        );
        let users = sqlx::query_as::<_, User>(&sql).fetch_all(&self.pool).await?;
        Ok(users)
    }

    /// Active users holding `role`.
    pub async fn list_by_role(&self, role: Role) -> DbResult<Vec<User>> {
        let sql = format!(
            "SELECT {USER_COLUMNS} FROM users WHERE role = ?1 AND is_active = 1 ORDER BY username COLLATE NOCASE"
        );
        let users = sqlx::query_as::<_, User>(&sql)
            .bind(role)
            .fetch_all(&self.pool)
            .await?;
        Ok(users)
    }

    /// Applies a partial update. Changes must be validated and any new password hashed.
    ///
    /// An empty `email` clears the address.
    pub async fn update(
        &self,
        id: &str,
        changes: &UserChanges,
        new_password_hash: Option<&str>,
        actor_id: Option<&str>,
    ) -> DbResult<User> {
        debug!(id = %id, "Updating user");

        let mut tx = self.pool.begin().await?;
        let now = Utc::now();

        let touched = sqlx::query("UPDATE users SET updated_at = ?2 WHERE id = ?1 AND is_active = 1")
            .bind(id)
            .bind(now)
            .execute(&mut *tx)
            .await?;
        if touched.rows_affected() == 0 {
            return Err(DbError::not_found("User", id));
        }

        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1");
        let mut user = sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .fetch_one(&mut *tx)
            .await?;

        if let Some(full_name) = &changes.full_name {
            user.full_name = full_name.trim().to_string();
        }
        if let Some(email) = &changes.email {
            user.email = normalize_email(Some(email));
        }
        if let Some(role) = changes.role {
            user.role = role;
        }
        if let Some(mfa_enabled) = changes.mfa_enabled {
            user.mfa_enabled = mfa_enabled;
        }

        sqlx::query(
            r#"
            UPDATE users SET
                full_name = ?2,
                email = ?3,
                role = ?4,
                mfa_enabled = ?5,
                password_hash = COALESCE(?6, password_hash)
            WHERE id = ?1
            "#,
        )
        .bind(&user.id)
        .bind(&user.full_name)
        .bind(&user.email)
        .bind(user.role)
        .bind(user.mfa_enabled)
        .bind(new_password_hash)
        .execute(&mut *tx)
        .await?;

        if let Some(actor_id) = actor_id {
            let mut fields = Vec::new();
            if changes.full_name.is_some() {
                fields.push("full_name");
            }
            if changes.email.is_some() {
                fields.push("email");
            }
            if changes.role.is_some() {
                fields.push("role");
            }
            if changes.mfa_enabled.is_some() {
                fields.push("mfa_enabled");
            }
            if new_password_hash.is_some() {
                fields.push("password");
            }
            let entry = NewActivity::new(
                actor_id,
                ActivityAction::UserUpdated,
                format!("Updated account '{}' ({})", user.username, fields.join(", ")),
            );
            activity::insert_with(&mut tx, entry).await?;
        }

        tx.commit().await?;
        user.updated_at = now;
        Ok(user)
    }

    /// Replaces the password hash of an active user.
    pub async fn set_password(&self, id: &str, password_hash: &str) -> DbResult<()> {
        let result = sqlx::query(
            "UPDATE users SET password_hash = ?2, updated_at = ?3 WHERE id = ?1 AND is_active = 1",
        )
        .bind(id)
        .bind(password_hash)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("User", id));
        }
        Ok(())
    }

    /// Deactivates an account (soft delete). It can no longer log in.
    pub async fn deactivate(&self, id: &str, actor_id: Option<&str>) -> DbResult<()> {
        debug!(id = %id, "Deactivating user");

        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            "UPDATE users SET is_active = 0, updated_at = ?2 WHERE id = ?1 AND is_active = 1",
        )
        .bind(id)
        .bind(Utc::now())
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("User", id));
        }

        if let Some(actor_id) = actor_id {
            let username: String = sqlx::query_scalar("SELECT username FROM users WHERE id = ?1")
                .bind(id)
                .fetch_one(&mut *tx)
                .await?;
            let entry = NewActivity::new(
                actor_id,
                ActivityAction::UserDeleted,
                format!("Deactivated account '{}'", username),
            );
            activity::insert_with(&mut tx, entry).await?;
        }

        tx.commit().await?;
        Ok(())
    }

    /// Counts all accounts, active or not.
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}

fn normalize_email(email: Option<&str>) -> Option<String> {
    email
        .map(str::trim)
        .filter(|e| !e.is_empty())
        .map(str::to_string)
}
