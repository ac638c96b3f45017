//! # Activity Log Repository
//!
//! Append-only log of managerial actions.
//!
//! Entries are written by the other repositories inside the same
//! transaction as the change they describe (see [`insert_with`]), so a
//! logged action always happened and a completed action is always logged.

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;
use uuid::Uuid;

use crate::error::DbResult;
use stockadoodle_core::reports::ActivityEntry;
use stockadoodle_core::{ActivityLog, DateRange, NewActivity};

/// Repository for reading the activity log.
#[derive(Debug, Clone)]
pub struct ActivityRepository {
    pool: SqlitePool,
}

impl ActivityRepository {
    /// Creates a new ActivityRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ActivityRepository { pool }
    }

    /// Entries by managers and admins within `range`, newest first.
    pub async fn entries_between(&self, range: &DateRange) -> DbResult<Vec<ActivityEntry>> {
        let entries = sqlx::query_as::<_, ActivityEntry>(
            r#"
            SELECT
                a.id AS log_id,
                a.action,
                a.description,
                a.product_id,
                p.name AS product_name,
                a.actor_id,
                u.full_name AS actor_name,
                u.role AS actor_role,
                a.created_at
            FROM activity_logs a
            JOIN users u ON u.id = a.actor_id
            LEFT JOIN products p ON p.id = a.product_id
            WHERE a.created_at >= ?1
              AND a.created_at < ?2
              AND u.role IN ('admin', 'manager')
            ORDER BY a.created_at DESC
            "#,
        )
        .bind(range.start_instant())
        .bind(range.end_instant_exclusive())
        .fetch_all(&self.pool)
        .await?;

        Ok(entries)
    }

    /// Counts all log entries (for diagnostics).
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM activity_logs")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}

/// Writes one entry on an open connection, usually a transaction.
pub(crate) async fn insert_with(
    conn: &mut SqliteConnection,
    entry: NewActivity,
) -> DbResult<ActivityLog> {
    let log = ActivityLog {
        id: Uuid::new_v4().to_string(),
        actor_id: entry.actor_id,
        action: entry.action,
        product_id: entry.product_id,
        description: entry.description,
        created_at: Utc::now(),
    };

    debug!(actor_id = %log.actor_id, action = %log.action, "Recording activity");

    sqlx::query(
        r#"
        INSERT INTO activity_logs (id, actor_id, action, product_id, description, created_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6)
        "#,
    )
    .bind(&log.id)
    .bind(&log.actor_id)
    .bind(log.action)
    .bind(&log.product_id)
    .bind(&log.description)
    .bind(log.created_at)
    .execute(conn)
    .await?;

    Ok(log)
}
