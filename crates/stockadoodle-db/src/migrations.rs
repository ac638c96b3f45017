//! # Schema Migrations
//!
//! The SQL files under `migrations/sqlite/` are compiled into the binary
//! and applied when [`crate::Database::new`] opens the store.
//!
//! ```text
//! ┌──────────────────────────┬──────────────────────────────────────────────┐
//! │ File                     │ Adds                                         │
//! ├──────────────────────────┼──────────────────────────────────────────────┤
//! │ 001_initial_schema.sql   │ users, products, sales, activity_logs,       │
//! │                          │ mfa_challenges                               │
//! │ 002_add_categories.sql   │ categories catalog, backfilled from products │
//! └──────────────────────────┴──────────────────────────────────────────────┘
//! ```
//!
//! sqlx records each applied file with its checksum, so an edited file is
//! refused at startup. Schema changes go in a new, higher-numbered file.

use sqlx::SqlitePool;
use tracing::info;

use crate::error::DbResult;

static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("../../migrations/sqlite");

/// Applies whatever files the store has not seen yet, oldest first.
pub async fn run_migrations(pool: &SqlitePool) -> DbResult<()> {
    info!(known = MIGRATOR.migrations.len(), "Applying schema migrations");
    MIGRATOR.run(pool).await?;
    Ok(())
}

/// `(embedded, applied)` counts, for the startup log and diagnostics.
///
/// A store that has never been migrated reports zero applied.
pub async fn migration_status(pool: &SqlitePool) -> DbResult<(usize, usize)> {
    let applied = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM _sqlx_migrations WHERE success = 1")
        .fetch_one(pool)
        .await
        .map_or(0, |n| n as usize);

    Ok((MIGRATOR.migrations.len(), applied))
}

#[cfg(test)]
mod tests {
    use crate::{Database, DbConfig};

    #[tokio::test]
    async fn test_category_backfill_merges_spellings() {
        let db = Database::new(DbConfig::in_memory().run_migrations(false))
            .await
            .unwrap();
        let pool = db.pool();

        sqlx::raw_sql(include_str!("../../../migrations/sqlite/001_initial_schema.sql"))
            .execute(pool)
            .await
            .unwrap();
        for (id, category) in [("p1", "Dairy"), ("p2", "dairy"), ("p3", "Snacks")] {
            sqlx::query(
                r#"
                INSERT INTO products (id, name, category, quantity_on_hand, price_cents, created_at, updated_at)
                VALUES (?1, ?1, ?2, 1, 100, '2026-10-19T00:00:00Z', '2026-10-19T00:00:00Z')
                "#,
            )
            .bind(id)
            .bind(category)
            .execute(pool)
            .await
            .unwrap();
        }

        sqlx::raw_sql(include_str!("../../../migrations/sqlite/002_add_categories.sql"))
            .execute(pool)
            .await
            .unwrap();

        let names: Vec<String> = sqlx::query_scalar("SELECT name FROM categories ORDER BY name")
            .fetch_all(pool)
            .await
            .unwrap();
        assert_eq!(names, vec!["Dairy", "Snacks"]);

        let spellings: Vec<String> =
            sqlx::query_scalar("SELECT DISTINCT category FROM products ORDER BY category")
                .fetch_all(pool)
                .await
                .unwrap();
        assert_eq!(spellings, vec!["Dairy", "Snacks"]);

        let ids: Vec<String> = sqlx::query_scalar("SELECT id FROM categories")
            .fetch_all(pool)
            .await
            .unwrap();
        assert!(ids.iter().all(|id| uuid::Uuid::parse_str(id).is_ok()));
    }
}
