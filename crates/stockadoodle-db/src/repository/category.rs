//! # Category Repository
//!
//! The category catalog. Products store the category name; this table adds
//! descriptions and keeps categories that currently have no products.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Product insert/update "dairy"                                          │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ensure_with: INSERT OR IGNORE INTO categories ("dairy")                │
//! │       │        (existing "Dairy" wins, names ignore case)               │
//! │       ▼                                                                 │
//! │  product.category = "Dairy"                                             │
//! │                                                                         │
//! │  Rename "Dairy" → "Dairy & Eggs"  → every product follows              │
//! │  Delete "Dairy" with active products → CategoryInUse                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use crate::repository::activity;
use stockadoodle_core::types::normalize_description;
use stockadoodle_core::{ActivityAction, Category, CategoryChanges, CoreError, NewActivity, NewCategory};

const CATEGORY_COLUMNS: &str = "id, name, description, created_at, updated_at";

/// Repository for the category catalog.
#[derive(Debug, Clone)]
pub struct CategoryRepository {
    pool: SqlitePool,
}

impl CategoryRepository {
    pub fn new(pool: SqlitePool) -> Self {
        CategoryRepository { pool }
    }

    /// Every category, ordered by name.
    pub async fn list(&self) -> DbResult<Vec<Category>> {
        let sql = format!("SELECT {CATEGORY_COLUMNS} FROM categories ORDER BY name COLLATE NOCASE");
        let categories = sqlx::query_as::<_, Category>(&sql)
            .fetch_all(&self.pool)
            .await?;
        debug!(count = categories.len(), "Listed categories");
        Ok(categories)
    }

    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Category>> {
        let sql = format!("SELECT {CATEGORY_COLUMNS} FROM categories WHERE id = ?1");
        let category = sqlx::query_as::<_, Category>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(category)
    }

    /// Creates a category. The input must already be validated.
    ///
    /// ## Errors
    /// - `UniqueViolation` if the name exists in any letter case
    pub async fn insert(&self, input: &NewCategory, actor_id: Option<&str>) -> DbResult<Category> {
        let now = Utc::now();
        let category = Category {
            id: Uuid::new_v4().to_string(),
            name: input.name.trim().to_string(),
            description: normalize_description(input.description.as_deref()),
            created_at: now,
            updated_at: now,
        };

        debug!(id = %category.id, name = %category.name, "Inserting category");

        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO categories (id, name, description, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
        )
        .bind(&category.id)
        .bind(&category.name)
        .bind(&category.description)
        .bind(category.created_at)
        .bind(category.updated_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| unique_name(e, &category.name))?;

        if let Some(actor_id) = actor_id {
            let entry = NewActivity::new(
                actor_id,
                ActivityAction::CategoryCreated,
                format!("Created category '{}'", category.name),
            );
            activity::insert_with(&mut tx, entry).await?;
        }

        tx.commit().await?;
        Ok(category)
    }

    /// Applies a partial update. A rename carries every product along.
    pub async fn update(
        &self,
        id: &str,
        changes: &CategoryChanges,
        actor_id: Option<&str>,
    ) -> DbResult<Category> {
        debug!(id = %id, "Updating category");

        let mut tx = self.pool.begin().await?;

        let now = Utc::now();
        let touched = sqlx::query("UPDATE categories SET updated_at = ?2 WHERE id = ?1")
            .bind(id)
            .bind(now)
            .execute(&mut *tx)
            .await?;
        if touched.rows_affected() == 0 {
            return Err(DbError::not_found("Category", id));
        }

        let mut category = fetch(&mut tx, id)
            .await?
            .ok_or_else(|| DbError::not_found("Category", id))?;
        let old_name = category.name.clone();
        category.apply(changes);

        sqlx::query("UPDATE categories SET name = ?2, description = ?3 WHERE id = ?1")
            .bind(&category.id)
            .bind(&category.name)
            .bind(&category.description)
            .execute(&mut *tx)
            .await
            .map_err(|e| unique_name(e, &category.name))?;

        let renamed = category.name != old_name;
        if renamed {
            let moved = sqlx::query(
                "UPDATE products SET category = ?1, updated_at = ?3 WHERE category = ?2 COLLATE NOCASE",
            )
            .bind(&category.name)
            .bind(&old_name)
            .bind(now)
            .execute(&mut *tx)
            .await?;
            debug!(from = %old_name, to = %category.name, products = moved.rows_affected(), "Renamed category");
        }

        if let Some(actor_id) = actor_id {
            let description = if renamed {
                format!("Renamed category '{}' to '{}'", old_name, category.name)
            } else {
                format!("Updated category '{}'", category.name)
            };
            let entry = NewActivity::new(actor_id, ActivityAction::CategoryUpdated, description);
            activity::insert_with(&mut tx, entry).await?;
        }

        tx.commit().await?;
        Ok(category)
    }

    /// Deletes a category that no active product uses.
    ///
    /// ## Errors
    /// - `NotFound` if the id is unknown
    /// - `Domain(CategoryInUse)` while active products carry the category
    pub async fn delete(&self, id: &str, actor_id: Option<&str>) -> DbResult<()> {
        debug!(id = %id, "Deleting category");

        let mut tx = self.pool.begin().await?;

        let category = fetch(&mut tx, id)
            .await?
            .ok_or_else(|| DbError::not_found("Category", id))?;

        let in_use: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM products WHERE is_active = 1 AND category = ?1 COLLATE NOCASE",
        )
        .bind(&category.name)
        .fetch_one(&mut *tx)
        .await?;
        if in_use > 0 {
            return Err(CoreError::CategoryInUse {
                category: category.name,
                products: in_use,
            }
            .into());
        }

        sqlx::query("DELETE FROM categories WHERE id = ?1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        if let Some(actor_id) = actor_id {
            let entry = NewActivity::new(
                actor_id,
                ActivityAction::CategoryDeleted,
                format!("Deleted category '{}'", category.name),
            );
            activity::insert_with(&mut tx, entry).await?;
        }

        tx.commit().await?;
        Ok(())
    }

    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM categories")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}

/// Registers `name` in the catalog if it is new and returns the catalog
/// spelling. Runs inside the caller's product transaction.
pub(crate) async fn ensure_with(conn: &mut SqliteConnection, name: &str) -> DbResult<String> {
    let now = Utc::now();
    sqlx::query(
        r#"
        INSERT OR IGNORE INTO categories (id, name, description, created_at, updated_at)
        VALUES (?1, ?2, NULL, ?3, ?3)
        "#,
    )
    .bind(Uuid::new_v4().to_string())
    .bind(name)
    .bind(now)
    .execute(&mut *conn)
    .await?;

    let canonical: String = sqlx::query_scalar("SELECT name FROM categories WHERE name = ?1")
        .bind(name)
        .fetch_one(&mut *conn)
        .await?;
    Ok(canonical)
}

async fn fetch(conn: &mut SqliteConnection, id: &str) -> DbResult<Option<Category>> {
    let sql = format!("SELECT {CATEGORY_COLUMNS} FROM categories WHERE id = ?1");
    let category = sqlx::query_as::<_, Category>(&sql)
        .bind(id)
        .fetch_optional(conn)
        .await?;
    Ok(category)
}

fn unique_name(err: sqlx::Error, name: &str) -> DbError {
    match DbError::from(err) {
        DbError::UniqueViolation { .. } => DbError::duplicate("category", name),
        other => other,
    }
}
