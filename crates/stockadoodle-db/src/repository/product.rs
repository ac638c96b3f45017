//! # Product Repository
//!
//! Database operations for products.
//!
//! ## Key Operations
//! - Listing with category filter and name search
//! - CRUD with soft delete
//! - Manual stock adjustment (restock / disposal)
//!
//! ## Stock Never Goes Negative
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Two requests dispose 4 units each, stock = 5                           │
//! │                                                                         │
//! │  Request A: UPDATE ... SET qty = qty - 4 WHERE qty - 4 >= 0  → 1 row   │
//! │  Request B: UPDATE ... SET qty = qty - 4 WHERE qty - 4 >= 0  → 0 rows  │
//! │                                                     │                   │
//! │                                                     ▼                   │
//! │                                       InsufficientStock (stock = 1)    │
//! │                                                                         │
//! │  The check and the write are one statement, so there is no window      │
//! │  between reading the stock and changing it.                            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Stock is also capped at `MAX_STOCK_QUANTITY`, checked in the same
//! statement.
//!
//! Every mutation takes an optional `actor_id`. When present, an activity
//! log entry is written in the same transaction.

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use crate::repository::{activity, category};
use stockadoodle_core::validation::validate_stock_delta;
use stockadoodle_core::{
    ActivityAction, CoreError, NewActivity, NewProduct, Product, ProductChanges, ValidationError,
    MAX_STOCK_QUANTITY,
};

pub(crate) const PRODUCT_COLUMNS: &str = r#"
    id, name, category, quantity_on_hand, reorder_threshold,
    expiration_date, price_cents, is_active, created_at, updated_at
"#;

/// Filters for [`ProductRepository::list`].
#[derive(Debug, Clone)]
pub struct ProductFilter {
    /// Exact category match (case-insensitive).
    pub category: Option<String>,
    /// Substring of the name or category (case-insensitive).
    pub search: Option<String>,
    pub limit: i64,
}

impl Default for ProductFilter {
    fn default() -> Self {
        ProductFilter {
            category: None,
            search: None,
            limit: 100,
        }
    }
}

/// Repository for product database operations.
#[derive(Debug, Clone)]
pub struct ProductRepository {
    pool: SqlitePool,
}

impl ProductRepository {
    /// Creates a new ProductRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ProductRepository { pool }
    }

    /// Lists active products ordered by name.
    pub async fn list(&self, filter: &ProductFilter) -> DbResult<Vec<Product>> {
        let sql = format!(
            r#"
            SELECT {PRODUCT_COLUMNS}
            FROM products
            WHERE is_active = 1
              AND (?1 IS NULL OR category = ?1 COLLATE NOCASE)
              AND (?2 IS NULL OR name LIKE '%' || ?2 || '%' OR category LIKE '%' || ?2 || '%')
            ORDER BY name COLLATE NOCASE, id
            LIMIT ?3
            "#
        );

        let products = sqlx::query_as::<_, Product>(&sql)
            .bind(filter.category.as_deref())
            .bind(filter.search.as_deref().filter(|s| !s.is_empty()))
            .bind(filter.limit)
            .fetch_all(&self.pool)
            .await?;

        debug!(count = products.len(), "Listed products");
        Ok(products)
    }

    /// Every active product, for the alert report.
    pub async fn list_all_active(&self) -> DbResult<Vec<Product>> {
        let sql = format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE is_active = 1 ORDER BY name COLLATE NOCASE"
        );
        let products = sqlx::query_as::<_, Product>(&sql)
            .fetch_all(&self.pool)
            .await?;
        Ok(products)
    }

    /// Gets an active product by ID. Deleted products are `None`.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Product>> {
        let sql = format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE id = ?1 AND is_active = 1");
        let product = sqlx::query_as::<_, Product>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(product)
    }

    /// Inserts a new product. The input must already be validated.
    ///
    /// The category is registered in the catalog if new, and stored with
    /// the catalog's spelling.
    pub async fn insert(&self, input: &NewProduct, actor_id: Option<&str>) -> DbResult<Product> {
        let now = Utc::now();
        let mut product = Product {
            id: Uuid::new_v4().to_string(),
            name: input.name.trim().to_string(),
            category: input.category.trim().to_string(),
            quantity_on_hand: input.quantity_on_hand,
            reorder_threshold: input.reorder_threshold,
            expiration_date: input.expiration_date,
            price_cents: input.price_cents,
            is_active: true,
            created_at: now,
            updated_at: now,
        };

        debug!(id = %product.id, name = %product.name, "Inserting product");

        let mut tx = self.pool.begin().await?;

        product.category = category::ensure_with(&mut tx, &product.category).await?;

        sqlx::query(
            r#"
            INSERT INTO products (
                id, name, category, quantity_on_hand, reorder_threshold,
                expiration_date, price_cents, is_active, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, 1, ?8, ?9)
            "#,
        )
        .bind(&product.id)
        .bind(&product.name)
        .bind(&product.category)
        .bind(product.quantity_on_hand)
        .bind(product.reorder_threshold)
        .bind(product.expiration_date)
        .bind(product.price_cents)
        .bind(product.created_at)
        .bind(product.updated_at)
        .execute(&mut *tx)
        .await?;

        if let Some(actor_id) = actor_id {
            let entry = NewActivity::new(
                actor_id,
                ActivityAction::ProductCreated,
                format!(
                    "Created product '{}' in {} with {} on hand",
                    product.name, product.category, product.quantity_on_hand
                ),
            )
            .for_product(&product.id);
            activity::insert_with(&mut tx, entry).await?;
        }

        tx.commit().await?;
        Ok(product)
    }

    /// Applies a partial update. The changes must already be validated.
    pub async fn update(
        &self,
        id: &str,
        changes: &ProductChanges,
        actor_id: Option<&str>,
    ) -> DbResult<Product> {
        debug!(id = %id, "Updating product");

        let mut tx = self.pool.begin().await?;

        // Touch the row first so the transaction holds the write lock before reading.
        let now = Utc::now();
        let touched = sqlx::query("UPDATE products SET updated_at = ?2 WHERE id = ?1 AND is_active = 1")
            .bind(id)
            .bind(now)
            .execute(&mut *tx)
            .await?;
        if touched.rows_affected() == 0 {
            return Err(DbError::not_found("Product", id));
        }

        let mut product = fetch_active(&mut tx, id)
            .await?
            .ok_or_else(|| DbError::not_found("Product", id))?;
        product.apply(changes);
        if changes.category.is_some() {
            product.category = category::ensure_with(&mut tx, &product.category).await?;
        }

        sqlx::query(
            r#"
            UPDATE products SET
                name = ?2,
                category = ?3,
                quantity_on_hand = ?4,
                reorder_threshold = ?5,
                expiration_date = ?6,
                price_cents = ?7
            WHERE id = ?1
            "#,
        )
        .bind(&product.id)
        .bind(&product.name)
        .bind(&product.category)
        .bind(product.quantity_on_hand)
        .bind(product.reorder_threshold)
        .bind(product.expiration_date)
        .bind(product.price_cents)
        .execute(&mut *tx)
        .await?;

        if let Some(actor_id) = actor_id {
            let entry = NewActivity::new(
                actor_id,
                ActivityAction::ProductUpdated,
                format!("Updated product '{}'", product.name),
            )
            .for_product(&product.id);
            activity::insert_with(&mut tx, entry).await?;
        }

        tx.commit().await?;
        Ok(product)
    }

    /// Changes stock by `delta` (positive restock, negative disposal).
    ///
    /// ## Errors
    /// - `Domain(Validation)` for a zero or oversized delta, or if the result
    ///   would exceed `MAX_STOCK_QUANTITY`
    /// - `NotFound` if the product is missing or deleted
    /// - `Domain(InsufficientStock)` if the result would be negative
    ///
    /// Stock is unchanged on every error.
    pub async fn adjust_stock(
        &self,
        id: &str,
        delta: i64,
        reason: Option<&str>,
        actor_id: Option<&str>,
    ) -> DbResult<Product> {
        debug!(id = %id, delta = %delta, "Adjusting stock");
        validate_stock_delta(delta).map_err(CoreError::from)?;

        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            r#"
            UPDATE products
            SET quantity_on_hand = quantity_on_hand + ?2,
                updated_at = ?3
            WHERE id = ?1
              AND is_active = 1
              AND quantity_on_hand + ?2 >= 0
              AND quantity_on_hand + ?2 <= ?4
            "#,
        )
        .bind(id)
        .bind(delta)
        .bind(Utc::now())
        .bind(MAX_STOCK_QUANTITY)
        .execute(&mut *tx)
        .await?;

        let product = fetch_active(&mut tx, id)
            .await?
            .ok_or_else(|| DbError::not_found("Product", id))?;

        if result.rows_affected() == 0 {
            if delta > 0 {
                return Err(CoreError::from(ValidationError::OutOfRange {
                    field: "quantity_on_hand".to_string(),
                    min: 0,
                    max: MAX_STOCK_QUANTITY,
                })
                .into());
            }
            return Err(CoreError::InsufficientStock {
                product: product.name,
                available: product.quantity_on_hand,
                requested: delta.saturating_neg(),
            }
            .into());
        }

        if let Some(actor_id) = actor_id {
            let verb = if delta > 0 { "Restocked" } else { "Disposed" };
            let mut description = format!(
                "{} {} unit(s) of '{}', now {} on hand",
                verb,
                delta.unsigned_abs(),
                product.name,
                product.quantity_on_hand
            );
            if let Some(reason) = reason.map(str::trim).filter(|r| !r.is_empty()) {
                description.push_str(": ");
                description.push_str(reason);
            }
            let entry = NewActivity::new(actor_id, ActivityAction::StockAdjusted, description)
                .for_product(&product.id);
            activity::insert_with(&mut tx, entry).await?;
        }

        tx.commit().await?;
        Ok(product)
    }

    /// Soft-deletes a product by setting is_active = false.
    ///
    /// Sales keep referencing the row; reads and reports stop seeing it.
    pub async fn soft_delete(&self, id: &str, actor_id: Option<&str>) -> DbResult<()> {
        debug!(id = %id, "Soft-deleting product");

        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            "UPDATE products SET is_active = 0, updated_at = ?2 WHERE id = ?1 AND is_active = 1",
        )
        .bind(id)
        .bind(Utc::now())
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", id));
        }

        if let Some(actor_id) = actor_id {
            let name: String = sqlx::query_scalar("SELECT name FROM products WHERE id = ?1")
                .bind(id)
                .fetch_one(&mut *tx)
                .await?;
            let entry = NewActivity::new(
                actor_id,
                ActivityAction::ProductDeleted,
                format!("Deleted product '{}'", name),
            )
            .for_product(id);
            activity::insert_with(&mut tx, entry).await?;
        }

        tx.commit().await?;
        Ok(())
    }

    /// Counts active products (for diagnostics and seeding).
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products WHERE is_active = 1")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}

/// Loads an active product on an open connection.
pub(crate) async fn fetch_active(conn: &mut SqliteConnection, id: &str) -> DbResult<Option<Product>> {
    let sql = format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE id = ?1 AND is_active = 1");
    let product = sqlx::query_as::<_, Product>(&sql)
        .bind(id)
        .fetch_optional(conn)
        .await?;
    Ok(product)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::test_support;
    use stockadoodle_core::{DateRange, Role};

    #[tokio::test]
    async fn test_insert_and_get() {
        let db = test_support::db().await;
        let product = test_support::product(&db, "Whole Milk", "Dairy", 12, 349).await;

        let loaded = db.products().get_by_id(&product.id).await.unwrap().unwrap();
        assert_eq!(loaded.name, "Whole Milk");
        assert_eq!(loaded.quantity_on_hand, 12);
        assert!(loaded.is_active);
    }

    #[tokio::test]
    async fn test_list_filters_and_order() {
        let db = test_support::db().await;
        test_support::product(&db, "Sourdough", "Bakery", 4, 500).await;
        test_support::product(&db, "Cheddar", "Dairy", 10, 650).await;
        test_support::product(&db, "Butter", "Dairy", 7, 420).await;

        let all = db.products().list(&ProductFilter::default()).await.unwrap();
        let names: Vec<&str> = all.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["Butter", "Cheddar", "Sourdough"]);

        let dairy = db
            .products()
            .list(&ProductFilter {
                category: Some("dairy".to_string()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(dairy.len(), 2);

        let search = db
            .products()
            .list(&ProductFilter {
                search: Some("dough".to_string()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(search.len(), 1);
        assert_eq!(search[0].name, "Sourdough");

        let limited = db
            .products()
            .list(&ProductFilter {
                limit: 1,
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(limited.len(), 1);
    }

    #[tokio::test]
    async fn test_update_partial() {
        let db = test_support::db().await;
        let product = test_support::product(&db, "Whole Milk", "Dairy", 12, 349).await;

        let changes = ProductChanges {
            price_cents: Some(399),
            ..Default::default()
        };
        let updated = db.products().update(&product.id, &changes, None).await.unwrap();
        assert_eq!(updated.price_cents, 399);
        assert_eq!(updated.name, "Whole Milk");

        let missing = db.products().update("nope", &changes, None).await;
        assert!(matches!(missing, Err(DbError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_soft_delete_hides_product() {
        let db = test_support::db().await;
        let product = test_support::product(&db, "Whole Milk", "Dairy", 12, 349).await;

        db.products().soft_delete(&product.id, None).await.unwrap();

        assert!(db.products().get_by_id(&product.id).await.unwrap().is_none());
        assert_eq!(db.products().count().await.unwrap(), 0);
        assert!(matches!(
            db.products().soft_delete(&product.id, None).await,
            Err(DbError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_adjust_stock_never_negative() {
        let db = test_support::db().await;
        let product = test_support::product(&db, "Eggs", "Dairy", 5, 300).await;

        let restocked = db
            .products()
            .adjust_stock(&product.id, 10, Some("delivery"), None)
            .await
            .unwrap();
        assert_eq!(restocked.quantity_on_hand, 15);

        let err = db
            .products()
            .adjust_stock(&product.id, -16, None, None)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            DbError::Domain(CoreError::InsufficientStock {
                available: 15,
                requested: 16,
                ..
            })
        ));

        let unchanged = db.products().get_by_id(&product.id).await.unwrap().unwrap();
        assert_eq!(unchanged.quantity_on_hand, 15);

        let emptied = db
            .products()
            .adjust_stock(&product.id, -15, Some("spoiled"), None)
            .await
            .unwrap();
        assert_eq!(emptied.quantity_on_hand, 0);
    }

    #[tokio::test]
    async fn test_adjust_stock_extreme_deltas() {
        let db = test_support::db().await;
        let product = test_support::product(&db, "Rice", "Pantry", 5, 300).await;

        for delta in [i64::MIN, i64::MAX, 0] {
            let err = db
                .products()
                .adjust_stock(&product.id, delta, None, None)
                .await
                .unwrap_err();
            assert!(matches!(err, DbError::Domain(CoreError::Validation(_))), "delta {}", delta);
        }

        let err = db
            .products()
            .adjust_stock(&product.id, -MAX_STOCK_QUANTITY, None, None)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            DbError::Domain(CoreError::InsufficientStock {
                requested: MAX_STOCK_QUANTITY,
                ..
            })
        ));

        let err = db
            .products()
            .adjust_stock(&product.id, MAX_STOCK_QUANTITY, None, None)
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Domain(CoreError::Validation(_))));

        let unchanged = db.products().get_by_id(&product.id).await.unwrap().unwrap();
        assert_eq!(unchanged.quantity_on_hand, 5);

        let full = db
            .products()
            .adjust_stock(&product.id, MAX_STOCK_QUANTITY - 5, None, None)
            .await
            .unwrap();
        assert_eq!(full.quantity_on_hand, MAX_STOCK_QUANTITY);
    }

    #[tokio::test]
    async fn test_mutations_are_logged_for_actor() {
        let db = test_support::db().await;
        let manager = test_support::user(&db, "manny", Role::Manager).await;

        let input = NewProduct {
            name: "Bagels".to_string(),
            category: "Bakery".to_string(),
            quantity_on_hand: 6,
            reorder_threshold: 2,
            expiration_date: None,
            price_cents: 250,
        };
        let product = db.products().insert(&input, Some(&manager.id)).await.unwrap();
        db.products()
            .adjust_stock(&product.id, -1, Some("dropped"), Some(&manager.id))
            .await
            .unwrap();
        db.products().soft_delete(&product.id, Some(&manager.id)).await.unwrap();

        let today = Utc::now().date_naive();
        let entries = db
            .activity()
            .entries_between(&DateRange::new(today, today).unwrap())
            .await
            .unwrap();
        let actions: Vec<ActivityAction> = entries.iter().map(|e| e.action).collect();
        assert_eq!(entries.len(), 3);
        assert!(actions.contains(&ActivityAction::ProductCreated));
        assert!(actions.contains(&ActivityAction::StockAdjusted));
        assert!(actions.contains(&ActivityAction::ProductDeleted));
        assert!(entries.iter().all(|e| e.product_name.as_deref() == Some("Bagels")));
    }
}
