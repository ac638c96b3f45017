//! # Sale Repository
//!
//! Recording and reading sales.
//!
//! ## Recording a Sale
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    record() - one transaction                           │
//! │                                                                         │
//! │  1. UPDATE products SET qty = qty - q                                  │
//! │       WHERE id = ? AND is_active = 1 AND qty >= q                      │
//! │       │                                                                 │
//! │       ├── 0 rows, product missing  → NotFound                          │
//! │       ├── 0 rows, product present  → InsufficientStock (rollback)      │
//! │       ▼                                                                 │
//! │  2. SELECT price  → snapshot unit price, total = price × q             │
//! │       ▼                                                                 │
//! │  3. INSERT INTO sales                                                  │
//! │       ▼                                                                 │
//! │  4. INSERT INTO activity_logs  (only when an actor is given)           │
//! │       ▼                                                                 │
//! │  5. COMMIT                                                             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The stock write comes first so the transaction takes SQLite's write lock
//! before it reads anything.

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use crate::repository::{activity, product};
use stockadoodle_core::{ActivityAction, CoreError, Money, NewActivity, Sale};

const SALE_COLUMNS: &str = r#"
    id, product_id, retailer_id, quantity, unit_price_cents, total_cents, created_at
"#;

/// Filters for [`SaleRepository::list`].
#[derive(Debug, Clone, Default)]
pub struct SaleFilter {
    /// Inclusive lower bound on `created_at`.
    pub from: Option<DateTime<Utc>>,
    /// Exclusive upper bound on `created_at`.
    pub until: Option<DateTime<Utc>>,
    pub retailer_id: Option<String>,
}

/// Repository for sale database operations.
#[derive(Debug, Clone)]
pub struct SaleRepository {
    pool: SqlitePool,
}

impl SaleRepository {
    /// Creates a new SaleRepository.
    pub fn new(pool: SqlitePool) -> Self {
        SaleRepository { pool }
    }

    /// Records a sale of `quantity` units and decrements stock.
    ///
    /// The quantity must already be validated (1 to 999) and the retailer
    /// must be an existing user. With `actor_id` set, a `sale_recorded`
    /// activity entry is written in the same transaction.
    ///
    /// ## Errors
    /// - `NotFound` if the product is missing or deleted
    /// - `Domain(InsufficientStock)` if `quantity` exceeds stock; nothing is written
    /// - `Domain(Overflow)` if the total does not fit in i64 cents
    pub async fn record(
        &self,
        product_id: &str,
        retailer_id: &str,
        quantity: i64,
        actor_id: Option<&str>,
    ) -> DbResult<Sale> {
        debug!(product_id = %product_id, retailer_id = %retailer_id, quantity, "Recording sale");

        let mut tx = self.pool.begin().await?;
        let now = Utc::now();

        let decremented = sqlx::query(
            r#"
            UPDATE products
            SET quantity_on_hand = quantity_on_hand - ?2,
                updated_at = ?3
            WHERE id = ?1
              AND is_active = 1
              AND quantity_on_hand >= ?2
            "#,
        )
        .bind(product_id)
        .bind(quantity)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        let product = product::fetch_active(&mut tx, product_id)
            .await?
            .ok_or_else(|| DbError::not_found("Product", product_id))?;

        if decremented.rows_affected() == 0 {
            return Err(CoreError::InsufficientStock {
                product: product.name,
                available: product.quantity_on_hand,
                requested: quantity,
            }
            .into());
        }

        let total = product
            .price()
            .checked_multiply_quantity(quantity)
            .ok_or_else(|| CoreError::Overflow("sale total".to_string()))?;

        let sale = Sale {
            id: Uuid::new_v4().to_string(),
            product_id: product.id.clone(),
            retailer_id: retailer_id.to_string(),
            quantity,
            unit_price_cents: product.price_cents,
            total_cents: total.cents(),
            created_at: now,
        };

        sqlx::query(
            r#"
            INSERT INTO sales (
                id, product_id, retailer_id, quantity,
                unit_price_cents, total_cents, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
        )
        .bind(&sale.id)
        .bind(&sale.product_id)
        .bind(&sale.retailer_id)
        .bind(sale.quantity)
        .bind(sale.unit_price_cents)
        .bind(sale.total_cents)
        .bind(sale.created_at)
        .execute(&mut *tx)
        .await?;

        if let Some(actor_id) = actor_id {
            let entry = NewActivity::new(
                actor_id,
                ActivityAction::SaleRecorded,
                format!(
                    "Recorded sale of {} x '{}' for {}",
                    quantity,
                    product.name,
                    Money::from_cents(sale.total_cents)
                ),
            )
            .for_product(&product.id);
            activity::insert_with(&mut tx, entry).await?;
        }

        tx.commit().await?;

        debug!(id = %sale.id, total_cents = sale.total_cents, "Sale recorded");
        Ok(sale)
    }

    /// Gets a sale by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Sale>> {
        let sql = format!("SELECT {SALE_COLUMNS} FROM sales WHERE id = ?1");
        let sale = sqlx::query_as::<_, Sale>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(sale)
    }

    /// Lists sales matching `filter`, newest first.
    pub async fn list(&self, filter: &SaleFilter) -> DbResult<Vec<Sale>> {
        let sql = format!(
            r#"
            SELECT {SALE_COLUMNS}
            FROM sales
            WHERE (?1 IS NULL OR created_at >= ?1)
              AND (?2 IS NULL OR created_at < ?2)
              AND (?3 IS NULL OR retailer_id = ?3)
            ORDER BY created_at DESC, id
            "#
        );
        let sales = sqlx::query_as::<_, Sale>(&sql)
            .bind(filter.from)
            .bind(filter.until)
            .bind(filter.retailer_id.as_deref())
            .fetch_all(&self.pool)
            .await?;
        Ok(sales)
    }
}
