//! # Report Repository
//!
//! Read-only queries feeding the management reports.
//!
//! Every query here joins `products` and keeps `is_active = 1`, so a
//! deleted product drops out of all aggregations at once. Totals, shares
//! and streaks are computed by `stockadoodle_core::reports`.

use chrono::NaiveDate;
use sqlx::SqlitePool;
use std::collections::HashMap;

use crate::error::DbResult;
use stockadoodle_core::reports::{CategoryStock, RetailerSalesInput, SaleLine};
use stockadoodle_core::{DateRange, Role, User};

/// Optional filters shared by the sales and transactions reports.
#[derive(Debug, Clone, Default)]
pub struct SalesQuery {
    pub category: Option<String>,
    pub retailer_id: Option<String>,
}

/// Repository for report queries.
#[derive(Debug, Clone)]
pub struct ReportRepository {
    pool: SqlitePool,
}

impl ReportRepository {
    /// Creates a new ReportRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ReportRepository { pool }
    }

    /// Sales within `range` joined with product and retailer, newest first.
    pub async fn sale_lines(&self, range: &DateRange, query: &SalesQuery) -> DbResult<Vec<SaleLine>> {
        let lines = sqlx::query_as::<_, SaleLine>(
            r#"
            SELECT
                s.id AS sale_id,
                s.created_at,
                s.product_id,
                p.name AS product_name,
                p.category,
                s.unit_price_cents,
                s.quantity,
                s.total_cents,
                s.retailer_id,
                u.full_name AS retailer_name
            FROM sales s
            JOIN products p ON p.id = s.product_id
            JOIN users u ON u.id = s.retailer_id
            WHERE p.is_active = 1
              AND s.created_at >= ?1
              AND s.created_at < ?2
              AND (?3 IS NULL OR p.category = ?3 COLLATE NOCASE)
              AND (?4 IS NULL OR s.retailer_id = ?4)
            ORDER BY s.created_at DESC, s.id
            "#,
        )
        .bind(range.start_instant())
        .bind(range.end_instant_exclusive())
        .bind(query.category.as_deref())
        .bind(query.retailer_id.as_deref())
        .fetch_all(&self.pool)
        .await?;

        Ok(lines)
    }

    /// Active product count and stock on hand for every catalog category.
    ///
    /// Categories without active products are listed with zeros.
    pub async fn category_stock(&self) -> DbResult<Vec<CategoryStock>> {
        let rows = sqlx::query_as::<_, CategoryStock>(
            r#"
            SELECT
                c.name AS category,
                COUNT(p.id) AS product_count,
                COALESCE(SUM(p.quantity_on_hand), 0) AS total_stock
            FROM categories c
            LEFT JOIN products p
                ON p.category = c.name AND p.is_active = 1
            GROUP BY c.id
            ORDER BY c.name
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    /// Sales history of every active retailer.
    ///
    /// `today` decides which sales count as "today".
    pub async fn retailer_sales(&self, today: NaiveDate) -> DbResult<Vec<RetailerSalesInput>> {
        let retailers: Vec<User> = sqlx::query_as::<_, User>(
            r#"
            SELECT id, username, full_name, email, role, mfa_enabled, is_active, created_at, updated_at
            FROM users
            WHERE role = ?1 AND is_active = 1
            ORDER BY username COLLATE NOCASE
            "#,
        )
        .bind(Role::Retailer)
        .fetch_all(&self.pool)
        .await?;

        let day = DateRange::last_days(today, 1);
        let totals: Vec<(String, i64, i64, i64)> = sqlx::query_as(
            r#"
            SELECT
                s.retailer_id,
                COALESCE(SUM(s.total_cents), 0),
                COUNT(*),
                COALESCE(SUM(CASE WHEN s.created_at >= ?1 AND s.created_at < ?2
                                  THEN s.total_cents ELSE 0 END), 0)
            FROM sales s
            JOIN products p ON p.id = s.product_id
            WHERE p.is_active = 1
            GROUP BY s.retailer_id
            "#,
        )
        .bind(day.start_instant())
        .bind(day.end_instant_exclusive())
        .fetch_all(&self.pool)
        .await?;

        let days: Vec<(String, String)> = sqlx::query_as(
            r#"
            SELECT DISTINCT s.retailer_id, substr(s.created_at, 1, 10)
            FROM sales s
            JOIN products p ON p.id = s.product_id
            WHERE p.is_active = 1
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        let mut totals_by_retailer: HashMap<String, (i64, i64, i64)> = totals
            .into_iter()
            .map(|(id, total, count, today_total)| (id, (total, count, today_total)))
            .collect();

        let mut days_by_retailer: HashMap<String, Vec<NaiveDate>> = HashMap::new();
        for (retailer_id, day) in days {
            if let Ok(date) = NaiveDate::parse_from_str(&day, "%Y-%m-%d") {
                days_by_retailer.entry(retailer_id).or_default().push(date);
            }
        }

        let inputs = retailers
            .into_iter()
            .map(|r| {
                let (total, count, today_total) =
                    totals_by_retailer.remove(&r.id).unwrap_or((0, 0, 0));
                RetailerSalesInput {
                    sale_days: days_by_retailer.remove(&r.id).unwrap_or_default(),
                    retailer_id: r.id,
                    username: r.username,
                    full_name: r.full_name,
                    sales_today_cents: today_total,
                    total_sales_cents: total,
                    total_transactions: count,
                }
            })
            .collect();

        Ok(inputs)
    }
}
