//! # Reports
//!
//! Shapes and aggregation for the seven management reports.
//!
//! The data layer fetches flat rows; everything that is computed from those
//! rows (totals, shares, streaks, alert classification) happens here so it
//! can be tested without a database.
//!
//! ```text
//! ┌──────────────────────────────┬──────────────────────────┬─────────────┐
//! │ Report                       │ Built from               │ Permission  │
//! ├──────────────────────────────┼──────────────────────────┼─────────────┤
//! │ 1 Sales performance          │ SaleLine rows            │ ViewReports │
//! │ 2 Category distribution      │ CategoryStock rows       │ ViewReports │
//! │ 3 Retailer performance       │ RetailerSalesInput       │ ViewReports │
//! │ 4 Low-stock & expiration     │ active Products          │ ViewReports │
//! │ 5 Managerial activity        │ ActivityEntry rows       │ ViewReports │
//! │ 6 Detailed transactions      │ SaleLine rows            │ ViewReports │
//! │ 7 User accounts              │ every User               │ ManageUsers │
//! └──────────────────────────────┴──────────────────────────┴─────────────┘
//! ```

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use ts_rs::TS;

use crate::alerts::{classify, Severity, StockAlert};
use crate::error::{CoreError, CoreResult};
use crate::metrics::{percentage, sales_streak};
use crate::money::Money;
use crate::types::{ActivityAction, DateRange, Product, Role, User};

// =============================================================================
// Rows
// =============================================================================

/// One sale joined with its product and retailer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct SaleLine {
    pub sale_id: String,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    pub product_id: String,
    pub product_name: String,
    pub category: String,
    pub unit_price_cents: i64,
    pub quantity: i64,
    pub total_cents: i64,
    pub retailer_id: String,
    pub retailer_name: String,
}

/// Stock held by one category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct CategoryStock {
    pub category: String,
    pub product_count: i64,
    pub total_stock: i64,
}

/// One activity log entry joined with actor and product names.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct ActivityEntry {
    pub log_id: String,
    pub action: ActivityAction,
    pub description: String,
    pub product_id: Option<String>,
    pub product_name: Option<String>,
    pub actor_id: String,
    pub actor_name: String,
    pub actor_role: Role,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

/// Sales history of one retailer, as fetched for the performance report.
#[derive(Debug, Clone)]
pub struct RetailerSalesInput {
    pub retailer_id: String,
    pub username: String,
    pub full_name: String,
    pub sales_today_cents: i64,
    pub total_sales_cents: i64,
    pub total_transactions: i64,
    /// Distinct UTC days on which the retailer sold something.
    pub sale_days: Vec<NaiveDate>,
}

/// Sums `values`, failing with [`CoreError::Overflow`] instead of wrapping.
fn checked_total(what: &str, values: impl IntoIterator<Item = i64>) -> CoreResult<i64> {
    values
        .into_iter()
        .try_fold(0i64, |acc, v| acc.checked_add(v))
        .ok_or_else(|| CoreError::Overflow(what.to_string()))
}

// =============================================================================
// 1 + 6: Sales
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct SalesSummary {
    pub total_income_cents: i64,
    pub total_quantity: i64,
    pub transaction_count: i64,
}

impl SalesSummary {
    pub fn from_lines(lines: &[SaleLine]) -> CoreResult<Self> {
        let income = lines
            .iter()
            .try_fold(Money::zero(), |acc, l| acc.checked_add(Money::from_cents(l.total_cents)))
            .ok_or_else(|| CoreError::Overflow("total income".to_string()))?;
        Ok(SalesSummary {
            total_income_cents: income.cents(),
            total_quantity: checked_total("total quantity", lines.iter().map(|l| l.quantity))?,
            transaction_count: lines.len() as i64,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ProductSales {
    pub product_id: String,
    pub product_name: String,
    pub quantity: i64,
    pub revenue_cents: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct SalesReport {
    pub range: DateRange,
    pub sales: Vec<SaleLine>,
    /// Per-product totals, highest revenue first.
    pub by_product: Vec<ProductSales>,
    pub summary: SalesSummary,
}

impl SalesReport {
    pub fn build(range: DateRange, sales: Vec<SaleLine>) -> CoreResult<Self> {
        let mut totals: BTreeMap<&str, ProductSales> = BTreeMap::new();
        for line in &sales {
            let entry = totals
                .entry(line.product_id.as_str())
                .or_insert_with(|| ProductSales {
                    product_id: line.product_id.clone(),
                    product_name: line.product_name.clone(),
                    quantity: 0,
                    revenue_cents: 0,
                });
            entry.quantity = entry
                .quantity
                .checked_add(line.quantity)
                .ok_or_else(|| CoreError::Overflow("product quantity".to_string()))?;
            entry.revenue_cents = entry
                .revenue_cents
                .checked_add(line.total_cents)
                .ok_or_else(|| CoreError::Overflow("product revenue".to_string()))?;
        }
        let mut by_product: Vec<ProductSales> = totals.into_values().collect();
        by_product.sort_by(|a, b| {
            b.revenue_cents
                .cmp(&a.revenue_cents)
                .then_with(|| a.product_name.cmp(&b.product_name))
        });

        let summary = SalesSummary::from_lines(&sales)?;
        Ok(SalesReport {
            range,
            sales,
            by_product,
            summary,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct TransactionReport {
    pub range: DateRange,
    /// Newest first.
    pub transactions: Vec<SaleLine>,
    pub summary: SalesSummary,
}

impl TransactionReport {
    pub fn build(range: DateRange, mut transactions: Vec<SaleLine>) -> CoreResult<Self> {
        transactions.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        let summary = SalesSummary::from_lines(&transactions)?;
        Ok(TransactionReport {
            range,
            transactions,
            summary,
        })
    }
}

// =============================================================================
// 2: Category distribution
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CategoryShare {
    pub category: String,
    pub product_count: i64,
    pub total_stock: i64,
    /// Share of all stock on hand, in percent with two decimals.
    pub percentage_share: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CategoryReport {
    pub categories: Vec<CategoryShare>,
    pub total_categories: i64,
    pub total_stock: i64,
}

impl CategoryReport {
    /// Every category is listed, including those with no active products.
    pub fn build(rows: Vec<CategoryStock>) -> CoreResult<Self> {
        let total_stock = checked_total("total stock", rows.iter().map(|r| r.total_stock))?;
        let mut categories: Vec<CategoryShare> = rows
            .into_iter()
            .map(|r| CategoryShare {
                percentage_share: percentage(r.total_stock, total_stock),
                category: r.category,
                product_count: r.product_count,
                total_stock: r.total_stock,
            })
            .collect();
        categories.sort_by(|a, b| a.category.cmp(&b.category));

        Ok(CategoryReport {
            total_categories: categories.len() as i64,
            categories,
            total_stock,
        })
    }
}

// =============================================================================
// 3: Retailer performance
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct RetailerPerformance {
    pub retailer_id: String,
    pub username: String,
    pub full_name: String,
    pub sales_today_cents: i64,
    pub daily_quota_cents: i64,
    pub quota_progress: f64,
    pub streak: u32,
    pub total_sales_cents: i64,
    pub total_transactions: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct RetailerReport {
    pub retailers: Vec<RetailerPerformance>,
    pub total_retailers: i64,
    /// Retailers with at least one sale today.
    pub active_today: i64,
}

impl RetailerReport {
    /// Sorted by streak, then total sales, both descending.
    pub fn build(inputs: Vec<RetailerSalesInput>, daily_quota_cents: i64, today: NaiveDate) -> Self {
        let mut retailers: Vec<RetailerPerformance> = inputs
            .into_iter()
            .map(|r| RetailerPerformance {
                quota_progress: percentage(r.sales_today_cents, daily_quota_cents),
                streak: sales_streak(r.sale_days, today),
                retailer_id: r.retailer_id,
                username: r.username,
                full_name: r.full_name,
                sales_today_cents: r.sales_today_cents,
                daily_quota_cents,
                total_sales_cents: r.total_sales_cents,
                total_transactions: r.total_transactions,
            })
            .collect();
        retailers.sort_by(|a, b| {
            b.streak
                .cmp(&a.streak)
                .then_with(|| b.total_sales_cents.cmp(&a.total_sales_cents))
                .then_with(|| a.username.cmp(&b.username))
        });

        RetailerReport {
            total_retailers: retailers.len() as i64,
            active_today: retailers.iter().filter(|r| r.sales_today_cents > 0).count() as i64,
            retailers,
        }
    }
}

// =============================================================================
// 4: Alerts
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct AlertReport {
    pub days_ahead: i64,
    /// Critical alerts first, then by product name.
    pub alerts: Vec<StockAlert>,
    pub total_alerts: i64,
    pub critical_alerts: i64,
    pub warning_alerts: i64,
}

impl AlertReport {
    pub fn build(products: &[Product], today: NaiveDate, days_ahead: i64) -> Self {
        let mut alerts: Vec<StockAlert> = products
            .iter()
            .filter_map(|p| classify(p, today, days_ahead))
            .collect();
        alerts.sort_by(|a, b| {
            b.severity
                .cmp(&a.severity)
                .then_with(|| a.product_name.cmp(&b.product_name))
        });

        let critical = alerts
            .iter()
            .filter(|a| a.severity == Severity::Critical)
            .count() as i64;
        AlertReport {
            days_ahead,
            total_alerts: alerts.len() as i64,
            critical_alerts: critical,
            warning_alerts: alerts.len() as i64 - critical,
            alerts,
        }
    }
}

// =============================================================================
// 5: Managerial activity
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ActivityReport {
    pub range: DateRange,
    pub entries: Vec<ActivityEntry>,
    pub total_actions: i64,
    pub unique_managers: i64,
}

impl ActivityReport {
    /// Keeps entries by managerial actors only.
    pub fn build(range: DateRange, entries: Vec<ActivityEntry>) -> Self {
        let entries: Vec<ActivityEntry> = entries
            .into_iter()
            .filter(|e| e.actor_role.is_managerial())
            .collect();
        let managers: HashSet<&str> = entries.iter().map(|e| e.actor_id.as_str()).collect();
        ActivityReport {
            range,
            total_actions: entries.len() as i64,
            unique_managers: managers.len() as i64,
            entries,
        }
    }
}

// =============================================================================
// 7: User accounts
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct UserAccountsReport {
    pub users: Vec<User>,
    pub total_users: i64,
    pub active_users: i64,
    pub admins: i64,
    pub managers: i64,
    pub retailers: i64,
}

impl UserAccountsReport {
    pub fn build(users: Vec<User>) -> Self {
        let count_role = |role: Role| users.iter().filter(|u| u.role == role).count() as i64;
        UserAccountsReport {
            total_users: users.len() as i64,
            active_users: users.iter().filter(|u| u.is_active).count() as i64,
            admins: count_role(Role::Admin),
            managers: count_role(Role::Manager),
            retailers: count_role(Role::Retailer),
            users,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, d).unwrap()
    }

    fn line(id: &str, product: &str, qty: i64, total: i64, hour: u32) -> SaleLine {
        SaleLine {
            sale_id: id.to_string(),
            created_at: Utc.with_ymd_and_hms(2026, 10, 19, hour, 0, 0).unwrap(),
            product_id: format!("id-{}", product),
            product_name: product.to_string(),
            category: "Snacks".to_string(),
            unit_price_cents: total / qty,
            quantity: qty,
            total_cents: total,
            retailer_id: "r-1".to_string(),
            retailer_name: "Rita Retailer".to_string(),
        }
    }

    fn range() -> DateRange {
        DateRange::new(day(1), day(19)).unwrap()
    }

    #[test]
    fn test_sales_report_totals() {
        let report = SalesReport::build(
            range(),
            vec![
                line("s1", "Chips", 2, 300, 9),
                line("s2", "Soda", 1, 500, 10),
                line("s3", "Chips", 3, 450, 11),
            ],
        )
        .unwrap();
        assert_eq!(report.summary.total_income_cents, 1250);
        assert_eq!(report.summary.total_quantity, 6);
        assert_eq!(report.summary.transaction_count, 3);
        assert_eq!(report.by_product[0].product_name, "Chips");
        assert_eq!(report.by_product[0].quantity, 5);
        assert_eq!(report.by_product[0].revenue_cents, 750);
    }

    #[test]
    fn test_transactions_newest_first() {
        let report = TransactionReport::build(
            range(),
            vec![line("early", "Chips", 1, 150, 8), line("late", "Chips", 1, 150, 17)],
        )
        .unwrap();
        assert_eq!(report.transactions[0].sale_id, "late");
    }

    #[test]
    fn test_category_shares() {
        let report = CategoryReport::build(vec![
            CategoryStock {
                category: "Dairy".to_string(),
                product_count: 2,
                total_stock: 25,
            },
            CategoryStock {
                category: "Bakery".to_string(),
                product_count: 1,
                total_stock: 75,
            },
        ])
        .unwrap();
        assert_eq!(report.total_stock, 100);
        assert_eq!(report.categories[0].category, "Bakery");
        assert_eq!(report.categories[0].percentage_share, 75.0);
        assert_eq!(report.categories[1].percentage_share, 25.0);
    }

    #[test]
    fn test_category_shares_with_no_stock() {
        let report = CategoryReport::build(vec![CategoryStock {
            category: "Dairy".to_string(),
            product_count: 3,
            total_stock: 0,
        }])
        .unwrap();
        assert_eq!(report.categories[0].percentage_share, 0.0);
    }

    #[test]
    fn test_overflowing_totals_are_errors() {
        let huge = line("s1", "Gold", 1, i64::MAX, 9);
        let err = SalesReport::build(range(), vec![huge.clone(), huge.clone()]).unwrap_err();
        assert!(matches!(err, CoreError::Overflow(_)));
        assert!(TransactionReport::build(range(), vec![huge.clone(), huge]).is_err());

        let stock = |name: &str| CategoryStock {
            category: name.to_string(),
            product_count: 1,
            total_stock: i64::MAX,
        };
        let err = CategoryReport::build(vec![stock("A"), stock("B")]).unwrap_err();
        assert!(matches!(err, CoreError::Overflow(_)));
    }

    #[test]
    fn test_retailer_ordering() {
        let input = |id: &str, total: i64, days: Vec<NaiveDate>| RetailerSalesInput {
            retailer_id: id.to_string(),
            username: id.to_string(),
            full_name: id.to_string(),
            sales_today_cents: if days.contains(&day(19)) { 5000 } else { 0 },
            total_sales_cents: total,
            total_transactions: days.len() as i64,
            sale_days: days,
        };
        let report = RetailerReport::build(
            vec![
                input("ana", 90_000, vec![day(19)]),
                input("ben", 10_000, vec![day(17), day(18), day(19)]),
                input("cy", 20_000, vec![day(19)]),
            ],
            10_000,
            day(19),
        );
        let order: Vec<&str> = report.retailers.iter().map(|r| r.username.as_str()).collect();
        assert_eq!(order, vec!["ben", "ana", "cy"]);
        assert_eq!(report.retailers[0].streak, 3);
        assert_eq!(report.retailers[0].quota_progress, 50.0);
        assert_eq!(report.active_today, 3);
    }
}
