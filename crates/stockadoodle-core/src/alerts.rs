//! # Stock Alerts
//!
//! Classifies products that need attention: running low, sold out, or
//! holding stock that has expired or is about to.
//!
//! ## Rules
//! ```text
//! ┌────────────────┬──────────────────────────────────────────┬──────────┐
//! │ Status         │ Condition                                │ Severity │
//! ├────────────────┼──────────────────────────────────────────┼──────────┤
//! │ OUT_OF_STOCK   │ qty == 0 and qty < reorder_threshold     │ CRITICAL │
//! │ LOW_STOCK      │ 0 < qty < reorder_threshold              │ WARNING  │
//! │ EXPIRED        │ expiration < today, qty > 0              │ CRITICAL │
//! │ EXPIRING_SOON  │ today ≤ expiration ≤ today + days_ahead, │ WARNING  │
//! │                │ qty > 0                                  │          │
//! └────────────────┴──────────────────────────────────────────┴──────────┘
//! ```
//!
//! A product can carry one stock status and one expiration status at the
//! same time. The alert is CRITICAL if any of its statuses is.

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::types::Product;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AlertStatus {
    OutOfStock,
    LowStock,
    Expired,
    ExpiringSoon,
}

impl AlertStatus {
    pub const fn severity(&self) -> Severity {
        match self {
            AlertStatus::OutOfStock | AlertStatus::Expired => Severity::Critical,
            AlertStatus::LowStock | AlertStatus::ExpiringSoon => Severity::Warning,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Severity {
    Warning,
    Critical,
}

/// One product that needs attention.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct StockAlert {
    pub product_id: String,
    pub product_name: String,
    pub category: String,
    pub quantity_on_hand: i64,
    pub reorder_threshold: i64,
    #[ts(as = "Option<String>")]
    pub expiration_date: Option<NaiveDate>,
    pub statuses: Vec<AlertStatus>,
    pub severity: Severity,
}

/// Returns the alert for `product`, or `None` if it needs no attention.
///
/// Deleted products never alert.
pub fn classify(product: &Product, today: NaiveDate, days_ahead: i64) -> Option<StockAlert> {
    if !product.is_active {
        return None;
    }

    let qty = product.quantity_on_hand;
    let mut statuses = Vec::with_capacity(2);

    if qty < product.reorder_threshold {
        if qty == 0 {
            statuses.push(AlertStatus::OutOfStock);
        } else {
            statuses.push(AlertStatus::LowStock);
        }
    }

    if let Some(expiration) = product.expiration_date {
        if qty > 0 {
            let cutoff = today + Duration::days(days_ahead);
            if expiration < today {
                statuses.push(AlertStatus::Expired);
            } else if expiration <= cutoff {
                statuses.push(AlertStatus::ExpiringSoon);
            }
        }
    }

    let severity = statuses.iter().map(AlertStatus::severity).max()?;

    Some(StockAlert {
        product_id: product.id.clone(),
        product_name: product.name.clone(),
        category: product.category.clone(),
        quantity_on_hand: qty,
        reorder_threshold: product.reorder_threshold,
        expiration_date: product.expiration_date,
        statuses,
        severity,
    })
}
