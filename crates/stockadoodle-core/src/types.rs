//! # Domain Types
//!
//! Core domain types used throughout StockaDoodle.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    Product      │   │      Sale       │   │      User       │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  id (UUID)      │◄──│  product_id     │   │  id (UUID)      │       │
//! │  │  category       │   │  retailer_id ───┼──►│  username       │       │
//! │  │  quantity ≥ 0   │   │  quantity       │   │  role           │       │
//! │  │  reorder_thresh │   │  unit_price     │   │  mfa_enabled    │       │
//! │  │  expiration     │   │  (snapshot)     │   └────────▲────────┘       │
//! │  └────────▲────────┘   └─────────────────┘            │                │
//! │           │            ┌─────────────────┐            │                │
//! │           └────────────│  ActivityLog    │────────────┘                │
//! │                        │  actor, action  │                             │
//! │                        └─────────────────┘                             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Records (`Product`, `Category`, `User`, `Sale`, `ActivityLog`) are what the data
//! store returns. Inputs (`NewProduct`, `ProductChanges`, ...) are what the
//! API accepts; they are validated in [`crate::validation`] before use.

use chrono::{DateTime, Days, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use ts_rs::TS;

use crate::error::ValidationError;
use crate::money::Money;
use crate::validation::validate_date;

// =============================================================================
// Role
// =============================================================================

/// The role a user account acts under.
///
/// Access rules live in [`crate::permissions`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Full control, including user management. Sessions require MFA.
    Admin,
    /// Manages products and stock, reads reports.
    Manager,
    /// Records sales at the point of sale.
    Retailer,
}

impl Role {
    /// All roles, in descending order of privilege.
    pub const ALL: [Role; 3] = [Role::Admin, Role::Manager, Role::Retailer];

    /// Lowercase name as stored and serialized.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Manager => "manager",
            Role::Retailer => "retailer",
        }
    }

    /// Manager and Admin actions are recorded in the activity log.
    pub const fn is_managerial(&self) -> bool {
        matches!(self, Role::Admin | Role::Manager)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for Role {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "admin" => Ok(Role::Admin),
            "manager" => Ok(Role::Manager),
            "retailer" => Ok(Role::Retailer),
            _ => Err(ValidationError::NotAllowed {
                field: "role".to_string(),
                allowed: Role::ALL.iter().map(|r| r.as_str().to_string()).collect(),
            }),
        }
    }
}

// =============================================================================
// Product
// =============================================================================

/// A stocked product.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Product {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Display name.
    pub name: String,

    /// Name of the category, as spelled in the category catalog.
    pub category: String,

    /// Units currently on hand. Never negative.
    pub quantity_on_hand: i64,

    /// Stock level below which a low-stock alert is raised.
    pub reorder_threshold: i64,

    /// Date after which the stock on hand is considered expired.
    #[ts(as = "Option<String>")]
    pub expiration_date: Option<NaiveDate>,

    /// Unit price in cents.
    pub price_cents: i64,

    /// False once the product has been deleted (soft delete).
    pub is_active: bool,

    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,

    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// Returns the unit price as Money.
    #[inline]
    pub fn price(&self) -> Money {
        Money::from_cents(self.price_cents)
    }

    /// Whether `quantity` units can be taken from stock.
    pub fn can_fulfil(&self, quantity: i64) -> bool {
        quantity > 0 && self.quantity_on_hand >= quantity
    }

    /// Applies validated changes in place.
    pub fn apply(&mut self, changes: &ProductChanges) {
        if let Some(name) = &changes.name {
            self.name = name.trim().to_string();
        }
        if let Some(category) = &changes.category {
            self.category = category.trim().to_string();
        }
        if let Some(qty) = changes.quantity_on_hand {
            self.quantity_on_hand = qty;
        }
        if let Some(threshold) = changes.reorder_threshold {
            self.reorder_threshold = threshold;
        }
        if changes.clear_expiration {
            self.expiration_date = None;
        } else if let Some(date) = changes.expiration_date {
            self.expiration_date = Some(date);
        }
        if let Some(price) = changes.price_cents {
            self.price_cents = price;
        }
    }
}

/// Input for creating a product.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct NewProduct {
    pub name: String,
    pub category: String,
    #[serde(default)]
    pub quantity_on_hand: i64,
    #[serde(default)]
    pub reorder_threshold: i64,
    #[serde(default)]
    #[ts(as = "Option<String>")]
    pub expiration_date: Option<NaiveDate>,
    pub price_cents: i64,
}

/// Partial update for a product. Absent fields are left unchanged.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ProductChanges {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub quantity_on_hand: Option<i64>,
    #[serde(default)]
    pub reorder_threshold: Option<i64>,
    #[serde(default)]
    #[ts(as = "Option<String>")]
    pub expiration_date: Option<NaiveDate>,
    /// Removes the expiration date; wins over `expiration_date`.
    #[serde(default)]
    pub clear_expiration: bool,
    #[serde(default)]
    pub price_cents: Option<i64>,
}

impl ProductChanges {
    /// True when the request would change nothing.
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.category.is_none()
            && self.quantity_on_hand.is_none()
            && self.reorder_threshold.is_none()
            && self.expiration_date.is_none()
            && !self.clear_expiration
            && self.price_cents.is_none()
    }
}

/// Manual stock maintenance: restock (positive) or disposal (negative).
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct StockAdjustment {
    pub delta: i64,
    #[serde(default)]
    pub reason: Option<String>,
}

// =============================================================================
// Category
// =============================================================================

/// A product category.
///
/// Products refer to their category by name. Writing a product with a
/// category that is not in the catalog yet registers it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Category {
    pub id: String,
    /// Unique, case-insensitive.
    pub name: String,
    pub description: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a category.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct NewCategory {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

/// Partial update for a category. An empty description clears it.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CategoryChanges {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

impl CategoryChanges {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.description.is_none()
    }
}

impl Category {
    /// Applies validated changes in place.
    pub fn apply(&mut self, changes: &CategoryChanges) {
        if let Some(name) = &changes.name {
            self.name = name.trim().to_string();
        }
        if let Some(description) = &changes.description {
            self.description = normalize_description(Some(description));
        }
    }
}

/// Trims a description; blank becomes `None`.
pub fn normalize_description(description: Option<&str>) -> Option<String> {
    description
        .map(str::trim)
        .filter(|d| !d.is_empty())
        .map(str::to_string)
}

// =============================================================================
// User
// =============================================================================

/// A user account. Credentials never leave the data store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct User {
    pub id: String,
    pub username: String,
    pub full_name: String,
    pub email: Option<String>,
    pub role: Role,
    /// Opt-in second factor for non-admin accounts.
    pub mfa_enabled: bool,
    /// False once the account has been deleted (deactivated).
    pub is_active: bool,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Admin sessions always need a second factor; others only when enabled.
    pub fn requires_mfa(&self) -> bool {
        self.role == Role::Admin || self.mfa_enabled
    }
}

/// Input for creating a user.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct NewUser {
    pub username: String,
    pub password: String,
    pub full_name: String,
    #[serde(default)]
    pub email: Option<String>,
    pub role: Role,
    #[serde(default)]
    pub mfa_enabled: bool,
}

impl NewUser {
    /// Same rule as [`User::requires_mfa`], before the user exists.
    pub fn requires_mfa(&self) -> bool {
        self.role == Role::Admin || self.mfa_enabled
    }
}

/// Partial update for a user. Absent fields are left unchanged.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct UserChanges {
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub role: Option<Role>,
    #[serde(default)]
    pub mfa_enabled: Option<bool>,
    #[serde(default)]
    pub password: Option<String>,
}

// =============================================================================
// Sale
// =============================================================================

/// A recorded sale. Immutable once written.
///
/// The unit price is a snapshot so later price edits do not rewrite history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Sale {
    pub id: String,
    pub product_id: String,
    pub retailer_id: String,
    pub quantity: i64,
    pub unit_price_cents: i64,
    pub total_cents: i64,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl Sale {
    /// Returns the sale total as Money.
    #[inline]
    pub fn total(&self) -> Money {
        Money::from_cents(self.total_cents)
    }
}

/// Input for recording a sale at the POS.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct NewSale {
    pub product_id: String,
    pub quantity: i64,
    /// Retailer credited with the sale. Defaults to the caller.
    #[serde(default)]
    pub retailer_id: Option<String>,
}

// =============================================================================
// Activity Log
// =============================================================================

/// Kind of managerial action recorded in the activity log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum ActivityAction {
    ProductCreated,
    ProductUpdated,
    ProductDeleted,
    StockAdjusted,
    SaleRecorded,
    UserCreated,
    UserUpdated,
    UserDeleted,
    CategoryCreated,
    CategoryUpdated,
    CategoryDeleted,
}

impl ActivityAction {
    pub const fn as_str(&self) -> &'static str {
        match self {
            ActivityAction::ProductCreated => "product_created",
            ActivityAction::ProductUpdated => "product_updated",
            ActivityAction::ProductDeleted => "product_deleted",
            ActivityAction::StockAdjusted => "stock_adjusted",
            ActivityAction::SaleRecorded => "sale_recorded",
            ActivityAction::UserCreated => "user_created",
            ActivityAction::UserUpdated => "user_updated",
            ActivityAction::UserDeleted => "user_deleted",
            ActivityAction::CategoryCreated => "category_created",
            ActivityAction::CategoryUpdated => "category_updated",
            ActivityAction::CategoryDeleted => "category_deleted",
        }
    }
}

impl fmt::Display for ActivityAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One entry of the managerial activity log. Read-only once written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct ActivityLog {
    pub id: String,
    pub actor_id: String,
    pub action: ActivityAction,
    pub product_id: Option<String>,
    pub description: String,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

/// An activity entry before it is persisted.
#[derive(Debug, Clone)]
pub struct NewActivity {
    pub actor_id: String,
    pub action: ActivityAction,
    pub product_id: Option<String>,
    pub description: String,
}

impl NewActivity {
    pub fn new(actor_id: impl Into<String>, action: ActivityAction, description: impl Into<String>) -> Self {
        NewActivity {
            actor_id: actor_id.into(),
            action,
            product_id: None,
            description: description.into(),
        }
    }

    /// Attaches the product the action concerned.
    pub fn for_product(mut self, product_id: impl Into<String>) -> Self {
        self.product_id = Some(product_id.into());
        self
    }
}

// =============================================================================
// Date Range
// =============================================================================

/// Inclusive range of calendar days used by time-filtered reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct DateRange {
    #[ts(as = "String")]
    pub start: NaiveDate,
    #[ts(as = "String")]
    pub end: NaiveDate,
}

impl DateRange {
    /// Builds a range, rejecting `start > end` and dates outside the supported years.
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, ValidationError> {
        validate_date("start_date", start)?;
        validate_date("end_date", end)?;
        if start > end {
            return Err(ValidationError::Rule(format!(
                "start_date {} is after end_date {}",
                start, end
            )));
        }
        Ok(DateRange { start, end })
    }

    /// The `days` days ending on (and including) `today`.
    pub fn last_days(today: NaiveDate, days: i64) -> Self {
        let span = Days::new((days - 1).max(0) as u64);
        let start = today.checked_sub_days(span).unwrap_or(NaiveDate::MIN);
        DateRange { start, end: today }
    }

    /// Resolves optional request bounds against a default window ending today.
    pub fn resolve(
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
        today: NaiveDate,
        default_days: i64,
    ) -> Result<Self, ValidationError> {
        let end = end.unwrap_or(today);
        validate_date("end_date", end)?;
        let start = match start {
            Some(start) => start,
            None => end
                .checked_sub_days(Days::new((default_days - 1).max(0) as u64))
                .ok_or_else(|| ValidationError::invalid_format("end_date", "date out of range"))?,
        };
        DateRange::new(start, end)
    }

    /// First instant of the range (UTC midnight of `start`).
    pub fn start_instant(&self) -> DateTime<Utc> {
        self.start.and_hms_opt(0, 0, 0).unwrap_or_default().and_utc()
    }

    /// First instant after the range (UTC midnight following `end`).
    ///
    /// Saturates at the last representable instant for `NaiveDate::MAX`.
    pub fn end_instant_exclusive(&self) -> DateTime<Utc> {
        match self.end.succ_opt() {
            Some(next) => next.and_hms_opt(0, 0, 0).unwrap_or_default().and_utc(),
            None => DateTime::<Utc>::MAX_UTC,
        }
    }

    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        instant >= self.start_instant() && instant < self.end_instant_exclusive()
    }
}
