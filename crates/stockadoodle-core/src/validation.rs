//! # Validation Module
//!
//! Input validation utilities for StockaDoodle.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: HTTP handler (axum)                                          │
//! │  └── Type validation (JSON / query deserialization)                    │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: THIS MODULE                                                  │
//! │  └── Business rule validation (lengths, ranges, formats)               │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Database (SQLite)                                            │
//! │  ├── NOT NULL / CHECK constraints                                      │
//! │  ├── UNIQUE constraints (username)                                     │
//! │  └── Foreign key constraints                                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use stockadoodle_core::validation::{validate_username, validate_sale_quantity};
//!
//! validate_username("maria.santos").unwrap();
//! validate_sale_quantity(5).unwrap();
//! assert!(validate_sale_quantity(1000).is_err());
//! ```

use chrono::{Datelike, NaiveDate};

use crate::error::ValidationError;
use crate::types::{
    CategoryChanges, NewCategory, NewProduct, NewUser, ProductChanges, Role, UserChanges,
};
use crate::{MAX_PRICE_CENTS, MAX_SALE_QUANTITY, MAX_STOCK_QUANTITY};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Upper bound for `days_ahead` on the alerts report.
pub const MAX_ALERT_DAYS_AHEAD: i64 = 365;

/// Upper bound for list `limit` parameters.
pub const MAX_LIST_LIMIT: i64 = 500;

/// Earliest year accepted in dates.
pub const MIN_DATE_YEAR: i32 = 1900;

/// Latest year accepted in dates.
pub const MAX_DATE_YEAR: i32 = 9999;

/// Longest category description.
pub const MAX_DESCRIPTION_LEN: usize = 500;

// =============================================================================
// String Validators
// =============================================================================

fn validate_length(field: &str, value: &str, min: usize, max: usize) -> ValidationResult<()> {
    let len = value.chars().count();
    if len == 0 {
        return Err(ValidationError::required(field));
    }
    if len < min {
        return Err(ValidationError::TooShort {
            field: field.to_string(),
            min,
        });
    }
    if len > max {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max,
        });
    }
    Ok(())
}

/// Validates a username.
///
/// ## Rules
/// - 3 to 50 characters
/// - Only ASCII letters, digits, `_`, `.` and `-`
///
/// ```rust
/// use stockadoodle_core::validation::validate_username;
///
/// assert!(validate_username("admin_01").is_ok());
/// assert!(validate_username("ab").is_err());
/// assert!(validate_username("has space").is_err());
/// ```
pub fn validate_username(username: &str) -> ValidationResult<()> {
    validate_length("username", username.trim(), 3, 50)?;

    if !username
        .trim()
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.' || c == '-')
    {
        return Err(ValidationError::invalid_format(
            "username",
            "must contain only letters, numbers, underscores, dots, and hyphens",
        ));
    }

    Ok(())
}

/// Validates a new password. Only the length is checked.
pub fn validate_password(password: &str) -> ValidationResult<()> {
    if password.is_empty() {
        return Err(ValidationError::required("password"));
    }
    if password.chars().count() < 8 {
        return Err(ValidationError::TooShort {
            field: "password".to_string(),
            min: 8,
        });
    }
    if password.len() > 128 {
        return Err(ValidationError::TooLong {
            field: "password".to_string(),
            max: 128,
        });
    }
    Ok(())
}

pub fn validate_full_name(full_name: &str) -> ValidationResult<()> {
    validate_length("full_name", full_name.trim(), 1, 100)
}

/// Validates an e-mail address.
///
/// Deliberately loose: one `@` with text on both sides and no whitespace.
pub fn validate_email(email: &str) -> ValidationResult<()> {
    let email = email.trim();
    if email.is_empty() {
        return Err(ValidationError::required("email"));
    }
    if email.len() > 254 {
        return Err(ValidationError::TooLong {
            field: "email".to_string(),
            max: 254,
        });
    }
    match email.split_once('@') {
        Some((local, domain))
            if !local.is_empty()
                && !domain.is_empty()
                && !domain.contains('@')
                && !email.chars().any(char::is_whitespace) =>
        {
            Ok(())
        }
        _ => Err(ValidationError::invalid_format("email", "must be an e-mail address")),
    }
}

/// Validates a product name (1 to 200 characters).
///
/// ```rust
/// use stockadoodle_core::validation::validate_product_name;
///
/// assert!(validate_product_name("Whole Milk 1L").is_ok());
/// assert!(validate_product_name("   ").is_err());
/// ```
pub fn validate_product_name(name: &str) -> ValidationResult<()> {
    validate_length("name", name.trim(), 1, 200)
}

/// Validates a product category (1 to 100 characters).
pub fn validate_category(category: &str) -> ValidationResult<()> {
    validate_length("category", category.trim(), 1, 100)
}

/// Validates an optional category description. Blank is allowed.
pub fn validate_description(description: Option<&str>) -> ValidationResult<()> {
    match description {
        Some(d) if d.trim().chars().count() > MAX_DESCRIPTION_LEN => Err(ValidationError::TooLong {
            field: "description".to_string(),
            max: MAX_DESCRIPTION_LEN,
        }),
        _ => Ok(()),
    }
}

/// Validates a search query. Returns the trimmed query.
pub fn validate_search_query(query: &str) -> ValidationResult<String> {
    let query = query.trim();

    if query.len() > 100 {
        return Err(ValidationError::TooLong {
            field: "search".to_string(),
            max: 100,
        });
    }

    Ok(query.to_string())
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates the quantity of a sale.
///
/// ## User Workflow
/// ```text
/// ┌─────────────────────────────────────────────────────────────────────────┐
/// │  POS: Record Sale                                                       │
/// │                                                                         │
/// │  Retailer enters quantity: 5                                           │
/// │       │                                                                 │
/// │       ▼                                                                 │
/// │  validate_sale_quantity(5) ← THIS FUNCTION                             │
/// │       │                                                                 │
/// │       ├── qty <= 0?  → Error: "quantity must be positive"              │
/// │       ├── qty > 999? → Error: "quantity must be between 1 and 999"     │
/// │       └── OK → stock check happens in the sale transaction             │
/// └─────────────────────────────────────────────────────────────────────────┘
/// ```
pub fn validate_sale_quantity(qty: i64) -> ValidationResult<()> {
    if qty <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        });
    }

    if qty > MAX_SALE_QUANTITY {
        return Err(ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: 1,
            max: MAX_SALE_QUANTITY,
        });
    }

    Ok(())
}

fn validate_non_negative(field: &str, value: i64) -> ValidationResult<()> {
    if value < 0 {
        return Err(ValidationError::MustNotBeNegative {
            field: field.to_string(),
        });
    }
    Ok(())
}

fn validate_at_most(field: &str, value: i64, max: i64) -> ValidationResult<()> {
    validate_non_negative(field, value)?;
    if value > max {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min: 0,
            max,
        });
    }
    Ok(())
}

/// Validates a stock level. Zero is allowed.
pub fn validate_stock_quantity(qty: i64) -> ValidationResult<()> {
    validate_at_most("quantity_on_hand", qty, MAX_STOCK_QUANTITY)
}

pub fn validate_reorder_threshold(threshold: i64) -> ValidationResult<()> {
    validate_at_most("reorder_threshold", threshold, MAX_STOCK_QUANTITY)
}

/// Validates a price in cents. Zero is allowed (free items).
///
/// ```rust
/// use stockadoodle_core::validation::validate_price_cents;
///
/// assert!(validate_price_cents(1099).is_ok());
/// assert!(validate_price_cents(0).is_ok());
/// assert!(validate_price_cents(-100).is_err());
/// assert!(validate_price_cents(i64::MAX).is_err());
/// ```
pub fn validate_price_cents(cents: i64) -> ValidationResult<()> {
    validate_at_most("price_cents", cents, MAX_PRICE_CENTS)
}

/// Validates a manual stock adjustment delta.
///
/// Zero changes nothing and is rejected; the magnitude is bounded by
/// [`MAX_STOCK_QUANTITY`].
pub fn validate_stock_delta(delta: i64) -> ValidationResult<()> {
    if delta == 0 {
        return Err(ValidationError::Rule("delta must not be zero".to_string()));
    }
    if delta.unsigned_abs() > MAX_STOCK_QUANTITY.unsigned_abs() {
        return Err(ValidationError::OutOfRange {
            field: "delta".to_string(),
            min: -MAX_STOCK_QUANTITY,
            max: MAX_STOCK_QUANTITY,
        });
    }
    Ok(())
}

/// Validates a calendar date from a request (years 1900 to 9999).
///
/// ```rust
/// use chrono::NaiveDate;
/// use stockadoodle_core::validation::validate_date;
///
/// assert!(validate_date("end_date", NaiveDate::from_ymd_opt(2026, 10, 19).unwrap()).is_ok());
/// assert!(validate_date("end_date", NaiveDate::MAX).is_err());
/// ```
pub fn validate_date(field: &str, date: NaiveDate) -> ValidationResult<()> {
    if !(MIN_DATE_YEAR..=MAX_DATE_YEAR).contains(&date.year()) {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min: i64::from(MIN_DATE_YEAR),
            max: i64::from(MAX_DATE_YEAR),
        });
    }
    Ok(())
}

/// Validates `days_ahead` for the alerts report.
pub fn validate_days_ahead(days: i64) -> ValidationResult<()> {
    if !(0..=MAX_ALERT_DAYS_AHEAD).contains(&days) {
        return Err(ValidationError::OutOfRange {
            field: "days_ahead".to_string(),
            min: 0,
            max: MAX_ALERT_DAYS_AHEAD,
        });
    }
    Ok(())
}

/// Validates a list `limit`.
pub fn validate_limit(limit: i64) -> ValidationResult<()> {
    if !(1..=MAX_LIST_LIMIT).contains(&limit) {
        return Err(ValidationError::OutOfRange {
            field: "limit".to_string(),
            min: 1,
            max: MAX_LIST_LIMIT,
        });
    }
    Ok(())
}

// =============================================================================
// UUID Validators
// =============================================================================

/// Validates a UUID string.
///
/// ```rust
/// use stockadoodle_core::validation::validate_uuid;
///
/// assert!(validate_uuid("product_id", "550e8400-e29b-41d4-a716-446655440000").is_ok());
/// assert!(validate_uuid("product_id", "not-a-uuid").is_err());
/// ```
pub fn validate_uuid(field: &str, id: &str) -> ValidationResult<()> {
    if id.trim().is_empty() {
        return Err(ValidationError::required(field));
    }

    uuid::Uuid::parse_str(id.trim())
        .map_err(|_| ValidationError::invalid_format(field, "must be a valid UUID"))?;

    Ok(())
}

// =============================================================================
// Composite Validators
// =============================================================================

/// Validates every field of a product before it is created.
pub fn validate_new_product(input: &NewProduct) -> ValidationResult<()> {
    validate_product_name(&input.name)?;
    validate_category(&input.category)?;
    validate_stock_quantity(input.quantity_on_hand)?;
    validate_reorder_threshold(input.reorder_threshold)?;
    validate_price_cents(input.price_cents)?;
    if let Some(date) = input.expiration_date {
        validate_date("expiration_date", date)?;
    }
    Ok(())
}

/// Validates the fields present in a product update.
pub fn validate_product_changes(changes: &ProductChanges) -> ValidationResult<()> {
    if changes.is_empty() {
        return Err(ValidationError::Rule("no fields to update".to_string()));
    }
    if let Some(name) = &changes.name {
        validate_product_name(name)?;
    }
    if let Some(category) = &changes.category {
        validate_category(category)?;
    }
    if let Some(qty) = changes.quantity_on_hand {
        validate_stock_quantity(qty)?;
    }
    if let Some(threshold) = changes.reorder_threshold {
        validate_reorder_threshold(threshold)?;
    }
    if let Some(price) = changes.price_cents {
        validate_price_cents(price)?;
    }
    if let Some(date) = changes.expiration_date {
        validate_date("expiration_date", date)?;
    }
    Ok(())
}

/// Validates a category before it is created.
pub fn validate_new_category(input: &NewCategory) -> ValidationResult<()> {
    validate_category(&input.name)?;
    validate_description(input.description.as_deref())
}

/// Validates the fields present in a category update.
pub fn validate_category_changes(changes: &CategoryChanges) -> ValidationResult<()> {
    if changes.is_empty() {
        return Err(ValidationError::Rule("no fields to update".to_string()));
    }
    if let Some(name) = &changes.name {
        validate_category(name)?;
    }
    validate_description(changes.description.as_deref())
}

/// Accounts that need a second factor must have somewhere to send the code.
fn validate_mfa_email(role: Role, mfa_enabled: bool, email: Option<&str>) -> ValidationResult<()> {
    let needs_email = role == Role::Admin || mfa_enabled;
    let has_email = email.map(|e| !e.trim().is_empty()).unwrap_or(false);
    if needs_email && !has_email {
        return Err(ValidationError::Rule(
            "email is required for admin and MFA-enabled accounts".to_string(),
        ));
    }
    Ok(())
}

/// Validates a user before it is created.
pub fn validate_new_user(input: &NewUser) -> ValidationResult<()> {
    validate_username(&input.username)?;
    validate_password(&input.password)?;
    validate_full_name(&input.full_name)?;
    if let Some(email) = input.email.as_deref().filter(|e| !e.trim().is_empty()) {
        validate_email(email)?;
    }
    validate_mfa_email(input.role, input.mfa_enabled, input.email.as_deref())
}

/// Validates a user update against the account's current role, MFA flag and e-mail.
pub fn validate_user_changes(
    changes: &UserChanges,
    current_role: Role,
    current_mfa: bool,
    current_email: Option<&str>,
) -> ValidationResult<()> {
    if let Some(full_name) = &changes.full_name {
        validate_full_name(full_name)?;
    }
    if let Some(email) = changes.email.as_deref().filter(|e| !e.trim().is_empty()) {
        validate_email(email)?;
    }
    if let Some(password) = &changes.password {
        validate_password(password)?;
    }

    let role = changes.role.unwrap_or(current_role);
    let mfa = changes.mfa_enabled.unwrap_or(current_mfa);
    let email = match &changes.email {
        Some(e) => Some(e.as_str()),
        None => current_email,
    };
    validate_mfa_email(role, mfa, email)
}

// =============================================================================
// Unit Tests
// =============================================================================
