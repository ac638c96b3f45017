//! # stockadoodle-core: Pure Business Logic for StockaDoodle
//!
//! This crate holds the domain model and every rule that can be decided
//! without touching the database or the network.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                     StockaDoodle Architecture                           │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │               HTTP API (apps/api-server, axum)                  │   │
//! │  │   /login  /products  /categories  /users  /sales  /reports/*   │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │            ★ stockadoodle-core (THIS CRATE) ★                   │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌─────────────┐  ┌──────────┐  │   │
//! │  │   │   types   │  │   money   │  │ permissions │  │  alerts  │  │   │
//! │  │   │  Product  │  │   Money   │  │  Role::can  │  │ LOW/OUT/ │  │   │
//! │  │   │ Sale, Log │  │           │  │             │  │ EXPIRING │  │   │
//! │  │   └───────────┘  └───────────┘  └─────────────┘  └──────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               stockadoodle-db (Database Layer)                  │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (Product, Category, User, Sale, ActivityLog)
//! - [`reports`] - Report shapes and aggregation
//! - [`money`] - Money type with integer arithmetic
//! - [`permissions`] - Role-based access rules
//! - [`alerts`] - Low-stock and expiration classification
//! - [`metrics`] - Retailer streak and quota math
//! - [`validation`] - Input validation
//! - [`error`] - Domain error types
//!
//! ## Example Usage
//!
//! ```rust
//! use stockadoodle_core::money::Money;
//! use stockadoodle_core::permissions::Permission;
//! use stockadoodle_core::types::Role;
//!
//! let total = Money::from_cents(250).multiply_quantity(4);
//! assert_eq!(total.cents(), 1000);
//!
//! assert!(Role::Manager.can(Permission::ManageProducts));
//! assert!(!Role::Retailer.can(Permission::ManageUsers));
//! ```

pub mod alerts;
pub mod error;
pub mod metrics;
pub mod money;
pub mod permissions;
pub mod reports;
pub mod types;
pub mod validation;

pub use error::{CoreError, ValidationError};
pub use money::Money;
pub use permissions::Permission;
pub use types::*;

/// Maximum quantity accepted in a single sale.
///
/// Guards against typing 1000 instead of 10 at the POS.
pub const MAX_SALE_QUANTITY: i64 = 999;

/// Largest stock level, reorder threshold or single stock adjustment.
pub const MAX_STOCK_QUANTITY: i64 = 1_000_000_000;

/// Largest unit price in cents ($10,000,000.00).
pub const MAX_PRICE_CENTS: i64 = 1_000_000_000;

/// Number of digits in an MFA confirmation code.
pub const MFA_CODE_DIGITS: usize = 6;

/// Default report window when no date range is given.
pub const DEFAULT_REPORT_DAYS: i64 = 30;
