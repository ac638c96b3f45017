//! # stockadoodle-db: Database Layer for StockaDoodle
//!
//! This crate provides database access for StockaDoodle.
//! It uses SQLite with sqlx for async operations.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      StockaDoodle Data Flow                             │
//! │                                                                         │
//! │  HTTP handler (POST /api/v1/sales)                                     │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                 stockadoodle-db (THIS CRATE)                    │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌───────────────┐    ┌──────────────┐  │   │
//! │  │   │   Database    │    │  Repositories │    │  Migrations  │  │   │
//! │  │   │   (pool.rs)   │    │               │    │  (embedded)  │  │   │
//! │  │   │               │    │ ProductRepo   │    │ 001_initial_ │  │   │
//! │  │   │ SqlitePool    │◄───│ CategoryRepo  │    │   schema     │  │   │
//! │  │   │               │    │ UserRepo      │    │ 002_add_     │  │   │
//! │  │   │               │    │ ReportRepo... │    │   categories │  │   │
//! │  │   └───────────────┘    └───────────────┘    └──────────────┘  │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     SQLite Database                             │   │
//! │  │                  ./stockadoodle.db (WAL)                        │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database error types
//! - [`repository`] - Repository implementations
//!
//! ## Usage
//!
//! ```rust,ignore
//! use stockadoodle_db::{Database, DbConfig};
//!
//! let db = Database::new(DbConfig::new("./stockadoodle.db")).await?;
//! let sale = db.sales().record(&product_id, &retailer_id, 2, None).await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};

// Repository re-exports for convenience
pub use repository::activity::ActivityRepository;
pub use repository::category::CategoryRepository;
pub use repository::mfa::{MfaChallenge, MfaRepository};
pub use repository::product::{ProductFilter, ProductRepository};
pub use repository::report::{ReportRepository, SalesQuery};
pub use repository::sale::{SaleFilter, SaleRepository};
pub use repository::user::{UserCredentials, UserRepository};
