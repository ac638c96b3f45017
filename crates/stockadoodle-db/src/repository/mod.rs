//! # Repository Module
//!
//! Database repository implementations for StockaDoodle.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Repository Pattern                                   │
//! │                                                                         │
//! │  HTTP handler                                                          │
//! │       │                                                                 │
//! │       │  state.db.sales().record(product_id, retailer_id, 3, actor)    │
//! │       ▼                                                                 │
//! │  SaleRepository                                                        │
//! │  ├── BEGIN                                                             │
//! │  ├── UPDATE products ... WHERE quantity_on_hand >= 3                   │
//! │  ├── INSERT INTO sales ...                                             │
//! │  ├── INSERT INTO activity_logs ...   (managerial callers only)         │
//! │  └── COMMIT                                                            │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite Database                                                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`product::ProductRepository`] - Product CRUD and stock adjustment
//! - [`category::CategoryRepository`] - Category catalog
//! - [`user::UserRepository`] - Accounts and credentials
//! - [`sale::SaleRepository`] - Sale recording and lookup
//! - [`activity::ActivityRepository`] - Managerial activity log
//! - [`mfa::MfaRepository`] - Pending second-factor challenges
//! - [`report::ReportRepository`] - Read-only report queries

pub mod activity;
pub mod category;
pub mod mfa;
pub mod product;
pub mod report;
pub mod sale;
pub mod user;
