//! HTTP service implementations.
//!
//! Each module owns one resource and exposes `routes()` for the router.

pub mod auth_service;
pub mod category_service;
pub mod health_service;
pub mod product_service;
pub mod report_service;
pub mod sale_service;
pub mod user_service;
