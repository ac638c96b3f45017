//! Report service.
//!
//! ```text
//! ┌────────────────────────┬──────────────────────────┬──────────────────┐
//! │ Route                  │ Source                   │ Builder          │
//! ├────────────────────────┼──────────────────────────┼──────────────────┤
//! │ /reports/sales         │ reports().sale_lines     │ SalesReport      │
//! │ /reports/categories    │ reports().category_stock │ CategoryReport   │
//! │ /reports/retailers     │ reports().retailer_sales │ RetailerReport   │
//! │ /reports/alerts        │ products().list_all_…    │ AlertReport      │
//! │ /reports/activity      │ activity().entries_…     │ ActivityReport   │
//! │ /reports/transactions  │ reports().sale_lines     │ TransactionReport│
//! │ /reports/users         │ users().list_all         │ UserAccounts…    │
//! └────────────────────────┴──────────────────────────┴──────────────────┘
//! ```
//!
//! Dated reports default to the last 30 days ending today (UTC).

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use chrono::{NaiveDate, Utc};
use serde::Deserialize;
use stockadoodle_core::reports::{
    ActivityReport, AlertReport, CategoryReport, RetailerReport, SalesReport, TransactionReport,
    UserAccountsReport,
};
use stockadoodle_core::validation::validate_days_ahead;
use stockadoodle_core::{DateRange, Permission, DEFAULT_REPORT_DAYS};
use stockadoodle_db::SalesQuery;

use crate::error::ApiResult;
use crate::extract::ApiQuery;
use crate::middleware::AuthUser;
use crate::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct RangeQuery {
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

impl RangeQuery {
    fn resolve(&self) -> ApiResult<DateRange> {
        let today = Utc::now().date_naive();
        let range = DateRange::resolve(self.start_date, self.end_date, today, DEFAULT_REPORT_DAYS)?;
        Ok(range)
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct SalesReportQuery {
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub category: Option<String>,
    pub retailer_id: Option<String>,
}

impl SalesReportQuery {
    fn split(self) -> (RangeQuery, SalesQuery) {
        let range = RangeQuery {
            start_date: self.start_date,
            end_date: self.end_date,
        };
        let filter = SalesQuery {
            category: self
                .category
                .map(|c| c.trim().to_string())
                .filter(|c| !c.is_empty()),
            retailer_id: self.retailer_id.filter(|r| !r.trim().is_empty()),
        };
        (range, filter)
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct AlertQuery {
    pub days_ahead: Option<i64>,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/reports/sales", get(sales_report))
        .route("/reports/categories", get(category_report))
        .route("/reports/retailers", get(retailer_report))
        .route("/reports/alerts", get(alert_report))
        .route("/reports/activity", get(activity_report))
        .route("/reports/transactions", get(transaction_report))
        .route("/reports/users", get(user_accounts_report))
}

async fn sales_report(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiQuery(query): ApiQuery<SalesReportQuery>,
) -> ApiResult<Json<SalesReport>> {
    auth.require(Permission::ViewReports)?;

    let (range, filter) = query.split();
    let range = range.resolve()?;
    let lines = state.db.reports().sale_lines(&range, &filter).await?;
    Ok(Json(SalesReport::build(range, lines)?))
}

async fn category_report(
    State(state): State<AppState>,
    auth: AuthUser,
) -> ApiResult<Json<CategoryReport>> {
    auth.require(Permission::ViewReports)?;

    let rows = state.db.reports().category_stock().await?;
    Ok(Json(CategoryReport::build(rows)?))
}

async fn retailer_report(
    State(state): State<AppState>,
    auth: AuthUser,
) -> ApiResult<Json<RetailerReport>> {
    auth.require(Permission::ViewReports)?;

    let today = Utc::now().date_naive();
    let inputs = state.db.reports().retailer_sales(today).await?;
    Ok(Json(RetailerReport::build(
        inputs,
        state.config.daily_quota_cents,
        today,
    )))
}

async fn alert_report(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiQuery(query): ApiQuery<AlertQuery>,
) -> ApiResult<Json<AlertReport>> {
    auth.require(Permission::ViewReports)?;

    let days_ahead = query.days_ahead.unwrap_or(state.config.alert_days_ahead);
    validate_days_ahead(days_ahead)?;

    let products = state.db.products().list_all_active().await?;
    Ok(Json(AlertReport::build(
        &products,
        Utc::now().date_naive(),
        days_ahead,
    )))
}

async fn activity_report(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiQuery(query): ApiQuery<RangeQuery>,
) -> ApiResult<Json<ActivityReport>> {
    auth.require(Permission::ViewReports)?;

    let range = query.resolve()?;
    let entries = state.db.activity().entries_between(&range).await?;
    Ok(Json(ActivityReport::build(range, entries)))
}

async fn transaction_report(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiQuery(query): ApiQuery<SalesReportQuery>,
) -> ApiResult<Json<TransactionReport>> {
    auth.require(Permission::ViewReports)?;

    let (range, filter) = query.split();
    let range = range.resolve()?;
    let lines = state.db.reports().sale_lines(&range, &filter).await?;
    Ok(Json(TransactionReport::build(range, lines)?))
}

async fn user_accounts_report(
    State(state): State<AppState>,
    auth: AuthUser,
) -> ApiResult<Json<UserAccountsReport>> {
    auth.require(Permission::ManageUsers)?;

    let users = state.db.users().list_all().await?;
    Ok(Json(UserAccountsReport::build(users)))
}
