//! Sale service.
//!
//! ```text
//! POST /sales ──► quantity 1..=999 ──► retailer = caller, unless
//!                                      RecordSalesForOthers
//!                     │
//!                     ▼
//!        SaleRepository::record (one transaction)
//!          stock -= q, sale row, activity entry for managers
//! ```
//!
//! Retailers only ever see their own sales; other ids read as not found.

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use chrono::NaiveDate;
use serde::Deserialize;
use stockadoodle_core::validation::{validate_date, validate_sale_quantity};
use stockadoodle_core::{DateRange, NewSale, Permission, Sale};
use stockadoodle_db::SaleFilter;
use tracing::info;

use crate::error::{ApiError, ApiResult};
use crate::extract::{ApiJson, ApiPath, ApiQuery};
use crate::middleware::AuthUser;
use crate::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct SaleQuery {
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub retailer_id: Option<String>,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/sales", get(list_sales).post(record_sale))
        .route("/sales/:id", get(get_sale))
}

async fn record_sale(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiJson(input): ApiJson<NewSale>,
) -> ApiResult<(StatusCode, Json<Sale>)> {
    auth.require(Permission::RecordSales)?;
    validate_sale_quantity(input.quantity)?;

    let retailer_id = match input.retailer_id.as_deref().map(str::trim) {
        Some(other) if !other.is_empty() && other != auth.id() => {
            auth.require(Permission::RecordSalesForOthers)?;
            state
                .db
                .users()
                .get_by_id(other)
                .await?
                .ok_or_else(|| ApiError::not_found("User", other))?
                .id
        }
        _ => auth.id().to_string(),
    };

    let actor = auth.role().is_managerial().then(|| auth.id());
    let sale = state
        .db
        .sales()
        .record(&input.product_id, &retailer_id, input.quantity, actor)
        .await?;

    info!(
        sale_id = %sale.id,
        product_id = %sale.product_id,
        retailer_id = %sale.retailer_id,
        quantity = sale.quantity,
        total_cents = sale.total_cents,
        "Sale recorded"
    );
    Ok((StatusCode::CREATED, Json(sale)))
}

async fn list_sales(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiQuery(query): ApiQuery<SaleQuery>,
) -> ApiResult<Json<Vec<Sale>>> {
    auth.require(Permission::RecordSales)?;

    if let Some(start) = query.start_date {
        validate_date("start_date", start)?;
    }
    if let Some(end) = query.end_date {
        validate_date("end_date", end)?;
    }
    if let (Some(start), Some(end)) = (query.start_date, query.end_date) {
        DateRange::new(start, end)?;
    }

    let retailer_id = if auth.can(Permission::ViewAllSales) {
        query.retailer_id.filter(|r| !r.trim().is_empty())
    } else {
        Some(auth.id().to_string())
    };

    let filter = SaleFilter {
        from: query
            .start_date
            .map(|d| DateRange { start: d, end: d }.start_instant()),
        until: query
            .end_date
            .map(|d| DateRange { start: d, end: d }.end_instant_exclusive()),
        retailer_id,
    };

    let sales = state.db.sales().list(&filter).await?;
    Ok(Json(sales))
}

async fn get_sale(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiPath(id): ApiPath<String>,
) -> ApiResult<Json<Sale>> {
    auth.require(Permission::RecordSales)?;

    let sale = state
        .db
        .sales()
        .get_by_id(&id)
        .await?
        .filter(|s| auth.can(Permission::ViewAllSales) || s.retailer_id == auth.id())
        .ok_or_else(|| ApiError::not_found("Sale", &id))?;
    Ok(Json(sale))
}
