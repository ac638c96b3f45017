//! Product service.
//!
//! Catalog reads for every role; writes need `ManageProducts` and are
//! logged to the activity trail by the repository.

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use stockadoodle_core::validation::{
    validate_limit, validate_new_product, validate_product_changes, validate_search_query,
    validate_stock_delta,
};
use stockadoodle_core::{NewProduct, Permission, Product, ProductChanges, StockAdjustment};
use stockadoodle_db::ProductFilter;
use tracing::info;

use crate::error::{ApiError, ApiResult};
use crate::extract::{ApiJson, ApiPath, ApiQuery};
use crate::middleware::AuthUser;
use crate::AppState;

/// Longest accepted stock adjustment reason.
const MAX_REASON_LEN: usize = 200;

#[derive(Debug, Default, Deserialize)]
pub struct ProductQuery {
    pub category: Option<String>,
    pub search: Option<String>,
    pub limit: Option<i64>,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/products", get(list_products).post(create_product))
        .route(
            "/products/:id",
            get(get_product).put(update_product).delete(delete_product),
        )
        .route("/products/:id/stock", post(adjust_stock))
}

async fn list_products(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiQuery(query): ApiQuery<ProductQuery>,
) -> ApiResult<Json<Vec<Product>>> {
    auth.require(Permission::ViewProducts)?;

    let mut filter = ProductFilter::default();
    if let Some(limit) = query.limit {
        validate_limit(limit)?;
        filter.limit = limit;
    }
    filter.category = query
        .category
        .map(|c| c.trim().to_string())
        .filter(|c| !c.is_empty());
    if let Some(search) = query.search {
        let search = validate_search_query(&search)?;
        filter.search = Some(search).filter(|s| !s.is_empty());
    }

    let products = state.db.products().list(&filter).await?;
    Ok(Json(products))
}

async fn create_product(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiJson(input): ApiJson<NewProduct>,
) -> ApiResult<(StatusCode, Json<Product>)> {
    auth.require(Permission::ManageProducts)?;
    validate_new_product(&input)?;

    let product = state.db.products().insert(&input, Some(auth.id())).await?;

    info!(product_id = %product.id, name = %product.name, actor = %auth.id(), "Product created");
    Ok((StatusCode::CREATED, Json(product)))
}

async fn get_product(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiPath(id): ApiPath<String>,
) -> ApiResult<Json<Product>> {
    auth.require(Permission::ViewProducts)?;

    let product = state
        .db
        .products()
        .get_by_id(&id)
        .await?
        .ok_or_else(|| ApiError::not_found("Product", &id))?;
    Ok(Json(product))
}

async fn update_product(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiPath(id): ApiPath<String>,
    ApiJson(changes): ApiJson<ProductChanges>,
) -> ApiResult<Json<Product>> {
    auth.require(Permission::ManageProducts)?;
    validate_product_changes(&changes)?;

    let product = state
        .db
        .products()
        .update(&id, &changes, Some(auth.id()))
        .await?;

    info!(product_id = %product.id, actor = %auth.id(), "Product updated");
    Ok(Json(product))
}

async fn delete_product(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiPath(id): ApiPath<String>,
) -> ApiResult<StatusCode> {
    auth.require(Permission::ManageProducts)?;

    state.db.products().soft_delete(&id, Some(auth.id())).await?;

    info!(product_id = %id, actor = %auth.id(), "Product deleted");
    Ok(StatusCode::NO_CONTENT)
}

async fn adjust_stock(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiPath(id): ApiPath<String>,
    ApiJson(adjustment): ApiJson<StockAdjustment>,
) -> ApiResult<Json<Product>> {
    auth.require(Permission::ManageProducts)?;
    validate_stock_delta(adjustment.delta)?;

    let reason = adjustment
        .reason
        .as_deref()
        .map(str::trim)
        .filter(|r| !r.is_empty());
    if reason.is_some_and(|r| r.chars().count() > MAX_REASON_LEN) {
        return Err(ApiError::validation(format!(
            "reason must be at most {} characters",
            MAX_REASON_LEN
        )));
    }

    let product = state
        .db
        .products()
        .adjust_stock(&id, adjustment.delta, reason, Some(auth.id()))
        .await?;

    info!(
        product_id = %product.id,
        delta = adjustment.delta,
        quantity_on_hand = product.quantity_on_hand,
        actor = %auth.id(),
        "Stock adjusted"
    );
    Ok(Json(product))
}
