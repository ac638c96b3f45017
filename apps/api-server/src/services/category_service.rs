//! Category service.
//!
//! The category catalog. Reads need `ViewProducts`, writes need
//! `ManageProducts` and land in the activity trail.
//!
//! Renaming a category renames it on every product. A category cannot be
//! deleted while active products use it (409).

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use stockadoodle_core::validation::{validate_category_changes, validate_new_category};
use stockadoodle_core::{Category, CategoryChanges, NewCategory, Permission};
use tracing::info;

use crate::error::{ApiError, ApiResult};
use crate::extract::{ApiJson, ApiPath};
use crate::middleware::AuthUser;
use crate::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/categories", get(list_categories).post(create_category))
        .route(
            "/categories/:id",
            get(get_category).put(update_category).delete(delete_category),
        )
}

async fn list_categories(
    State(state): State<AppState>,
    auth: AuthUser,
) -> ApiResult<Json<Vec<Category>>> {
    auth.require(Permission::ViewProducts)?;
    Ok(Json(state.db.categories().list().await?))
}

async fn create_category(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiJson(input): ApiJson<NewCategory>,
) -> ApiResult<(StatusCode, Json<Category>)> {
    auth.require(Permission::ManageProducts)?;
    validate_new_category(&input)?;

    let category = state.db.categories().insert(&input, Some(auth.id())).await?;

    info!(category_id = %category.id, name = %category.name, actor = %auth.id(), "Category created");
    Ok((StatusCode::CREATED, Json(category)))
}

async fn get_category(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiPath(id): ApiPath<String>,
) -> ApiResult<Json<Category>> {
    auth.require(Permission::ViewProducts)?;

    let category = state
        .db
        .categories()
        .get_by_id(&id)
        .await?
        .ok_or_else(|| ApiError::not_found("Category", &id))?;
    Ok(Json(category))
}

async fn update_category(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiPath(id): ApiPath<String>,
    ApiJson(changes): ApiJson<CategoryChanges>,
) -> ApiResult<Json<Category>> {
    auth.require(Permission::ManageProducts)?;
    validate_category_changes(&changes)?;

    let category = state
        .db
        .categories()
        .update(&id, &changes, Some(auth.id()))
        .await?;

    info!(category_id = %category.id, name = %category.name, actor = %auth.id(), "Category updated");
    Ok(Json(category))
}

async fn delete_category(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiPath(id): ApiPath<String>,
) -> ApiResult<StatusCode> {
    auth.require(Permission::ManageProducts)?;

    state.db.categories().delete(&id, Some(auth.id())).await?;

    info!(category_id = %id, actor = %auth.id(), "Category deleted");
    Ok(StatusCode::NO_CONTENT)
}
