//! Catalog endpoints.

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use domain::{NewProduct, Product};

use super::{json_body, parse_product_id};
use crate::AppState;
use crate::error::ApiError;

/// POST /products
#[tracing::instrument(skip_all)]
pub async fn create(
    State(state): State<AppState>,
    payload: Result<Json<NewProduct>, JsonRejection>,
) -> Result<(StatusCode, Json<Product>), ApiError> {
    let product = state.catalog.create_product(json_body(payload)?).await?;
    Ok((StatusCode::CREATED, Json(product)))
}

/// GET /products
pub async fn list(State(state): State<AppState>) -> Result<Json<Vec<Product>>, ApiError> {
    Ok(Json(state.catalog.get_all_products().await?))
}

/// GET /products/{id}
pub async fn get(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Product>, ApiError> {
    let id = parse_product_id(&id)?;
    Ok(Json(state.catalog.get_product_by_id(id).await?))
}

/// POST /products/uncached
#[tracing::instrument(skip_all)]
pub async fn create_uncached(
    State(state): State<AppState>,
    payload: Result<Json<NewProduct>, JsonRejection>,
) -> Result<(StatusCode, Json<Product>), ApiError> {
    let product = state
        .catalog
        .create_product_without_cache(json_body(payload)?)
        .await?;
    Ok((StatusCode::CREATED, Json(product)))
}

/// GET /products/uncached
pub async fn list_uncached(
    State(state): State<AppState>,
) -> Result<Json<Vec<Product>>, ApiError> {
    Ok(Json(state.catalog.get_all_products_without_cache().await?))
}
