//! Order endpoints.

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use domain::Order;
use serde::Deserialize;

use super::{json_body, parse_product_id};
use crate::AppState;
use crate::error::ApiError;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderRequest {
    pub product_id: String,
    #[serde(alias = "quantity")]
    pub qty: i64,
}

/// POST /orders: record an order for an existing product.
#[tracing::instrument(skip_all)]
pub async fn create(
    State(state): State<AppState>,
    payload: Result<Json<CreateOrderRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Order>), ApiError> {
    let req = json_body(payload)?;
    let product_id = parse_product_id(&req.product_id)?;
    let order = state.orders.create_order(product_id, req.qty).await?;
    Ok((StatusCode::CREATED, Json(order)))
}

/// GET /orders
pub async fn list(State(state): State<AppState>) -> Result<Json<Vec<Order>>, ApiError> {
    Ok(Json(state.orders.get_all_orders().await?))
}

/// DELETE /orders: administrative wipe of every order.
#[tracing::instrument(skip_all)]
pub async fn delete_all(State(state): State<AppState>) -> Result<StatusCode, ApiError> {
    state.orders.delete_all_orders().await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /orders/product/{productId}
pub async fn for_product(
    State(state): State<AppState>,
    Path(product_id): Path<String>,
) -> Result<Json<Vec<Order>>, ApiError> {
    let product_id = parse_product_id(&product_id)?;
    Ok(Json(state.orders.get_orders_for_product(product_id).await?))
}
