pub mod orders;
pub mod products;
pub mod system;

use axum::Json;
use axum::extract::rejection::JsonRejection;
use common::ProductId;

use crate::error::ApiError;

/// Parses a product id from a path segment.
pub(crate) fn parse_product_id(raw: &str) -> Result<ProductId, ApiError> {
    raw.parse()
        .map_err(|e| ApiError::BadRequest(format!("Invalid product id {raw:?}: {e}")))
}

/// Unwraps a JSON body, turning a malformed one into a 400.
pub(crate) fn json_body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
    payload
        .map(|Json(body)| body)
        .map_err(|rejection| ApiError::BadRequest(rejection.body_text()))
}
