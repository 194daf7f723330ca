//! API error types with HTTP response mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use catalog::CatalogError;
use orders::OrderError;

/// API-level error type that maps to HTTP responses.
#[derive(Debug)]
pub enum ApiError {
    /// Bad request from the client.
    BadRequest(String),
    /// Catalog service error.
    Catalog(CatalogError),
    /// Order service error.
    Order(OrderError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Catalog(err) => catalog_error_to_response(err),
            ApiError::Order(err) => order_error_to_response(err),
        };

        if status.is_server_error() {
            tracing::error!(error = %message, "internal server error");
        }

        let body = serde_json::json!({ "error": message });
        (status, axum::Json(body)).into_response()
    }
}

fn catalog_error_to_response(err: CatalogError) -> (StatusCode, String) {
    match &err {
        CatalogError::Validation(_) => (StatusCode::BAD_REQUEST, err.to_string()),
        CatalogError::NotFound(_) => (StatusCode::NOT_FOUND, err.to_string()),
        CatalogError::Store(_) | CatalogError::Bus(_) | CatalogError::Serialization(_) => {
            (StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
        }
    }
}

fn order_error_to_response(err: OrderError) -> (StatusCode, String) {
    match &err {
        OrderError::Validation(_) => (StatusCode::BAD_REQUEST, err.to_string()),
        OrderError::ProductNotFound(_) => (StatusCode::NOT_FOUND, err.to_string()),
        OrderError::Directory(_)
        | OrderError::Store(_)
        | OrderError::Bus(_)
        | OrderError::Serialization(_) => (StatusCode::INTERNAL_SERVER_ERROR, err.to_string()),
    }
}

impl From<CatalogError> for ApiError {
    fn from(err: CatalogError) -> Self {
        ApiError::Catalog(err)
    }
}

impl From<OrderError> for ApiError {
    fn from(err: OrderError) -> Self {
        ApiError::Order(err)
    }
}
