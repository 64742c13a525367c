//! API error types with HTTP response mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use order_store::OrderStoreError;
use saga::{SagaError, StockError};

use crate::response::ErrorResponse;

/// API-level error type that maps to HTTP responses.
#[derive(Debug)]
pub enum ApiError {
    /// Malformed id, body or status from the client.
    BadRequest(String),
    /// No usable caller identity on the request.
    Unauthorized(String),
    /// Caller is known but may not touch this resource.
    Forbidden(String),
    /// Resource not found.
    NotFound(String),
    /// Order fulfillment saga error.
    Saga(SagaError),
    /// Order store error.
    OrderStore(OrderStoreError),
    /// Internal server error.
    Internal(String),
}

impl ApiError {
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            ApiError::BadRequest(_) => (StatusCode::BAD_REQUEST, "BAD_REQUEST"),
            ApiError::Unauthorized(_) => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED"),
            ApiError::Forbidden(_) => (StatusCode::FORBIDDEN, "FORBIDDEN"),
            ApiError::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            ApiError::Saga(err) => saga_status(err),
            ApiError::OrderStore(err) => store_status(err),
            ApiError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        }
    }

    fn message(&self) -> String {
        match self {
            ApiError::BadRequest(msg)
            | ApiError::Unauthorized(msg)
            | ApiError::Forbidden(msg)
            | ApiError::NotFound(msg)
            | ApiError::Internal(msg) => msg.clone(),
            ApiError::Saga(err) => err.to_string(),
            ApiError::OrderStore(err) => err.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();
        let mut message = self.message();

        if status.is_server_error() {
            tracing::error!(error = %message, %status, "request failed");
            // Database and internal details stay in the logs.
            if status == StatusCode::INTERNAL_SERVER_ERROR {
                message = "Internal server error".to_string();
            }
        }

        (status, axum::Json(ErrorResponse::new(message, code))).into_response()
    }
}

fn saga_status(err: &SagaError) -> (StatusCode, &'static str) {
    match err {
        SagaError::EmptyCart => (StatusCode::BAD_REQUEST, "EMPTY_CART"),
        SagaError::InvalidCart(_) | SagaError::Domain(_) => (StatusCode::BAD_REQUEST, "INVALID_CART"),
        SagaError::ProductNotFound(_)
        | SagaError::StockUpdateFailed {
            source: StockError::NotFound(_),
            ..
        } => (StatusCode::NOT_FOUND, "PRODUCT_NOT_FOUND"),
        SagaError::InsufficientStock { .. } => (StatusCode::CONFLICT, "INSUFFICIENT_STOCK"),
        SagaError::StockUpdateFailed { .. } | SagaError::ServiceUnavailable(_) => {
            (StatusCode::SERVICE_UNAVAILABLE, "SERVICE_UNAVAILABLE")
        }
        SagaError::OrderStore(err) => store_status(err),
    }
}

fn store_status(err: &OrderStoreError) -> (StatusCode, &'static str) {
    match err {
        OrderStoreError::NotFound(_) => (StatusCode::NOT_FOUND, "ORDER_NOT_FOUND"),
        OrderStoreError::InvalidStatusTransition { .. } => {
            (StatusCode::CONFLICT, "INVALID_STATUS_TRANSITION")
        }
        OrderStoreError::Unavailable(_) => {
            (StatusCode::SERVICE_UNAVAILABLE, "SERVICE_UNAVAILABLE")
        }
        OrderStoreError::Corrupt(_)
        | OrderStoreError::Database(_)
        | OrderStoreError::Migration(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
    }
}

impl From<SagaError> for ApiError {
    fn from(err: SagaError) -> Self {
        ApiError::Saga(err)
    }
}

impl From<OrderStoreError> for ApiError {
    fn from(err: OrderStoreError) -> Self {
        ApiError::OrderStore(err)
    }
}
