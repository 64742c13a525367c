//! HTTP route handlers.

pub mod health;
pub mod internal;
pub mod metrics;
pub mod orders;

use common::{OrderId, UserId};

use crate::error::ApiError;

/// Fallback for unknown routes.
pub async fn not_found() -> ApiError {
    ApiError::NotFound("Route not found".to_string())
}

fn parse_order_id(id: &str) -> Result<OrderId, ApiError> {
    id.parse()
        .map_err(|e: common::ParseIdError| ApiError::BadRequest(e.to_string()))
}

fn parse_user_id(id: &str) -> Result<UserId, ApiError> {
    id.parse()
        .map_err(|e: common::ParseIdError| ApiError::BadRequest(e.to_string()))
}
