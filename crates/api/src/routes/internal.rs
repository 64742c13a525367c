//! Service-to-service endpoints.
//!
//! These routes sit behind the private network and carry no caller identity;
//! the reviews service uses them to verify purchases.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};

use crate::AppState;
use crate::error::ApiError;
use crate::response::{ApiResponse, OrderResponse};

/// GET /internal/orders/{id}
#[tracing::instrument(skip(state))]
pub async fn get_order(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<OrderResponse>>, ApiError> {
    let order_id = super::parse_order_id(&id)?;

    let order = state
        .orders
        .find_by_id(order_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Order with id {order_id} not found")))?;

    Ok(Json(ApiResponse::ok(OrderResponse::from(&order))))
}
