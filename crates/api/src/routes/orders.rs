//! Order endpoints for customers and admins.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use domain::OrderStatus;
use serde::Deserialize;

use crate::AppState;
use crate::error::ApiError;
use crate::extract::{ApiJson, Principal};
use crate::response::{ApiResponse, OrderResponse};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderRequest {
    pub user_id: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: String,
}

/// POST /api/orders
///
/// Turns the user's cart into an order through the fulfillment saga.
#[tracing::instrument(skip(state, req))]
pub async fn create(
    State(state): State<Arc<AppState>>,
    principal: Principal,
    ApiJson(req): ApiJson<CreateOrderRequest>,
) -> Result<(StatusCode, Json<ApiResponse<OrderResponse>>), ApiError> {
    let user_id = super::parse_user_id(&req.user_id)?;
    principal.ensure_owner_or_admin(user_id, "create")?;

    let order = state.saga_coordinator.create_order(user_id).await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok(OrderResponse::from(&order))),
    ))
}

/// GET /api/orders/{id}
#[tracing::instrument(skip(state))]
pub async fn get(
    State(state): State<Arc<AppState>>,
    principal: Principal,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<OrderResponse>>, ApiError> {
    let order_id = super::parse_order_id(&id)?;

    let order = state
        .orders
        .find_by_id(order_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Order with id {order_id} not found")))?;
    principal.ensure_owner_or_admin(order.user_id(), "view")?;

    Ok(Json(ApiResponse::ok(OrderResponse::from(&order))))
}

/// GET /api/orders/user/{user_id}
///
/// Lists a user's orders, newest first.
#[tracing::instrument(skip(state))]
pub async fn list_for_user(
    State(state): State<Arc<AppState>>,
    principal: Principal,
    Path(user_id): Path<String>,
) -> Result<Json<ApiResponse<Vec<OrderResponse>>>, ApiError> {
    let user_id = super::parse_user_id(&user_id)?;
    principal.ensure_owner_or_admin(user_id, "view")?;

    let orders = state.orders.find_by_user(user_id).await?;

    Ok(Json(ApiResponse::ok(
        orders.iter().map(OrderResponse::from).collect(),
    )))
}

/// PUT /api/orders/{id}/status
///
/// Admin only. The move must follow the order status graph.
#[tracing::instrument(skip(state, req))]
pub async fn update_status(
    State(state): State<Arc<AppState>>,
    principal: Principal,
    Path(id): Path<String>,
    ApiJson(req): ApiJson<UpdateStatusRequest>,
) -> Result<Json<ApiResponse<OrderResponse>>, ApiError> {
    principal.ensure_admin()?;
    let order_id = super::parse_order_id(&id)?;
    let status: OrderStatus = req
        .status
        .parse()
        .map_err(|e: domain::OrderError| ApiError::BadRequest(e.to_string()))?;

    let order = state.orders.update_status(order_id, status).await?;

    metrics::counter!("order_status_updates_total", "status" => status.as_str()).increment(1);
    tracing::info!(%order_id, %status, "order status updated");

    Ok(Json(ApiResponse::ok(OrderResponse::from(&order))))
}
