use std::sync::Arc;

use async_trait::async_trait;
use common::{OrderId, UserId};
use domain::{Order, OrderStatus};

use crate::Result;

/// Core trait for order store implementations.
///
/// All implementations must be thread-safe (Send + Sync).
#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Persists a new order together with its items.
    ///
    /// The write is atomic: afterwards either the order and all of its items
    /// are visible, or neither is. Returns the order as stored.
    async fn create(&self, order: Order) -> Result<Order>;

    /// Deletes an order and its items.
    ///
    /// Deleting an order that does not exist is not an error.
    async fn delete(&self, order_id: OrderId) -> Result<()>;

    /// Moves an order to `status`.
    ///
    /// Fails with `InvalidStatusTransition` when the status graph forbids the
    /// move, leaving the stored order unchanged.
    async fn update_status(&self, order_id: OrderId, status: OrderStatus) -> Result<Order>;

    /// Retrieves an order by id.
    async fn find_by_id(&self, order_id: OrderId) -> Result<Option<Order>>;

    /// Retrieves all orders of a user, newest first.
    async fn find_by_user(&self, user_id: UserId) -> Result<Vec<Order>>;
}

#[async_trait]
impl<T: OrderStore + ?Sized> OrderStore for Arc<T> {
    async fn create(&self, order: Order) -> Result<Order> {
        (**self).create(order).await
    }

    async fn delete(&self, order_id: OrderId) -> Result<()> {
        (**self).delete(order_id).await
    }

    async fn update_status(&self, order_id: OrderId, status: OrderStatus) -> Result<Order> {
        (**self).update_status(order_id, status).await
    }

    async fn find_by_id(&self, order_id: OrderId) -> Result<Option<Order>> {
        (**self).find_by_id(order_id).await
    }

    async fn find_by_user(&self, user_id: UserId) -> Result<Vec<Order>> {
        (**self).find_by_user(user_id).await
    }
}
