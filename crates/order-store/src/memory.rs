use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use common::{OrderId, UserId};
use domain::{Order, OrderStatus};
use tokio::sync::RwLock;

use crate::{OrderStoreError, Result, store::OrderStore};

#[derive(Debug, Default)]
struct InMemoryOrderState {
    orders: HashMap<OrderId, Order>,
    fail_on_create: bool,
    fail_on_delete: bool,
}

/// In-memory order store implementation for testing and local runs.
///
/// Provides the same interface as the PostgreSQL implementation, plus
/// switches that make writes fail so callers' error paths can be exercised.
#[derive(Debug, Clone, Default)]
pub struct InMemoryOrderStore {
    state: Arc<RwLock<InMemoryOrderState>>,
}

impl InMemoryOrderStore {
    /// Creates a new empty in-memory order store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the total number of orders stored.
    pub async fn order_count(&self) -> usize {
        self.state.read().await.orders.len()
    }

    /// Makes subsequent `create` calls fail.
    pub async fn set_fail_on_create(&self, fail: bool) {
        self.state.write().await.fail_on_create = fail;
    }

    /// Makes subsequent `delete` calls fail.
    pub async fn set_fail_on_delete(&self, fail: bool) {
        self.state.write().await.fail_on_delete = fail;
    }
}

#[async_trait]
impl OrderStore for InMemoryOrderStore {
    async fn create(&self, order: Order) -> Result<Order> {
        let mut state = self.state.write().await;

        if state.fail_on_create {
            return Err(OrderStoreError::Unavailable(
                "create rejected".to_string(),
            ));
        }

        state.orders.insert(order.id(), order.clone());
        Ok(order)
    }

    async fn delete(&self, order_id: OrderId) -> Result<()> {
        let mut state = self.state.write().await;

        if state.fail_on_delete {
            return Err(OrderStoreError::Unavailable(
                "delete rejected".to_string(),
            ));
        }

        state.orders.remove(&order_id);
        Ok(())
    }

    async fn update_status(&self, order_id: OrderId, status: OrderStatus) -> Result<Order> {
        let mut state = self.state.write().await;

        let order = state
            .orders
            .get_mut(&order_id)
            .ok_or(OrderStoreError::NotFound(order_id))?;

        order.transition_to(status)?;
        Ok(order.clone())
    }

    async fn find_by_id(&self, order_id: OrderId) -> Result<Option<Order>> {
        Ok(self.state.read().await.orders.get(&order_id).cloned())
    }

    async fn find_by_user(&self, user_id: UserId) -> Result<Vec<Order>> {
        let state = self.state.read().await;
        let mut orders: Vec<_> = state
            .orders
            .values()
            .filter(|o| o.user_id() == user_id)
            .cloned()
            .collect();
        orders.sort_by(|a, b| b.created_at().cmp(&a.created_at()));
        Ok(orders)
    }
}
