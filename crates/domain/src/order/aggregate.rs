//! Order entity.

use chrono::{DateTime, Utc};
use common::{OrderId, UserId};
use serde::{Deserialize, Serialize};

use super::{Money, OrderError, OrderItem, OrderStatus};

/// An order placed from a user's cart.
///
/// Items are a snapshot taken at creation time and never change afterwards,
/// so `total_amount` always equals the sum of item subtotals.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    id: OrderId,
    user_id: UserId,
    status: OrderStatus,
    items: Vec<OrderItem>,
    total_amount: Money,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl Order {
    /// Creates a new pending order with a fresh id.
    pub fn pending(user_id: UserId, items: Vec<OrderItem>) -> Result<Self, OrderError> {
        if items.is_empty() {
            return Err(OrderError::NoItems);
        }

        let total_amount = Self::sum_items(&items)?;
        let now = Utc::now();
        Ok(Self {
            id: OrderId::new(),
            user_id,
            status: OrderStatus::Pending,
            total_amount,
            items,
            created_at: now,
            updated_at: now,
        })
    }

    /// Rebuilds an order from persisted parts.
    ///
    /// The total is recomputed from the items.
    pub fn restore(
        id: OrderId,
        user_id: UserId,
        status: OrderStatus,
        items: Vec<OrderItem>,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    ) -> Result<Self, OrderError> {
        Ok(Self {
            id,
            user_id,
            status,
            total_amount: Self::sum_items(&items)?,
            items,
            created_at,
            updated_at,
        })
    }

    fn sum_items(items: &[OrderItem]) -> Result<Money, OrderError> {
        items.iter().try_fold(Money::zero(), |total, item| {
            let subtotal = item.checked_subtotal()?;
            total
                .checked_add(subtotal)
                .ok_or_else(|| OrderError::InvalidAmount {
                    input: format!("{total} + {subtotal}"),
                })
        })
    }

    pub fn id(&self) -> OrderId {
        self.id
    }

    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    pub fn status(&self) -> OrderStatus {
        self.status
    }

    pub fn items(&self) -> &[OrderItem] {
        &self.items
    }

    pub fn total_amount(&self) -> Money {
        self.total_amount
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Returns true if the order can still be cancelled.
    pub fn can_be_cancelled(&self) -> bool {
        self.status.can_cancel()
    }

    /// Moves the order to `next`, rejecting transitions outside the status graph.
    ///
    /// On error the order is left untouched.
    pub fn transition_to(&mut self, next: OrderStatus) -> Result<(), OrderError> {
        if !self.status.can_transition_to(next) {
            return Err(OrderError::InvalidStatusTransition {
                from: self.status,
                to: next,
            });
        }

        self.status = next;
        self.updated_at = Utc::now();
        Ok(())
    }
}
