//! Cart snapshot as read from the cart service at saga start.

use common::UserId;

use super::{Money, OrderError, ProductId};

/// One line of a user's cart.
///
/// `unit_price` is the price recorded when the product was added to the cart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CartLine {
    product_id: ProductId,
    product_name: String,
    quantity: u32,
    unit_price: Money,
}

impl CartLine {
    /// Creates a cart line, rejecting zero quantities and negative prices.
    pub fn new(
        product_id: impl Into<ProductId>,
        product_name: impl Into<String>,
        quantity: u32,
        unit_price: Money,
    ) -> Result<Self, OrderError> {
        if quantity == 0 {
            return Err(OrderError::InvalidQuantity { quantity });
        }
        if unit_price.is_negative() {
            return Err(OrderError::InvalidPrice {
                price: unit_price.cents(),
            });
        }

        Ok(Self {
            product_id: product_id.into(),
            product_name: product_name.into(),
            quantity,
            unit_price,
        })
    }

    pub fn product_id(&self) -> &ProductId {
        &self.product_id
    }

    pub fn product_name(&self) -> &str {
        &self.product_name
    }

    pub fn quantity(&self) -> u32 {
        self.quantity
    }

    pub fn unit_price(&self) -> Money {
        self.unit_price
    }
}

/// A user's cart, read once and not modified afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CartSnapshot {
    user_id: UserId,
    lines: Vec<CartLine>,
}

impl CartSnapshot {
    /// Creates a snapshot; line order is preserved.
    pub fn new(user_id: UserId, lines: Vec<CartLine>) -> Self {
        Self { user_id, lines }
    }

    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    pub fn lines(&self) -> &[CartLine] {
        &self.lines
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}
