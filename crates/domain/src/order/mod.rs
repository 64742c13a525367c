//! Order entity and related types.

mod aggregate;
mod cart;
mod state;
mod value_objects;

pub use aggregate::Order;
pub use cart::{CartLine, CartSnapshot};
pub use state::OrderStatus;
pub use value_objects::{Money, OrderItem, ProductId};

use thiserror::Error;

/// Errors raised by order domain rules.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OrderError {
    /// Invalid quantity.
    #[error("Invalid quantity: {quantity} (must be greater than 0)")]
    InvalidQuantity { quantity: u32 },

    /// Invalid price.
    #[error("Invalid price: {price} cents (must not be negative)")]
    InvalidPrice { price: i64 },

    /// A decimal amount could not be parsed.
    #[error("Invalid amount: '{input}'")]
    InvalidAmount { input: String },

    /// Order has no items.
    #[error("Order has no items")]
    NoItems,

    /// The requested status is not reachable from the current one.
    #[error("Cannot transition order from {from} to {to}")]
    InvalidStatusTransition { from: OrderStatus, to: OrderStatus },

    /// Status string does not name a known status.
    #[error(
        "Invalid order status: {value}. Must be one of: pending, processing, shipped, delivered, cancelled"
    )]
    UnknownStatus { value: String },
}
