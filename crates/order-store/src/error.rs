use common::OrderId;
use domain::{OrderError, OrderStatus};
use thiserror::Error;

/// Errors that can occur when interacting with the order store.
#[derive(Debug, Error)]
pub enum OrderStoreError {
    /// The order was not found.
    #[error("Order with id {0} not found")]
    NotFound(OrderId),

    /// The requested status change is not allowed by the status graph.
    #[error("Cannot transition order from {from} to {to}")]
    InvalidStatusTransition { from: OrderStatus, to: OrderStatus },

    /// A stored row could not be mapped back to a domain value.
    #[error("Corrupt order row: {0}")]
    Corrupt(String),

    /// The store refused the write (used by test doubles to simulate outages).
    #[error("Order store unavailable: {0}")]
    Unavailable(String),

    /// A database error occurred.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A database migration error occurred.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

impl From<OrderError> for OrderStoreError {
    fn from(err: OrderError) -> Self {
        match err {
            OrderError::InvalidStatusTransition { from, to } => {
                OrderStoreError::InvalidStatusTransition { from, to }
            }
            other => OrderStoreError::Corrupt(other.to_string()),
        }
    }
}

/// Result type for order store operations.
pub type Result<T> = std::result::Result<T, OrderStoreError>;
