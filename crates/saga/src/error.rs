//! Saga error types.

use domain::{OrderError, ProductId};
use order_store::OrderStoreError;
use thiserror::Error;

use crate::services::{CartError, StockError};

/// Errors that end an order-fulfillment saga.
///
/// Every variant is returned only after the saga has undone its own writes.
#[derive(Debug, Error)]
pub enum SagaError {
    /// The user has no cart or the cart has no lines.
    #[error("Cannot create order from empty cart")]
    EmptyCart,

    /// A cart line references a product the products service does not know.
    #[error("Product {0} not found")]
    ProductNotFound(ProductId),

    /// A product does not have enough stock for its cart line.
    #[error("Insufficient stock for {product_name}. Available: {available}, Requested: {requested}")]
    InsufficientStock {
        product_id: ProductId,
        product_name: String,
        available: u32,
        requested: u32,
    },

    /// Decrementing stock failed for a reason other than contention.
    #[error("Stock update failed for product {product_id}: {source}")]
    StockUpdateFailed {
        product_id: ProductId,
        #[source]
        source: StockError,
    },

    /// The cart returned by the cart service cannot be turned into an order.
    #[error("Invalid cart: {0}")]
    InvalidCart(String),

    /// A collaborator could not be reached.
    #[error("{0}")]
    ServiceUnavailable(String),

    /// Order domain rule violated.
    #[error("Domain error: {0}")]
    Domain(#[from] OrderError),

    /// Order persistence failed.
    #[error("Order store error: {0}")]
    OrderStore(#[from] OrderStoreError),
}

impl From<CartError> for SagaError {
    fn from(err: CartError) -> Self {
        match err {
            CartError::Invalid(reason) => SagaError::InvalidCart(reason),
            unavailable @ CartError::Unavailable(_) => {
                SagaError::ServiceUnavailable(unavailable.to_string())
            }
        }
    }
}

/// Convenience type alias for saga results.
pub type Result<T> = std::result::Result<T, SagaError>;
