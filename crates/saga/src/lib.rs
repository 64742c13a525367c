//! Order fulfillment saga.
//!
//! Turns a user's cart into a persisted order while keeping the products
//! service's stock consistent with it:
//! 1. Fetch the cart
//! 2. Verify stock for every line
//! 3. Persist the pending order
//! 4. Decrement stock
//! 5. Clear the cart (best effort)
//!
//! A failure after the order is persisted is compensated in reverse order:
//! decremented stock is restored, then the order is deleted.

pub mod compensation;
pub mod coordinator;
pub mod error;
pub mod http;
pub mod order_fulfillment;
pub mod services;

pub use compensation::{Compensation, CompensationLog, CompensationReport, FailedCompensation};
pub use coordinator::SagaCoordinator;
pub use error::SagaError;
pub use http::{HttpCartStore, HttpStockLedger, ServiceEndpoint};
pub use services::{
    CartError, CartStore, InMemoryCartStore, InMemoryStockLedger, StockError, StockLedger,
};
