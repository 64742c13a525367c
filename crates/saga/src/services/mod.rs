//! Collaborator traits used by the fulfillment saga, with in-memory
//! implementations.

pub mod cart;
pub mod stock;

pub use cart::{CartError, CartStore, InMemoryCartStore};
pub use stock::{InMemoryStockLedger, StockError, StockLedger};
