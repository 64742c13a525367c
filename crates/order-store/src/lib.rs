//! Order persistence for the orders service.
//!
//! `OrderStore` is the contract the fulfillment saga and the HTTP layer
//! depend on. Two implementations are provided: an in-memory store for tests
//! and local runs, and a PostgreSQL store.

pub mod error;
pub mod memory;
pub mod postgres;
pub mod store;

pub use error::{OrderStoreError, Result};
pub use memory::InMemoryOrderStore;
pub use postgres::PostgresOrderStore;
pub use store::OrderStore;
