//! Stock ledger trait and in-memory implementation.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use domain::ProductId;
use thiserror::Error;
use tokio::sync::RwLock;

/// Errors reported by a stock ledger.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StockError {
    /// The product does not exist.
    #[error("Product {0} not found")]
    NotFound(ProductId),

    /// Applying the adjustment would make the quantity negative.
    #[error(
        "Insufficient stock for product {product_id}. Available: {available}, Requested: {requested}"
    )]
    Insufficient {
        product_id: ProductId,
        available: u32,
        requested: u32,
    },

    /// The ledger could not be reached or answered unexpectedly.
    #[error("Products service unavailable: {0}")]
    Unavailable(String),
}

/// Authoritative per-product stock quantities.
#[async_trait]
pub trait StockLedger: Send + Sync {
    /// Returns the current quantity of a product.
    async fn quantity(&self, product_id: &ProductId) -> Result<u32, StockError>;

    /// Atomically adds `delta` (negative to decrement) to a product's quantity
    /// and returns the new quantity.
    ///
    /// A result below zero is rejected with `Insufficient` and the quantity is
    /// left untouched.
    async fn adjust(&self, product_id: &ProductId, delta: i64) -> Result<u32, StockError>;
}

#[async_trait]
impl<T: StockLedger + ?Sized> StockLedger for Arc<T> {
    async fn quantity(&self, product_id: &ProductId) -> Result<u32, StockError> {
        (**self).quantity(product_id).await
    }

    async fn adjust(&self, product_id: &ProductId, delta: i64) -> Result<u32, StockError> {
        (**self).adjust(product_id, delta).await
    }
}

#[derive(Debug, Default)]
struct InMemoryStockState {
    stock: HashMap<ProductId, u32>,
    fail_on_adjust: HashSet<ProductId>,
}

/// In-memory stock ledger for tests and local runs.
#[derive(Debug, Clone, Default)]
pub struct InMemoryStockLedger {
    state: Arc<RwLock<InMemoryStockState>>,
}

impl InMemoryStockLedger {
    /// Creates an empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the quantity of a product, creating it if needed.
    pub async fn set_stock(&self, product_id: impl Into<ProductId>, quantity: u32) {
        self.state
            .write()
            .await
            .stock
            .insert(product_id.into(), quantity);
    }

    /// Removes a product from the ledger.
    pub async fn remove_product(&self, product_id: &ProductId) {
        self.state.write().await.stock.remove(product_id);
    }

    /// Returns the quantity of a product, if it exists.
    pub async fn stock(&self, product_id: impl Into<ProductId>) -> Option<u32> {
        self.state
            .read()
            .await
            .stock
            .get(&product_id.into())
            .copied()
    }

    /// Makes every adjustment of `product_id` fail as if the ledger were down.
    pub async fn set_fail_on_adjust(&self, product_id: impl Into<ProductId>, fail: bool) {
        let mut state = self.state.write().await;
        let product_id = product_id.into();
        if fail {
            state.fail_on_adjust.insert(product_id);
        } else {
            state.fail_on_adjust.remove(&product_id);
        }
    }
}

#[async_trait]
impl StockLedger for InMemoryStockLedger {
    async fn quantity(&self, product_id: &ProductId) -> Result<u32, StockError> {
        self.state
            .read()
            .await
            .stock
            .get(product_id)
            .copied()
            .ok_or_else(|| StockError::NotFound(product_id.clone()))
    }

    async fn adjust(&self, product_id: &ProductId, delta: i64) -> Result<u32, StockError> {
        // Check and write under one lock so concurrent decrements cannot oversell.
        let mut state = self.state.write().await;

        if state.fail_on_adjust.contains(product_id) {
            return Err(StockError::Unavailable(format!(
                "adjustment of {product_id} rejected"
            )));
        }

        let current = state
            .stock
            .get_mut(product_id)
            .ok_or_else(|| StockError::NotFound(product_id.clone()))?;

        let next = i64::from(*current) + delta;
        if next < 0 {
            return Err(StockError::Insufficient {
                product_id: product_id.clone(),
                available: *current,
                requested: u32::try_from(delta.unsigned_abs()).unwrap_or(u32::MAX),
            });
        }

        *current = u32::try_from(next)
            .map_err(|_| StockError::Unavailable(format!("quantity of {product_id} overflowed")))?;
        Ok(*current)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn adjust_applies_delta() {
        let ledger = InMemoryStockLedger::new();
        ledger.set_stock("P1", 5).await;

        let p1 = ProductId::new("P1");
        assert_eq!(ledger.adjust(&p1, -2).await.unwrap(), 3);
        assert_eq!(ledger.adjust(&p1, 4).await.unwrap(), 7);
        assert_eq!(ledger.quantity(&p1).await.unwrap(), 7);
    }

    #[tokio::test]
    async fn adjust_below_zero_is_rejected_without_mutation() {
        let ledger = InMemoryStockLedger::new();
        ledger.set_stock("P1", 1).await;

        let result = ledger.adjust(&ProductId::new("P1"), -2).await;

        assert_eq!(
            result,
            Err(StockError::Insufficient {
                product_id: ProductId::new("P1"),
                available: 1,
                requested: 2,
            })
        );
        assert_eq!(ledger.stock("P1").await, Some(1));
    }

    #[tokio::test]
    async fn unknown_product() {
        let ledger = InMemoryStockLedger::new();
        let missing = ProductId::new("missing");

        assert!(matches!(
            ledger.quantity(&missing).await,
            Err(StockError::NotFound(_))
        ));
        assert!(matches!(
            ledger.adjust(&missing, 1).await,
            Err(StockError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn fail_on_adjust_is_per_product() {
        let ledger = InMemoryStockLedger::new();
        ledger.set_stock("P1", 5).await;
        ledger.set_stock("P2", 5).await;
        ledger.set_fail_on_adjust("P2", true).await;

        assert!(ledger.adjust(&ProductId::new("P1"), -1).await.is_ok());
        assert!(matches!(
            ledger.adjust(&ProductId::new("P2"), -1).await,
            Err(StockError::Unavailable(_))
        ));
        assert_eq!(ledger.stock("P2").await, Some(5));

        ledger.set_fail_on_adjust("P2", false).await;
        assert_eq!(ledger.adjust(&ProductId::new("P2"), -1).await.unwrap(), 4);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_decrements_never_oversell() {
        let ledger = InMemoryStockLedger::new();
        ledger.set_stock("P1", 10).await;

        let handles: Vec<_> = (0..25)
            .map(|_| {
                let ledger = ledger.clone();
                tokio::spawn(async move { ledger.adjust(&ProductId::new("P1"), -1).await })
            })
            .collect();

        let mut succeeded = 0;
        for handle in handles {
            if handle.await.unwrap().is_ok() {
                succeeded += 1;
            }
        }

        assert_eq!(succeeded, 10);
        assert_eq!(ledger.stock("P1").await, Some(0));
    }
}
