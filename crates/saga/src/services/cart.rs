//! Cart store trait and in-memory implementation.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use common::UserId;
use domain::{CartLine, CartSnapshot};
use thiserror::Error;
use tokio::sync::RwLock;

/// Errors reported by a cart store.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CartError {
    /// The cart service answered with a cart that cannot be ordered.
    #[error("Invalid cart: {0}")]
    Invalid(String),

    /// The cart service could not be reached or answered unexpectedly.
    #[error("Cart service unavailable: {0}")]
    Unavailable(String),
}

/// Read and clear access to users' shopping carts.
#[async_trait]
pub trait CartStore: Send + Sync {
    /// Returns the user's cart, or `None` when the user has no cart.
    async fn get_cart(&self, user_id: UserId) -> Result<Option<CartSnapshot>, CartError>;

    /// Empties the user's cart. Clearing an absent cart succeeds.
    async fn clear(&self, user_id: UserId) -> Result<(), CartError>;
}

#[async_trait]
impl<T: CartStore + ?Sized> CartStore for Arc<T> {
    async fn get_cart(&self, user_id: UserId) -> Result<Option<CartSnapshot>, CartError> {
        (**self).get_cart(user_id).await
    }

    async fn clear(&self, user_id: UserId) -> Result<(), CartError> {
        (**self).clear(user_id).await
    }
}

#[derive(Debug, Default)]
struct InMemoryCartState {
    carts: HashMap<UserId, Vec<CartLine>>,
    fail_on_get: bool,
    fail_on_clear: bool,
}

/// In-memory cart store for tests and local runs.
#[derive(Debug, Clone, Default)]
pub struct InMemoryCartStore {
    state: Arc<RwLock<InMemoryCartState>>,
}

impl InMemoryCartStore {
    /// Creates an empty cart store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the user's cart with `lines`.
    pub async fn put_cart(&self, user_id: UserId, lines: Vec<CartLine>) {
        self.state.write().await.carts.insert(user_id, lines);
    }

    /// Returns the number of lines in the user's cart.
    pub async fn line_count(&self, user_id: UserId) -> usize {
        self.state
            .read()
            .await
            .carts
            .get(&user_id)
            .map_or(0, Vec::len)
    }

    /// Makes subsequent `get_cart` calls fail.
    pub async fn set_fail_on_get(&self, fail: bool) {
        self.state.write().await.fail_on_get = fail;
    }

    /// Makes subsequent `clear` calls fail.
    pub async fn set_fail_on_clear(&self, fail: bool) {
        self.state.write().await.fail_on_clear = fail;
    }
}

#[async_trait]
impl CartStore for InMemoryCartStore {
    async fn get_cart(&self, user_id: UserId) -> Result<Option<CartSnapshot>, CartError> {
        let state = self.state.read().await;

        if state.fail_on_get {
            return Err(CartError::Unavailable("cart lookup rejected".to_string()));
        }

        Ok(state
            .carts
            .get(&user_id)
            .map(|lines| CartSnapshot::new(user_id, lines.clone())))
    }

    async fn clear(&self, user_id: UserId) -> Result<(), CartError> {
        let mut state = self.state.write().await;

        if state.fail_on_clear {
            return Err(CartError::Unavailable("cart clear rejected".to_string()));
        }

        state.carts.remove(&user_id);
        Ok(())
    }
}
