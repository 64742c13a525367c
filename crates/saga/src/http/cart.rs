use async_trait::async_trait;
use common::UserId;
use domain::{CartLine, CartSnapshot, Money};
use reqwest::{Method, StatusCode};
use serde::Deserialize;

use super::{Envelope, ServiceEndpoint};
use crate::services::{CartError, CartStore};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CartDto {
    #[serde(default)]
    items: Vec<CartItemDto>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CartItemDto {
    product_id: String,
    product_name: String,
    quantity: u32,
    price_at_addition: Money,
}

/// Cart store backed by the cart service's REST API.
#[derive(Debug, Clone)]
pub struct HttpCartStore {
    endpoint: ServiceEndpoint,
}

impl HttpCartStore {
    /// Creates a cart store for the service at `endpoint`.
    pub fn new(endpoint: ServiceEndpoint) -> Self {
        Self { endpoint }
    }
}

fn unavailable(err: reqwest::Error) -> CartError {
    CartError::Unavailable(err.to_string())
}

#[async_trait]
impl CartStore for HttpCartStore {
    #[tracing::instrument(skip(self))]
    async fn get_cart(&self, user_id: UserId) -> Result<Option<CartSnapshot>, CartError> {
        let user = user_id.to_string();
        let response = self
            .endpoint
            .request(Method::GET, &["api", "cart", user.as_str()])
            .send()
            .await
            .map_err(unavailable)?;

        match response.status() {
            StatusCode::NOT_FOUND => return Ok(None),
            status if !status.is_success() => {
                return Err(CartError::Unavailable(format!(
                    "cart lookup returned {status}"
                )));
            }
            _ => {}
        }

        let cart = response
            .json::<Envelope<CartDto>>()
            .await
            .map_err(unavailable)?
            .into_data()
            .ok_or_else(|| CartError::Unavailable("cart service reported failure".to_string()))?;

        let lines = cart
            .items
            .into_iter()
            .map(|item| {
                CartLine::new(
                    item.product_id,
                    item.product_name,
                    item.quantity,
                    item.price_at_addition,
                )
                .map_err(|e| CartError::Invalid(e.to_string()))
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Some(CartSnapshot::new(user_id, lines)))
    }

    #[tracing::instrument(skip(self))]
    async fn clear(&self, user_id: UserId) -> Result<(), CartError> {
        let user = user_id.to_string();
        let response = self
            .endpoint
            .request(Method::DELETE, &["api", "cart", user.as_str()])
            .send()
            .await
            .map_err(unavailable)?;

        let status = response.status();
        if status.is_success() || status == StatusCode::NOT_FOUND {
            Ok(())
        } else {
            Err(CartError::Unavailable(format!(
                "cart clear returned {status}"
            )))
        }
    }
}
