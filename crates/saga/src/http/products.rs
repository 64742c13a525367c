use async_trait::async_trait;
use domain::ProductId;
use reqwest::{Method, Response, StatusCode};
use serde::{Deserialize, Serialize};

use super::{Envelope, ServiceEndpoint};
use crate::services::{StockError, StockLedger};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProductDto {
    stock_quantity: i64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct StockChange {
    quantity_change: i64,
}

/// Stock ledger backed by the products service.
///
/// Quantities are read from the public product route and changed through the
/// internal stock route, which applies each change atomically.
#[derive(Debug, Clone)]
pub struct HttpStockLedger {
    endpoint: ServiceEndpoint,
}

impl HttpStockLedger {
    /// Creates a stock ledger for the service at `endpoint`.
    pub fn new(endpoint: ServiceEndpoint) -> Self {
        Self { endpoint }
    }

    async fn read_stock(response: Response) -> Result<u32, StockError> {
        let product = response
            .json::<Envelope<ProductDto>>()
            .await
            .map_err(unavailable)?
            .into_data()
            .ok_or_else(|| {
                StockError::Unavailable("products service reported failure".to_string())
            })?;

        // Negative stock upstream is treated as none left.
        Ok(u32::try_from(product.stock_quantity.max(0)).unwrap_or(u32::MAX))
    }
}

fn unavailable(err: reqwest::Error) -> StockError {
    StockError::Unavailable(err.to_string())
}

#[async_trait]
impl StockLedger for HttpStockLedger {
    #[tracing::instrument(skip(self))]
    async fn quantity(&self, product_id: &ProductId) -> Result<u32, StockError> {
        let response = self
            .endpoint
            .request(Method::GET, &["api", "products", product_id.as_str()])
            .send()
            .await
            .map_err(unavailable)?;

        match response.status() {
            StatusCode::NOT_FOUND => Err(StockError::NotFound(product_id.clone())),
            status if status.is_success() => Self::read_stock(response).await,
            status => Err(StockError::Unavailable(format!(
                "product lookup returned {status}"
            ))),
        }
    }

    #[tracing::instrument(skip(self))]
    async fn adjust(&self, product_id: &ProductId, delta: i64) -> Result<u32, StockError> {
        let response = self
            .endpoint
            .request(
                Method::PUT,
                &["internal", "products", product_id.as_str(), "stock"],
            )
            .json(&StockChange {
                quantity_change: delta,
            })
            .send()
            .await
            .map_err(unavailable)?;

        match response.status() {
            StatusCode::NOT_FOUND => Err(StockError::NotFound(product_id.clone())),
            StatusCode::BAD_REQUEST | StatusCode::CONFLICT => {
                // The rejection body carries no numbers, so read the current quantity.
                let available = self.quantity(product_id).await?;
                Err(StockError::Insufficient {
                    product_id: product_id.clone(),
                    available,
                    requested: u32::try_from(delta.unsigned_abs()).unwrap_or(u32::MAX),
                })
            }
            status if status.is_success() => Self::read_stock(response).await,
            status => Err(StockError::Unavailable(format!(
                "stock update returned {status}"
            ))),
        }
    }
}
