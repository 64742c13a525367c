//! HTTP API of the orders service.
//!
//! Provides REST endpoints for creating orders from carts and managing their
//! status, with structured logging (tracing) and Prometheus metrics.

pub mod config;
pub mod error;
pub mod extract;
pub mod response;
pub mod routes;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post, put};
use metrics_exporter_prometheus::PrometheusHandle;
use order_store::{InMemoryOrderStore, OrderStore, OrderStoreError, PostgresOrderStore};
use saga::{
    CartStore, HttpCartStore, HttpStockLedger, InMemoryCartStore, InMemoryStockLedger,
    SagaCoordinator, ServiceEndpoint, StockLedger,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use config::Config;

/// Saga coordinator over type-erased collaborators.
pub type Coordinator =
    SagaCoordinator<Arc<dyn OrderStore>, Arc<dyn CartStore>, Arc<dyn StockLedger>>;

/// Shared application state accessible from all handlers.
pub struct AppState {
    pub orders: Arc<dyn OrderStore>,
    pub saga_coordinator: Coordinator,
}

impl AppState {
    pub fn new(
        orders: Arc<dyn OrderStore>,
        carts: Arc<dyn CartStore>,
        stock: Arc<dyn StockLedger>,
    ) -> Self {
        Self {
            saga_coordinator: SagaCoordinator::new(orders.clone(), carts, stock),
            orders,
        }
    }
}

/// Handles to the in-memory collaborators behind a default state.
#[derive(Debug, Clone, Default)]
pub struct InMemoryBackends {
    pub orders: InMemoryOrderStore,
    pub carts: InMemoryCartStore,
    pub stock: InMemoryStockLedger,
}

/// Errors that prevent the server from starting.
#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error("failed to connect to database: {0}")]
    Database(#[from] sqlx::Error),

    #[error("failed to prepare order store: {0}")]
    OrderStore(#[from] OrderStoreError),

    #[error("failed to build HTTP client: {0}")]
    HttpClient(#[from] reqwest::Error),
}

/// Creates the Axum application router with all routes and shared state.
pub fn create_app(state: Arc<AppState>, metrics_handle: PrometheusHandle) -> Router {
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::get))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::health::check))
        .route("/api/orders", post(routes::orders::create))
        .route("/api/orders/{id}", get(routes::orders::get))
        .route("/api/orders/user/{user_id}", get(routes::orders::list_for_user))
        .route("/api/orders/{id}/status", put(routes::orders::update_status))
        .route("/internal/orders/{id}", get(routes::internal::get_order))
        .with_state(state)
        .merge(metrics_router)
        .fallback(routes::not_found)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}

/// Creates an application state backed entirely by in-memory collaborators.
pub fn create_default_state() -> (Arc<AppState>, InMemoryBackends) {
    let backends = InMemoryBackends::default();
    let state = Arc::new(AppState::new(
        Arc::new(backends.orders.clone()),
        Arc::new(backends.carts.clone()),
        Arc::new(backends.stock.clone()),
    ));
    (state, backends)
}

/// Creates the application state described by `config`.
///
/// Orders go to PostgreSQL when `DATABASE_URL` is set (migrations are applied
/// on startup) and stay in memory otherwise. Carts and stock always come from
/// the sibling services.
pub async fn create_state(config: &Config) -> Result<Arc<AppState>, StartupError> {
    let orders: Arc<dyn OrderStore> = match &config.database_url {
        Some(url) => {
            let pool = sqlx::postgres::PgPoolOptions::new()
                .max_connections(10)
                .connect(url)
                .await?;
            let store = PostgresOrderStore::new(pool);
            store.run_migrations().await.map_err(OrderStoreError::from)?;
            tracing::info!("using PostgreSQL order store");
            Arc::new(store)
        }
        None => {
            tracing::warn!("DATABASE_URL not set, orders are kept in memory");
            Arc::new(InMemoryOrderStore::new())
        }
    };

    let client = reqwest::Client::builder()
        .timeout(config.http_timeout)
        .build()?;
    let endpoint = |base_url: &str| {
        let endpoint = ServiceEndpoint::new(client.clone(), base_url);
        match &config.service_auth_token {
            Some(token) => endpoint.with_auth_token(token.clone()),
            None => endpoint,
        }
    };

    let carts = HttpCartStore::new(endpoint(&config.cart_service_url));
    let stock = HttpStockLedger::new(endpoint(&config.products_service_url));

    Ok(Arc::new(AppState::new(
        orders,
        Arc::new(carts),
        Arc::new(stock),
    )))
}
