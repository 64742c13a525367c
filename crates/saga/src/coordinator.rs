//! Saga coordinator for turning a cart into an order.

use common::UserId;
use domain::{CartLine, CartSnapshot, Order, OrderItem};
use order_store::OrderStore;

use crate::compensation::{Compensation, CompensationLog};
use crate::error::SagaError;
use crate::order_fulfillment;
use crate::services::{CartStore, StockError, StockLedger};

/// Orchestrates the order fulfillment saga.
///
/// Steps run strictly in sequence: fetch cart, verify stock, persist the order,
/// decrement stock, clear the cart. Nothing is written before the order is
/// persisted; after that point every failure is compensated in reverse order
/// before the error is returned.
pub struct SagaCoordinator<O, C, L>
where
    O: OrderStore,
    C: CartStore,
    L: StockLedger,
{
    orders: O,
    carts: C,
    stock: L,
}

impl<O, C, L> SagaCoordinator<O, C, L>
where
    O: OrderStore,
    C: CartStore,
    L: StockLedger,
{
    /// Creates a new saga coordinator.
    pub fn new(orders: O, carts: C, stock: L) -> Self {
        Self {
            orders,
            carts,
            stock,
        }
    }

    /// The order store the saga writes to.
    pub fn orders(&self) -> &O {
        &self.orders
    }

    /// Creates an order from the user's current cart.
    ///
    /// On success the order is persisted as `pending`, stock has been
    /// decremented for every line and the cart has been cleared (best effort).
    /// On failure no order exists and all stock changes have been reverted,
    /// unless compensation itself failed, which is logged for reconciliation.
    #[tracing::instrument(skip(self), fields(saga_type = order_fulfillment::SAGA_TYPE))]
    pub async fn create_order(&self, user_id: UserId) -> Result<Order, SagaError> {
        metrics::counter!("saga_executions_total").increment(1);
        let saga_start = std::time::Instant::now();

        let result = self.run(user_id).await;

        let duration = saga_start.elapsed().as_secs_f64();
        metrics::histogram!("saga_duration_seconds").record(duration);
        match &result {
            Ok(order) => {
                metrics::counter!("saga_completed").increment(1);
                tracing::info!(order_id = %order.id(), duration, "saga completed successfully");
            }
            Err(e) => {
                metrics::counter!("saga_failed").increment(1);
                tracing::warn!(error = %e, duration, "saga failed");
            }
        }

        result
    }

    async fn run(&self, user_id: UserId) -> Result<Order, SagaError> {
        // 1. Fetch the cart
        tracing::info!(step = order_fulfillment::STEP_FETCH_CART, "saga step started");
        let cart = self
            .carts
            .get_cart(user_id)
            .await?
            .filter(|cart| !cart.is_empty())
            .ok_or(SagaError::EmptyCart)?;

        // 2. Verify stock for every line
        tracing::info!(step = order_fulfillment::STEP_VERIFY_STOCK, "saga step started");
        self.verify_stock(&cart).await?;

        // 3. Snapshot the lines and persist the pending order
        tracing::info!(step = order_fulfillment::STEP_PERSIST_ORDER, "saga step started");
        let items = cart.lines().iter().map(OrderItem::from_cart_line).collect();
        let order = self.orders.create(Order::pending(user_id, items)?).await?;

        let mut compensations = CompensationLog::new();
        compensations.record(Compensation::DeleteOrder(order.id()));

        // 4. Decrement stock
        tracing::info!(
            step = order_fulfillment::STEP_DECREMENT_STOCK,
            order_id = %order.id(),
            "saga step started"
        );
        for line in cart.lines() {
            let delta = -i64::from(line.quantity());
            match self.stock.adjust(line.product_id(), delta).await {
                Ok(remaining) => {
                    tracing::debug!(product_id = %line.product_id(), remaining, "stock decremented");
                    compensations.record(Compensation::RestoreStock {
                        product_id: line.product_id().clone(),
                        quantity: line.quantity(),
                    });
                }
                Err(e) => {
                    tracing::warn!(
                        step = order_fulfillment::STEP_DECREMENT_STOCK,
                        product_id = %line.product_id(),
                        error = %e,
                        "saga step failed, compensating"
                    );
                    self.compensate(compensations, &order).await;
                    return Err(stock_update_error(line, e));
                }
            }
        }

        // 5. Clear the cart; the order stands even if this fails
        tracing::info!(step = order_fulfillment::STEP_CLEAR_CART, "saga step started");
        if let Err(e) = self.carts.clear(user_id).await {
            tracing::warn!(order_id = %order.id(), error = %e, "failed to clear cart after order creation");
        }

        Ok(order)
    }

    async fn verify_stock(&self, cart: &CartSnapshot) -> Result<(), SagaError> {
        for line in cart.lines() {
            let available = self
                .stock
                .quantity(line.product_id())
                .await
                .map_err(stock_check_error)?;

            if available < line.quantity() {
                return Err(SagaError::InsufficientStock {
                    product_id: line.product_id().clone(),
                    product_name: line.product_name().to_string(),
                    available,
                    requested: line.quantity(),
                });
            }
        }
        Ok(())
    }

    async fn compensate(&self, compensations: CompensationLog, order: &Order) {
        let report = compensations.run(&self.orders, &self.stock).await;

        if !report.is_clean() {
            let failed: Vec<String> = report
                .failed
                .iter()
                .map(|f| format!("{}: {}", f.action, f.reason))
                .collect();
            tracing::error!(
                order_id = %order.id(),
                user_id = %order.user_id(),
                needs_reconciliation = true,
                failed = ?failed,
                "saga compensation incomplete"
            );
        }
    }
}

fn stock_check_error(err: StockError) -> SagaError {
    match err {
        StockError::NotFound(product_id) => SagaError::ProductNotFound(product_id),
        other => SagaError::ServiceUnavailable(other.to_string()),
    }
}

fn stock_update_error(line: &CartLine, err: StockError) -> SagaError {
    match err {
        StockError::Insufficient {
            available,
            requested,
            ..
        } => SagaError::InsufficientStock {
            product_id: line.product_id().clone(),
            product_name: line.product_name().to_string(),
            available,
            requested,
        },
        other => SagaError::StockUpdateFailed {
            product_id: line.product_id().clone(),
            source: other,
        },
    }
}

#[cfg(test)]
mod tests {
    use domain::{Money, OrderStatus, ProductId};
    use order_store::InMemoryOrderStore;

    use super::*;
    use crate::services::{InMemoryCartStore, InMemoryStockLedger};

    type TestCoordinator =
        SagaCoordinator<InMemoryOrderStore, InMemoryCartStore, InMemoryStockLedger>;

    fn setup() -> (
        TestCoordinator,
        InMemoryOrderStore,
        InMemoryCartStore,
        InMemoryStockLedger,
    ) {
        let orders = InMemoryOrderStore::new();
        let carts = InMemoryCartStore::new();
        let stock = InMemoryStockLedger::new();

        let coordinator = SagaCoordinator::new(orders.clone(), carts.clone(), stock.clone());
        (coordinator, orders, carts, stock)
    }

    fn line(product_id: &str, name: &str, quantity: u32, cents: i64) -> CartLine {
        CartLine::new(product_id, name, quantity, Money::from_cents(cents)).unwrap()
    }

    #[tokio::test]
    async fn test_happy_path() {
        let (coordinator, orders, carts, stock) = setup();
        let user_id = UserId::new();
        stock.set_stock("P1", 5).await;
        carts
            .put_cart(user_id, vec![line("P1", "Widget", 2, 1000)])
            .await;

        let order = coordinator.create_order(user_id).await.unwrap();

        assert_eq!(order.status(), OrderStatus::Pending);
        assert_eq!(order.user_id(), user_id);
        assert_eq!(order.total_amount(), Money::from_cents(2000));
        assert_eq!(stock.stock("P1").await, Some(3));
        assert_eq!(carts.line_count(user_id).await, 0);
        assert_eq!(
            orders.find_by_id(order.id()).await.unwrap(),
            Some(order.clone())
        );
    }

    #[tokio::test]
    async fn test_missing_cart_is_empty_cart() {
        let (coordinator, orders, _, _) = setup();

        let result = coordinator.create_order(UserId::new()).await;

        assert!(matches!(result, Err(SagaError::EmptyCart)));
        assert_eq!(orders.order_count().await, 0);
    }

    #[tokio::test]
    async fn test_unknown_product_writes_nothing() {
        let (coordinator, orders, carts, stock) = setup();
        let user_id = UserId::new();
        stock.set_stock("P1", 5).await;
        carts
            .put_cart(
                user_id,
                vec![line("P1", "Widget", 1, 1000), line("GONE", "Old", 1, 500)],
            )
            .await;

        let result = coordinator.create_order(user_id).await;

        assert!(matches!(result, Err(SagaError::ProductNotFound(p)) if p == ProductId::new("GONE")));
        assert_eq!(orders.order_count().await, 0);
        assert_eq!(stock.stock("P1").await, Some(5));
        assert_eq!(carts.line_count(user_id).await, 2);
    }

    #[tokio::test]
    async fn test_cart_service_down() {
        let (coordinator, orders, carts, _) = setup();
        carts.set_fail_on_get(true).await;

        let result = coordinator.create_order(UserId::new()).await;

        assert!(matches!(result, Err(SagaError::ServiceUnavailable(_))));
        assert_eq!(orders.order_count().await, 0);
    }

    #[tokio::test]
    async fn test_persist_failure_touches_no_stock() {
        let (coordinator, orders, carts, stock) = setup();
        let user_id = UserId::new();
        stock.set_stock("P1", 5).await;
        carts
            .put_cart(user_id, vec![line("P1", "Widget", 2, 1000)])
            .await;
        orders.set_fail_on_create(true).await;

        let result = coordinator.create_order(user_id).await;

        assert!(matches!(result, Err(SagaError::OrderStore(_))));
        assert_eq!(stock.stock("P1").await, Some(5));
        assert_eq!(carts.line_count(user_id).await, 1);
    }

    #[tokio::test]
    async fn test_stock_update_failure_is_compensated() {
        let (coordinator, orders, carts, stock) = setup();
        let user_id = UserId::new();
        stock.set_stock("P1", 5).await;
        stock.set_stock("P2", 5).await;
        stock.set_fail_on_adjust("P2", true).await;
        carts
            .put_cart(
                user_id,
                vec![line("P1", "Widget", 2, 1000), line("P2", "Gadget", 1, 500)],
            )
            .await;

        let result = coordinator.create_order(user_id).await;

        assert!(matches!(
            result,
            Err(SagaError::StockUpdateFailed { ref product_id, .. }) if *product_id == ProductId::new("P2")
        ));
        assert_eq!(orders.order_count().await, 0);
        assert_eq!(stock.stock("P1").await, Some(5));
        assert_eq!(stock.stock("P2").await, Some(5));
        assert_eq!(carts.line_count(user_id).await, 2);
    }
}
