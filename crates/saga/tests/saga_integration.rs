//! Integration tests for the order fulfillment saga.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use common::UserId;
use domain::{CartLine, Money, OrderError, OrderStatus, ProductId};
use order_store::{InMemoryOrderStore, OrderStore, OrderStoreError};
use saga::{
    InMemoryCartStore, InMemoryStockLedger, SagaCoordinator, SagaError, StockError, StockLedger,
};

/// Ledger whose availability checks see stale quantities, as when another
/// buyer drains stock between the saga's check and its decrement.
#[derive(Clone)]
struct StaleReadLedger {
    inner: InMemoryStockLedger,
    stale: Arc<HashMap<ProductId, u32>>,
}

#[async_trait]
impl StockLedger for StaleReadLedger {
    async fn quantity(&self, product_id: &ProductId) -> Result<u32, StockError> {
        match self.stale.get(product_id) {
            Some(quantity) => Ok(*quantity),
            None => self.inner.quantity(product_id).await,
        }
    }

    async fn adjust(&self, product_id: &ProductId, delta: i64) -> Result<u32, StockError> {
        self.inner.adjust(product_id, delta).await
    }
}

struct TestHarness<L: StockLedger> {
    coordinator: SagaCoordinator<InMemoryOrderStore, InMemoryCartStore, L>,
    orders: InMemoryOrderStore,
    carts: InMemoryCartStore,
    stock: InMemoryStockLedger,
}

impl TestHarness<InMemoryStockLedger> {
    fn new() -> Self {
        let stock = InMemoryStockLedger::new();
        Self::with_ledger(stock.clone(), stock)
    }
}

impl<L: StockLedger> TestHarness<L> {
    fn with_ledger(ledger: L, stock: InMemoryStockLedger) -> Self {
        let orders = InMemoryOrderStore::new();
        let carts = InMemoryCartStore::new();
        let coordinator = SagaCoordinator::new(orders.clone(), carts.clone(), ledger);

        Self {
            coordinator,
            orders,
            carts,
            stock,
        }
    }

    async fn cart(&self, lines: Vec<CartLine>) -> UserId {
        let user_id = UserId::new();
        self.carts.put_cart(user_id, lines).await;
        user_id
    }
}

fn line(product_id: &str, name: &str, quantity: u32, cents: i64) -> CartLine {
    CartLine::new(product_id, name, quantity, Money::from_cents(cents)).unwrap()
}

mod happy_path {
    use super::*;

    #[tokio::test]
    async fn single_line_example() {
        let h = TestHarness::new();
        h.stock.set_stock("P1", 5).await;
        let user_id = h.cart(vec![line("P1", "Widget", 2, 1000)]).await;

        let order = h.coordinator.create_order(user_id).await.unwrap();

        assert_eq!(order.total_amount(), Money::parse_decimal("20.00").unwrap());
        assert_eq!(order.status(), OrderStatus::Pending);
        assert_eq!(h.stock.stock("P1").await, Some(3));
        assert_eq!(h.carts.line_count(user_id).await, 0);
    }

    #[tokio::test]
    async fn totals_and_stock_for_several_lines() {
        let h = TestHarness::new();
        h.stock.set_stock("P1", 10).await;
        h.stock.set_stock("P2", 4).await;
        h.stock.set_stock("P3", 1).await;
        let user_id = h
            .cart(vec![
                line("P1", "Widget", 3, 1250),
                line("P2", "Gadget", 4, 999),
                line("P3", "Gizmo", 1, 5),
            ])
            .await;

        let order = h.coordinator.create_order(user_id).await.unwrap();

        let expected: i64 = order
            .items()
            .iter()
            .map(|i| i64::from(i.quantity) * i.unit_price.cents())
            .sum();
        assert_eq!(order.total_amount().cents(), expected);
        assert_eq!(order.total_amount().cents(), 3 * 1250 + 4 * 999 + 5);

        assert_eq!(h.stock.stock("P1").await, Some(7));
        assert_eq!(h.stock.stock("P2").await, Some(0));
        assert_eq!(h.stock.stock("P3").await, Some(0));
        assert_eq!(h.carts.line_count(user_id).await, 0);
    }

    #[tokio::test]
    async fn items_snapshot_cart_in_order() {
        let h = TestHarness::new();
        h.stock.set_stock("P1", 5).await;
        h.stock.set_stock("P2", 5).await;
        let user_id = h
            .cart(vec![line("P2", "Gadget", 1, 500), line("P1", "Widget", 2, 1000)])
            .await;

        let order = h.coordinator.create_order(user_id).await.unwrap();

        let snapshot: Vec<_> = order
            .items()
            .iter()
            .map(|i| (i.product_id.as_str(), i.product_name.as_str(), i.quantity))
            .collect();
        assert_eq!(snapshot, vec![("P2", "Gadget", 1), ("P1", "Widget", 2)]);

        let stored = h.orders.find_by_id(order.id()).await.unwrap().unwrap();
        assert_eq!(stored, order);
    }

    #[tokio::test]
    async fn cart_clear_failure_keeps_the_order() {
        let h = TestHarness::new();
        h.stock.set_stock("P1", 5).await;
        let user_id = h.cart(vec![line("P1", "Widget", 2, 1000)]).await;
        h.carts.set_fail_on_clear(true).await;

        let order = h.coordinator.create_order(user_id).await.unwrap();

        assert!(h.orders.find_by_id(order.id()).await.unwrap().is_some());
        assert_eq!(h.stock.stock("P1").await, Some(3));
        assert_eq!(h.carts.line_count(user_id).await, 1);
    }
}

mod rejected_before_commit {
    use super::*;

    #[tokio::test]
    async fn empty_cart() {
        let h = TestHarness::new();
        h.stock.set_stock("P1", 5).await;
        let user_id = h.cart(vec![]).await;

        let result = h.coordinator.create_order(user_id).await;

        assert!(matches!(result, Err(SagaError::EmptyCart)));
        assert_eq!(result.unwrap_err().to_string(), "Cannot create order from empty cart");
        assert_eq!(h.orders.order_count().await, 0);
        assert_eq!(h.stock.stock("P1").await, Some(5));
    }

    #[tokio::test]
    async fn deleted_product() {
        let h = TestHarness::new();
        h.stock.set_stock("P1", 5).await;
        h.stock.set_stock("P2", 5).await;
        let user_id = h
            .cart(vec![line("P1", "Widget", 1, 1000), line("P2", "Gadget", 1, 500)])
            .await;
        h.stock.remove_product(&ProductId::new("P2")).await;

        let result = h.coordinator.create_order(user_id).await;

        assert!(matches!(result, Err(SagaError::ProductNotFound(ref p)) if p.as_str() == "P2"));
        assert_eq!(h.orders.order_count().await, 0);
        assert_eq!(h.stock.stock("P1").await, Some(5));
        assert_eq!(h.carts.line_count(user_id).await, 2);
    }

    #[tokio::test]
    async fn insufficient_stock_example() {
        let h = TestHarness::new();
        h.stock.set_stock("P1", 5).await;
        let user_id = h.cart(vec![line("P1", "Widget", 10, 1000)]).await;

        let result = h.coordinator.create_order(user_id).await;

        match result {
            Err(SagaError::InsufficientStock {
                product_name,
                available,
                requested,
                ..
            }) => {
                assert_eq!(product_name, "Widget");
                assert_eq!(available, 5);
                assert_eq!(requested, 10);
            }
            other => panic!("expected InsufficientStock, got {other:?}"),
        }
        assert_eq!(h.stock.stock("P1").await, Some(5));
        assert_eq!(h.orders.order_count().await, 0);
    }

    #[tokio::test]
    async fn second_line_short_leaves_first_untouched() {
        let h = TestHarness::new();
        h.stock.set_stock("P1", 5).await;
        h.stock.set_stock("P2", 1).await;
        let user_id = h
            .cart(vec![line("P1", "Widget", 2, 1000), line("P2", "Gadget", 3, 500)])
            .await;

        let result = h.coordinator.create_order(user_id).await;

        assert!(matches!(result, Err(SagaError::InsufficientStock { .. })));
        assert_eq!(h.orders.order_count().await, 0);
        assert_eq!(h.stock.stock("P1").await, Some(5));
        assert_eq!(h.stock.stock("P2").await, Some(1));
    }

    #[tokio::test]
    async fn total_too_large_is_rejected() {
        let h = TestHarness::new();
        h.stock.set_stock("P1", 5).await;
        let user_id = h.cart(vec![line("P1", "Widget", 2, i64::MAX / 2 + 1)]).await;

        let result = h.coordinator.create_order(user_id).await;

        assert!(matches!(
            result,
            Err(SagaError::Domain(OrderError::InvalidAmount { .. }))
        ));
        assert_eq!(h.orders.order_count().await, 0);
        assert_eq!(h.stock.stock("P1").await, Some(5));
        assert_eq!(h.carts.line_count(user_id).await, 1);
    }
}

mod compensation {
    use super::*;

    #[tokio::test]
    async fn second_line_drained_after_check_is_rolled_back() {
        let stock = InMemoryStockLedger::new();
        stock.set_stock("P1", 5).await;
        stock.set_stock("P2", 1).await;
        let ledger = StaleReadLedger {
            inner: stock.clone(),
            stale: Arc::new(HashMap::from([(ProductId::new("P2"), 10)])),
        };
        let h = TestHarness::with_ledger(ledger, stock);
        let user_id = h
            .cart(vec![line("P1", "Widget", 2, 1000), line("P2", "Gadget", 3, 500)])
            .await;

        let result = h.coordinator.create_order(user_id).await;

        match result {
            Err(SagaError::InsufficientStock {
                product_name,
                available,
                requested,
                ..
            }) => {
                assert_eq!(product_name, "Gadget");
                assert_eq!(available, 1);
                assert_eq!(requested, 3);
            }
            other => panic!("expected InsufficientStock, got {other:?}"),
        }
        assert_eq!(h.orders.order_count().await, 0);
        assert_eq!(h.stock.stock("P1").await, Some(5));
        assert_eq!(h.stock.stock("P2").await, Some(1));
        assert_eq!(h.carts.line_count(user_id).await, 2);
    }

    #[tokio::test]
    async fn ledger_outage_mid_decrement_is_rolled_back() {
        let h = TestHarness::new();
        h.stock.set_stock("P1", 5).await;
        h.stock.set_stock("P2", 5).await;
        h.stock.set_stock("P3", 5).await;
        h.stock.set_fail_on_adjust("P3", true).await;
        let user_id = h
            .cart(vec![
                line("P1", "Widget", 1, 1000),
                line("P2", "Gadget", 2, 500),
                line("P3", "Gizmo", 3, 100),
            ])
            .await;

        let result = h.coordinator.create_order(user_id).await;

        match result {
            Err(SagaError::StockUpdateFailed { product_id, source }) => {
                assert_eq!(product_id.as_str(), "P3");
                assert!(matches!(source, StockError::Unavailable(_)));
            }
            other => panic!("expected StockUpdateFailed, got {other:?}"),
        }
        assert_eq!(h.orders.order_count().await, 0);
        for product in ["P1", "P2", "P3"] {
            assert_eq!(h.stock.stock(product).await, Some(5));
        }
    }

    #[tokio::test]
    async fn failed_compensation_still_returns_original_error() {
        let h = TestHarness::new();
        h.stock.set_stock("P1", 5).await;
        h.stock.set_stock("P2", 5).await;
        h.stock.set_fail_on_adjust("P2", true).await;
        h.orders.set_fail_on_delete(true).await;
        let user_id = h
            .cart(vec![line("P1", "Widget", 2, 1000), line("P2", "Gadget", 1, 500)])
            .await;

        let result = h.coordinator.create_order(user_id).await;

        assert!(matches!(result, Err(SagaError::StockUpdateFailed { .. })));
        // The stock restore ran even though the order delete failed afterwards.
        assert_eq!(h.stock.stock("P1").await, Some(5));
        assert_eq!(h.orders.order_count().await, 1);
    }
}

mod concurrency {
    use super::*;

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn overcommitted_carts_never_oversell() {
        let h = TestHarness::new();
        h.stock.set_stock("P1", 5).await;
        let alice = h.cart(vec![line("P1", "Widget", 3, 1000)]).await;
        let bob = h.cart(vec![line("P1", "Widget", 3, 1000)]).await;

        let (a, b) = tokio::join!(
            h.coordinator.create_order(alice),
            h.coordinator.create_order(bob),
        );

        let results = [a, b];
        let succeeded = results.iter().filter(|r| r.is_ok()).count();
        assert_eq!(succeeded, 1);
        assert!(
            results
                .iter()
                .any(|r| matches!(r, Err(SagaError::InsufficientStock { .. })))
        );
        assert_eq!(h.stock.stock("P1").await, Some(2));
        assert_eq!(h.orders.order_count().await, 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn many_buyers_total_never_exceeds_stock() {
        let h = Arc::new(TestHarness::new());
        h.stock.set_stock("P1", 7).await;

        let mut handles = Vec::new();
        for _ in 0..10 {
            let h = Arc::clone(&h);
            handles.push(tokio::spawn(async move {
                let user_id = h.cart(vec![line("P1", "Widget", 2, 1000)]).await;
                h.coordinator.create_order(user_id).await
            }));
        }

        let mut succeeded = 0u32;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => succeeded += 1,
                Err(e) => assert!(matches!(e, SagaError::InsufficientStock { .. })),
            }
        }

        assert_eq!(succeeded, 3);
        assert_eq!(h.stock.stock("P1").await, Some(1));
        assert_eq!(h.orders.order_count().await, 3);
    }
}

mod status_updates {
    use super::*;

    #[tokio::test]
    async fn delivered_cannot_return_to_processing() {
        let h = TestHarness::new();
        h.stock.set_stock("P1", 5).await;
        let user_id = h.cart(vec![line("P1", "Widget", 1, 1000)]).await;
        let order = h.coordinator.create_order(user_id).await.unwrap();

        let orders = h.coordinator.orders();
        for next in [
            OrderStatus::Processing,
            OrderStatus::Shipped,
            OrderStatus::Delivered,
        ] {
            orders.update_status(order.id(), next).await.unwrap();
        }

        let result = orders
            .update_status(order.id(), OrderStatus::Processing)
            .await;

        assert!(matches!(
            result,
            Err(OrderStoreError::InvalidStatusTransition {
                from: OrderStatus::Delivered,
                to: OrderStatus::Processing,
            })
        ));
        let stored = orders.find_by_id(order.id()).await.unwrap().unwrap();
        assert_eq!(stored.status(), OrderStatus::Delivered);
    }
}
