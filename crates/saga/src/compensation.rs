//! Undo actions recorded while a saga moves forward.

use common::OrderId;
use domain::ProductId;
use order_store::OrderStore;

use crate::services::StockLedger;

/// A single action that reverses one completed forward step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Compensation {
    /// Remove an order persisted by this saga.
    DeleteOrder(OrderId),
    /// Add back stock decremented by this saga.
    RestoreStock { product_id: ProductId, quantity: u32 },
}

impl std::fmt::Display for Compensation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Compensation::DeleteOrder(order_id) => write!(f, "delete order {order_id}"),
            Compensation::RestoreStock {
                product_id,
                quantity,
            } => write!(f, "restore {quantity} of product {product_id}"),
        }
    }
}

/// An undo action that did not succeed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailedCompensation {
    pub action: Compensation,
    pub reason: String,
}

/// Outcome of running a [`CompensationLog`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompensationReport {
    pub completed: Vec<Compensation>,
    pub failed: Vec<FailedCompensation>,
}

impl CompensationReport {
    /// True when every undo action succeeded.
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Ordered list of undo actions, executed last-in first-out.
#[derive(Debug, Clone, Default)]
pub struct CompensationLog {
    actions: Vec<Compensation>,
}

impl CompensationLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the undo action of a step that just succeeded.
    pub fn record(&mut self, action: Compensation) {
        self.actions.push(action);
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    /// Pending actions in the order they will run.
    pub fn pending(&self) -> impl Iterator<Item = &Compensation> {
        self.actions.iter().rev()
    }

    /// Runs every recorded action in reverse order.
    ///
    /// A failing action is logged and skipped; the remaining actions still run.
    #[tracing::instrument(skip_all, fields(actions = self.actions.len()))]
    pub async fn run<O, L>(self, orders: &O, stock: &L) -> CompensationReport
    where
        O: OrderStore + ?Sized,
        L: StockLedger + ?Sized,
    {
        metrics::counter!("saga_compensations_total").increment(1);
        let mut report = CompensationReport::default();

        for action in self.actions.into_iter().rev() {
            let outcome = match &action {
                Compensation::DeleteOrder(order_id) => orders
                    .delete(*order_id)
                    .await
                    .map_err(|e| e.to_string()),
                Compensation::RestoreStock {
                    product_id,
                    quantity,
                } => stock
                    .adjust(product_id, i64::from(*quantity))
                    .await
                    .map(|_| ())
                    .map_err(|e| e.to_string()),
            };

            match outcome {
                Ok(()) => {
                    tracing::info!(%action, "compensation step completed");
                    report.completed.push(action);
                }
                Err(reason) => {
                    metrics::counter!("saga_compensation_failures_total").increment(1);
                    tracing::error!(%action, %reason, "compensation step failed");
                    report.failed.push(FailedCompensation { action, reason });
                }
            }
        }

        report
    }
}
