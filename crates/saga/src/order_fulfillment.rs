//! Order fulfillment saga constants.

/// The saga type identifier for order fulfillment.
pub const SAGA_TYPE: &str = "OrderFulfillment";

/// Step name: Read the user's cart.
pub const STEP_FETCH_CART: &str = "fetch_cart";

/// Step name: Check every cart line against current stock.
pub const STEP_VERIFY_STOCK: &str = "verify_stock";

/// Step name: Persist the pending order and its item snapshots.
pub const STEP_PERSIST_ORDER: &str = "persist_order";

/// Step name: Decrement stock for every line.
pub const STEP_DECREMENT_STOCK: &str = "decrement_stock";

/// Step name: Empty the user's cart.
pub const STEP_CLEAR_CART: &str = "clear_cart";
