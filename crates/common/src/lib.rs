//! Identifier types shared across the orders workspace.

pub mod types;

pub use types::{OrderId, ParseIdError, UserId};
