//! Domain layer for the orders service.
//!
//! This crate provides the core order model:
//! - `Money` and `ProductId` value objects
//! - `CartSnapshot` as read from the cart service
//! - `Order` with immutable `OrderItem` snapshots
//! - `OrderStatus` and its transition graph

pub mod order;

pub use order::{
    CartLine, CartSnapshot, Money, Order, OrderError, OrderItem, OrderStatus, ProductId,
};
