//! Shopping cart domain module.
//!
//! Pure, deterministic cart rules (no IO, no persistence, no async). The
//! client crate wraps a [`Cart`] and mirrors it to durable storage.

pub mod cart;
pub mod product;

pub use cart::{Cart, CartLine, Decremented};
pub use product::Product;
