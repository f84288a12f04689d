//! `duka-core`: shared building blocks for the storefront client.
//!
//! This crate contains **pure** primitives (no IO, no async): identifiers,
//! money, and the domain error model.

pub mod error;
pub mod id;
pub mod money;

pub use error::{DomainError, DomainResult};
pub use id::{OrderId, ProductId, UserId};
pub use money::Amount;
