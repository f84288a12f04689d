//! `duka-client`
//!
//! **Responsibility:** the storefront client's cart and checkout session.
//!
//! This crate provides:
//! - A durable, per-profile cart slot (SQLite, or in-memory for tests)
//! - An ordered write queue mirroring every cart mutation to that slot
//! - `CheckoutSession`: the cart plus the guarded two-phase order submission
//! - Optional HTTP adapters for the hosted backend (`remote` feature)
//!
//! The backend stays the authority for orders; the only state owned here is
//! the cart.

pub mod cart_model;
pub mod catalog;
pub mod config;
pub mod notice;
#[cfg(feature = "remote")]
pub mod rest;
pub mod session;
pub mod sqlite_store;
pub mod store;
pub mod writer;

pub use cart_model::CartModel;
pub use catalog::{Catalog, CatalogError, InMemoryCatalog};
pub use config::{ClientConfig, ConfigError};
pub use notice::{Notice, NoticeLevel};
pub use session::{CatalogAddError, CheckoutSession, HistoryError, PaymentSettings, SubmitOutcome};
pub use sqlite_store::SqliteCartStore;
pub use store::{CartStore, InMemoryCartStore};
pub use writer::CartWriter;
