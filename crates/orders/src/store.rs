use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use duka_core::{OrderId, UserId};

use crate::order::{NewOrder, NewOrderLine, OrderRecord};

/// Order store operation error.
///
/// These are **remote** failures (transport, validation by the backend,
/// undecodable responses). None of them is retried automatically.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum OrderStoreError {
    #[error("network error: {0}")]
    Network(String),

    #[error("store rejected the write ({status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("could not decode store response: {0}")]
    Decode(String),

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

impl OrderStoreError {
    pub fn rejected(status: u16, message: impl Into<String>) -> Self {
        Self::Rejected {
            status,
            message: message.into(),
        }
    }
}

/// Hosted relational storage for orders.
///
/// `insert_order` and `insert_order_lines` are independent calls: the store
/// offers no transaction spanning both. A caller that sees the second fail
/// after the first succeeded is left with a header that has no lines.
#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Insert one order header and return the identifier the store assigned.
    async fn insert_order(&self, order: &NewOrder) -> Result<OrderId, OrderStoreError>;

    /// Insert all lines of an order in a single call.
    async fn insert_order_lines(&self, lines: &[NewOrderLine]) -> Result<(), OrderStoreError>;

    /// Orders placed by `user_id`, newest first, each with its lines.
    async fn list_orders(&self, user_id: &UserId) -> Result<Vec<OrderRecord>, OrderStoreError>;
}

#[async_trait]
impl<S> OrderStore for Arc<S>
where
    S: OrderStore + ?Sized,
{
    async fn insert_order(&self, order: &NewOrder) -> Result<OrderId, OrderStoreError> {
        (**self).insert_order(order).await
    }

    async fn insert_order_lines(&self, lines: &[NewOrderLine]) -> Result<(), OrderStoreError> {
        (**self).insert_order_lines(lines).await
    }

    async fn list_orders(&self, user_id: &UserId) -> Result<Vec<OrderRecord>, OrderStoreError> {
        (**self).list_orders(user_id).await
    }
}
