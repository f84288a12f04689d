use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use uuid::Uuid;

use duka_core::{OrderId, UserId};

use crate::order::{NewOrder, NewOrderLine, OrderRecord, OrderRecordLine};
use crate::store::{OrderStore, OrderStoreError};

#[derive(Debug, Default)]
struct Inner {
    orders: Vec<(OrderId, NewOrder)>,
    lines: Vec<(String, NewOrderLine)>,
    order_failures: VecDeque<OrderStoreError>,
    line_failures: VecDeque<OrderStoreError>,
    order_calls: usize,
    line_calls: usize,
}

/// In-memory order store.
///
/// Intended for tests/dev. Mirrors the hosted store's behavior that matters to
/// the client: generated ids, a foreign-key check on lines, and no
/// transaction across the two inserts. Failures can be scripted per call.
#[derive(Debug, Default)]
pub struct InMemoryOrderStore {
    inner: Mutex<Inner>,
}

impl InMemoryOrderStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next `insert_order` call fail with `err`.
    pub fn fail_next_order_insert(&self, err: OrderStoreError) {
        self.with_inner(|inner| inner.order_failures.push_back(err));
    }

    /// Make the next `insert_order_lines` call fail with `err`.
    pub fn fail_next_lines_insert(&self, err: OrderStoreError) {
        self.with_inner(|inner| inner.line_failures.push_back(err));
    }

    /// Number of `insert_order` calls received, failed ones included.
    pub fn order_insert_calls(&self) -> usize {
        self.with_inner(|inner| inner.order_calls)
    }

    /// Number of `insert_order_lines` calls received, failed ones included.
    pub fn lines_insert_calls(&self) -> usize {
        self.with_inner(|inner| inner.line_calls)
    }

    /// All stored headers in insertion order.
    pub fn orders(&self) -> Vec<(OrderId, NewOrder)> {
        self.with_inner(|inner| inner.orders.clone())
    }

    /// Stored lines belonging to `order_id`.
    pub fn lines_for(&self, order_id: &OrderId) -> Vec<NewOrderLine> {
        self.with_inner(|inner| {
            inner
                .lines
                .iter()
                .filter(|(_, l)| &l.order_id == order_id)
                .map(|(_, l)| l.clone())
                .collect()
        })
    }

    fn with_inner<T>(&self, f: impl FnOnce(&mut Inner) -> T) -> T {
        let mut guard = match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        f(&mut guard)
    }
}

#[async_trait]
impl OrderStore for InMemoryOrderStore {
    async fn insert_order(&self, order: &NewOrder) -> Result<OrderId, OrderStoreError> {
        self.with_inner(|inner| {
            inner.order_calls += 1;
            if let Some(err) = inner.order_failures.pop_front() {
                return Err(err);
            }

            let id = OrderId::parse(Uuid::now_v7().to_string())
                .map_err(|e| OrderStoreError::Decode(e.to_string()))?;
            inner.orders.push((id.clone(), order.clone()));
            Ok(id)
        })
    }

    async fn insert_order_lines(&self, lines: &[NewOrderLine]) -> Result<(), OrderStoreError> {
        self.with_inner(|inner| {
            inner.line_calls += 1;
            if let Some(err) = inner.line_failures.pop_front() {
                return Err(err);
            }

            // All-or-nothing, like a single bulk INSERT.
            for (idx, line) in lines.iter().enumerate() {
                if !inner.orders.iter().any(|(id, _)| id == &line.order_id) {
                    return Err(OrderStoreError::rejected(
                        409,
                        format!("line {idx} references unknown order {}", line.order_id),
                    ));
                }
                if line.quantity == 0 {
                    return Err(OrderStoreError::rejected(
                        400,
                        format!("line {idx} has quantity 0"),
                    ));
                }
            }

            for line in lines {
                inner.lines.push((Uuid::now_v7().to_string(), line.clone()));
            }
            Ok(())
        })
    }

    async fn list_orders(&self, user_id: &UserId) -> Result<Vec<OrderRecord>, OrderStoreError> {
        self.with_inner(|inner| {
            let mut records: Vec<OrderRecord> = inner
                .orders
                .iter()
                .rev()
                .filter(|(_, o)| o.user_id.as_ref() == Some(user_id))
                .map(|(id, o)| OrderRecord {
                    id: id.clone(),
                    user_id: o.user_id.clone(),
                    status: o.status.clone(),
                    amount: o.amount,
                    created_at: o.created_at,
                    lines: inner
                        .lines
                        .iter()
                        .filter(|(_, l)| &l.order_id == id)
                        .map(|(line_id, l)| OrderRecordLine {
                            id: line_id.clone(),
                            product_id: l.product_id.clone(),
                            product_name: None,
                            quantity: l.quantity,
                            price: l.price,
                        })
                        .collect(),
                })
                .collect();

            // Stable sort keeps reverse insertion order for equal timestamps.
            records.sort_by(|a, b| b.created_at.cmp(&a.created_at));
            Ok(records)
        })
    }
}
