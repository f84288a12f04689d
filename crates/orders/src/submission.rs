//! Two-phase order submission.
//!
//! Flow:
//! 1. Insert the order header (phase 1) and receive its id.
//! 2. Insert one line per cart line referencing that id (phase 2).
//!
//! There is no compensating action: if phase 2 fails the header stays in the
//! store without lines. That outcome is reported as
//! [`SubmissionError::LinesRejected`] and surfaced as an [`OrphanedOrder`] so
//! it can be reconciled out of band.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use duka_cart::Cart;
use duka_core::{Amount, OrderId, UserId};

use crate::order::{NewOrder, NewOrderLine};
use crate::store::{OrderStore, OrderStoreError};

/// A fully recorded order (header and lines both stored).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlacedOrder {
    pub order_id: OrderId,
    pub amount: Amount,
    pub line_count: usize,
    pub created_at: DateTime<Utc>,
}

/// An order header whose lines were never stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrphanedOrder {
    pub order_id: OrderId,
    pub amount: Amount,
    pub created_at: DateTime<Utc>,
    pub reason: String,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SubmissionError {
    #[error("cannot submit an empty cart")]
    EmptyCart,

    /// Phase 1 failed. Nothing was written.
    #[error("order failed to submit: {0}")]
    OrderRejected(#[source] OrderStoreError),

    /// Phase 2 failed after phase 1 stored the header.
    #[error("order {order_id} was stored but its items were rejected: {source}")]
    LinesRejected {
        order_id: OrderId,
        amount: Amount,
        created_at: DateTime<Utc>,
        #[source]
        source: OrderStoreError,
    },
}

impl SubmissionError {
    /// User-facing text for the failure notification.
    pub fn user_message(&self) -> &'static str {
        match self {
            SubmissionError::EmptyCart => "Your cart is empty.",
            SubmissionError::OrderRejected(_) => "Order failed to submit. Try again.",
            SubmissionError::LinesRejected { .. } => "Trouble submitting items.",
        }
    }

    /// The header left behind by a phase-2 failure, if any.
    pub fn orphaned_order(&self) -> Option<OrphanedOrder> {
        match self {
            SubmissionError::LinesRejected {
                order_id,
                amount,
                created_at,
                source,
            } => Some(OrphanedOrder {
                order_id: order_id.clone(),
                amount: *amount,
                created_at: *created_at,
                reason: source.to_string(),
            }),
            _ => None,
        }
    }
}

/// Write `cart` to `store` as one order.
///
/// The cart is only read; clearing it after success is the caller's job.
pub async fn submit_cart<S>(
    store: &S,
    cart: &Cart,
    user_id: Option<UserId>,
    now: DateTime<Utc>,
) -> Result<PlacedOrder, SubmissionError>
where
    S: OrderStore + ?Sized,
{
    let header = NewOrder::from_cart(cart, user_id, now).map_err(|_| SubmissionError::EmptyCart)?;
    let amount = header.amount;

    tracing::info!(amount = %amount, lines = cart.len(), "submitting order header");
    let order_id = store.insert_order(&header).await.map_err(|err| {
        tracing::warn!(error = %err, "order header insert failed");
        SubmissionError::OrderRejected(err)
    })?;

    let lines = NewOrderLine::for_cart(&order_id, cart);
    tracing::debug!(order_id = %order_id, lines = lines.len(), "submitting order lines");
    if let Err(err) = store.insert_order_lines(&lines).await {
        tracing::error!(
            order_id = %order_id,
            amount = %amount,
            error = %err,
            "order lines insert failed; header left without lines"
        );
        return Err(SubmissionError::LinesRejected {
            order_id,
            amount,
            created_at: now,
            source: err,
        });
    }

    tracing::info!(order_id = %order_id, amount = %amount, "order submitted");
    Ok(PlacedOrder {
        order_id,
        amount,
        line_count: lines.len(),
        created_at: now,
    })
}

/// Submission lifecycle for one cart.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SubmissionState {
    #[default]
    Idle,
    Submitting,
    Succeeded(PlacedOrder),
    Failed(SubmissionError),
}

impl SubmissionState {
    pub fn is_submitting(&self) -> bool {
        matches!(self, SubmissionState::Submitting)
    }
}

/// Why [`SubmissionTracker::begin`] refused to start.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Refusal {
    /// Nothing to submit; not an error.
    EmptyCart,
    /// Another submission for this cart is still in flight.
    AlreadySubmitting,
}

/// Ticket for one submission attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Attempt(u64);

/// Explicit state machine guarding submissions: `Idle -> Submitting -> Succeeded | Failed`.
///
/// At most one attempt is in flight. A finished attempt (either outcome) may be
/// followed by a new one.
#[derive(Debug, Default)]
pub struct SubmissionTracker {
    state: SubmissionState,
    attempts: u64,
}

impl SubmissionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &SubmissionState {
        &self.state
    }

    /// Move to `Submitting` for `cart`, or explain why not.
    pub fn begin(&mut self, cart: &Cart) -> Result<Attempt, Refusal> {
        if self.state.is_submitting() {
            return Err(Refusal::AlreadySubmitting);
        }
        if cart.is_empty() {
            return Err(Refusal::EmptyCart);
        }
        self.attempts += 1;
        self.state = SubmissionState::Submitting;
        Ok(Attempt(self.attempts))
    }

    /// Record the outcome of `attempt`. Returns `false` if it is not the current attempt.
    pub fn finish(&mut self, attempt: Attempt, outcome: &Result<PlacedOrder, SubmissionError>) -> bool {
        if attempt.0 != self.attempts || !self.state.is_submitting() {
            return false;
        }
        self.state = match outcome {
            Ok(placed) => SubmissionState::Succeeded(placed.clone()),
            Err(err) => SubmissionState::Failed(err.clone()),
        };
        true
    }

    /// Return to `Idle` from a finished state (e.g. when the payment view is dismissed).
    pub fn reset(&mut self) {
        if !self.state.is_submitting() {
            self.state = SubmissionState::Idle;
        }
    }
}
