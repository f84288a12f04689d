//! Checkout session: the cart, its submission guard and the payment hand-off.
//!
//! Locks are `std::sync::Mutex` and are never held across an `.await`. When
//! both are needed they are taken in the order cart, then tracker.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::Utc;
use thiserror::Error;

use duka_cart::{Cart, CartLine, Decremented, Product};
use duka_core::{Amount, DomainError, DomainResult, ProductId, UserId};
use duka_orders::{
    submit_cart, NextView, OrderRecord, OrderStore, OrderStoreError, OrphanedOrder,
    PaymentInstructions, PlacedOrder, Refusal, SubmissionError, SubmissionState,
    SubmissionTracker,
};

use crate::cart_model::CartModel;
use crate::catalog::{Catalog, CatalogError};
use crate::config::{ClientConfig, DEFAULT_CURRENCY_LABEL, DEFAULT_PAYMENT_DESTINATION};
use crate::notice::Notice;
use crate::store::CartStore;

pub const ORDER_SUBMITTED: &str = "Order submitted successfully.";
pub const FETCH_ORDERS_FAILED: &str = "Failed to fetch orders";

/// Where and how customers are told to pay.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentSettings {
    pub destination: String,
    pub currency_label: String,
}

impl PaymentSettings {
    pub fn from_config(config: &ClientConfig) -> Self {
        Self {
            destination: config.payment_destination.clone(),
            currency_label: config.currency_label.clone(),
        }
    }

    fn instructions(&self, amount: Amount) -> PaymentInstructions {
        PaymentInstructions::new(amount, self.destination.clone(), self.currency_label.clone())
    }
}

impl Default for PaymentSettings {
    fn default() -> Self {
        Self {
            destination: DEFAULT_PAYMENT_DESTINATION.to_string(),
            currency_label: DEFAULT_CURRENCY_LABEL.to_string(),
        }
    }
}

/// Result of [`CheckoutSession::submit`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// The cart was empty; nothing happened.
    Declined,
    /// Another submission is still in flight; nothing happened.
    AlreadySubmitting,
    /// Header and lines stored, cart cleared.
    Placed {
        order: PlacedOrder,
        payment: PaymentInstructions,
        notice: Notice,
    },
    /// The store rejected a write; the cart is untouched.
    Failed { error: SubmissionError, notice: Notice },
    /// The session was closed before the result arrived. Nothing is shown, but
    /// a stored order still clears the cart.
    Stale,
}

#[derive(Debug, Error)]
pub enum CatalogAddError {
    #[error(transparent)]
    Catalog(#[from] CatalogError),

    #[error(transparent)]
    Cart(#[from] DomainError),
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum HistoryError {
    #[error("no signed-in user")]
    SignedOut,

    #[error("failed to fetch orders: {0}")]
    Store(#[from] OrderStoreError),
}

impl HistoryError {
    pub fn notice(&self) -> Notice {
        Notice::error(FETCH_ORDERS_FAILED)
    }
}

/// One shopper's cart and checkout flow.
pub struct CheckoutSession {
    cart: Mutex<CartModel>,
    tracker: Mutex<SubmissionTracker>,
    orphans: Mutex<Vec<OrphanedOrder>>,
    orders: Arc<dyn OrderStore>,
    user_id: Option<UserId>,
    payment: PaymentSettings,
    active: AtomicBool,
}

impl core::fmt::Debug for CheckoutSession {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("CheckoutSession")
            .field("user_id", &self.user_id)
            .field("active", &self.is_active())
            .finish_non_exhaustive()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl CheckoutSession {
    /// Start a session, rehydrating the cart from `cart_store`.
    pub async fn open(
        cart_store: Arc<dyn CartStore>,
        orders: Arc<dyn OrderStore>,
        user_id: Option<UserId>,
        payment: PaymentSettings,
    ) -> Self {
        let model = CartModel::open(cart_store).await;
        tracing::debug!(lines = model.lines().len(), "checkout session opened");
        Self {
            cart: Mutex::new(model),
            tracker: Mutex::new(SubmissionTracker::new()),
            orphans: Mutex::new(Vec::new()),
            orders,
            user_id,
            payment,
            active: AtomicBool::new(true),
        }
    }

    pub fn user_id(&self) -> Option<&UserId> {
        self.user_id.as_ref()
    }

    /// Run `f` on the cart unless a submission is in flight.
    fn mutate<T>(&self, f: impl FnOnce(&mut CartModel) -> DomainResult<T>) -> DomainResult<T> {
        let mut model = lock(&self.cart);
        if lock(&self.tracker).state().is_submitting() {
            return Err(DomainError::invariant(
                "cart is locked while an order is being submitted",
            ));
        }
        f(&mut model)
    }

    /// Add one unit of `product`, merging with an existing line.
    ///
    /// Fails with `InvariantViolation` only while a submission is in flight.
    pub fn add_product(&self, product: &Product) -> DomainResult<usize> {
        self.mutate(|model| Ok(model.add_product(product)))
    }

    /// Look `id` up in `catalog` and add it. The cart is unchanged on failure.
    pub async fn add_from_catalog(
        &self,
        catalog: &dyn Catalog,
        id: &ProductId,
    ) -> Result<usize, CatalogAddError> {
        let product = catalog.get_product(id).await?;
        Ok(self.add_product(&product)?)
    }

    pub fn increment(&self, index: usize) -> DomainResult<u32> {
        self.mutate(|model| model.increment(index))
    }

    pub fn decrement(&self, index: usize) -> DomainResult<Decremented> {
        self.mutate(|model| model.decrement(index))
    }

    pub fn remove(&self, index: usize) -> DomainResult<CartLine> {
        self.mutate(|model| model.remove(index))
    }

    pub fn clear(&self) -> DomainResult<()> {
        self.mutate(|model| {
            model.clear();
            Ok(())
        })
    }

    pub fn cart(&self) -> Cart {
        lock(&self.cart).cart().clone()
    }

    pub fn lines(&self) -> Vec<CartLine> {
        lock(&self.cart).lines().to_vec()
    }

    pub fn total(&self) -> Amount {
        lock(&self.cart).total()
    }

    pub fn item_count(&self) -> u64 {
        lock(&self.cart).item_count()
    }

    pub fn state(&self) -> SubmissionState {
        lock(&self.tracker).state().clone()
    }

    /// Submit the cart as one order.
    ///
    /// The cart and its slot are cleared only after both writes succeed, even
    /// if the session was closed meanwhile. On failure both are left exactly
    /// as they were so the shopper can retry.
    pub async fn submit(&self) -> SubmitOutcome {
        if !self.is_active() {
            tracing::debug!("submit on a closed session ignored");
            return SubmitOutcome::Stale;
        }

        let (attempt, snapshot) = {
            let model = lock(&self.cart);
            let mut tracker = lock(&self.tracker);
            match tracker.begin(model.cart()) {
                Ok(attempt) => (attempt, model.cart().clone()),
                Err(Refusal::EmptyCart) => return SubmitOutcome::Declined,
                Err(Refusal::AlreadySubmitting) => {
                    tracing::debug!("submission already in flight");
                    return SubmitOutcome::AlreadySubmitting;
                }
            }
        };

        let result = submit_cart(
            self.orders.as_ref(),
            &snapshot,
            self.user_id.clone(),
            Utc::now(),
        )
        .await;

        if let Some(orphan) = result.as_ref().err().and_then(SubmissionError::orphaned_order) {
            lock(&self.orphans).push(orphan);
        }

        let mut model = lock(&self.cart);
        lock(&self.tracker).finish(attempt, &result);

        if result.is_ok() {
            model.clear();
        }

        if !self.is_active() {
            tracing::warn!(
                succeeded = result.is_ok(),
                "session closed during submission; outcome not shown"
            );
            return SubmitOutcome::Stale;
        }

        match result {
            Ok(order) => {
                let payment = self.payment.instructions(order.amount);
                SubmitOutcome::Placed {
                    order,
                    payment,
                    notice: Notice::success(ORDER_SUBMITTED),
                }
            }
            Err(error) => SubmitOutcome::Failed {
                notice: Notice::error(error.user_message()),
                error,
            },
        }
    }

    /// Close the payment view and return the submission guard to idle.
    pub fn dismiss_payment(&self, payment: &PaymentInstructions) -> NextView {
        lock(&self.tracker).reset();
        payment.dismiss()
    }

    /// Headers stored without lines during this session.
    pub fn orphaned_orders(&self) -> Vec<OrphanedOrder> {
        lock(&self.orphans).clone()
    }

    /// The signed-in user's orders, newest first.
    pub async fn order_history(&self) -> Result<Vec<OrderRecord>, HistoryError> {
        let user_id = self.user_id.as_ref().ok_or(HistoryError::SignedOut)?;
        self.orders.list_orders(user_id).await.map_err(|err| {
            tracing::warn!(error = %err, "failed to fetch order history");
            HistoryError::Store(err)
        })
    }

    /// Mark the session inactive. A submission still in flight reports `Stale`.
    pub fn close(&self) {
        if self.active.swap(false, Ordering::SeqCst) {
            tracing::debug!("checkout session closed");
        }
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    /// Wait for pending cart writes to reach the slot.
    pub async fn flush(&self) {
        let writer = lock(&self.cart).writer();
        writer.flush().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use duka_orders::InMemoryOrderStore;

    use crate::store::InMemoryCartStore;

    fn product(id: &str, minor: u64) -> Product {
        Product::new(ProductId::parse(id).unwrap(), id, Amount::new(minor))
    }

    async fn session_with(orders: Arc<InMemoryOrderStore>) -> (CheckoutSession, Arc<InMemoryCartStore>) {
        let slot = Arc::new(InMemoryCartStore::new());
        let session = CheckoutSession::open(
            slot.clone(),
            orders,
            Some(UserId::parse("u1").unwrap()),
            PaymentSettings::default(),
        )
        .await;
        (session, slot)
    }

    #[tokio::test]
    async fn empty_cart_is_declined_without_store_calls() {
        let orders = Arc::new(InMemoryOrderStore::new());
        let (session, _) = session_with(orders.clone()).await;

        assert_eq!(session.submit().await, SubmitOutcome::Declined);
        assert_eq!(session.state(), SubmissionState::Idle);
        assert_eq!(orders.order_insert_calls(), 0);
    }

    #[tokio::test]
    async fn phase_one_failure_keeps_cart_and_reports_notice() {
        let orders = Arc::new(InMemoryOrderStore::new());
        orders.fail_next_order_insert(OrderStoreError::Network("offline".into()));
        let (session, slot) = session_with(orders.clone()).await;
        session.add_product(&product("p1", 100)).unwrap();
        session.flush().await;
        let persisted = slot.raw();
        assert!(persisted.is_some());

        match session.submit().await {
            SubmitOutcome::Failed { notice, .. } => {
                assert_eq!(notice, Notice::error("Order failed to submit. Try again."));
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
        assert!(matches!(session.state(), SubmissionState::Failed(_)));
        assert_eq!(session.total(), Amount::new(100));
        session.flush().await;
        assert_eq!(slot.raw(), persisted);
        assert!(session.orphaned_orders().is_empty());

        // Manual retry succeeds.
        assert!(matches!(session.submit().await, SubmitOutcome::Placed { .. }));
        assert!(session.lines().is_empty());
    }

    #[tokio::test]
    async fn closed_session_does_not_submit() {
        let orders = Arc::new(InMemoryOrderStore::new());
        let (session, _) = session_with(orders.clone()).await;
        session.add_product(&product("p1", 100)).unwrap();
        session.close();

        assert_eq!(session.submit().await, SubmitOutcome::Stale);
        assert_eq!(orders.order_insert_calls(), 0);
    }

    #[tokio::test]
    async fn dismissing_payment_returns_to_catalog_and_idle() {
        let orders = Arc::new(InMemoryOrderStore::new());
        let (session, _) = session_with(orders).await;
        session.add_product(&product("p1", 100)).unwrap();

        let SubmitOutcome::Placed { payment, .. } = session.submit().await else {
            panic!("expected a placed order");
        };
        assert!(matches!(session.state(), SubmissionState::Succeeded(_)));
        assert_eq!(session.dismiss_payment(&payment), NextView::Catalog);
        assert_eq!(session.state(), SubmissionState::Idle);
    }

    #[tokio::test]
    async fn history_requires_a_user_and_maps_failures_to_notice() {
        let orders = Arc::new(InMemoryOrderStore::new());
        let session = CheckoutSession::open(
            Arc::new(InMemoryCartStore::new()),
            orders,
            None,
            PaymentSettings::default(),
        )
        .await;

        let err = session.order_history().await.unwrap_err();
        assert_eq!(err, HistoryError::SignedOut);
        assert_eq!(err.notice().message, "Failed to fetch orders");
    }
}
