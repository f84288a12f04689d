//! Ordered write queue for the cart slot.
//!
//! Every cart mutation enqueues a full snapshot. A single task applies the
//! queue in order, so a slow older write can never land after a newer one.

use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};

use duka_cart::Cart;

use crate::store::{encode_cart, CartStore};

#[derive(Debug)]
enum WriteOp {
    Save(String),
    Erase,
    Flush(oneshot::Sender<()>),
}

/// Handle to the cart write queue. Cheap to clone.
///
/// Writes are best-effort: failures are logged and never reach the caller.
#[derive(Debug, Clone)]
pub struct CartWriter {
    tx: mpsc::UnboundedSender<WriteOp>,
}

impl CartWriter {
    /// Start the drain task on the current tokio runtime.
    ///
    /// The task ends once every handle has been dropped and the queue is empty.
    pub fn spawn(store: Arc<dyn CartStore>) -> Self {
        let (tx, mut rx) = mpsc::unbounded_channel::<WriteOp>();

        tokio::spawn(async move {
            while let Some(op) = rx.recv().await {
                match op {
                    WriteOp::Save(data) => {
                        if let Err(err) = store.write(data).await {
                            tracing::warn!("failed to persist cart: {err:?}");
                        }
                    }
                    WriteOp::Erase => {
                        if let Err(err) = store.erase().await {
                            tracing::warn!("failed to erase persisted cart: {err:?}");
                        }
                    }
                    WriteOp::Flush(done) => {
                        let _ = done.send(());
                    }
                }
            }
            tracing::debug!("cart writer stopped");
        });

        Self { tx }
    }

    /// Enqueue a full rewrite of the slot with `cart`.
    pub fn save(&self, cart: &Cart) {
        match encode_cart(cart) {
            Ok(data) => self.send(WriteOp::Save(data)),
            Err(err) => tracing::warn!("cart not persisted: {err:?}"),
        }
    }

    /// Enqueue removal of the slot.
    pub fn erase(&self) {
        self.send(WriteOp::Erase);
    }

    /// Wait until every write enqueued before this call has been applied.
    pub async fn flush(&self) {
        let (done_tx, done_rx) = oneshot::channel();
        if self.tx.send(WriteOp::Flush(done_tx)).is_err() {
            return;
        }
        let _ = done_rx.await;
    }

    fn send(&self, op: WriteOp) {
        if self.tx.send(op).is_err() {
            tracing::warn!("cart writer is gone; write dropped");
        }
    }
}
