//! The session's cart, mirrored to its durable slot.

use std::sync::Arc;

use duka_cart::{Cart, CartLine, Decremented, Product};
use duka_core::{Amount, DomainResult};

use crate::store::{load_cart, CartStore};
use crate::writer::CartWriter;

/// In-memory cart plus its write-behind mirror.
///
/// Every successful mutation enqueues a full snapshot; failed ones change
/// nothing and write nothing.
#[derive(Debug)]
pub struct CartModel {
    cart: Cart,
    writer: CartWriter,
}

impl CartModel {
    /// Rehydrate from `store` (empty on missing or corrupt data) and start the writer.
    pub async fn open(store: Arc<dyn CartStore>) -> Self {
        let cart = load_cart(store.as_ref()).await;
        Self {
            cart,
            writer: CartWriter::spawn(store),
        }
    }

    pub fn cart(&self) -> &Cart {
        &self.cart
    }

    pub fn lines(&self) -> &[CartLine] {
        self.cart.lines()
    }

    pub fn is_empty(&self) -> bool {
        self.cart.is_empty()
    }

    /// Returns the index of the affected line.
    pub fn add_product(&mut self, product: &Product) -> usize {
        let index = self.cart.add_product(product);
        self.persist();
        index
    }

    pub fn increment(&mut self, index: usize) -> DomainResult<u32> {
        let quantity = self.cart.increment(index)?;
        self.persist();
        Ok(quantity)
    }

    pub fn decrement(&mut self, index: usize) -> DomainResult<Decremented> {
        let outcome = self.cart.decrement(index)?;
        self.persist();
        Ok(outcome)
    }

    pub fn remove(&mut self, index: usize) -> DomainResult<CartLine> {
        let line = self.cart.remove(index)?;
        self.persist();
        Ok(line)
    }

    /// Empty the cart and erase the slot.
    pub fn clear(&mut self) {
        self.cart.clear();
        self.writer.erase();
    }

    pub fn total(&self) -> Amount {
        self.cart.total()
    }

    pub fn item_count(&self) -> u64 {
        self.cart.item_count()
    }

    /// Wait for pending slot writes.
    pub async fn flush(&self) {
        self.writer.flush().await;
    }

    /// A handle to the write queue, usable without holding the model.
    pub fn writer(&self) -> CartWriter {
        self.writer.clone()
    }

    fn persist(&self) {
        self.writer.save(&self.cart);
    }
}
