//! Durable cart slot.
//!
//! A device profile has exactly one slot holding the serialized cart. The
//! slot stores an opaque string; encoding and the "never fails" load policy
//! live here so every backend behaves the same.

use std::sync::Mutex;

use async_trait::async_trait;

use anyhow::Context;
use duka_cart::Cart;

/// Single-slot key-value storage for the serialized cart.
///
/// Last write wins. Backends give no transactional guarantee beyond that and
/// do not arbitrate between concurrent writers (e.g. two windows on the same
/// profile).
#[async_trait]
pub trait CartStore: Send + Sync {
    /// Raw slot contents, `None` if nothing was ever written or it was erased.
    async fn read(&self) -> anyhow::Result<Option<String>>;

    /// Replace the slot contents.
    async fn write(&self, data: String) -> anyhow::Result<()>;

    /// Remove the slot contents.
    async fn erase(&self) -> anyhow::Result<()>;
}

/// Serialize a cart into its stored form.
pub fn encode_cart(cart: &Cart) -> anyhow::Result<String> {
    serde_json::to_string(cart).context("failed to serialize cart")
}

/// Load the cart from `store`.
///
/// Never fails: a missing, unreadable or corrupt record yields an empty cart.
/// Stored data is normalized (zero quantities dropped, duplicates merged).
pub async fn load_cart(store: &dyn CartStore) -> Cart {
    let raw = match store.read().await {
        Ok(Some(raw)) => raw,
        Ok(None) => return Cart::new(),
        Err(err) => {
            tracing::warn!("failed to read stored cart, starting empty: {err:?}");
            return Cart::new();
        }
    };

    match serde_json::from_str::<Cart>(&raw) {
        Ok(cart) => {
            tracing::debug!(lines = cart.len(), "restored cart");
            cart
        }
        Err(err) => {
            tracing::warn!("stored cart is unreadable, starting empty: {err}");
            Cart::new()
        }
    }
}

/// In-memory slot (tests and ephemeral sessions).
#[derive(Debug, Default)]
pub struct InMemoryCartStore {
    slot: Mutex<Option<String>>,
}

impl InMemoryCartStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store whose slot already holds `data` (used to seed corrupt records).
    pub fn with_raw(data: impl Into<String>) -> Self {
        Self {
            slot: Mutex::new(Some(data.into())),
        }
    }

    /// Current slot contents.
    pub fn raw(&self) -> Option<String> {
        self.slot.lock().map(|s| s.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl CartStore for InMemoryCartStore {
    async fn read(&self) -> anyhow::Result<Option<String>> {
        let slot = self
            .slot
            .lock()
            .map_err(|_| anyhow::anyhow!("cart slot lock poisoned"))?;
        Ok(slot.clone())
    }

    async fn write(&self, data: String) -> anyhow::Result<()> {
        let mut slot = self
            .slot
            .lock()
            .map_err(|_| anyhow::anyhow!("cart slot lock poisoned"))?;
        *slot = Some(data);
        Ok(())
    }

    async fn erase(&self) -> anyhow::Result<()> {
        let mut slot = self
            .slot
            .lock()
            .map_err(|_| anyhow::anyhow!("cart slot lock poisoned"))?;
        *slot = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use duka_cart::Product;
    use duka_core::{Amount, ProductId};

    struct BrokenStore;

    #[async_trait]
    impl CartStore for BrokenStore {
        async fn read(&self) -> anyhow::Result<Option<String>> {
            anyhow::bail!("disk on fire")
        }

        async fn write(&self, _data: String) -> anyhow::Result<()> {
            anyhow::bail!("disk on fire")
        }

        async fn erase(&self) -> anyhow::Result<()> {
            anyhow::bail!("disk on fire")
        }
    }

    fn sample_cart() -> Cart {
        let mut cart = Cart::new();
        let p1 = Product::new(ProductId::parse("p1").unwrap(), "One", Amount::new(100));
        cart.add_product(&p1);
        cart.add_product(&p1);
        cart.add_product(&Product::new(ProductId::parse("p2").unwrap(), "Two", Amount::new(50)));
        cart
    }

    #[tokio::test]
    async fn save_then_load_preserves_lines_and_order() {
        let store = InMemoryCartStore::new();
        let cart = sample_cart();
        store.write(encode_cart(&cart).unwrap()).await.unwrap();

        let loaded = load_cart(&store).await;
        assert_eq!(loaded, cart);
    }

    #[tokio::test]
    async fn missing_record_loads_empty() {
        assert!(load_cart(&InMemoryCartStore::new()).await.is_empty());
    }

    #[tokio::test]
    async fn corrupt_record_loads_empty() {
        for raw in ["{not json", "{\"productId\":\"p1\"}", "[{\"productId\":\"p1\",\"quantity\":-2}]"] {
            let store = InMemoryCartStore::with_raw(raw);
            assert!(load_cart(&store).await.is_empty(), "accepted {raw:?}");
        }
    }

    #[tokio::test]
    async fn read_failure_loads_empty() {
        assert!(load_cart(&BrokenStore).await.is_empty());
    }

    #[tokio::test]
    async fn erase_clears_slot() {
        let store = InMemoryCartStore::with_raw("[]");
        store.erase().await.unwrap();
        assert_eq!(store.raw(), None);
    }
}
