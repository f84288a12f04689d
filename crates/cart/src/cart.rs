use serde::{Deserialize, Serialize};

use duka_core::{Amount, DomainError, DomainResult, ProductId};

use crate::product::Product;

/// One product selection in a cart.
///
/// `name`, `unit_price` and `image_url` are a snapshot taken when the product
/// was first added. They are not refreshed if the catalog later changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLine {
    pub product_id: ProductId,
    pub name: String,
    /// Price in smallest currency unit (e.g., cents).
    pub unit_price: Amount,
    #[serde(default)]
    pub image_url: String,
    /// Always >= 1 inside a `Cart`.
    pub quantity: u32,
}

impl CartLine {
    fn from_product(product: &Product) -> Self {
        Self {
            product_id: product.id.clone(),
            name: product.name.clone(),
            unit_price: product.price,
            image_url: product.image_url.clone(),
            quantity: 1,
        }
    }

    pub fn subtotal(&self) -> Amount {
        self.unit_price.times(self.quantity)
    }
}

/// Result of [`Cart::decrement`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decremented {
    /// The line is still present with this quantity.
    Quantity(u32),
    /// The line dropped below one and was removed.
    Removed(CartLine),
}

/// Ordered product selections pending checkout.
///
/// Invariants:
/// - at most one line per `product_id`
/// - every line has `quantity >= 1`
/// - insertion order is display order
///
/// Serializes as a plain array of lines. Deserializing goes through
/// [`Cart::from_lines`], so stored data is normalized on the way in.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<CartLine>", into = "Vec<CartLine>")]
pub struct Cart {
    lines: Vec<CartLine>,
}

impl Cart {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a cart from raw lines, restoring the invariants.
    ///
    /// Lines with quantity 0 are dropped. Repeated product ids are merged into
    /// the first occurrence.
    pub fn from_lines(raw: Vec<CartLine>) -> Self {
        let mut cart = Cart::new();
        for line in raw {
            if line.quantity == 0 {
                continue;
            }
            match cart.position(&line.product_id) {
                Some(idx) => {
                    let existing = &mut cart.lines[idx];
                    existing.quantity = existing.quantity.saturating_add(line.quantity);
                }
                None => cart.lines.push(line),
            }
        }
        cart
    }

    pub fn lines(&self) -> &[CartLine] {
        &self.lines
    }

    pub fn into_lines(self) -> Vec<CartLine> {
        self.lines
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&CartLine> {
        self.lines.get(index)
    }

    pub fn position(&self, product_id: &ProductId) -> Option<usize> {
        self.lines.iter().position(|l| &l.product_id == product_id)
    }

    /// Add one unit of `product`. Returns the index of the affected line.
    ///
    /// An existing line for the same product is incremented; its snapshot
    /// fields are left as they were.
    pub fn add_product(&mut self, product: &Product) -> usize {
        match self.position(&product.id) {
            Some(idx) => {
                let line = &mut self.lines[idx];
                line.quantity = line.quantity.saturating_add(1);
                idx
            }
            None => {
                self.lines.push(CartLine::from_product(product));
                self.lines.len() - 1
            }
        }
    }

    /// Increase the quantity at `index` by one. Returns the new quantity.
    pub fn increment(&mut self, index: usize) -> DomainResult<u32> {
        let line = self.line_mut(index)?;
        line.quantity = line.quantity.saturating_add(1);
        Ok(line.quantity)
    }

    /// Decrease the quantity at `index` by one, removing the line below one.
    pub fn decrement(&mut self, index: usize) -> DomainResult<Decremented> {
        let line = self.line_mut(index)?;
        if line.quantity > 1 {
            line.quantity -= 1;
            return Ok(Decremented::Quantity(line.quantity));
        }
        Ok(Decremented::Removed(self.lines.remove(index)))
    }

    /// Remove the line at `index` whatever its quantity.
    pub fn remove(&mut self, index: usize) -> DomainResult<CartLine> {
        self.line_mut(index)?;
        Ok(self.lines.remove(index))
    }

    pub fn clear(&mut self) {
        self.lines.clear();
    }

    /// Sum of `unit_price * quantity` over all lines, computed on every call.
    pub fn total(&self) -> Amount {
        self.lines.iter().map(CartLine::subtotal).sum()
    }

    /// Number of units across all lines.
    pub fn item_count(&self) -> u64 {
        self.lines.iter().map(|l| u64::from(l.quantity)).sum()
    }

    fn line_mut(&mut self, index: usize) -> DomainResult<&mut CartLine> {
        let len = self.lines.len();
        self.lines
            .get_mut(index)
            .ok_or(DomainError::index_out_of_range(index, len))
    }
}

impl From<Vec<CartLine>> for Cart {
    fn from(lines: Vec<CartLine>) -> Self {
        Cart::from_lines(lines)
    }
}

impl From<Cart> for Vec<CartLine> {
    fn from(cart: Cart) -> Self {
        cart.lines
    }
}
