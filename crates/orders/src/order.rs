use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use duka_cart::Cart;
use duka_core::{Amount, DomainError, DomainResult, OrderId, ProductId, UserId};

/// Order status as stored by the backend.
///
/// The client only ever writes `Pending`; other values come back when reading
/// order history. Unknown values are kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum OrderStatus {
    Pending,
    Paid,
    Processing,
    Completed,
    Cancelled,
    Other(String),
}

impl OrderStatus {
    pub fn as_str(&self) -> &str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Paid => "paid",
            OrderStatus::Processing => "processing",
            OrderStatus::Completed => "completed",
            OrderStatus::Cancelled => "cancelled",
            OrderStatus::Other(s) => s,
        }
    }
}

impl From<String> for OrderStatus {
    fn from(value: String) -> Self {
        match value.to_ascii_lowercase().as_str() {
            "pending" => OrderStatus::Pending,
            "paid" => OrderStatus::Paid,
            "processing" => OrderStatus::Processing,
            "completed" => OrderStatus::Completed,
            "cancelled" | "canceled" => OrderStatus::Cancelled,
            _ => OrderStatus::Other(value),
        }
    }
}

impl From<OrderStatus> for String {
    fn from(value: OrderStatus) -> Self {
        value.as_str().to_string()
    }
}

impl core::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Order header written in phase 1.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewOrder {
    pub user_id: Option<UserId>,
    pub status: OrderStatus,
    pub amount: Amount,
    pub created_at: DateTime<Utc>,
}

impl NewOrder {
    /// Header for `cart`, priced at the cart total at this instant.
    pub fn from_cart(cart: &Cart, user_id: Option<UserId>, created_at: DateTime<Utc>) -> DomainResult<Self> {
        if cart.is_empty() {
            return Err(DomainError::validation("cannot place an order for an empty cart"));
        }
        Ok(Self {
            user_id,
            status: OrderStatus::Pending,
            amount: cart.total(),
            created_at,
        })
    }
}

/// Order line written in phase 2, after the header id is known.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewOrderLine {
    pub order_id: OrderId,
    pub product_id: ProductId,
    pub quantity: u32,
    /// Unit price snapshot from the cart line.
    pub price: Amount,
}

impl NewOrderLine {
    /// One line per cart line, in cart order.
    pub fn for_cart(order_id: &OrderId, cart: &Cart) -> Vec<NewOrderLine> {
        cart.lines()
            .iter()
            .map(|line| NewOrderLine {
                order_id: order_id.clone(),
                product_id: line.product_id.clone(),
                quantity: line.quantity,
                price: line.unit_price,
            })
            .collect()
    }
}

/// A line of a previously placed order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderRecordLine {
    pub id: String,
    pub product_id: ProductId,
    /// Current catalog name, when the store joins it in.
    #[serde(default)]
    pub product_name: Option<String>,
    pub quantity: u32,
    pub price: Amount,
}

impl OrderRecordLine {
    /// Product name if known, otherwise its id.
    pub fn label(&self) -> &str {
        self.product_name.as_deref().unwrap_or(self.product_id.as_str())
    }

    pub fn subtotal(&self) -> Amount {
        self.price.times(self.quantity)
    }
}

/// A previously placed order, as read back from the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderRecord {
    pub id: OrderId,
    pub user_id: Option<UserId>,
    pub status: OrderStatus,
    pub amount: Amount,
    pub created_at: DateTime<Utc>,
    pub lines: Vec<OrderRecordLine>,
}

impl OrderRecord {
    /// `true` when the header has no lines (phase 2 never landed).
    pub fn is_orphaned(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn item_count(&self) -> u64 {
        self.lines.iter().map(|l| u64::from(l.quantity)).sum()
    }
}
