use serde::{Deserialize, Serialize};

use duka_core::{Amount, ProductId};

/// A catalog product as handed to the cart.
///
/// The catalog owns products; the cart only copies these fields when a product
/// is added and never looks them up again.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub price: Amount,
    #[serde(default)]
    pub image_url: String,
}

impl Product {
    pub fn new(id: ProductId, name: impl Into<String>, price: Amount) -> Self {
        Self {
            id,
            name: name.into(),
            price,
            image_url: String::new(),
        }
    }

    pub fn with_image(mut self, image_url: impl Into<String>) -> Self {
        self.image_url = image_url.into();
        self
    }
}
