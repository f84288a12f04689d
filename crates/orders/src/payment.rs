use serde::Serialize;

use duka_core::Amount;

/// Where the UI goes after the payment instructions are dismissed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NextView {
    Catalog,
}

/// Manual payment instructions shown after a successful submission.
///
/// Purely informational: payment happens off-platform (mobile money transfer
/// to `destination`), nothing here talks to a payment provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PaymentInstructions {
    amount: Amount,
    destination: String,
    currency_label: String,
}

impl PaymentInstructions {
    pub fn new(amount: Amount, destination: impl Into<String>, currency_label: impl Into<String>) -> Self {
        Self {
            amount,
            destination: destination.into(),
            currency_label: currency_label.into(),
        }
    }

    pub fn amount(&self) -> Amount {
        self.amount
    }

    /// Amount as displayed, e.g. `Ksh. 250.00`.
    pub fn amount_display(&self) -> String {
        self.amount.labelled(&self.currency_label)
    }

    /// Destination as displayed (spacing preserved).
    pub fn destination(&self) -> &str {
        &self.destination
    }

    /// Destination as copied to the clipboard: digits (and a leading `+`) only.
    pub fn destination_for_copy(&self) -> String {
        let trimmed = self.destination.trim();
        let mut out = String::with_capacity(trimmed.len());
        if trimmed.starts_with('+') {
            out.push('+');
        }
        out.extend(trimmed.chars().filter(char::is_ascii_digit));
        out
    }

    pub fn message(&self) -> String {
        format!(
            "Please pay {} to {} to process your order.",
            self.amount_display(),
            self.destination
        )
    }

    pub fn dismiss(&self) -> NextView {
        NextView::Catalog
    }
}
