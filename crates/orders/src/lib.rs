//! Order submission module.
//!
//! Builds order headers and lines from a cart, writes them to an external
//! [`OrderStore`] in two dependent phases, and tracks the submission state
//! machine. The store itself (a hosted database) is an external collaborator;
//! [`InMemoryOrderStore`] stands in for it in tests and offline demos.

pub mod in_memory;
pub mod order;
pub mod payment;
pub mod store;
pub mod submission;

pub use in_memory::InMemoryOrderStore;
pub use order::{NewOrder, NewOrderLine, OrderRecord, OrderRecordLine, OrderStatus};
pub use payment::{NextView, PaymentInstructions};
pub use store::{OrderStore, OrderStoreError};
pub use submission::{
    submit_cart, Attempt, OrphanedOrder, PlacedOrder, Refusal, SubmissionError, SubmissionState,
    SubmissionTracker,
};
