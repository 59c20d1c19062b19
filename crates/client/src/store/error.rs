//! Order store error types.

use campus_print_core::{Amount, OrderId, OrderStatus};
use thiserror::Error;

use crate::api::ApiError;

/// Errors from adding entries to the cart. Always raised locally.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CartError {
    /// The document exceeds the configured size limit.
    #[error("{name} is {size} bytes, the limit is {max} bytes")]
    FileTooLarge { name: String, size: u64, max: u64 },

    /// The document type is not on the allow list.
    #[error("{name} has unsupported type {mime_type}")]
    UnsupportedType { name: String, mime_type: String },

    /// The document has no content.
    #[error("{name} is empty")]
    EmptyFile { name: String },

    /// The cart already holds the maximum number of entries.
    #[error("cart is full ({max} entries)")]
    CartFull { max: usize },

    /// A stationery item is malformed.
    #[error("invalid item: {0}")]
    InvalidItem(String),
}

/// Errors from submitting orders and advancing their status.
#[derive(Debug, Error)]
pub enum OrderError {
    /// Nothing to submit.
    #[error("cart is empty")]
    EmptyCart,

    /// Another submission from this store has not finished yet.
    #[error("an order is already being submitted")]
    AlreadySubmitting,

    /// The caller's total no longer matches the cart.
    #[error("total changed: cart is {expected}, got {submitted}")]
    TotalMismatch { expected: Amount, submitted: Amount },

    /// The order is not in the cached list.
    #[error("order not found: {0}")]
    NotFound(OrderId),

    /// The requested status is not the next step for this order.
    #[error("cannot move order from {from} to {to}")]
    InvalidTransition { from: OrderStatus, to: OrderStatus },

    /// The pickup code entered does not match the order.
    #[error("pickup code does not match")]
    OtpMismatch,

    /// The backend call failed.
    #[error(transparent)]
    Api(#[from] ApiError),
}

impl OrderError {
    /// Returns true if the error was detected before contacting the backend.
    #[must_use]
    pub const fn is_local(&self) -> bool {
        !matches!(self, Self::Api(_))
    }
}
