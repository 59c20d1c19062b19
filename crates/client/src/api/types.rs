//! Request and response bodies for the print-shop backend.
//!
//! Field names are camelCase on the wire.

use campus_print_core::{
    Amount, Email, OrderFile, OrderId, OrderStatus, PickupCode, PrintSettings, Role,
    SubmittedOrder, User, UserId,
};
use serde::{Deserialize, Serialize};

// =============================================================================
// Auth
// =============================================================================

#[derive(Debug, Serialize)]
pub(crate) struct LoginRequest<'a> {
    pub email: &'a Email,
    pub password: &'a str,
    pub role: Role,
}

#[derive(Debug, Serialize)]
pub(crate) struct RegisterRequest<'a> {
    pub name: &'a str,
    pub email: &'a Email,
    pub password: &'a str,
    pub role: Role,
}

/// Successful login or registration.
#[derive(Debug, Deserialize)]
pub(crate) struct AuthResponse {
    pub user: User,
    pub token: String,
}

/// Body of a non-2xx response.
#[derive(Debug, Deserialize)]
pub(crate) struct ErrorBody {
    #[serde(alias = "message")]
    pub error: String,
}

// =============================================================================
// Orders
// =============================================================================

/// An order ready for submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewOrder {
    pub user_id: UserId,
    pub user_email: Email,
    pub files: Vec<OrderFile>,
    pub settings: PrintSettings,
    pub total_amount: Amount,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct PlaceOrderResponse {
    pub success: bool,
    pub otp: Option<PickupCode>,
    #[serde(alias = "id", alias = "_id")]
    pub order_id: Option<OrderId>,
    pub order: Option<SubmittedOrder>,
    pub error: Option<String>,
}

/// What the backend hands back for an accepted order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderReceipt {
    pub otp: PickupCode,
    /// Server-assigned ID, when the response carries one outside `order`.
    pub order_id: Option<OrderId>,
    /// Full stored order, when the backend echoes it.
    pub order: Option<SubmittedOrder>,
}

#[derive(Debug, Serialize)]
pub(crate) struct StatusUpdateRequest {
    pub status: OrderStatus,
}

#[derive(Debug, Deserialize)]
pub(crate) struct StatusUpdateResponse {
    pub success: bool,
    pub order: Option<SubmittedOrder>,
    pub error: Option<String>,
}
