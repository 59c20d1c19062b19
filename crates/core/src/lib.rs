//! Campus Print Core - Shared types and pricing.
//!
//! This crate provides the domain types used by the Campus Print client:
//! - cart entries (uploaded documents and stationery items)
//! - print settings and the draft order
//! - submitted orders and their pickup status
//! - users and roles
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions - no I/O, no HTTP
//! clients, no async runtime. Pricing lives here so it can be tested without
//! any collaborator in place.
//!
//! # Modules
//!
//! - [`types`] - Newtype IDs, amounts, emails, statuses, files, orders
//! - [`pricing`] - Total price calculation for a draft order

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod pricing;
pub mod types;

pub use pricing::{COLOR_PAGE_RATE, MONO_PAGE_RATE, calculate_total, per_page_rate};
pub use types::*;
