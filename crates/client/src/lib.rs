//! Campus Print Client - order/cart state and backend access.
//!
//! # Architecture
//!
//! - [`OrderStore`] owns the draft order and the cached order history. It is a
//!   cheaply cloneable handle; all views share one store.
//! - [`ApiClient`] talks JSON to the print-shop backend with `reqwest`. The
//!   store only sees it through the [`OrderService`] trait.
//! - [`AuthProvider`] logs in and persists the `{user, token}` pair through a
//!   [`SessionStorage`] backend.
//! - [`PrintClient`] is the composition root: it wires the pieces from a
//!   [`ClientConfig`], hydrates the session on [`PrintClient::init`] and tears
//!   everything down on [`PrintClient::logout`].
//!
//! # Example
//!
//! ```rust,ignore
//! use campus_print_client::{ClientConfig, FileUpload, PrintClient};
//!
//! let client = PrintClient::from_config(ClientConfig::from_env()?)?;
//! client.init()?;
//! client.auth().login("student@campus.edu", &password, Role::Student).await?;
//!
//! client.orders().add_file(FileUpload::new("notes.pdf", "application/pdf", bytes))?;
//! client.orders().update_setting(SettingUpdate::Copies(2));
//! let placed = client.checkout().await?;
//! println!("pickup code: {}", placed.otp);
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod api;
pub mod auth;
pub mod config;
pub mod error;
pub mod state;
pub mod store;
pub mod telemetry;

mod sync;

pub use api::{ApiClient, ApiError, NewOrder, OrderReceipt, OrderService};
pub use auth::{
    AuthError, AuthProvider, AuthSession, FileSessionStorage, MemorySessionStorage,
    SessionStorage, StorageError,
};
pub use config::{ClientConfig, ConfigError};
pub use error::ClientError;
pub use state::PrintClient;
pub use store::{
    CartError, FileLimits, FileUpload, OrderError, OrderStore, PageCountError, PageCounter,
    PdfPageCounter, PlacedOrder,
};

pub use campus_print_core as core;
