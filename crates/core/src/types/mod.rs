//! Core types for Campus Print.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod amount;
pub mod email;
pub mod file;
pub mod id;
pub mod order;
pub mod settings;
pub mod status;
pub mod user;

pub use amount::Amount;
pub use email::{Email, EmailError};
pub use file::{FileKind, PageCount, STATIONERY_MIME_TYPE, UploadedFile};
pub use id::*;
pub use order::{DraftOrder, OrderFile, PickupCode, PickupCodeError, SubmittedOrder};
pub use settings::{PrintSettings, SettingKey, SettingUpdate, SettingsError};
pub use status::*;
pub use user::User;
