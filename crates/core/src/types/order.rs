//! Draft and submitted orders.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::amount::Amount;
use super::email::Email;
use super::file::{FileKind, PageCount, UploadedFile};
use super::id::{FileId, OrderId, UserId};
use super::settings::{PrintSettings, SettingUpdate};
use super::status::OrderStatus;
use crate::pricing::calculate_total;

// =============================================================================
// Draft Order
// =============================================================================

/// The in-progress cart: files in insertion order plus one set of settings.
///
/// The total is never stored; [`DraftOrder::total`] recomputes it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DraftOrder {
    files: Vec<UploadedFile>,
    settings: PrintSettings,
}

impl DraftOrder {
    /// An empty draft with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn files(&self) -> &[UploadedFile] {
        &self.files
    }

    #[must_use]
    pub const fn settings(&self) -> &PrintSettings {
        &self.settings
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// Append an entry at the end of the cart.
    pub fn push(&mut self, file: UploadedFile) {
        self.files.push(file);
    }

    /// Remove the entry with `id`. Returns false if it was not in the cart.
    pub fn remove(&mut self, id: FileId) -> bool {
        let before = self.files.len();
        self.files.retain(|file| file.id != id);
        self.files.len() != before
    }

    /// Mutable access to one entry.
    pub fn get_mut(&mut self, id: FileId) -> Option<&mut UploadedFile> {
        self.files.iter_mut().find(|file| file.id == id)
    }

    #[must_use]
    pub fn get(&self, id: FileId) -> Option<&UploadedFile> {
        self.files.iter().find(|file| file.id == id)
    }

    /// Apply one settings change.
    pub fn update_setting(&mut self, update: SettingUpdate) {
        self.settings.apply(update);
    }

    /// Current total price.
    #[must_use]
    pub fn total(&self) -> Amount {
        calculate_total(&self.files, &self.settings)
    }

    /// Drop the given entries, then reset settings once the cart is empty.
    pub fn remove_submitted(&mut self, submitted: &[FileId]) {
        self.files.retain(|file| !submitted.contains(&file.id));
        if self.files.is_empty() {
            self.settings = PrintSettings::default();
        }
    }

    /// Empty the cart and restore default settings.
    pub fn clear(&mut self) {
        self.files.clear();
        self.settings = PrintSettings::default();
    }
}

// =============================================================================
// Pickup Code
// =============================================================================

/// Errors from parsing a [`PickupCode`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PickupCodeError {
    #[error("pickup code must be exactly {len} digits", len = PickupCode::LENGTH)]
    InvalidFormat,
}

/// The 4-digit one-time code a student shows at pickup.
///
/// The backend sometimes sends it as a JSON number, which drops leading zeros;
/// deserialization pads those back.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PickupCode(String);

impl PickupCode {
    /// Number of digits in a code.
    pub const LENGTH: usize = 4;

    /// Parse a code.
    ///
    /// # Errors
    ///
    /// Returns `PickupCodeError::InvalidFormat` unless the trimmed input is
    /// exactly four ASCII digits.
    pub fn parse(s: &str) -> Result<Self, PickupCodeError> {
        let s = s.trim();
        if s.len() == Self::LENGTH && s.bytes().all(|b| b.is_ascii_digit()) {
            Ok(Self(s.to_string()))
        } else {
            Err(PickupCodeError::InvalidFormat)
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Compare against a code typed in by the vendor.
    #[must_use]
    pub fn matches(&self, entered: &str) -> bool {
        self.0 == entered.trim()
    }
}

impl core::fmt::Display for PickupCode {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

impl Serialize for PickupCode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for PickupCode {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Text(String),
            Number(u64),
        }

        let text = match Raw::deserialize(deserializer)? {
            Raw::Text(text) => text,
            Raw::Number(number) => format!("{number:0width$}", width = Self::LENGTH),
        };
        Self::parse(&text).map_err(serde::de::Error::custom)
    }
}

// =============================================================================
// Submitted Order
// =============================================================================

/// Snapshot of a cart entry as stored with a submitted order.
///
/// Content travels base64-encoded so the vendor can download the document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderFile {
    pub name: String,
    #[serde(default)]
    pub size: u64,
    #[serde(rename = "type", default)]
    pub mime_type: String,
    #[serde(with = "base64_content", default)]
    pub content: Arc<[u8]>,
    #[serde(default)]
    pub pages: Option<u32>,
    #[serde(flatten)]
    pub kind: FileKind,
}

impl From<&UploadedFile> for OrderFile {
    fn from(file: &UploadedFile) -> Self {
        Self {
            name: file.name.clone(),
            size: file.size,
            mime_type: file.mime_type.clone(),
            content: Arc::clone(&file.content),
            pages: file.page_count().and_then(PageCount::get),
            kind: file.kind,
        }
    }
}

/// An order accepted by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmittedOrder {
    #[serde(alias = "_id")]
    pub id: OrderId,
    pub user_id: UserId,
    pub user_email: Option<Email>,
    #[serde(default)]
    pub files: Vec<OrderFile>,
    #[serde(default)]
    pub settings: PrintSettings,
    pub total_amount: Amount,
    pub otp: PickupCode,
    #[serde(default)]
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
}

impl SubmittedOrder {
    /// Whether the order still appears in the vendor's active queue.
    #[must_use]
    pub const fn is_active(&self) -> bool {
        self.status.is_active()
    }
}

mod base64_content {
    use std::sync::Arc;

    use base64::Engine;
    use base64::engine::general_purpose::STANDARD;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(content: &Arc<[u8]>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(content))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Arc<[u8]>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        // Browsers upload data URLs; keep only the payload.
        let payload = encoded
            .split_once(";base64,")
            .map_or(encoded.as_str(), |(_, data)| data);
        STANDARD
            .decode(payload)
            .map(Arc::from)
            .map_err(serde::de::Error::custom)
    }
}
