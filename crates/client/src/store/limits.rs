//! Upload validation.

use campus_print_core::Amount;

use super::error::CartError;

/// 25 MiB.
const DEFAULT_MAX_FILE_BYTES: u64 = 25 * 1024 * 1024;
const DEFAULT_MAX_CART_ENTRIES: usize = 20;
const DEFAULT_ALLOWED_TYPES: &[&str] = &["application/pdf", "image/png", "image/jpeg"];

/// A file picked or dropped by the user, before it joins the cart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileUpload {
    pub name: String,
    pub mime_type: String,
    pub content: Vec<u8>,
}

impl FileUpload {
    /// Build an upload. An empty MIME type is guessed from the file extension.
    #[must_use]
    pub fn new(name: impl Into<String>, mime_type: impl Into<String>, content: Vec<u8>) -> Self {
        let name = name.into();
        let mut mime_type = mime_type.into();
        if mime_type.trim().is_empty() {
            mime_type = guess_mime_type(&name).to_string();
        }
        Self {
            name,
            mime_type,
            content,
        }
    }

    #[must_use]
    pub fn size(&self) -> u64 {
        self.content.len() as u64
    }
}

/// Best-effort MIME type from a file name.
#[must_use]
pub fn guess_mime_type(name: &str) -> &'static str {
    let extension = name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();
    match extension.as_str() {
        "pdf" => "application/pdf",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "txt" => "text/plain",
        "doc" => "application/msword",
        "docx" => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        _ => "application/octet-stream",
    }
}

/// Client-side limits on what can go into a cart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileLimits {
    /// Largest accepted document, in bytes.
    pub max_file_bytes: u64,
    /// Lowercase MIME types accepted for documents. Empty accepts any type.
    pub allowed_mime_types: Vec<String>,
    /// Most entries (documents plus stationery) in one cart.
    pub max_cart_entries: usize,
}

impl Default for FileLimits {
    fn default() -> Self {
        Self {
            max_file_bytes: DEFAULT_MAX_FILE_BYTES,
            allowed_mime_types: DEFAULT_ALLOWED_TYPES
                .iter()
                .map(ToString::to_string)
                .collect(),
            max_cart_entries: DEFAULT_MAX_CART_ENTRIES,
        }
    }
}

impl FileLimits {
    /// No limits at all.
    #[must_use]
    pub const fn unrestricted() -> Self {
        Self {
            max_file_bytes: u64::MAX,
            allowed_mime_types: Vec::new(),
            max_cart_entries: usize::MAX,
        }
    }

    /// Whether documents of `mime_type` may be uploaded. Parameters such as
    /// `; charset=utf-8` are ignored.
    #[must_use]
    pub fn allows_type(&self, mime_type: &str) -> bool {
        if self.allowed_mime_types.is_empty() {
            return true;
        }
        let essence = mime_type
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();
        self.allowed_mime_types.iter().any(|allowed| *allowed == essence)
    }

    /// Check a document upload against the limits.
    ///
    /// # Errors
    ///
    /// Returns the first limit the upload breaks.
    pub fn check_document(&self, upload: &FileUpload, cart_len: usize) -> Result<(), CartError> {
        self.check_capacity(cart_len)?;
        if upload.content.is_empty() {
            return Err(CartError::EmptyFile {
                name: upload.name.clone(),
            });
        }
        if upload.size() > self.max_file_bytes {
            return Err(CartError::FileTooLarge {
                name: upload.name.clone(),
                size: upload.size(),
                max: self.max_file_bytes,
            });
        }
        if !self.allows_type(&upload.mime_type) {
            return Err(CartError::UnsupportedType {
                name: upload.name.clone(),
                mime_type: upload.mime_type.clone(),
            });
        }
        Ok(())
    }

    /// Check a stationery item against the limits.
    ///
    /// # Errors
    ///
    /// Returns `CartError::InvalidItem` for a blank name or negative price and
    /// `CartError::CartFull` when there is no room.
    pub fn check_stationery(
        &self,
        name: &str,
        price: Amount,
        cart_len: usize,
    ) -> Result<(), CartError> {
        self.check_capacity(cart_len)?;
        if name.trim().is_empty() {
            return Err(CartError::InvalidItem("item name cannot be empty".to_string()));
        }
        if price.is_negative() {
            return Err(CartError::InvalidItem(format!(
                "price for '{name}' cannot be negative"
            )));
        }
        Ok(())
    }

    const fn check_capacity(&self, cart_len: usize) -> Result<(), CartError> {
        if cart_len >= self.max_cart_entries {
            return Err(CartError::CartFull {
                max: self.max_cart_entries,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rust_decimal::Decimal;

    use super::*;

    fn pdf(size: usize) -> FileUpload {
        FileUpload::new("thesis.pdf", "application/pdf", vec![0; size])
    }

    #[test]
    fn test_guess_mime_type() {
        assert_eq!(FileUpload::new("Scan.JPG", "", vec![1]).mime_type, "image/jpeg");
        assert_eq!(guess_mime_type("notes.pdf"), "application/pdf");
        assert_eq!(guess_mime_type("README"), "application/octet-stream");
    }

    #[test]
    fn test_default_limits_accept_pdf() {
        assert!(FileLimits::default().check_document(&pdf(10), 0).is_ok());
    }

    #[test]
    fn test_rejects_oversized_file() {
        let limits = FileLimits {
            max_file_bytes: 8,
            ..FileLimits::default()
        };
        assert!(matches!(
            limits.check_document(&pdf(9), 0),
            Err(CartError::FileTooLarge { size: 9, max: 8, .. })
        ));
        assert!(limits.check_document(&pdf(8), 0).is_ok());
    }

    #[test]
    fn test_rejects_disallowed_type() {
        let upload = FileUpload::new("macro.docm", "application/vnd.ms-word", vec![1]);
        assert!(matches!(
            FileLimits::default().check_document(&upload, 0),
            Err(CartError::UnsupportedType { .. })
        ));
        assert!(FileLimits::unrestricted().check_document(&upload, 0).is_ok());
    }

    #[test]
    fn test_type_check_ignores_parameters_and_case() {
        let limits = FileLimits::default();
        assert!(limits.allows_type("Application/PDF; version=1.7"));
        assert!(!limits.allows_type("text/plain"));
    }

    #[test]
    fn test_rejects_empty_file() {
        assert!(matches!(
            FileLimits::default().check_document(&pdf(0), 0),
            Err(CartError::EmptyFile { .. })
        ));
    }

    #[test]
    fn test_cart_capacity() {
        let limits = FileLimits {
            max_cart_entries: 2,
            ..FileLimits::default()
        };
        assert!(limits.check_document(&pdf(1), 1).is_ok());
        assert!(matches!(
            limits.check_document(&pdf(1), 2),
            Err(CartError::CartFull { max: 2 })
        ));
        assert!(matches!(
            limits.check_stationery("Pen", Amount::from_units(5), 2),
            Err(CartError::CartFull { max: 2 })
        ));
    }

    #[test]
    fn test_stationery_validation() {
        let limits = FileLimits::default();
        assert!(limits.check_stationery("Pen", Amount::from_units(5), 0).is_ok());
        assert!(matches!(
            limits.check_stationery("  ", Amount::from_units(5), 0),
            Err(CartError::InvalidItem(_))
        ));
        assert!(matches!(
            limits.check_stationery("Pen", Amount::new(Decimal::new(-5, 0)), 0),
            Err(CartError::InvalidItem(_))
        ));
    }
}
