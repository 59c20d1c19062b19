//! Cart entries: uploaded documents and stationery items.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::amount::Amount;
use super::id::FileId;

/// MIME type recorded for stationery items, which have no real content.
pub const STATIONERY_MIME_TYPE: &str = "application/x-stationery";

/// What a cart entry is, and how it is priced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FileKind {
    /// A document priced per page, per copy.
    Document,
    /// A shop item with a fixed price that ignores print settings.
    Stationery { price: Amount },
}

/// Page count of a document.
///
/// Starts `Pending` when the file is added and moves to `Resolved` once; it
/// never changes after that.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PageCount {
    #[default]
    Pending,
    Resolved(u32),
}

impl PageCount {
    /// Resolved count, or `None` while pending.
    #[must_use]
    pub const fn get(self) -> Option<u32> {
        match self {
            Self::Pending => None,
            Self::Resolved(pages) => Some(pages),
        }
    }

    /// Pages to bill for: the resolved count, or 1 while pending.
    #[must_use]
    pub const fn billable(self) -> u32 {
        match self {
            Self::Pending => 1,
            Self::Resolved(pages) => pages,
        }
    }

    /// Returns true if the count has not been determined yet.
    #[must_use]
    pub const fn is_pending(self) -> bool {
        matches!(self, Self::Pending)
    }
}

/// One entry in the draft order.
///
/// Content is reference counted so snapshots of the cart (for views and for
/// submission) don't copy file bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedFile {
    pub id: FileId,
    pub name: String,
    pub size: u64,
    pub mime_type: String,
    pub content: Arc<[u8]>,
    /// Always `None` for stationery; see [`UploadedFile::page_count`].
    pages: Option<PageCount>,
    pub kind: FileKind,
}

impl UploadedFile {
    /// A freshly added document, with its page count pending.
    #[must_use]
    pub fn document(name: impl Into<String>, mime_type: impl Into<String>, content: Vec<u8>) -> Self {
        let content: Arc<[u8]> = content.into();
        Self {
            id: FileId::generate(),
            name: name.into(),
            size: content.len() as u64,
            mime_type: mime_type.into(),
            content,
            pages: Some(PageCount::Pending),
            kind: FileKind::Document,
        }
    }

    /// A stationery item with a fixed price.
    #[must_use]
    pub fn stationery(name: impl Into<String>, price: Amount) -> Self {
        Self {
            id: FileId::generate(),
            name: name.into(),
            size: 0,
            mime_type: STATIONERY_MIME_TYPE.to_string(),
            content: Arc::from(Vec::new()),
            pages: None,
            kind: FileKind::Stationery { price },
        }
    }

    /// Page count state; `None` for stationery items.
    #[must_use]
    pub const fn page_count(&self) -> Option<PageCount> {
        self.pages
    }

    /// Returns true if this is a stationery item.
    #[must_use]
    pub const fn is_stationery(&self) -> bool {
        matches!(self.kind, FileKind::Stationery { .. })
    }

    /// Record the page count of a pending document.
    ///
    /// Returns false (and changes nothing) for stationery items or if the count
    /// was already resolved.
    pub fn resolve_pages(&mut self, pages: u32) -> bool {
        match self.pages {
            Some(PageCount::Pending) => {
                self.pages = Some(PageCount::Resolved(pages));
                true
            }
            Some(PageCount::Resolved(_)) | None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_starts_pending() {
        let file = UploadedFile::document("notes.pdf", "application/pdf", vec![0; 10]);
        assert_eq!(file.size, 10);
        assert_eq!(file.page_count(), Some(PageCount::Pending));
        assert!(!file.is_stationery());
    }

    #[test]
    fn test_pages_resolve_once() {
        let mut file = UploadedFile::document("notes.pdf", "application/pdf", Vec::new());
        assert!(file.resolve_pages(3));
        assert!(!file.resolve_pages(7));
        assert_eq!(file.page_count(), Some(PageCount::Resolved(3)));
    }

    #[test]
    fn test_stationery_never_has_pages() {
        let mut item = UploadedFile::stationery("Blue pen", Amount::from_units(20));
        assert!(item.is_stationery());
        assert!(!item.resolve_pages(1));
        assert_eq!(item.page_count(), None);
    }

    #[test]
    fn test_billable_pages_default_to_one() {
        assert_eq!(PageCount::Pending.billable(), 1);
        assert_eq!(PageCount::Resolved(4).billable(), 4);
        assert_eq!(PageCount::Pending.get(), None);
    }
}
