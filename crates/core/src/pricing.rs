//! Price calculation for a draft order.
//!
//! ```text
//! documents  = sum(pages or 1) * rate(color) * copies
//! stationery = sum(item price)              (not multiplied by copies)
//! total      = documents + stationery
//! ```

use crate::types::{Amount, FileKind, PageCount, PrintSettings, UploadedFile};

/// Per-page rate for color printing.
pub const COLOR_PAGE_RATE: u32 = 10;

/// Per-page rate for mono printing.
pub const MONO_PAGE_RATE: u32 = 2;

/// Per-page rate for the given color mode.
#[must_use]
pub const fn per_page_rate(color: bool) -> u32 {
    if color { COLOR_PAGE_RATE } else { MONO_PAGE_RATE }
}

/// Total price of `files` printed with `settings`.
///
/// Pure: the same inputs always give the same amount. Documents whose page
/// count is still pending are billed as one page.
#[must_use]
pub fn calculate_total(files: &[UploadedFile], settings: &PrintSettings) -> Amount {
    let mut pages: u64 = 0;
    let mut stationery = Amount::ZERO;

    for file in files {
        match file.kind {
            FileKind::Document => {
                let billable = file.page_count().map_or(1, PageCount::billable);
                pages = pages.saturating_add(u64::from(billable));
            }
            FileKind::Stationery { price } => stationery += price,
        }
    }

    let documents = Amount::from_units(pages) * per_page_rate(settings.color) * settings.copies();
    documents + stationery
}
