//! Page range selection.

use std::ops::Range;

/// Clip a document's pages to a requested inclusive `[start, end]` window.
///
/// `end` is inclusive; `None` means "to the last page". Returns a half-open
/// index range into the page list. An out-of-range window (`start >= total`
/// or `start > end`) yields an empty range; downstream code returns zero
/// pages rather than failing.
pub fn select_page_range(total: usize, start: usize, end: Option<usize>) -> Range<usize> {
    let begin = start.min(total);
    let stop = match end {
        Some(end) => total.min(end.saturating_add(1)),
        None => total,
    };
    begin..stop.max(begin)
}
