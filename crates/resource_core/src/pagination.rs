use serde::Serialize;
use shared::protocol::PageMeta;

pub const DEFAULT_PAGE_SIZE: u32 = 10;

/// Normalized page metrics derived from a raw paged response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PaginationInfo {
    pub page: u32,
    pub page_size: u32,
    pub total_items: u64,
    pub total_pages: u64,
    pub has_next: bool,
    pub has_previous: bool,
}

impl Default for PaginationInfo {
    fn default() -> Self {
        Self {
            page: 1,
            page_size: DEFAULT_PAGE_SIZE,
            total_items: 0,
            total_pages: 0,
            has_next: false,
            has_previous: false,
        }
    }
}

/// Derives `PaginationInfo` from response metadata, falling back to the
/// controller's current page and page size for fields the backend omitted.
///
/// A backend `page_size` of 0 is floored to 1 before the division.
/// `has_next`/`has_previous` mirror the presence of the server-provided
/// cursors; the backend's windowing is authoritative, so they are never
/// recomputed from `page` vs `total_pages`.
pub fn compute(meta: &PageMeta, fallback_page: u32, fallback_page_size: u32) -> PaginationInfo {
    let page = meta.page.unwrap_or(fallback_page).max(1);
    let page_size = meta.page_size.unwrap_or(fallback_page_size).max(1);
    let total_items = meta.count.unwrap_or(0);
    let total_pages = total_items.div_ceil(u64::from(page_size));
    PaginationInfo {
        page,
        page_size,
        total_items,
        total_pages,
        has_next: meta.next.is_some(),
        has_previous: meta.previous.is_some(),
    }
}
