//! Page-walking helper shared by drivers whose list endpoints are paginated.
//!
//! Providers paginate in different ways (page numbers, opaque markers, next
//! links). A driver describes one fetched page as a [`Page`] whose `next`
//! cursor, when present, is fed back into the fetch closure.

use std::future::Future;

use crate::error::{DriverError, Result};

/// Upper bound on pages walked by [`collect_pages`].
pub const MAX_PAGES: usize = 1000;

/// One page of results and the cursor for the following page.
#[derive(Debug, Clone)]
pub struct Page<T, C> {
    pub items: Vec<T>,
    pub next: Option<C>,
}

impl<T, C> Page<T, C> {
    pub fn new(items: Vec<T>, next: Option<C>) -> Self {
        Self { items, next }
    }

    /// A page with no successor.
    pub fn last(items: Vec<T>) -> Self {
        Self { items, next: None }
    }
}

/// Page-number cursor for APIs that stop on a short page.
///
/// Returns `Some(page + 1)` when `received` filled the page, `None` otherwise.
pub fn next_page_number(page: u32, page_size: u32, received: usize) -> Option<u32> {
    let full = u32::try_from(received).map_or(true, |n| n >= page_size);
    (received > 0 && full).then_some(page + 1)
}

/// Fetches pages starting at `first` until a page reports no `next` cursor.
///
/// Fails with [`DriverError::MalformedResponse`] after [`MAX_PAGES`] pages, which
/// only happens when a provider keeps returning a cursor (e.g. a marker cycle).
pub async fn collect_pages<T, C, F, Fut>(provider: &str, first: C, mut fetch: F) -> Result<Vec<T>>
where
    F: FnMut(C) -> Fut,
    Fut: Future<Output = Result<Page<T, C>>>,
{
    let mut items = Vec::new();
    let mut cursor = Some(first);
    let mut pages = 0usize;

    while let Some(current) = cursor.take() {
        if pages == MAX_PAGES {
            return Err(DriverError::MalformedResponse {
                provider: provider.to_string(),
                detail: format!("pagination did not terminate after {MAX_PAGES} pages"),
                body: None,
            });
        }
        let page = fetch(current).await?;
        pages += 1;
        log::debug!(
            "[{provider}] page {pages}: {} item(s), more={}",
            page.items.len(),
            page.next.is_some()
        );
        items.extend(page.items);
        cursor = page.next;
    }

    Ok(items)
}
