use serde::Serialize;

use crate::schemas::PageParams;

const MAX_PAGE_SIZE: i64 = 100;
const MAX_PAGE: i64 = 100_000;

/// Clamped page window: `1 <= page <= 100_000`, `1 <= page_size <= 100`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Page {
    pub(crate) page: i64,
    pub(crate) page_size: i64,
}

impl Page {
    pub(crate) fn offset(self) -> i64 {
        (self.page - 1) * self.page_size
    }
}

impl From<PageParams> for Page {
    fn from(params: PageParams) -> Self {
        Self {
            page: params.page.clamp(1, MAX_PAGE),
            page_size: params.page_size.clamp(1, MAX_PAGE_SIZE),
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct PaginatedResponse<T> {
    pub(crate) items: Vec<T>,
    pub(crate) total_count: i64,
    pub(crate) page: i64,
    pub(crate) page_size: i64,
    pub(crate) total_pages: i64,
}

impl<T> PaginatedResponse<T> {
    pub(crate) fn new(items: Vec<T>, total_count: i64, page: Page) -> Self {
        let total_pages = (total_count + page.page_size - 1) / page.page_size;
        Self { items, total_count, page: page.page, page_size: page.page_size, total_pages }
    }
}
