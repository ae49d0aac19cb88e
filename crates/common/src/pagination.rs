//! Page-number pagination.
//!
//! List queries take a [`PageRequest`] (1-based page plus page size) and
//! return a [`Page`] carrying the total row count, so the API layer can
//! render `count`, `next` and `previous`.

use serde::Serialize;

use crate::config::PaginationConfig;
use crate::{AppError, AppResult};

/// Largest offset a database `OFFSET` (a signed 64-bit value) accepts.
const MAX_OFFSET: u64 = i64::MAX.unsigned_abs();

/// A validated page request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    /// 1-based page number.
    pub page: u64,
    /// Rows per page.
    pub page_size: u64,
}

impl PageRequest {
    /// Build a page request from optional client input.
    ///
    /// A missing page size falls back to the configured default and an
    /// oversized one is capped at the configured maximum.
    pub fn new(
        page: Option<u64>,
        page_size: Option<u64>,
        config: &PaginationConfig,
    ) -> AppResult<Self> {
        let page = page.unwrap_or(1);
        if page == 0 {
            return Err(AppError::Validation("Invalid page.".to_string()));
        }

        let page_size = match page_size {
            Some(0) | None => config.default_page_size,
            Some(size) => size.min(config.max_page_size),
        };

        Ok(Self { page, page_size })
    }

    /// Number of rows to skip. Pages far past the end clamp to [`MAX_OFFSET`]
    /// and read as empty.
    #[must_use]
    pub const fn offset(&self) -> u64 {
        let offset = self.page.saturating_sub(1).saturating_mul(self.page_size);
        if offset > MAX_OFFSET { MAX_OFFSET } else { offset }
    }

    /// Number of rows to fetch.
    #[must_use]
    pub const fn limit(&self) -> u64 {
        self.page_size
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: 1,
            page_size: PaginationConfig::default().default_page_size,
        }
    }
}

/// One page of results.
#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    /// Rows on this page.
    pub items: Vec<T>,
    /// Total rows across all pages.
    pub total: u64,
    /// The request that produced this page.
    #[serde(skip)]
    pub request: PageRequest,
}

impl<T> Page<T> {
    /// Create a page.
    #[must_use]
    pub const fn new(items: Vec<T>, total: u64, request: PageRequest) -> Self {
        Self {
            items,
            total,
            request,
        }
    }

    /// Whether a later page exists.
    #[must_use]
    pub const fn has_next(&self) -> bool {
        self.request.page.saturating_mul(self.request.page_size) < self.total
    }

    /// Whether an earlier page exists.
    #[must_use]
    pub const fn has_previous(&self) -> bool {
        self.request.page > 1
    }

    /// Transform the rows while keeping the paging metadata.
    pub fn map<U, F: FnMut(T) -> U>(self, f: F) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            total: self.total,
            request: self.request,
        }
    }
}
