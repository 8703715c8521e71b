//! Pagination types for `page[number]` / `page[size]`

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Maximum items per page
const MAX_PAGE_SIZE: u32 = 500;

/// Default items per page
pub const DEFAULT_PAGE_SIZE: u32 = 25;

pub const PAGE_NUMBER_KEY: &str = "page[number]";
pub const PAGE_SIZE_KEY: &str = "page[size]";

/// Pagination parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    /// Page number (1-indexed)
    pub page_number: u32,
    /// Items per page (max 500)
    pub page_size: u32,
}

impl Pagination {
    /// Create pagination with validation.
    ///
    /// - Page number is clamped to minimum of 1
    /// - Page size is clamped to 1..=500
    pub fn new(page_number: u32, page_size: u32) -> Self {
        Self {
            page_number: page_number.max(1),
            page_size: page_size.clamp(1, MAX_PAGE_SIZE),
        }
    }

    /// Read `page[number]` and `page[size]` from raw query parameters.
    ///
    /// Missing, non-numeric or non-positive values fall back to the defaults.
    pub fn from_params(params: &BTreeMap<String, String>) -> Self {
        let number = params
            .get(PAGE_NUMBER_KEY)
            .and_then(|v| parse_positive(v))
            .unwrap_or(1);
        let size = params
            .get(PAGE_SIZE_KEY)
            .and_then(|v| parse_positive(v))
            .unwrap_or(DEFAULT_PAGE_SIZE);
        Self::new(number, size)
    }

    /// Calculate SQL OFFSET value.
    pub fn offset(&self) -> u64 {
        (self.page_number as u64 - 1) * self.page_size as u64
    }

    /// Get FETCH NEXT value.
    pub fn limit(&self) -> u32 {
        self.page_size
    }

    /// `OFFSET $n ROWS FETCH NEXT $n+1 ROWS ONLY`, placeholders starting at `first_placeholder`.
    pub fn sql_fragment(&self, first_placeholder: usize) -> String {
        format!(
            "OFFSET ${} ROWS FETCH NEXT ${} ROWS ONLY",
            first_placeholder,
            first_placeholder + 1
        )
    }
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            page_number: 1,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

fn parse_positive(raw: &str) -> Option<u32> {
    raw.trim().parse::<u32>().ok().filter(|n| *n > 0)
}

/// One page of results plus the metadata the serializer needs
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Paginated<T> {
    /// Items for current page
    pub items: Vec<T>,
    /// Total count across all pages
    pub total_results: i64,
    /// Current page number
    pub page_number: u32,
    /// Items per page
    pub page_size: u32,
}

impl<T> Paginated<T> {
    pub fn new(items: Vec<T>, total_results: i64, page: Pagination) -> Self {
        Self {
            items,
            total_results,
            page_number: page.page_number,
            page_size: page.page_size,
        }
    }

    /// Calculate total number of pages.
    pub fn total_pages(&self) -> u32 {
        if self.total_results <= 0 {
            1
        } else {
            let total = self.total_results as u64;
            let size = self.page_size.max(1) as u64;
            total.div_ceil(size).max(1) as u32
        }
    }

    /// Check if there's a next page.
    pub fn has_next(&self) -> bool {
        self.page_number < self.total_pages()
    }

    /// Check if there's a previous page.
    pub fn has_prev(&self) -> bool {
        self.page_number > 1
    }
}
