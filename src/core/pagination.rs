// Skip/limit pagination

use serde::Deserialize;

pub const MAX_PAGE_SIZE: u64 = 100;
pub const API_PAGE_SIZE: u64 = 10;
pub const VIEW_PAGE_SIZE: u64 = 20;

/// Raw `?page=&limit=` query parameters
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PageParams {
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

/// A validated page window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub page: u64,
    pub limit: u64,
}

impl Page {
    /// Clamp user input: pages start at 1, out-of-range limits fall back to `default_limit`.
    pub fn from_params(params: &PageParams, default_limit: u64) -> Self {
        let page = match params.page {
            Some(p) if p >= 1 => p as u64,
            _ => 1,
        };
        let limit = match params.limit {
            Some(l) if l >= 1 && l as u64 <= MAX_PAGE_SIZE => l as u64,
            _ => default_limit,
        };
        Self { page, limit }
    }

    pub fn skip(&self) -> u64 {
        (self.page - 1).saturating_mul(self.limit)
    }

    /// Number of pages needed for `total` documents (at least one)
    pub fn page_count(&self, total: u64) -> u64 {
        total.div_ceil(self.limit).max(1)
    }
}
