use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

pub const DEFAULT_PAGE_SIZE: i64 = 6;
pub const MAX_PAGE_SIZE: i64 = 100;

/// Raw paging parameters as a client supplies them.
#[derive(Debug, Default, Clone, Copy, Deserialize, ToSchema)]
pub struct PageParams {
    /// Number of items to return (default: configured page size, max: 100)
    pub limit: Option<i64>,
    /// Number of items to skip (default: 0)
    pub offset: Option<i64>,
}

impl PageParams {
    pub fn new(limit: Option<i64>, offset: Option<i64>) -> Self {
        Self { limit, offset }
    }

    pub fn resolve(&self, default_limit: i64) -> Page {
        Page {
            limit: self
                .limit
                .unwrap_or(default_limit)
                .clamp(1, MAX_PAGE_SIZE),
            offset: self.offset.unwrap_or(0).max(0),
        }
    }
}

/// Validated window into an ordered result set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub limit: i64,
    pub offset: i64,
}

impl Default for Page {
    fn default() -> Self {
        PageParams::default().resolve(DEFAULT_PAGE_SIZE)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct PaginationMetadata {
    /// Total number of items available
    pub total: i64,
    /// Number of items requested (limit)
    pub limit: i64,
    /// Number of items skipped (offset)
    pub offset: i64,
}

impl PaginationMetadata {
    pub fn new(total: i64, page: Page) -> Self {
        Self {
            total,
            limit: page.limit,
            offset: page.offset,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply_when_missing() {
        let page = PageParams::default().resolve(6);
        assert_eq!(page, Page { limit: 6, offset: 0 });
    }

    #[test]
    fn limit_and_offset_are_clamped() {
        let page = PageParams::new(Some(5000), Some(-3)).resolve(6);
        assert_eq!(page, Page { limit: MAX_PAGE_SIZE, offset: 0 });

        let page = PageParams::new(Some(0), Some(12)).resolve(6);
        assert_eq!(page, Page { limit: 1, offset: 12 });
    }
}
