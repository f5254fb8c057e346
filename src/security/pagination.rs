//! Page/limit clamping for row browsing.

use serde::Serialize;

pub const DEFAULT_PAGE_LIMIT: u32 = 50;
pub const MAX_PAGE_LIMIT: u32 = 1000;

/// Sanitized pagination parameters. Construction never fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Pagination {
    pub page: u32,
    pub limit: u32,
}

impl Pagination {
    pub fn new(page: Option<i64>, limit: Option<i64>) -> Self {
        Self::with_bounds(page, limit, DEFAULT_PAGE_LIMIT, MAX_PAGE_LIMIT)
    }

    /// Clamp with caller-provided defaults. Zero or missing values fall back
    /// to the defaults before clamping.
    pub fn with_bounds(
        page: Option<i64>,
        limit: Option<i64>,
        default_limit: u32,
        max_limit: u32,
    ) -> Self {
        let page = page.filter(|p| *p != 0).unwrap_or(1).max(1);
        let limit = limit
            .filter(|l| *l != 0)
            .unwrap_or(i64::from(default_limit))
            .clamp(1, i64::from(max_limit.max(1)));

        Self {
            page: u32::try_from(page).unwrap_or(u32::MAX),
            limit: limit as u32,
        }
    }

    pub fn offset(&self) -> u64 {
        u64::from(self.page - 1) * u64::from(self.limit)
    }
}

impl Default for Pagination {
    fn default() -> Self {
        Self::new(None, None)
    }
}

/// Clamp raw page/limit values.
pub fn validate_pagination(page: Option<i64>, limit: Option<i64>) -> Pagination {
    Pagination::new(page, limit)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let p = Pagination::default();
        assert_eq!(p.page, 1);
        assert_eq!(p.limit, 50);
        assert_eq!(p.offset(), 0);
    }

    #[test]
    fn test_clamping() {
        assert_eq!(validate_pagination(Some(-3), Some(5)).page, 1);
        assert_eq!(validate_pagination(Some(0), None).page, 1);
        assert_eq!(validate_pagination(Some(2), Some(5000)).limit, 1000);
        assert_eq!(validate_pagination(Some(2), Some(-7)).limit, 1);
        assert_eq!(validate_pagination(Some(2), Some(0)).limit, 50);
    }

    #[test]
    fn test_offset() {
        let p = validate_pagination(Some(3), Some(25));
        assert_eq!(p.offset(), 50);
    }

    #[test]
    fn test_custom_bounds() {
        let p = Pagination::with_bounds(None, Some(500), 20, 200);
        assert_eq!(p.limit, 200);
        let p = Pagination::with_bounds(None, None, 20, 200);
        assert_eq!(p.limit, 20);
    }
}
