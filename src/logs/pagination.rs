//! Page/limit cursor over an in-memory entry list.

#![allow(missing_docs)]

use serde::Serialize;

use crate::core::errors::{Result, SgqError};

/// A validated `(page, limit)` pair; both are at least 1.
///
/// Only [`PageRequest::parse`] and [`PageRequest::new`] build one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    page: usize,
    limit: usize,
}

impl PageRequest {
    /// Build from raw caller strings.
    ///
    /// Missing (or blank) page is 1 and missing limit is `default_limit`. A
    /// limit above `max_limit` is clamped. Non-integers and values below 1 are
    /// `InvalidParameter`.
    pub fn parse(
        page: Option<&str>,
        limit: Option<&str>,
        default_limit: usize,
        max_limit: usize,
    ) -> Result<Self> {
        let page = match non_blank(page) {
            Some(raw) => parse_positive("page", raw)?,
            None => 1,
        };
        let limit = match non_blank(limit) {
            Some(raw) => parse_positive("limit", raw)?,
            None => default_limit,
        };
        Ok(Self::new(page, limit, max_limit))
    }

    /// Clamp already-typed values into range: page >= 1, 1 <= limit <= max.
    pub fn new(page: usize, limit: usize, max_limit: usize) -> Self {
        Self {
            page: page.max(1),
            limit: limit.clamp(1, max_limit.max(1)),
        }
    }

    pub const fn page(self) -> usize {
        self.page
    }

    pub const fn limit(self) -> usize {
        self.limit
    }

    pub fn offset(self) -> usize {
        (self.page - 1).saturating_mul(self.limit)
    }
}

fn non_blank(raw: Option<&str>) -> Option<&str> {
    raw.map(str::trim).filter(|s| !s.is_empty())
}

fn parse_positive(name: &'static str, raw: &str) -> Result<usize> {
    let value: i64 = raw
        .parse()
        .map_err(|_| SgqError::invalid_parameter(name, format!("{raw:?} is not an integer")))?;
    if value < 1 {
        return Err(SgqError::invalid_parameter(
            name,
            format!("must be >= 1, got {value}"),
        ));
    }
    Ok(usize::try_from(value).unwrap_or(usize::MAX))
}

/// Pagination block returned with every log page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Pagination {
    pub page: usize,
    pub limit: usize,
    pub total_logs: usize,
    pub total_pages: usize,
}

impl Pagination {
    pub fn new(request: PageRequest, total_logs: usize) -> Self {
        Self {
            page: request.page,
            limit: request.limit,
            total_logs,
            total_pages: total_logs.div_ceil(request.limit),
        }
    }
}

/// Slice `items` for `request`; pages past the end are empty.
pub fn page_slice<T>(items: &[T], request: PageRequest) -> &[T] {
    let start = request.offset().min(items.len());
    let end = start.saturating_add(request.limit).min(items.len());
    &items[start..end]
}
