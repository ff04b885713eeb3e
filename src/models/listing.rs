use serde::Serialize;
use time::OffsetDateTime;

use crate::models::{User, UserRole};

pub const DEFAULT_PAGE_SIZE: u64 = 10;
pub const MAX_PAGE_SIZE: u64 = 100;
/// Highest page whose offset still fits a Postgres BIGINT at the largest page size
pub const MAX_PAGE: u64 = i64::MAX as u64 / MAX_PAGE_SIZE;

/// Optional predicates for listing users. `None` means no constraint on that dimension.
#[derive(Debug, Clone, Default)]
pub struct UserFilter {
    pub role: Option<UserRole>,
    pub is_active: Option<bool>,
    /// Case-insensitive substring match against full name or email
    pub search: Option<String>,
    pub email_domain: Option<String>,
    pub created_from: Option<OffsetDateTime>,
    pub created_to: Option<OffsetDateTime>,
    pub updated_from: Option<OffsetDateTime>,
    pub updated_to: Option<OffsetDateTime>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

impl SortOrder {
    /// Anything other than an exact `"desc"` sorts ascending.
    pub fn from_param(value: &str) -> Self {
        if value == "desc" {
            SortOrder::Desc
        } else {
            SortOrder::Asc
        }
    }

    pub fn as_sql(&self) -> &'static str {
        match self {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        }
    }
}

/// Requested ordering. The field is matched against an allow-list when the
/// query is built, so arbitrary names are tolerated here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortSpec {
    pub field: String,
    pub order: SortOrder,
}

impl SortSpec {
    pub fn new(field: impl Into<String>, order: SortOrder) -> Self {
        Self {
            field: field.into(),
            order,
        }
    }
}

/// 1-based page window over a result set
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageSpec {
    page: u64,
    page_size: u64,
}

impl PageSpec {
    /// Out-of-range values are clamped: page to 1..=MAX_PAGE, page size to 1..=100.
    pub fn new(page: u64, page_size: u64) -> Self {
        Self {
            page: page.clamp(1, MAX_PAGE),
            page_size: page_size.clamp(1, MAX_PAGE_SIZE),
        }
    }

    pub fn page(&self) -> u64 {
        self.page
    }

    pub fn page_size(&self) -> u64 {
        self.page_size
    }

    pub fn offset(&self) -> u64 {
        (self.page - 1).saturating_mul(self.page_size)
    }
}

impl Default for PageSpec {
    fn default() -> Self {
        Self::new(1, DEFAULT_PAGE_SIZE)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PaginationMeta {
    pub page: u64,
    pub page_size: u64,
    pub total: u64,
    pub total_pages: u64,
    pub has_next: bool,
    pub has_prev: bool,
}

impl PaginationMeta {
    pub fn new(page: &PageSpec, total: u64) -> Self {
        let total_pages = total.div_ceil(page.page_size()).max(1);

        Self {
            page: page.page(),
            page_size: page.page_size(),
            total,
            total_pages,
            has_next: page.page() < total_pages,
            has_prev: page.page() > 1,
        }
    }
}

/// One page of users plus the metadata describing the window
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserPage {
    pub data: Vec<User>,
    pub pagination: PaginationMeta,
}
