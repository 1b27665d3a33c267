//! Loaders (GET) and form actions (POST/PUT/DELETE), grouped by area.

use serde::Deserialize;
use utoipa::IntoParams;

use crate::models::Pagination;

pub mod account;
pub mod admin;
pub mod jobs;
pub mod shop;
pub mod storefront;
pub mod student;
pub mod superadmin;
pub mod tutor;

pub const JOBS_PER_PAGE: i64 = 10;
pub const APPLICATIONS_PER_PAGE: i64 = 10;
pub const APPLIED_JOBS_PER_PAGE: i64 = 10;
pub const PRODUCTS_PER_PAGE: i64 = 3;
pub const ORDERS_PER_PAGE: i64 = 10;

/// PageQuery
///
/// `?page=&search=` accepted by the paginated dashboards.
#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct PageQuery {
    /// 1-based page number, defaults to 1.
    pub page: Option<i64>,
    pub search: Option<String>,
}

impl PageQuery {
    pub fn page_number(&self) -> i64 {
        self.page.unwrap_or(1).max(1)
    }

    /// Search term, `None` when blank.
    pub fn search(&self) -> Option<&str> {
        self.search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }

    pub fn paginate(&self, per_page: i64, total_items: i64) -> Pagination {
        Pagination::new(self.page_number(), per_page, total_items)
    }
}

/// Trims a form value and drops it when empty.
pub(crate) fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
