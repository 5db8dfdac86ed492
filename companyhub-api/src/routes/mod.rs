//! API route handlers
//!
//! - `health`: Health check endpoint
//! - `auth`: Signup, login, logout and the current session
//! - `users`: User accounts
//! - `companies`: Companies and active company selection
//! - `memberships`: Members of the active company
//! - `invites`: Invites into the active company and their acceptance

pub mod auth;
pub mod companies;
pub mod health;
pub mod invites;
pub mod memberships;
pub mod users;

use serde::{Deserialize, Serialize};

/// Default page size for paginated lists
pub const DEFAULT_PAGE_SIZE: u32 = 10;

/// Largest page size a client may request
pub const MAX_PAGE_SIZE: u32 = 100;

/// `?page=&pageSize=` query parameters
#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub page: Option<u32>,
    pub page_size: Option<u32>,
}

impl Pagination {
    /// Page number, 1-based
    pub fn page(&self) -> u32 {
        self.page.unwrap_or(1).max(1)
    }

    /// Page size, clamped to `1..=MAX_PAGE_SIZE`
    pub fn page_size(&self) -> u32 {
        self.page_size
            .unwrap_or(DEFAULT_PAGE_SIZE)
            .clamp(1, MAX_PAGE_SIZE)
    }

    pub fn limit(&self) -> i64 {
        i64::from(self.page_size())
    }

    pub fn offset(&self) -> i64 {
        i64::from(self.page() - 1) * self.limit()
    }

    /// Wraps one page of results with its metadata
    pub fn paginate<T>(&self, data: Vec<T>, total: i64) -> Paginated<T> {
        Paginated {
            data,
            meta: PageMeta {
                total,
                page: self.page(),
                page_size: self.page_size(),
            },
        }
    }
}

/// Paginated list response
#[derive(Debug, Serialize)]
pub struct Paginated<T> {
    pub data: Vec<T>,
    pub meta: PageMeta,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageMeta {
    pub total: i64,
    pub page: u32,
    pub page_size: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pagination_defaults() {
        let p = Pagination::default();
        assert_eq!(p.page(), 1);
        assert_eq!(p.page_size(), DEFAULT_PAGE_SIZE);
        assert_eq!(p.offset(), 0);
    }

    #[test]
    fn test_pagination_bounds() {
        let p = Pagination {
            page: Some(0),
            page_size: Some(1000),
        };
        assert_eq!(p.page(), 1);
        assert_eq!(p.page_size(), MAX_PAGE_SIZE);

        let p = Pagination {
            page: Some(3),
            page_size: Some(20),
        };
        assert_eq!(p.limit(), 20);
        assert_eq!(p.offset(), 40);
    }

    #[test]
    fn test_page_meta_serialization() {
        let page = Pagination::default().paginate(vec![1, 2], 12);
        let json = serde_json::to_value(&page).unwrap();

        assert_eq!(json["data"], serde_json::json!([1, 2]));
        assert_eq!(json["meta"]["total"], 12);
        assert_eq!(json["meta"]["pageSize"], 10);
    }
}
