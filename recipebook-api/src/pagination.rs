/// Page-number pagination for list endpoints
///
/// Lists accept `?page=N&limit=M` and answer with
///
/// ```json
/// {
///   "count": 123,
///   "next": "/api/recipes?author=1&page=3",
///   "previous": "/api/recipes?author=1",
///   "results": []
/// }
/// ```
///
/// Links are relative and keep every other query parameter.

use axum::http::Uri;
use serde::{Deserialize, Serialize};

use crate::config::MAX_PAGE_SIZE;
use crate::error::{ApiError, ApiResult};

/// `page` / `limit` query parameters
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct PageParams {
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

/// A resolved, 1-based page
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub number: u32,
    pub size: u32,
}

impl PageParams {
    /// Applies defaults and bounds
    pub fn resolve(&self, default_size: u32) -> ApiResult<Page> {
        let number = self.page.unwrap_or(1);
        if number == 0 {
            return Err(ApiError::invalid_field("page", "Pages start at 1"));
        }

        let size = match self.limit {
            Some(0) => return Err(ApiError::invalid_field("limit", "Limit must be positive")),
            Some(limit) => limit.min(MAX_PAGE_SIZE),
            None => default_size,
        };

        Ok(Page { number, size })
    }
}

impl Page {
    pub fn limit(&self) -> i64 {
        i64::from(self.size)
    }

    pub fn offset(&self) -> i64 {
        i64::from(self.number - 1) * i64::from(self.size)
    }

    /// Fails with 404 for a page past the end (page 1 always exists)
    pub fn ensure_exists(&self, count: i64) -> ApiResult<()> {
        if self.number > 1 && self.offset() >= count {
            return Err(ApiError::NotFound("Invalid page".to_string()));
        }
        Ok(())
    }

    fn has_next(&self, count: i64) -> bool {
        self.offset() + self.limit() < count
    }
}

/// Paginated list body
#[derive(Debug, Serialize)]
pub struct Paginated<T> {
    pub count: i64,
    pub next: Option<String>,
    pub previous: Option<String>,
    pub results: Vec<T>,
}

impl<T> Paginated<T> {
    pub fn new(results: Vec<T>, count: i64, page: Page, uri: &Uri) -> Self {
        let next = page
            .has_next(count)
            .then(|| page_link(uri, page.number + 1));
        let previous = (page.number > 1).then(|| page_link(uri, page.number - 1));

        Self {
            count,
            next,
            previous,
            results,
        }
    }
}

/// Rebuilds the request path with `page` replaced; page 1 drops the parameter
fn page_link(uri: &Uri, page: u32) -> String {
    let page_param = format!("page={}", page);
    let mut params: Vec<&str> = uri
        .query()
        .unwrap_or_default()
        .split('&')
        .filter(|pair| !pair.is_empty())
        .filter(|pair| pair.split('=').next() != Some("page"))
        .collect();

    if page > 1 {
        params.push(&page_param);
    }

    if params.is_empty() {
        uri.path().to_string()
    } else {
        format!("{}?{}", uri.path(), params.join("&"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn uri(s: &str) -> Uri {
        s.parse().unwrap()
    }

    #[test]
    fn test_resolve_defaults() {
        let page = PageParams::default().resolve(6).unwrap();
        assert_eq!(page, Page { number: 1, size: 6 });
        assert_eq!(page.offset(), 0);
    }

    #[test]
    fn test_resolve_caps_limit() {
        let params = PageParams {
            page: Some(3),
            limit: Some(1000),
        };
        let page = params.resolve(6).unwrap();

        assert_eq!(page.size, MAX_PAGE_SIZE);
        assert_eq!(page.offset(), 200);
    }

    #[test]
    fn test_resolve_rejects_zero() {
        let zero_page = PageParams {
            page: Some(0),
            limit: None,
        };
        assert!(zero_page.resolve(6).is_err());

        let zero_limit = PageParams {
            page: None,
            limit: Some(0),
        };
        assert!(zero_limit.resolve(6).is_err());
    }

    #[test]
    fn test_links_keep_other_params() {
        let page = Page { number: 2, size: 2 };
        let list = Paginated::new(vec![3, 4], 7, page, &uri("/api/recipes?author=5&page=2&limit=2"));

        assert_eq!(list.next.as_deref(), Some("/api/recipes?author=5&limit=2&page=3"));
        assert_eq!(list.previous.as_deref(), Some("/api/recipes?author=5&limit=2"));
    }

    #[test]
    fn test_single_page_has_no_links() {
        let page = Page { number: 1, size: 6 };
        let list = Paginated::new(vec![1, 2, 3], 3, page, &uri("/api/users"));

        assert_eq!(list.count, 3);
        assert!(list.next.is_none());
        assert!(list.previous.is_none());
    }

    #[test]
    fn test_first_page_links_to_second() {
        let page = Page { number: 1, size: 6 };
        let list: Paginated<i32> = Paginated::new(vec![], 10, page, &uri("/api/users"));

        assert_eq!(list.next.as_deref(), Some("/api/users?page=2"));
    }

    #[test]
    fn test_page_past_end_is_not_found() {
        let page = Page { number: 3, size: 6 };
        assert!(page.ensure_exists(12).is_err());
        assert!(page.ensure_exists(13).is_ok());

        let first = Page { number: 1, size: 6 };
        assert!(first.ensure_exists(0).is_ok());
    }
}
