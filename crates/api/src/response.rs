//! API response types.

#![allow(missing_docs)]

use agora_common::Page;
use axum::{
    Json,
    http::{StatusCode, Uri},
    response::{IntoResponse, Response},
};
use serde::Serialize;

/// Paginated list envelope: `{count, next, previous, results}`.
#[derive(Debug, Serialize)]
pub struct Paginated<T: Serialize> {
    pub count: u64,
    pub next: Option<String>,
    pub previous: Option<String>,
    pub results: Vec<T>,
}

impl<T: Serialize> Paginated<T> {
    /// Build the envelope, linking neighbouring pages relative to `uri`.
    pub fn from_page<U>(page: Page<U>, uri: &Uri) -> Self
    where
        T: From<U>,
    {
        let current = page.request.page;
        let next = page.has_next().then(|| page_link(uri, Some(current + 1)));
        let previous = page.has_previous().then(|| {
            // Page 1 is the default, so its link carries no page parameter
            page_link(uri, (current > 2).then_some(current - 1))
        });

        Self {
            count: page.total,
            next,
            previous,
            results: page.items.into_iter().map(T::from).collect(),
        }
    }
}

impl<T: Serialize> IntoResponse for Paginated<T> {
    fn into_response(self) -> Response {
        Json(self).into_response()
    }
}

/// Rewrite the `page` query parameter of `uri`, keeping every other one.
fn page_link(uri: &Uri, page: Option<u64>) -> String {
    let mut params: Vec<String> = uri
        .query()
        .unwrap_or_default()
        .split('&')
        .filter(|pair| !pair.is_empty() && pair.split('=').next() != Some("page"))
        .map(str::to_string)
        .collect();

    if let Some(page) = page {
        params.push(format!("page={page}"));
    }

    if params.is_empty() {
        uri.path().to_string()
    } else {
        format!("{}?{}", uri.path(), params.join("&"))
    }
}

/// `{"detail": "..."}` message body.
#[derive(Debug, Serialize)]
pub struct Detail {
    pub detail: String,
}

impl Detail {
    pub fn new(detail: impl Into<String>) -> Self {
        Self {
            detail: detail.into(),
        }
    }
}

impl IntoResponse for Detail {
    fn into_response(self) -> Response {
        Json(self).into_response()
    }
}

/// 201 with a JSON body.
pub fn created<T: Serialize>(body: T) -> Response {
    (StatusCode::CREATED, Json(body)).into_response()
}

/// Empty success response.
#[must_use]
pub fn no_content() -> StatusCode {
    StatusCode::NO_CONTENT
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use agora_common::PageRequest;

    fn page(n: u64, total: u64) -> Page<u64> {
        Page::new(
            vec![1, 2],
            total,
            PageRequest {
                page: n,
                page_size: 2,
            },
        )
    }

    #[test]
    fn test_first_page_links() {
        let uri: Uri = "/api/posts/posts?search=rust".parse().unwrap();
        let body: Paginated<u64> = Paginated::from_page(page(1, 5), &uri);

        assert_eq!(body.count, 5);
        assert_eq!(body.next.as_deref(), Some("/api/posts/posts?search=rust&page=2"));
        assert!(body.previous.is_none());
    }

    #[test]
    fn test_previous_of_second_page_drops_page_param() {
        let uri: Uri = "/api/posts/posts?page=2&page_size=2".parse().unwrap();
        let body: Paginated<u64> = Paginated::from_page(page(2, 5), &uri);

        assert_eq!(body.previous.as_deref(), Some("/api/posts/posts?page_size=2"));
        assert_eq!(
            body.next.as_deref(),
            Some("/api/posts/posts?page_size=2&page=3")
        );
    }

    #[test]
    fn test_last_page_has_no_next() {
        let uri: Uri = "/api/library/books?page=3".parse().unwrap();
        let body: Paginated<u64> = Paginated::from_page(page(3, 5), &uri);

        assert!(body.next.is_none());
        assert_eq!(body.previous.as_deref(), Some("/api/library/books?page=2"));
    }
}
