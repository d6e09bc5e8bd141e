//! Limit/offset pagination over list endpoints.
//!
//! `limit` and `offset` are pagination controls, not filters: they are split
//! off the query before the remaining pairs are validated as filters.

use axum::http::{StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use ledger_accounting::{Page, PageRequest};

const LIMIT: &str = "limit";
const OFFSET: &str = "offset";

/// Query pairs split into filters and a page window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListParams {
    pub filters: Vec<(String, String)>,
    pub page: PageRequest,
}

impl ListParams {
    /// Unparseable `limit`/`offset` values fall back to their defaults.
    pub fn from_pairs(pairs: Vec<(String, String)>) -> Self {
        let mut limit = None;
        let mut offset = None;
        let mut filters = Vec::with_capacity(pairs.len());

        for (key, value) in pairs {
            match key.as_str() {
                LIMIT => limit = value.trim().parse::<u32>().ok(),
                OFFSET => offset = value.trim().parse::<u64>().ok(),
                _ => filters.push((key, value)),
            }
        }

        Self {
            filters,
            page: PageRequest::new(limit, offset),
        }
    }
}

#[derive(Debug, Serialize)]
struct Paginated<T> {
    count: u64,
    next: Option<String>,
    previous: Option<String>,
    results: Vec<T>,
}

/// `{count, next, previous, results}` with links relative to the request.
pub fn paginated_response<T: Serialize>(uri: &Uri, request: PageRequest, page: Page<T>) -> Response {
    let limit = u64::from(request.limit);
    let next_offset = request.offset.saturating_add(limit);

    let body = Paginated {
        count: page.count,
        next: (next_offset < page.count).then(|| page_link(uri, request.limit, next_offset)),
        previous: (request.offset > 0)
            .then(|| page_link(uri, request.limit, request.offset.saturating_sub(limit))),
        results: page.items,
    };

    (StatusCode::OK, axum::Json(body)).into_response()
}

/// The request path and filters, with `limit`/`offset` replaced.
fn page_link(uri: &Uri, limit: u32, offset: u64) -> String {
    let mut segments: Vec<String> = uri
        .query()
        .unwrap_or_default()
        .split('&')
        .filter(|s| !s.is_empty())
        .filter(|s| {
            let key = s.split('=').next().unwrap_or_default();
            key != LIMIT && key != OFFSET
        })
        .map(str::to_string)
        .collect();
    segments.push(format!("{LIMIT}={limit}"));
    if offset > 0 {
        segments.push(format!("{OFFSET}={offset}"));
    }

    format!("{}?{}", uri.path(), segments.join("&"))
}
