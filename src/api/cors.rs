//! Origin allow-list for browser callers.
//!
//! Headers are only ever added for an allow-listed `Origin`. Other origins get
//! the same response with no CORS headers, so the browser blocks it.

use axum::http::{HeaderMap, HeaderValue, header};

pub const ALLOWED_HEADERS: &str = "Content-Type";
pub const ALLOWED_METHODS: &str = "POST, OPTIONS";

/// Set of origins allowed to read lead endpoint responses.
#[derive(Debug, Clone, Default)]
pub struct CorsPolicy {
    origins: Vec<String>,
}

impl CorsPolicy {
    pub fn new<I, S>(origins: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            origins: origins
                .into_iter()
                .map(|o| o.into().trim_end_matches('/').to_string())
                .collect(),
        }
    }

    pub fn allows(&self, origin: &str) -> bool {
        self.origins.iter().any(|o| o == origin)
    }

    /// The request's `Origin`, if it is allow-listed.
    pub fn allowed_origin<'a>(&self, request_headers: &'a HeaderMap) -> Option<&'a HeaderValue> {
        request_headers
            .get(header::ORIGIN)
            .filter(|v| v.to_str().is_ok_and(|o| self.allows(o)))
    }

    /// Add CORS headers to `response_headers` when the request origin is allowed.
    pub fn apply(&self, request_headers: &HeaderMap, response_headers: &mut HeaderMap) {
        let Some(origin) = self.allowed_origin(request_headers) else {
            return;
        };
        response_headers.insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, origin.clone());
        response_headers.insert(
            header::ACCESS_CONTROL_ALLOW_HEADERS,
            HeaderValue::from_static(ALLOWED_HEADERS),
        );
        response_headers.insert(
            header::ACCESS_CONTROL_ALLOW_METHODS,
            HeaderValue::from_static(ALLOWED_METHODS),
        );
        response_headers.append(header::VARY, HeaderValue::from_static("Origin"));
    }
}
