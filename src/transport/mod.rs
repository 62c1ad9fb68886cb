//! Transport to the graph API
//!
//! The explorer only needs two verbs: POST a JSON body and GET a path. Both
//! resolve to an arbitrary JSON value. [`HttpTransport`] talks to the real
//! API over `reqwest`; tests substitute in-memory implementations.

pub mod call_log;
pub mod http;

use async_trait::async_trait;
use serde_json::Value;

use crate::cancel::CancelSignal;
use crate::error::TransportResult;

pub use call_log::{to_curl, ApiCallLog, CallLog, CurlRequest};
pub use http::HttpTransport;

/// Request/response access to the graph API
///
/// Implementations must be Send + Sync so traversal branches can share one
/// transport.
#[async_trait]
pub trait Transport: Send + Sync {
    /// POST `body` as JSON to `path` (relative to the API base)
    async fn post(&self, path: &str, body: &Value, signal: &CancelSignal) -> TransportResult<Value>;

    /// GET `path` (relative to the API base, may carry a query string)
    async fn get(&self, path: &str, signal: &CancelSignal) -> TransportResult<Value>;
}

/// HTTP method of a request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
        }
    }
}

impl std::fmt::Display for Method {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Build an API path from raw segments, percent-encoding each one, with
/// optional form-encoded query pairs
///
/// `api_path(&["e 1", "attributes", "a/b"], &[])` is
/// `/e%201/attributes/a%2Fb`. Every segment is kept, including empty ones
/// and the dot segments `.` and `..`, which are escaped as `%2E`.
pub fn api_path(segments: &[&str], query: &[(&str, &str)]) -> String {
    let path: String = segments
        .iter()
        .map(|segment| format!("/{}", encode_segment(segment)))
        .collect();

    if query.is_empty() {
        return path;
    }
    let query = url::form_urlencoded::Serializer::new(String::new())
        .extend_pairs(query)
        .finish();
    format!("{path}?{query}")
}

/// True for segments a URL parser resolves away (`.`, `..`, `%2E`, ...)
pub fn is_dot_segment(segment: &str) -> bool {
    let decoded = segment.to_ascii_lowercase().replace("%2e", ".");
    decoded == "." || decoded == ".."
}

/// Percent-encode a single path segment
fn encode_segment(segment: &str) -> String {
    // `push` drops dot segments
    if segment == "." || segment == ".." {
        return segment.replace('.', "%2E");
    }

    let Ok(mut url) = url::Url::parse("http://api.invalid/") else {
        return segment.to_string();
    };
    if let Ok(mut path) = url.path_segments_mut() {
        path.clear().push(segment);
    }
    let path = url.path();
    path.strip_prefix('/').unwrap_or(path).to_string()
}
