//! Immutable response snapshots.

use bytes::Bytes;

/// Body of the synthetic response returned when the network fails outright.
pub const SYNTHETIC_FAILURE_BODY: &str = "That totally failed";

/// A response as stored in and served from the cache.
///
/// The body is a [`Bytes`] handle, so cloning shares the underlying buffer and
/// every clone observes the same bytes. A response fetched on a miss can be
/// written to the store and returned to the caller without any explicit
/// duplication step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Bytes,
}

impl CachedResponse {
    pub fn new(status: u16, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body: body.into(),
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// The fixed response handed back when a fetch fails without any HTTP status.
    pub fn synthetic_failure() -> Self {
        Self::new(200, Bytes::from_static(SYNTHETIC_FAILURE_BODY.as_bytes()))
            .with_header("content-type", "text/plain;charset=UTF-8")
    }

    /// Case-insensitive header lookup; returns the first match.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn is_not_found(&self) -> bool {
        self.status == 404
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}
