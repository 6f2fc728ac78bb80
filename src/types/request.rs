//! Intercepted requests and the keys cached entries are stored under.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use url::Url;

/// Address of a cached entry: upper-cased method plus URL without fragment.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RequestKey {
    pub method: String,
    pub url: String,
}

impl RequestKey {
    pub fn new(method: impl AsRef<str>, url: impl AsRef<str>) -> Self {
        Self {
            method: method.as_ref().trim().to_uppercase(),
            url: normalize_url(url.as_ref()),
        }
    }

    pub fn get(url: impl AsRef<str>) -> Self {
        Self::new("GET", url)
    }

    /// Resolves the URL against `origin`, so `/cat.jpg` and
    /// `https://example.com/cat.jpg` address the same entry. Without an origin,
    /// or when the URL cannot be joined, the key is returned unchanged.
    pub fn resolve(self, origin: Option<&Url>) -> Self {
        let Some(origin) = origin else {
            return self;
        };
        match origin.join(&self.url) {
            Ok(mut url) => {
                url.set_fragment(None);
                Self {
                    method: self.method,
                    url: url.to_string(),
                }
            }
            Err(_) => self,
        }
    }

    pub fn is_get(&self) -> bool {
        self.method == "GET"
    }

    /// Stable hex digest of the key, used as an on-disk entry name.
    pub fn digest(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.method.as_bytes());
        hasher.update(b" ");
        hasher.update(self.url.as_bytes());
        hasher
            .finalize()
            .iter()
            .map(|b| format!("{:02x}", b))
            .collect()
    }
}

impl std::fmt::Display for RequestKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.method, self.url)
    }
}

impl From<&str> for RequestKey {
    fn from(url: &str) -> Self {
        Self::get(url)
    }
}

impl From<String> for RequestKey {
    fn from(url: String) -> Self {
        Self::get(url)
    }
}

fn normalize_url(url: &str) -> String {
    let trimmed = url.trim();
    match trimmed.split_once('#') {
        Some((before, _)) => before.to_string(),
        None => trimmed.to_string(),
    }
}

/// An outbound request as seen by the interceptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub method: String,
    pub url: String,
    pub headers: Vec<(String, String)>,
}

impl Request {
    pub fn new(method: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            url: url.into(),
            headers: Vec::new(),
        }
    }

    pub fn get(url: impl Into<String>) -> Self {
        Self::new("GET", url)
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn key(&self) -> RequestKey {
        RequestKey::new(&self.method, &self.url)
    }

    /// Only GET requests are looked up in or written to the store.
    pub fn is_cacheable(&self) -> bool {
        self.method.trim().eq_ignore_ascii_case("GET")
    }
}

impl From<&RequestKey> for Request {
    fn from(key: &RequestKey) -> Self {
        Self::new(key.method.clone(), key.url.clone())
    }
}
