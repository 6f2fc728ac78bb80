use super::{FetchError, Fetcher};
use crate::config::CacheConfig;
use crate::types::{CachedResponse, Request};
use crate::Result;
use async_trait::async_trait;
use reqwest::{Method, Proxy};
use std::env;
use std::time::Duration;
use url::Url;

pub struct HttpFetcher {
    client: reqwest::Client,
    origin: Option<Url>,
}

impl HttpFetcher {
    pub fn new(config: &CacheConfig) -> Result<Self> {
        let mut builder = reqwest::Client::builder()
            .pool_max_idle_per_host(
                env::var("OFFLINE_CACHE_HTTP_POOL_MAX_IDLE_PER_HOST")
                    .ok()
                    .and_then(|s| s.parse::<usize>().ok())
                    .unwrap_or(32),
            )
            .pool_idle_timeout(Some(Duration::from_secs(
                env::var("OFFLINE_CACHE_HTTP_POOL_IDLE_TIMEOUT_SECS")
                    .ok()
                    .and_then(|s| s.parse::<u64>().ok())
                    .unwrap_or(90),
            )));

        // No timeout unless configured: a hung origin hangs only its own request.
        if let Some(secs) = config.http_timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }

        if let Ok(proxy_url) = env::var("OFFLINE_CACHE_PROXY_URL") {
            if let Ok(proxy) = Proxy::all(&proxy_url) {
                builder = builder.proxy(proxy);
            }
        }

        let client = builder.build().map_err(FetchError::Http)?;

        Ok(Self {
            client,
            origin: config.origin_url()?,
        })
    }

    /// Resolves a request URL against the configured origin.
    pub fn resolve(&self, raw: &str) -> std::result::Result<Url, FetchError> {
        let parsed = match &self.origin {
            Some(origin) => origin.join(raw),
            None => Url::parse(raw),
        };
        let mut url = parsed.map_err(|e| FetchError::InvalidUrl {
            url: raw.to_string(),
            message: e.to_string(),
        })?;
        url.set_fragment(None);
        Ok(url)
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, request: &Request) -> std::result::Result<CachedResponse, FetchError> {
        let url = self.resolve(&request.url)?;
        let method = Method::from_bytes(request.method.trim().to_uppercase().as_bytes())
            .map_err(|_| FetchError::UnsupportedMethod(request.method.clone()))?;

        let mut req = self.client.request(method, url);
        for (name, value) in &request.headers {
            req = req.header(name.as_str(), value.as_str());
        }

        let resp = req.send().await?;
        let status = resp.status().as_u16();
        let headers = resp
            .headers()
            .iter()
            .filter_map(|(k, v)| {
                v.to_str()
                    .ok()
                    .map(|v| (k.as_str().to_string(), v.to_string()))
            })
            .collect();
        let body = resp.bytes().await?;

        Ok(CachedResponse {
            status,
            headers,
            body,
        })
    }
}
