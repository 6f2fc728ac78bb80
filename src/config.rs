//! Deployment configuration for one cache version.
//!
//! A version is identified by its generation tag. The seed list, fallback page
//! and reserved prefix travel with it; nothing here is process-global.

use crate::{Error, ErrorContext, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::Path;
use url::Url;

pub const DEFAULT_GENERATION: &str = "v3";
pub const DEFAULT_PREFIX: &str = "v";
pub const DEFAULT_FALLBACK: &str = "/my404.html";

fn default_generation() -> String {
    DEFAULT_GENERATION.to_string()
}

fn default_prefix() -> String {
    DEFAULT_PREFIX.to_string()
}

fn default_seed() -> Vec<String> {
    vec![
        "/wonderful.jpg".to_string(),
        "/cat.jpg".to_string(),
        DEFAULT_FALLBACK.to_string(),
    ]
}

fn default_fallback() -> String {
    DEFAULT_FALLBACK.to_string()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Tag of the generation this version serves from and writes into.
    #[serde(default = "default_generation")]
    pub generation: String,
    /// Generations starting with this prefix belong to us and may be reaped.
    #[serde(default = "default_prefix")]
    pub prefix: String,
    /// Resources fetched into the generation at install time, in order.
    #[serde(default = "default_seed")]
    pub seed: Vec<String>,
    /// Substituted for upstream 404s on a cache miss; must be seeded.
    #[serde(default = "default_fallback")]
    pub fallback: String,
    /// Base URL relative request URLs are resolved against.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub origin: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub http_timeout_secs: Option<u64>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            generation: default_generation(),
            prefix: default_prefix(),
            seed: default_seed(),
            fallback: default_fallback(),
            origin: None,
            http_timeout_secs: None,
        }
    }
}

impl CacheConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_generation(mut self, generation: impl Into<String>) -> Self {
        self.generation = generation.into();
        self
    }

    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    pub fn with_seed<I, S>(mut self, seed: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.seed = seed.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_fallback(mut self, fallback: impl Into<String>) -> Self {
        self.fallback = fallback.into();
        self
    }

    pub fn with_origin(mut self, origin: impl Into<String>) -> Self {
        self.origin = Some(origin.into());
        self
    }

    pub fn with_http_timeout_secs(mut self, secs: u64) -> Self {
        self.http_timeout_secs = Some(secs);
        self
    }

    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    pub async fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = tokio::fs::read_to_string(path.as_ref()).await?;
        Self::from_yaml_str(&content)
    }

    /// Applies `OFFLINE_CACHE_GENERATION`, `OFFLINE_CACHE_ORIGIN` and
    /// `OFFLINE_CACHE_HTTP_TIMEOUT_SECS` when set.
    pub fn apply_env_overrides(mut self) -> Self {
        if let Ok(generation) = env::var("OFFLINE_CACHE_GENERATION") {
            if !generation.trim().is_empty() {
                self.generation = generation.trim().to_string();
            }
        }
        if let Ok(origin) = env::var("OFFLINE_CACHE_ORIGIN") {
            if !origin.trim().is_empty() {
                self.origin = Some(origin.trim().to_string());
            }
        }
        if let Some(secs) = env::var("OFFLINE_CACHE_HTTP_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
        {
            self.http_timeout_secs = Some(secs);
        }
        self
    }

    /// Whether a generation tag follows this deployment's naming convention.
    pub fn owns(&self, generation: &str) -> bool {
        generation.starts_with(&self.prefix)
    }

    pub fn origin_url(&self) -> Result<Option<Url>> {
        self.origin
            .as_deref()
            .map(|o| {
                Url::parse(o).map_err(|e| {
                    Error::configuration_with_context(
                        "origin is not a valid URL",
                        ErrorContext::new()
                            .with_field_path("origin")
                            .with_details(format!("{}: {}", o, e))
                            .with_source("config"),
                    )
                })
            })
            .transpose()
    }

    pub fn validate(&self) -> Result<()> {
        let invalid = |field: &str, msg: &str, details: String| -> Result<()> {
            Err(Error::configuration_with_context(
                msg,
                ErrorContext::new()
                    .with_field_path(field)
                    .with_details(details)
                    .with_source("config"),
            ))
        };

        if self.prefix.is_empty() {
            return invalid(
                "prefix",
                "prefix must not be empty",
                "an empty prefix would claim every generation in the store".into(),
            );
        }
        if self.generation.trim().is_empty() {
            return invalid("generation", "generation must not be empty", String::new());
        }
        if !self.owns(&self.generation) {
            return invalid(
                "generation",
                "generation does not carry the reserved prefix",
                format!("generation '{}', prefix '{}'", self.generation, self.prefix),
            );
        }
        if !self.seed.iter().any(|s| s == &self.fallback) {
            return invalid(
                "fallback",
                "fallback page is not part of the seed set",
                format!("fallback '{}'", self.fallback),
            );
        }
        self.origin_url()?;
        Ok(())
    }
}
