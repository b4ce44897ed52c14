//! Worker configuration — cache version names, precache list and routing.
//!
//! The two cache names are the only persisted configuration: bumping either
//! one makes the next activation delete every cache stored under the old name.

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

use crate::http::{Method, Request};

/// Errors produced while loading or validating a [`CacheConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid origin {origin:?}: {source}")]
    InvalidOrigin {
        origin: String,
        #[source]
        source: url::ParseError,
    },

    #[error("invalid asset URL {asset:?}: {source}")]
    InvalidAsset {
        asset: String,
        #[source]
        source: url::ParseError,
    },

    #[error("cache name `{field}` must not be empty")]
    EmptyCacheName { field: &'static str },

    #[error("static and dynamic caches must use different names (both are {name:?})")]
    DuplicateCacheName { name: String },
}

/// Everything the dispatcher needs to know up front.
///
/// Missing JSON fields fall back to the defaults below.
///
/// # Examples
///
/// ```
/// use swcache::config::CacheConfig;
///
/// let config = CacheConfig::from_json_str(r#"{
///     "static_cache": "site-static-v2",
///     "origin": "http://127.0.0.1:5000"
/// }"#).unwrap();
///
/// assert_eq!(config.static_cache, "site-static-v2");
/// assert_eq!(config.dynamic_cache, "async-pw-dynamic-v1");
/// assert_eq!(
///     config.resolve_asset("/static/js/main.js").unwrap().url().as_str(),
///     "http://127.0.0.1:5000/static/js/main.js",
/// );
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Name of the cache holding precached and cache-first assets.
    pub static_cache: String,
    /// Name of the cache filled at runtime by network-first and SWR.
    pub dynamic_cache: String,
    /// URLs precached on install, in order. Relative entries resolve
    /// against `origin`.
    pub static_assets: Vec<String>,
    /// Base URL of the site the worker fronts.
    pub origin: String,
    /// Path prefix routed to cache-first.
    pub static_prefix: String,
    /// Path prefix routed to network-first.
    pub api_prefix: String,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            static_cache: "async-pw-static-v1".into(),
            dynamic_cache: "async-pw-dynamic-v1".into(),
            static_assets: vec![
                "/".into(),
                "/static/css/styles.css".into(),
                "/static/js/main.js".into(),
                "https://fonts.googleapis.com/css2?family=JetBrains+Mono:wght@300;400;500;600&display=swap".into(),
            ],
            origin: "http://127.0.0.1:5000".into(),
            static_prefix: "/static/".into(),
            api_prefix: "/api/".into(),
        }
    }
}

impl CacheConfig {
    /// Parses and validates a JSON document.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a JSON config file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json_str(&json)
    }

    #[must_use]
    pub fn with_cache_names(
        mut self,
        static_cache: impl Into<String>,
        dynamic_cache: impl Into<String>,
    ) -> Self {
        self.static_cache = static_cache.into();
        self.dynamic_cache = dynamic_cache.into();
        self
    }

    #[must_use]
    pub fn with_origin(mut self, origin: impl Into<String>) -> Self {
        self.origin = origin.into();
        self
    }

    #[must_use]
    pub fn with_static_assets<I, S>(mut self, assets: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.static_assets = assets.into_iter().map(Into::into).collect();
        self
    }

    /// Checks the invariants the dispatcher relies on.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.static_cache.is_empty() {
            return Err(ConfigError::EmptyCacheName {
                field: "static_cache",
            });
        }
        if self.dynamic_cache.is_empty() {
            return Err(ConfigError::EmptyCacheName {
                field: "dynamic_cache",
            });
        }
        if self.static_cache == self.dynamic_cache {
            return Err(ConfigError::DuplicateCacheName {
                name: self.static_cache.clone(),
            });
        }
        self.origin_url()?;
        Ok(())
    }

    /// Returns `true` if `name` is one of the two current cache versions.
    pub fn is_current_cache(&self, name: &str) -> bool {
        name == self.static_cache || name == self.dynamic_cache
    }

    /// Builds the `GET` request for one precache entry.
    pub fn resolve_asset(&self, asset: &str) -> Result<Request, ConfigError> {
        let url = self
            .origin_url()?
            .join(asset)
            .map_err(|source| ConfigError::InvalidAsset {
                asset: asset.to_owned(),
                source,
            })?;
        Ok(Request::new(Method::Get, url))
    }

    /// Resolves the whole precache list, preserving order.
    pub fn asset_requests(&self) -> Result<Vec<Request>, ConfigError> {
        self.static_assets
            .iter()
            .map(|asset| self.resolve_asset(asset))
            .collect()
    }

    /// Parses [`origin`](Self::origin); origin-form proxy requests resolve
    /// against it.
    pub fn origin_url(&self) -> Result<Url, ConfigError> {
        Url::parse(&self.origin).map_err(|source| ConfigError::InvalidOrigin {
            origin: self.origin.clone(),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = CacheConfig::default();
        config.validate().unwrap();
        assert_eq!(config.static_assets.len(), 4);
        assert!(config.is_current_cache("async-pw-static-v1"));
        assert!(!config.is_current_cache("async-pw-static-v0"));
    }

    #[test]
    fn absolute_assets_ignore_origin() {
        let config = CacheConfig::default();
        let requests = config.asset_requests().unwrap();
        assert_eq!(requests[0].url().as_str(), "http://127.0.0.1:5000/");
        assert_eq!(requests[3].url().host_str(), Some("fonts.googleapis.com"));
    }

    #[test]
    fn duplicate_names_rejected() {
        let config = CacheConfig::default().with_cache_names("same", "same");
        assert!(matches!(
            config.validate(),
            Err(ConfigError::DuplicateCacheName { .. })
        ));
    }

    #[test]
    fn empty_name_rejected() {
        let err = CacheConfig::from_json_str(r#"{"dynamic_cache": ""}"#).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::EmptyCacheName {
                field: "dynamic_cache"
            }
        ));
    }

    #[test]
    fn bad_origin_rejected() {
        let err = CacheConfig::from_json_str(r#"{"origin": "not a url"}"#).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidOrigin { .. }));
    }

    #[test]
    fn malformed_json_rejected() {
        assert!(matches!(
            CacheConfig::from_json_str("{"),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn missing_file_reports_path() {
        let err = CacheConfig::from_file("/nonexistent/swcache.json").unwrap_err();
        assert!(err.to_string().contains("/nonexistent/swcache.json"));
    }
}
