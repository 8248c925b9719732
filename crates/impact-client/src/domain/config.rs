//! Client configuration with validation.
//!
//! # Example
//!
//! ```
//! use impact_client::CarbonConfig;
//! use std::time::Duration;
//!
//! let config = CarbonConfig::default()
//!     .with_api_key("my-key")
//!     .with_concurrency(8)
//!     .with_cache_ttl(Duration::from_secs(600));
//! config.validate().unwrap();
//! ```

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::ConfigError;

/// Default service endpoint
pub const DEFAULT_ENDPOINT: &str = "http://impact.brighterplanet.com";

/// Maximum simultaneous in-flight requests the service accepts
pub const DEFAULT_CONCURRENCY: usize = 16;

/// Default lifetime of a cached response (one hour)
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(3_600);

/// Default per-request transport timeout
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Parameter name the API key is sent under
pub const API_KEY_PARAM: &str = "key";

/// Client configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CarbonConfig {
    /// API key injected into every query that does not carry one
    pub api_key: Option<String>,
    /// Service base URL, without trailing slash
    pub endpoint: String,
    /// Concurrency ceiling (in-flight network calls)
    pub concurrency: usize,
    /// Cached response lifetime
    #[serde(with = "humantime_serde")]
    pub cache_ttl: Duration,
    /// Transport timeout for a single call
    #[serde(with = "humantime_serde")]
    pub request_timeout: Duration,
}

impl Default for CarbonConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            endpoint: DEFAULT_ENDPOINT.to_string(),
            concurrency: DEFAULT_CONCURRENCY,
            cache_ttl: DEFAULT_CACHE_TTL,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }
}

impl CarbonConfig {
    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_endpoint(&self.endpoint)?;

        if self.concurrency == 0 {
            return Err(ConfigError::InvalidConcurrency(self.concurrency));
        }

        if self.cache_ttl.is_zero() {
            return Err(ConfigError::InvalidDuration {
                field: "cache_ttl",
                reason: "cannot be 0".into(),
            });
        }

        if self.request_timeout.is_zero() {
            return Err(ConfigError::InvalidDuration {
                field: "request_timeout",
                reason: "cannot be 0".into(),
            });
        }

        Ok(())
    }

    /// Load from environment variables on top of the defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::default().apply_overrides(|name| std::env::var(name).ok())
    }

    /// Apply `CARBON_*` overrides read through `lookup`.
    ///
    /// Recognized: `CARBON_KEY`, `CARBON_DOMAIN`, `CARBON_CONCURRENCY`,
    /// `CARBON_CACHE_TTL`, `CARBON_REQUEST_TIMEOUT` (durations in humantime
    /// form, e.g. `90s`, `1h`).
    pub fn apply_overrides<F>(mut self, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(key) = lookup("CARBON_KEY").filter(|k| !k.trim().is_empty()) {
            self.api_key = Some(key);
        }
        if let Some(domain) = lookup("CARBON_DOMAIN") {
            self.endpoint = normalize_endpoint(&domain);
        }
        if let Some(value) = lookup("CARBON_CONCURRENCY") {
            self.concurrency = value.trim().parse().map_err(|_| ConfigError::InvalidEnvValue {
                var: "CARBON_CONCURRENCY",
                value: value.clone(),
            })?;
        }
        if let Some(value) = lookup("CARBON_CACHE_TTL") {
            self.cache_ttl = parse_duration("CARBON_CACHE_TTL", &value)?;
        }
        if let Some(value) = lookup("CARBON_REQUEST_TIMEOUT") {
            self.request_timeout = parse_duration("CARBON_REQUEST_TIMEOUT", &value)?;
        }
        self.validate()?;
        Ok(self)
    }

    /// Builder-style method to set the API key
    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Builder-style method to set the endpoint
    pub fn with_endpoint(mut self, endpoint: &str) -> Self {
        self.endpoint = normalize_endpoint(endpoint);
        self
    }

    /// Builder-style method to set the concurrency ceiling
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }

    /// Builder-style method to set the cache TTL
    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = ttl;
        self
    }

    /// Builder-style method to set the request timeout
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }
}

/// Trim whitespace and trailing slashes
pub fn normalize_endpoint(endpoint: &str) -> String {
    endpoint.trim().trim_end_matches('/').to_string()
}

/// An endpoint must be an absolute http(s) URL with a host
pub fn validate_endpoint(endpoint: &str) -> Result<(), ConfigError> {
    let rest = endpoint
        .strip_prefix("http://")
        .or_else(|| endpoint.strip_prefix("https://"))
        .ok_or_else(|| ConfigError::InvalidEndpoint(endpoint.to_string()))?;
    if rest.is_empty() || rest.starts_with('/') || rest.chars().any(char::is_whitespace) {
        return Err(ConfigError::InvalidEndpoint(endpoint.to_string()));
    }
    Ok(())
}

fn parse_duration(var: &'static str, value: &str) -> Result<Duration, ConfigError> {
    humantime_serde::re::humantime::parse_duration(value.trim()).map_err(|_| ConfigError::InvalidEnvValue {
        var,
        value: value.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = CarbonConfig::default();
        assert_eq!(config.endpoint, DEFAULT_ENDPOINT);
        assert_eq!(config.concurrency, 16);
        assert_eq!(config.cache_ttl, Duration::from_secs(3600));
        assert!(config.api_key.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_zero_concurrency_rejected() {
        let config = CarbonConfig::default().with_concurrency(0);
        assert_eq!(config.validate(), Err(ConfigError::InvalidConcurrency(0)));
    }

    #[test]
    fn test_zero_durations_rejected() {
        assert!(CarbonConfig::default().with_cache_ttl(Duration::ZERO).validate().is_err());
        assert!(CarbonConfig::default()
            .with_request_timeout(Duration::ZERO)
            .validate()
            .is_err());
    }

    #[test]
    fn test_endpoint_validation() {
        assert!(validate_endpoint("https://impact.example.com").is_ok());
        assert!(validate_endpoint("http://localhost:3000").is_ok());
        assert!(validate_endpoint("impact.example.com").is_err());
        assert!(validate_endpoint("http://").is_err());
        assert!(validate_endpoint("http://bad host").is_err());
    }

    #[test]
    fn test_with_endpoint_strips_trailing_slash() {
        let config = CarbonConfig::default().with_endpoint("http://carbon.brighterplanet.com/");
        assert_eq!(config.endpoint, "http://carbon.brighterplanet.com");
    }

    #[test]
    fn test_env_overrides() {
        let config = CarbonConfig::default()
            .apply_overrides(lookup(&[
                ("CARBON_KEY", "abc123"),
                ("CARBON_DOMAIN", "https://impact.example.com/"),
                ("CARBON_CONCURRENCY", "4"),
                ("CARBON_CACHE_TTL", "10m"),
                ("CARBON_REQUEST_TIMEOUT", "5s"),
            ]))
            .unwrap();

        assert_eq!(config.api_key.as_deref(), Some("abc123"));
        assert_eq!(config.endpoint, "https://impact.example.com");
        assert_eq!(config.concurrency, 4);
        assert_eq!(config.cache_ttl, Duration::from_secs(600));
        assert_eq!(config.request_timeout, Duration::from_secs(5));
    }

    #[test]
    fn test_env_invalid_values() {
        let err = CarbonConfig::default()
            .apply_overrides(lookup(&[("CARBON_CONCURRENCY", "lots")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnvValue { var: "CARBON_CONCURRENCY", .. }));

        let err = CarbonConfig::default()
            .apply_overrides(lookup(&[("CARBON_CACHE_TTL", "forever")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnvValue { var: "CARBON_CACHE_TTL", .. }));
    }

    #[test]
    fn test_blank_key_ignored() {
        let config = CarbonConfig::default()
            .apply_overrides(lookup(&[("CARBON_KEY", "  ")]))
            .unwrap();
        assert!(config.api_key.is_none());
    }

    #[test]
    fn test_deserialize_with_humantime() {
        let json = r#"{ "api_key": "k", "concurrency": 2, "cache_ttl": "15m" }"#;
        let config: CarbonConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.api_key.as_deref(), Some("k"));
        assert_eq!(config.concurrency, 2);
        assert_eq!(config.cache_ttl, Duration::from_secs(900));
        assert_eq!(config.endpoint, DEFAULT_ENDPOINT);
    }
}
