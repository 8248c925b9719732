//! A single, fully resolved query.
//!
//! Identity is the `(endpoint, emitter, parameters)` tuple. Two queries with
//! equal identity are interchangeable: they share one cache entry and one
//! network call.

use serde::Serialize;
use std::fmt;
use std::hash::{Hash, Hasher};

use crate::domain::config::{normalize_endpoint, CarbonConfig, API_KEY_PARAM};
use crate::domain::naming::resource_path;
use crate::domain::value::{form_pairs, ParamValue, Params};
use crate::error::CarbonError;

/// Parameter names that select the endpoint instead of being sent
pub const ENDPOINT_PARAMS: [&str; 2] = ["domain", "endpoint"];

/// Equality/hash/cache key of a query
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct QueryIdentity {
    pub endpoint: String,
    pub emitter: String,
    pub params: Params,
}

impl fmt::Display for QueryIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.endpoint, self.emitter)?;
        if !self.params.is_empty() {
            let keys: Vec<&str> = self.params.keys().map(String::as_str).collect();
            write!(f, "{{{}}}", keys.join(","))?;
        }
        Ok(())
    }
}

/// One outbound request
#[derive(Debug, Clone)]
pub struct Query {
    identity: QueryIdentity,
}

impl Query {
    /// Build a query from an emitter name and raw parameters.
    ///
    /// A `domain` or `endpoint` parameter is removed and used as the
    /// endpoint. Passing both is accepted only when they name the same URL.
    /// The configured API key is injected unless the caller sent one.
    pub fn new(emitter: &str, mut params: Params, config: &CarbonConfig) -> Result<Self, CarbonError> {
        let emitter = emitter.trim();
        if emitter.is_empty() {
            return Err(CarbonError::InvalidInputShape("emitter name is blank".into()));
        }

        let mut selected: Option<(&str, String)> = None;
        for name in ENDPOINT_PARAMS {
            let Some(value) = params.remove(name) else {
                continue;
            };
            let url = match value {
                ParamValue::Text(text) if !text.trim().is_empty() => normalize_endpoint(&text),
                other => {
                    return Err(CarbonError::InvalidInputShape(format!(
                        "`{}` override must be a URL, got {}",
                        name, other
                    )));
                }
            };
            if let Some((first, earlier)) = &selected {
                if *earlier != url {
                    return Err(CarbonError::InvalidInputShape(format!(
                        "conflicting `{}` ({}) and `{}` ({}) overrides",
                        first, earlier, name, url
                    )));
                }
                continue;
            }
            selected = Some((name, url));
        }
        let endpoint = selected.map_or_else(|| config.endpoint.clone(), |(_, url)| url);

        if let Some(key) = &config.api_key {
            params
                .entry(API_KEY_PARAM.to_string())
                .or_insert_with(|| ParamValue::Text(key.clone()));
        }

        Ok(Self {
            identity: QueryIdentity {
                endpoint,
                emitter: emitter.to_string(),
                params,
            },
        })
    }

    pub fn identity(&self) -> &QueryIdentity {
        &self.identity
    }

    pub fn into_identity(self) -> QueryIdentity {
        self.identity
    }

    pub fn emitter(&self) -> &str {
        &self.identity.emitter
    }

    pub fn endpoint(&self) -> &str {
        &self.identity.endpoint
    }

    pub fn params(&self) -> &Params {
        &self.identity.params
    }

    /// `{endpoint}/{underscored plural emitter}.json`
    pub fn url(&self) -> String {
        format!("{}/{}.json", self.identity.endpoint, resource_path(&self.identity.emitter))
    }

    /// Url-encoded form body
    pub fn form_pairs(&self) -> Vec<(String, String)> {
        form_pairs(&self.identity.params)
    }
}

impl PartialEq for Query {
    fn eq(&self, other: &Self) -> bool {
        self.identity == other.identity
    }
}

impl Eq for Query {}

impl Hash for Query {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.identity.hash(state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params;

    fn keyed_config() -> CarbonConfig {
        CarbonConfig::default().with_api_key("carbon_test")
    }

    #[test]
    fn test_url() {
        let q = Query::new("AutomobileTrip", params! {}, &CarbonConfig::default()).unwrap();
        assert_eq!(q.url(), "http://impact.brighterplanet.com/automobile_trips.json");
    }

    #[test]
    fn test_injects_api_key() {
        let q = Query::new("Flight", params! { "trips" => 1 }, &keyed_config()).unwrap();
        assert_eq!(q.params()["key"], ParamValue::from("carbon_test"));
        assert_eq!(q.params()["trips"], ParamValue::from(1));
    }

    #[test]
    fn test_caller_key_wins() {
        let q = Query::new("Flight", params! { "key" => "carbon_test1" }, &keyed_config()).unwrap();
        assert_eq!(q.params()["key"], ParamValue::from("carbon_test1"));
    }

    #[test]
    fn test_no_key_when_unconfigured() {
        let q = Query::new("Flight", params! {}, &CarbonConfig::default()).unwrap();
        assert!(q.params().is_empty());
    }

    #[test]
    fn test_domain_override_stripped() {
        let q = Query::new(
            "Flight",
            params! { "domain" => "http://carbon.brighterplanet.com/" },
            &CarbonConfig::default(),
        )
        .unwrap();
        assert_eq!(q.endpoint(), "http://carbon.brighterplanet.com");
        assert!(!q.params().contains_key("domain"));
        assert_eq!(q.url(), "http://carbon.brighterplanet.com/flights.json");
    }

    #[test]
    fn test_conflicting_domain_and_endpoint_rejected() {
        let err = Query::new(
            "Flight",
            params! { "domain" => "http://a.example.com", "endpoint" => "http://b.example.com" },
            &CarbonConfig::default(),
        )
        .unwrap_err();
        assert!(matches!(err, CarbonError::InvalidInputShape(_)));
    }

    #[test]
    fn test_matching_domain_and_endpoint_accepted() {
        let q = Query::new(
            "Flight",
            params! { "domain" => "http://a.example.com/", "endpoint" => "http://a.example.com" },
            &CarbonConfig::default(),
        )
        .unwrap();
        assert_eq!(q.endpoint(), "http://a.example.com");
        assert!(!q.params().contains_key("domain"));
        assert!(!q.params().contains_key("endpoint"));
    }

    #[test]
    fn test_non_text_domain_rejected() {
        let err = Query::new("Flight", params! { "endpoint" => 5 }, &CarbonConfig::default()).unwrap_err();
        assert!(matches!(err, CarbonError::InvalidInputShape(_)));
    }

    #[test]
    fn test_blank_emitter_rejected() {
        let err = Query::new("  ", params! {}, &CarbonConfig::default()).unwrap_err();
        assert!(matches!(err, CarbonError::InvalidInputShape(_)));
    }

    #[test]
    fn test_identity_covers_endpoint() {
        let config = CarbonConfig::default();
        let a = Query::new("Flight", params! {}, &config).unwrap();
        let b = Query::new("Flight", params! { "domain" => "http://other.example.com" }, &config).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_identity_ignores_insertion_order() {
        let config = CarbonConfig::default();
        let mut p1 = Params::new();
        p1.insert("origin_airport".into(), "LAX".into());
        p1.insert("destination_airport".into(), "SFO".into());
        let mut p2 = Params::new();
        p2.insert("destination_airport".into(), "SFO".into());
        p2.insert("origin_airport".into(), "LAX".into());

        let a = Query::new("Flight", p1, &config).unwrap();
        let b = Query::new("Flight", p2, &config).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.identity(), b.identity());
    }
}
