//! Normalized service response.
//!
//! Every executed query yields exactly one [`ImpactResponse`], success or
//! failure. The decoded JSON document is kept whole; accessors expose the
//! sections callers usually need:
//!
//! ```text
//! certification
//! characteristics.{}.description / .object
//! compliance.[]
//! decisions.{}.description / .methodology / .object
//! emitter
//! equivalents.{}
//! errors.[]
//! methodology
//! scope
//! timeframe.startDate / .endDate
//! ```

use serde::Serialize;
use serde_json::{Map, Value};

/// Error detail recorded for transport failures
pub const NETWORK_ERROR_MESSAGE: &str = "Timeout or other network error.";

/// Raw status and body returned by a transport
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    pub status: u16,
    pub body: String,
}

impl RawResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Start and end dates reported by the service
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseTimeframe {
    pub start_date: String,
    pub end_date: String,
}

/// The normalized result of one query
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImpactResponse {
    pub status: u16,
    pub success: bool,
    pub errors: Vec<String>,
    #[serde(flatten)]
    document: Map<String, Value>,
}

impl ImpactResponse {
    /// Normalize a raw transport response.
    ///
    /// 2xx bodies are decoded and merged in; anything else is a failure that
    /// carries the raw body as its error detail. A 2xx body that is not a
    /// JSON object is also a failure.
    pub fn from_raw(raw: &RawResponse) -> Self {
        if !raw.is_success() {
            return Self::failure(raw.status, vec![raw.body.clone()]);
        }

        match serde_json::from_str::<Value>(&raw.body) {
            Ok(Value::Object(mut document)) => {
                let errors = match document.remove("errors") {
                    Some(Value::Array(items)) => items
                        .into_iter()
                        .map(|item| match item {
                            Value::String(s) => s,
                            other => other.to_string(),
                        })
                        .collect(),
                    Some(Value::String(s)) => vec![s],
                    _ => Vec::new(),
                };
                Self {
                    status: raw.status,
                    success: true,
                    errors,
                    document,
                }
            }
            Ok(other) => Self::failure(
                raw.status,
                vec![format!("Malformed response body: expected a JSON object, got {}", other)],
            ),
            Err(e) => Self::failure(raw.status, vec![format!("Malformed response body: {}", e)]),
        }
    }

    /// Response recorded when the transport failed (timeout, connection error)
    pub fn network_failure() -> Self {
        Self::failure(0, vec![NETWORK_ERROR_MESSAGE.to_string()])
    }

    fn failure(status: u16, errors: Vec<String>) -> Self {
        Self {
            status,
            success: false,
            errors,
            document: Map::new(),
        }
    }

    /// Top-level field of the decoded body
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.document.get(key)
    }

    /// Slash-separated deep lookup, e.g. `/decisions/carbon/object/value`
    pub fn pointer(&self, path: &str) -> Option<&Value> {
        let mut segments = path.trim_start_matches('/').split('/');
        let first = segments.next()?;
        let mut current = self.document.get(first)?;
        for segment in segments {
            current = match current {
                Value::Object(map) => map.get(segment)?,
                Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
                _ => return None,
            };
        }
        Some(current)
    }

    pub fn document(&self) -> &Map<String, Value> {
        &self.document
    }

    pub fn decisions(&self) -> Option<&Map<String, Value>> {
        self.section("decisions")
    }

    pub fn characteristics(&self) -> Option<&Map<String, Value>> {
        self.section("characteristics")
    }

    pub fn equivalents(&self) -> Option<&Map<String, Value>> {
        self.section("equivalents")
    }

    pub fn methodology(&self) -> Option<&str> {
        self.text("methodology")
    }

    pub fn scope(&self) -> Option<&str> {
        self.text("scope")
    }

    pub fn certification(&self) -> Option<&str> {
        self.text("certification")
    }

    pub fn emitter(&self) -> Option<&str> {
        self.text("emitter")
    }

    pub fn compliance(&self) -> Vec<&str> {
        match self.document.get("compliance") {
            Some(Value::Array(items)) => items.iter().filter_map(Value::as_str).collect(),
            _ => Vec::new(),
        }
    }

    /// Timeframe as an object (`startDate`/`endDate`) or `"start/end"` string
    pub fn timeframe(&self) -> Option<ResponseTimeframe> {
        match self.document.get("timeframe")? {
            Value::Object(map) => Some(ResponseTimeframe {
                start_date: map.get("startDate")?.as_str()?.to_string(),
                end_date: map.get("endDate")?.as_str()?.to_string(),
            }),
            Value::String(s) => {
                let (start, end) = s.split_once('/')?;
                Some(ResponseTimeframe {
                    start_date: start.to_string(),
                    end_date: end.to_string(),
                })
            }
            _ => None,
        }
    }

    /// `decisions.carbon.object.value`
    pub fn carbon_value(&self) -> Option<f64> {
        self.pointer("/decisions/carbon/object/value")?.as_f64()
    }

    fn section(&self, key: &str) -> Option<&Map<String, Value>> {
        self.document.get(key)?.as_object()
    }

    fn text(&self, key: &str) -> Option<&str> {
        self.document.get(key)?.as_str()
    }
}
