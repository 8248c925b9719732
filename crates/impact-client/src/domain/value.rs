//! Parameter values sent to the impact service.
//!
//! A [`Params`] map is part of a query's identity, so [`ParamValue`] is
//! `Eq + Hash`. Floats compare by bit pattern.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::hash::{Hash, Hasher};

/// Ordered parameter map. Equality ignores insertion order.
pub type Params = BTreeMap<String, ParamValue>;

/// A scalar or nested parameter value
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Bool(bool),
    Integer(i64),
    Float(f64),
    Text(String),
    List(Vec<ParamValue>),
    Map(BTreeMap<String, ParamValue>),
}

impl ParamValue {
    /// Whether the value counts as absent when mapping an object.
    ///
    /// Blank: whitespace-only text, `false`, empty lists and maps.
    pub fn is_blank(&self) -> bool {
        match self {
            ParamValue::Bool(b) => !b,
            ParamValue::Integer(_) | ParamValue::Float(_) => false,
            ParamValue::Text(s) => s.trim().is_empty(),
            ParamValue::List(items) => items.is_empty(),
            ParamValue::Map(map) => map.is_empty(),
        }
    }

    /// Text content, if this is a text value
    pub fn as_str(&self) -> Option<&str> {
        match self {
            ParamValue::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Flatten into url-encoded form pairs using bracket notation.
    fn push_form_pairs(&self, name: String, out: &mut Vec<(String, String)>) {
        match self {
            ParamValue::List(items) => {
                for item in items {
                    item.push_form_pairs(format!("{}[]", name), out);
                }
            }
            ParamValue::Map(map) => {
                for (key, value) in map {
                    value.push_form_pairs(format!("{}[{}]", name, key), out);
                }
            }
            scalar => out.push((name, scalar.to_string())),
        }
    }
}

/// Insert `value` under `key`, spreading nested maps into bracket keys.
///
/// `("airline", {"iata_code": "UA"})` is stored as `airline[iata_code] = UA`,
/// so it replaces a value already stored under that flat key.
pub fn insert_flat(params: &mut Params, key: String, value: ParamValue) {
    match value {
        ParamValue::Map(map) if !map.is_empty() => {
            for (sub, nested) in map {
                insert_flat(params, format!("{}[{}]", key, sub), nested);
            }
        }
        other => {
            params.insert(key, other);
        }
    }
}

/// Flatten a parameter map into form pairs, in key order.
///
/// `{"comply": ["tcr"], "airline": {"iata_code": "UA"}}` becomes
/// `comply[]=tcr` and `airline[iata_code]=UA`.
pub fn form_pairs(params: &Params) -> Vec<(String, String)> {
    let mut out = Vec::with_capacity(params.len());
    for (key, value) in params {
        value.push_form_pairs(key.clone(), &mut out);
    }
    out
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamValue::Bool(b) => write!(f, "{}", b),
            ParamValue::Integer(i) => write!(f, "{}", i),
            ParamValue::Float(x) => write!(f, "{}", x),
            ParamValue::Text(s) => f.write_str(s),
            ParamValue::List(items) => {
                let parts: Vec<String> = items.iter().map(ToString::to_string).collect();
                write!(f, "[{}]", parts.join(", "))
            }
            ParamValue::Map(map) => {
                let parts: Vec<String> = map.iter().map(|(k, v)| format!("{}: {}", k, v)).collect();
                write!(f, "{{{}}}", parts.join(", "))
            }
        }
    }
}

impl PartialEq for ParamValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (ParamValue::Bool(a), ParamValue::Bool(b)) => a == b,
            (ParamValue::Integer(a), ParamValue::Integer(b)) => a == b,
            (ParamValue::Float(a), ParamValue::Float(b)) => a.to_bits() == b.to_bits(),
            (ParamValue::Text(a), ParamValue::Text(b)) => a == b,
            (ParamValue::List(a), ParamValue::List(b)) => a == b,
            (ParamValue::Map(a), ParamValue::Map(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for ParamValue {}

impl Hash for ParamValue {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            ParamValue::Bool(b) => b.hash(state),
            ParamValue::Integer(i) => i.hash(state),
            ParamValue::Float(x) => x.to_bits().hash(state),
            ParamValue::Text(s) => s.hash(state),
            ParamValue::List(items) => items.hash(state),
            ParamValue::Map(map) => map.hash(state),
        }
    }
}

impl From<&str> for ParamValue {
    fn from(s: &str) -> Self {
        ParamValue::Text(s.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(s: String) -> Self {
        ParamValue::Text(s)
    }
}

impl From<bool> for ParamValue {
    fn from(b: bool) -> Self {
        ParamValue::Bool(b)
    }
}

impl From<i64> for ParamValue {
    fn from(i: i64) -> Self {
        ParamValue::Integer(i)
    }
}

impl From<i32> for ParamValue {
    fn from(i: i32) -> Self {
        ParamValue::Integer(i64::from(i))
    }
}

impl From<u32> for ParamValue {
    fn from(i: u32) -> Self {
        ParamValue::Integer(i64::from(i))
    }
}

impl From<f64> for ParamValue {
    fn from(x: f64) -> Self {
        ParamValue::Float(x)
    }
}

impl<V: Into<ParamValue>> From<Vec<V>> for ParamValue {
    fn from(items: Vec<V>) -> Self {
        ParamValue::List(items.into_iter().map(Into::into).collect())
    }
}

impl From<BTreeMap<String, ParamValue>> for ParamValue {
    fn from(map: BTreeMap<String, ParamValue>) -> Self {
        ParamValue::Map(map)
    }
}

/// Build a [`Params`] map from `key => value` pairs.
///
/// ```
/// use impact_client::params;
///
/// let p = params! { "origin_airport" => "LAX", "trips" => 1 };
/// assert_eq!(p.len(), 2);
/// ```
#[macro_export]
macro_rules! params {
    () => { $crate::domain::Params::new() };
    ($($key:expr => $value:expr),+ $(,)?) => {{
        let mut map = $crate::domain::Params::new();
        $( map.insert(::std::string::String::from($key), $crate::domain::ParamValue::from($value)); )+
        map
    }};
}
