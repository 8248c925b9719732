//! Caller-facing inputs and batch results.
//!
//! Inputs are a tagged union: a raw `(emitter, params)` query or a
//! mappable object. Results are delivered per submitted input, never per
//! deduplicated query, so two inputs resolving to the same identity each get
//! their own entry.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use uuid::Uuid;

use crate::domain::mapping::{Mappable, MappingRegistry};
use crate::domain::query::QueryIdentity;
use crate::domain::response::ImpactResponse;
use crate::domain::value::Params;
use crate::error::MappingError;

/// `(emitter, params)` as passed by the caller
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RawQuery {
    pub emitter: String,
    pub params: Params,
}

impl RawQuery {
    pub fn new(emitter: impl Into<String>, params: Params) -> Self {
        Self {
            emitter: emitter.into(),
            params,
        }
    }

    /// Query with no parameters
    pub fn bare(emitter: impl Into<String>) -> Self {
        Self::new(emitter, Params::new())
    }
}

/// Type-erased mapping entry point for objects in heterogeneous batches
trait ErasedMappable: Send + Sync {
    fn map(&self, registry: &MappingRegistry, overrides: &Params) -> Result<(String, Params), MappingError>;
    fn type_name(&self) -> &'static str;
}

impl<T: Mappable> ErasedMappable for T {
    fn map(&self, registry: &MappingRegistry, overrides: &Params) -> Result<(String, Params), MappingError> {
        registry.to_query(self, overrides.clone())
    }

    fn type_name(&self) -> &'static str {
        std::any::type_name::<T>()
    }
}

/// A mappable object plus per-call overrides
#[derive(Clone)]
pub struct MappedObject {
    object: Arc<dyn ErasedMappable>,
    /// Address of the shared object, for reference-identity lookups
    addr: usize,
    overrides: Params,
}

impl MappedObject {
    pub fn new<T: Mappable>(object: Arc<T>) -> Self {
        let addr = Arc::as_ptr(&object) as *const () as usize;
        Self {
            object,
            addr,
            overrides: Params::new(),
        }
    }

    pub fn with_overrides(mut self, overrides: Params) -> Self {
        self.overrides = overrides;
        self
    }

    pub fn overrides(&self) -> &Params {
        &self.overrides
    }

    pub fn type_name(&self) -> &'static str {
        self.object.type_name()
    }

    /// Whether this wraps the very same allocation as `other`
    pub fn is<T: Mappable>(&self, other: &Arc<T>) -> bool {
        self.addr == Arc::as_ptr(other) as *const () as usize
    }

    /// Resolve to `(emitter, params)` through the registry
    pub fn map(&self, registry: &MappingRegistry) -> Result<(String, Params), MappingError> {
        self.object.map(registry, &self.overrides)
    }
}

impl fmt::Debug for MappedObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MappedObject")
            .field("type", &self.type_name())
            .field("addr", &format_args!("{:#x}", self.addr))
            .field("overrides", &self.overrides)
            .finish()
    }
}

/// One element of a request
#[derive(Debug, Clone)]
pub enum ImpactInput {
    Query(RawQuery),
    Object(MappedObject),
}

impl ImpactInput {
    pub fn query(emitter: impl Into<String>, params: Params) -> Self {
        ImpactInput::Query(RawQuery::new(emitter, params))
    }

    pub fn object<T: Mappable>(object: Arc<T>) -> Self {
        ImpactInput::Object(MappedObject::new(object))
    }

    pub fn object_with<T: Mappable>(object: Arc<T>, overrides: Params) -> Self {
        ImpactInput::Object(MappedObject::new(object).with_overrides(overrides))
    }
}

impl From<RawQuery> for ImpactInput {
    fn from(query: RawQuery) -> Self {
        ImpactInput::Query(query)
    }
}

impl From<MappedObject> for ImpactInput {
    fn from(object: MappedObject) -> Self {
        ImpactInput::Object(object)
    }
}

/// Call shape accepted by [`ImpactApi::perform`](crate::ports::ImpactApi::perform)
#[derive(Debug, Clone)]
pub enum ImpactRequest {
    Single(ImpactInput),
    Batch(Vec<ImpactInput>),
}

/// Result shape matching the request shape
#[derive(Debug, Clone)]
pub enum ImpactOutcome {
    Single(Arc<ImpactResponse>),
    Batch(BatchResults),
}

impl ImpactOutcome {
    pub fn into_single(self) -> Option<Arc<ImpactResponse>> {
        match self {
            ImpactOutcome::Single(response) => Some(response),
            ImpactOutcome::Batch(_) => None,
        }
    }

    pub fn into_batch(self) -> Option<BatchResults> {
        match self {
            ImpactOutcome::Batch(results) => Some(results),
            ImpactOutcome::Single(_) => None,
        }
    }
}

/// Time-ordered batch identifier (UUID v7), used to correlate log lines
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BatchId(Uuid);

impl BatchId {
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for BatchId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for BatchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Position of an input within its batch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InputId(pub usize);

impl fmt::Display for InputId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Result for one submitted input
#[derive(Debug, Clone)]
pub struct BatchEntry {
    pub id: InputId,
    pub input: ImpactInput,
    pub identity: QueryIdentity,
    pub response: Arc<ImpactResponse>,
}

/// One entry per submitted input, in submission order
#[derive(Debug, Clone)]
pub struct BatchResults {
    batch_id: BatchId,
    entries: Vec<BatchEntry>,
}

impl BatchResults {
    pub fn new(batch_id: BatchId, entries: Vec<BatchEntry>) -> Self {
        Self { batch_id, entries }
    }

    pub fn empty() -> Self {
        Self::new(BatchId::new(), Vec::new())
    }

    pub fn batch_id(&self) -> BatchId {
        self.batch_id
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &BatchEntry> {
        self.entries.iter()
    }

    pub fn get(&self, id: InputId) -> Option<&BatchEntry> {
        self.entries.get(id.0).filter(|entry| entry.id == id)
    }

    pub fn response(&self, id: InputId) -> Option<&Arc<ImpactResponse>> {
        self.get(id).map(|entry| &entry.response)
    }

    /// Response for the first raw input equal to `query`
    pub fn for_query(&self, query: &RawQuery) -> Option<&Arc<ImpactResponse>> {
        self.entries.iter().find_map(|entry| match &entry.input {
            ImpactInput::Query(q) if q == query => Some(&entry.response),
            _ => None,
        })
    }

    /// Entries submitted for this exact object (reference identity)
    pub fn for_object<T: Mappable>(&self, object: &Arc<T>) -> Vec<&BatchEntry> {
        self.entries
            .iter()
            .filter(|entry| matches!(&entry.input, ImpactInput::Object(o) if o.is(object)))
            .collect()
    }

    /// Responses in submission order
    pub fn responses(&self) -> Vec<Arc<ImpactResponse>> {
        self.entries.iter().map(|entry| Arc::clone(&entry.response)).collect()
    }

    pub fn into_entries(self) -> Vec<BatchEntry> {
        self.entries
    }
}

impl IntoIterator for BatchResults {
    type Item = BatchEntry;
    type IntoIter = std::vec::IntoIter<BatchEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}
