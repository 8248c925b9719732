//! Domain Layer
//!
//! Pure logic, no I/O: parameter values, emitter naming, the characteristic
//! mapper, query identity, response normalization and configuration.

pub mod config;
pub mod input;
pub mod mapping;
pub mod naming;
pub mod query;
pub mod response;
pub mod timeframe;
pub mod value;

pub use config::{CarbonConfig, DEFAULT_CACHE_TTL, DEFAULT_CONCURRENCY, DEFAULT_ENDPOINT};
pub use input::{
    BatchEntry, BatchId, BatchResults, ImpactInput, ImpactOutcome, ImpactRequest, InputId, MappedObject, RawQuery,
};
pub use mapping::{FieldRule, Mappable, MappingRegistry, MappingSpec, ProvideOptions, Registrar, Resolver};
pub use query::{Query, QueryIdentity};
pub use response::{ImpactResponse, RawResponse, ResponseTimeframe, NETWORK_ERROR_MESSAGE};
pub use timeframe::Timeframe;
pub use value::{form_pairs, insert_flat, ParamValue, Params};
