// Allow missing docs for internal items in development
#![allow(missing_docs)]

//! Impact Client - concurrent client for a remote impact calculation service.
//!
//! Turns domain objects or ad-hoc parameter sets into form POSTs against
//! the service and returns normalized, deeply nested responses.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                         IMPACT CLIENT                            │
//! ├──────────────────────────────────────────────────────────────────┤
//! │  ImpactApi (perform / query / multi / resolve_batch)             │
//! │        │                                                         │
//! │  ┌─────┴──────────┐     ┌──────────────────┐                     │
//! │  │ PendingBatch   │────→│ MappingRegistry  │  object → query     │
//! │  │ (normalize,    │     └──────────────────┘                     │
//! │  │  dedupe)       │                                              │
//! │  └─────┬──────────┘                                              │
//! │        │                                                         │
//! │  ┌─────┴──────────┐  rounds of ≤ ceiling, join_all               │
//! │  │ QueryScheduler │                                              │
//! │  └─────┬──────────┘                                              │
//! │        │                                                         │
//! │  ┌─────┴──────────┐     ┌──────────────────┐                     │
//! │  │ QueryExecutor  │────→│ ResultCache      │  single-flight, TTL │
//! │  │ (semaphore,    │     └──────────────────┘                     │
//! │  │  timeout)      │                                              │
//! │  └─────┬──────────┘                                              │
//! └────────┼─────────────────────────────────────────────────────────┘
//!          │ Transport port
//!          ▼
//!    HttpTransport ──→ POST {endpoint}/{emitters}.json
//! ```
//!
//! # Usage
//!
//! ```ignore
//! use impact_client::{params, CarbonConfig, ImpactApi, ImpactService, MappingRegistry};
//! use std::sync::Arc;
//!
//! let service = ImpactService::http(CarbonConfig::from_env()?, Arc::new(MappingRegistry::new()))?;
//! let response = service.query("Flight", params! { "origin_airport" => "LAX" }).await?;
//! println!("{:?}", response.carbon_value());
//! ```
//!
//! # Guarantees
//!
//! - Equal queries share one network call and one cache entry
//! - At most `concurrency` calls are in flight at any moment, across every
//!   service sharing one cache
//! - Every submitted input gets exactly one result, in submission order
//! - Per-query failures are recorded in the response, never raised

#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod adapters;
pub mod domain;
pub mod error;
pub mod metrics;
pub mod ports;
pub mod service;

// Re-export main types
pub use adapters::HttpTransport;
pub use domain::{
    BatchEntry, BatchId, BatchResults, CarbonConfig, ImpactInput, ImpactOutcome, ImpactRequest, ImpactResponse,
    InputId, Mappable, MappedObject, MappingRegistry, ParamValue, Params, ProvideOptions, Query, QueryIdentity,
    RawQuery, RawResponse, Registrar, Timeframe, NETWORK_ERROR_MESSAGE,
};
pub use error::{CarbonError, CarbonResult, ConfigError, MappingError, TimeframeError, TransportError};
pub use metrics::{Metrics, MetricsSnapshot};
pub use ports::{ImpactApi, ManualTimeSource, SystemTimeSource, TimeSource, Transport};
pub use service::{ImpactService, ResultCache};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
