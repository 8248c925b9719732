//! Inbound Ports (Driving Ports)
//!
//! The API callers use to resolve impact queries.

use async_trait::async_trait;
use std::sync::Arc;

use crate::domain::{BatchResults, ImpactInput, ImpactOutcome, ImpactRequest, ImpactResponse, Params, RawQuery};
use crate::error::CarbonResult;

/// Primary impact API (Driving Port)
#[async_trait]
pub trait ImpactApi: Send + Sync {
    /// Resolve a single input or a batch, matching the request shape
    async fn perform(&self, request: ImpactRequest) -> CarbonResult<ImpactOutcome>;

    /// One raw `(emitter, params)` query
    async fn query(&self, emitter: &str, params: Params) -> CarbonResult<Arc<ImpactResponse>>;

    /// Many raw queries in parallel; responses in submission order
    async fn multi(&self, queries: Vec<RawQuery>) -> CarbonResult<Vec<Arc<ImpactResponse>>>;

    /// A heterogeneous batch, one result entry per input
    async fn resolve_batch(&self, inputs: Vec<ImpactInput>) -> CarbonResult<BatchResults>;
}
