//! Pending Batch - correlation between submitted inputs and unique queries.
//!
//! Flow:
//! 1. `normalize()` maps every input to a [`Query`] (raising mapping and
//!    shape errors before any I/O)
//! 2. Equal identities collapse into one unique query; each input keeps a
//!    pointer to its unique slot, so duplicates are preserved
//! 3. The scheduler resolves `unique_queries()` in any order
//! 4. `fan_out()` hands every input its response, in submission order

use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

use crate::domain::{
    BatchEntry, BatchId, BatchResults, CarbonConfig, ImpactInput, ImpactResponse, InputId, MappingRegistry, Query,
    QueryIdentity,
};
use crate::error::CarbonResult;

/// Map one input to its outbound query
pub fn to_query(input: &ImpactInput, registry: &MappingRegistry, config: &CarbonConfig) -> CarbonResult<Query> {
    match input {
        ImpactInput::Query(raw) => Query::new(&raw.emitter, raw.params.clone(), config),
        ImpactInput::Object(object) => {
            let (emitter, params) = object.map(registry)?;
            Query::new(&emitter, params, config)
        }
    }
}

/// A normalized batch awaiting resolution
#[derive(Debug)]
pub struct PendingBatch {
    batch_id: BatchId,
    inputs: Vec<ImpactInput>,
    /// Unique slot index per input, indexed by `InputId`
    assignments: Vec<usize>,
    unique: Vec<Query>,
}

impl PendingBatch {
    /// Normalize and deduplicate `inputs`.
    ///
    /// Fails on the first input that cannot be mapped; nothing has been
    /// scheduled at that point.
    pub fn normalize(inputs: Vec<ImpactInput>, registry: &MappingRegistry, config: &CarbonConfig) -> CarbonResult<Self> {
        let batch_id = BatchId::new();
        let mut slots: HashMap<QueryIdentity, usize> = HashMap::with_capacity(inputs.len());
        let mut unique: Vec<Query> = Vec::new();
        let mut assignments = Vec::with_capacity(inputs.len());

        for input in &inputs {
            let query = to_query(input, registry, config)?;
            let slot = match slots.get(query.identity()) {
                Some(&slot) => slot,
                None => {
                    let slot = unique.len();
                    slots.insert(query.identity().clone(), slot);
                    unique.push(query);
                    slot
                }
            };
            assignments.push(slot);
        }

        debug!(
            batch_id = %batch_id,
            inputs = inputs.len(),
            unique = unique.len(),
            "Normalized batch"
        );

        Ok(Self {
            batch_id,
            inputs,
            assignments,
            unique,
        })
    }

    pub fn batch_id(&self) -> BatchId {
        self.batch_id
    }

    /// Number of submitted inputs
    pub fn len(&self) -> usize {
        self.inputs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inputs.is_empty()
    }

    /// Distinct queries, in order of first appearance
    pub fn unique_queries(&self) -> &[Query] {
        &self.unique
    }

    /// Identity the input at `id` resolves to
    pub fn identity_of(&self, id: InputId) -> Option<&QueryIdentity> {
        let slot = *self.assignments.get(id.0)?;
        Some(self.unique[slot].identity())
    }

    /// Inputs sharing their identity with at least one other input
    pub fn duplicate_count(&self) -> usize {
        self.inputs.len() - self.unique.len()
    }

    /// Build the result set from one response per unique query.
    ///
    /// `responses` must be aligned with [`unique_queries`](Self::unique_queries).
    pub fn fan_out(self, responses: Vec<Arc<ImpactResponse>>) -> BatchResults {
        debug_assert_eq!(responses.len(), self.unique.len());

        let entries = self
            .inputs
            .into_iter()
            .zip(self.assignments)
            .enumerate()
            .map(|(position, (input, slot))| BatchEntry {
                id: InputId(position),
                input,
                identity: self.unique[slot].identity().clone(),
                response: Arc::clone(&responses[slot]),
            })
            .collect();

        BatchResults::new(self.batch_id, entries)
    }
}
