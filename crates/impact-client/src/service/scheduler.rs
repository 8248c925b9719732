//! Concurrency Scheduler - resolves a batch of inputs.
//!
//! ```text
//! Normalize ──→ Deduplicate ──→ Schedule ──→ Fan out
//!  (map inputs)   (by identity)   (≤ ceiling     (one entry
//!                                  per round)     per input)
//! ```
//!
//! Unique queries already in the cache are served without scheduling. The
//! rest run in rounds of at most `ceiling`, each round fully parallel; the
//! next round starts once the previous one has completed.

use futures::future::join_all;
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, instrument, Span};

use crate::domain::{BatchResults, CarbonConfig, ImpactInput, ImpactResponse, MappingRegistry};
use crate::error::CarbonResult;
use crate::ports::Transport;
use crate::service::executor::QueryExecutor;
use crate::service::pending::PendingBatch;

pub struct QueryScheduler<T: Transport> {
    executor: Arc<QueryExecutor<T>>,
    registry: Arc<MappingRegistry>,
    config: Arc<CarbonConfig>,
    ceiling: usize,
}

impl<T: Transport> QueryScheduler<T> {
    pub fn new(
        executor: Arc<QueryExecutor<T>>,
        registry: Arc<MappingRegistry>,
        config: Arc<CarbonConfig>,
    ) -> Self {
        let ceiling = config.concurrency.min(executor.cache().ceiling()).max(1);
        Self {
            executor,
            registry,
            config,
            ceiling,
        }
    }

    pub fn ceiling(&self) -> usize {
        self.ceiling
    }

    /// Resolve `inputs`, one result entry per input in submission order.
    ///
    /// Mapping and shape errors are raised before any query is scheduled.
    /// Failed queries are recorded in their entries and never abort the batch.
    #[instrument(skip_all, fields(inputs = inputs.len(), batch_id = tracing::field::Empty))]
    pub async fn resolve(&self, inputs: Vec<ImpactInput>) -> CarbonResult<BatchResults> {
        if inputs.is_empty() {
            return Ok(BatchResults::empty());
        }

        let started = Instant::now();
        let batch = PendingBatch::normalize(inputs, &self.registry, &self.config)?;
        Span::current().record("batch_id", tracing::field::display(batch.batch_id()));

        let queries = batch.unique_queries();
        let mut resolved: Vec<Option<Arc<ImpactResponse>>> = queries
            .iter()
            .map(|query| self.executor.cache().peek(query.identity()))
            .collect();

        let cached = resolved.iter().filter(|r| r.is_some()).count();
        for _ in 0..cached {
            self.executor.metrics().record_cache_hit();
        }

        let outstanding: Vec<usize> = resolved
            .iter()
            .enumerate()
            .filter_map(|(slot, response)| response.is_none().then_some(slot))
            .collect();

        let mut rounds = 0;
        for round in outstanding.chunks(self.ceiling) {
            rounds += 1;
            let responses = join_all(round.iter().map(|&slot| self.executor.resolve(&queries[slot]))).await;
            for (&slot, response) in round.iter().zip(responses) {
                resolved[slot] = Some(response);
            }
        }

        let failed = resolved.iter().flatten().filter(|r| !r.success).count();
        let unique = queries.len();
        let responses: Vec<Arc<ImpactResponse>> = resolved.into_iter().flatten().collect();

        self.executor.metrics().record_batch();
        info!(
            batch_id = %batch.batch_id(),
            inputs = batch.len(),
            unique = unique,
            cached = cached,
            rounds = rounds,
            failed = failed,
            elapsed_ms = started.elapsed().as_millis(),
            "Resolved batch"
        );

        Ok(batch.fan_out(responses))
    }
}
