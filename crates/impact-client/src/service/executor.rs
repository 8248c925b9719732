//! Query Executor - performs one query through the cache.
//!
//! On a cache miss exactly one transport call is made, holding a permit of
//! the cache's semaphore and bounded by the request timeout. Transport
//! failures never escape: they become failed responses.

use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

use crate::domain::{ImpactResponse, Query};
use crate::error::TransportError;
use crate::metrics::Metrics;
use crate::ports::Transport;
use crate::service::cache::ResultCache;

pub struct QueryExecutor<T: Transport> {
    transport: Arc<T>,
    cache: Arc<ResultCache>,
    request_timeout: Duration,
    metrics: Arc<Metrics>,
}

impl<T: Transport> QueryExecutor<T> {
    pub fn new(transport: Arc<T>, cache: Arc<ResultCache>, request_timeout: Duration, metrics: Arc<Metrics>) -> Self {
        Self {
            transport,
            cache,
            request_timeout,
            metrics,
        }
    }

    pub fn cache(&self) -> &Arc<ResultCache> {
        &self.cache
    }

    pub fn metrics(&self) -> &Arc<Metrics> {
        &self.metrics
    }

    /// Permits not currently held by an in-flight call
    pub fn available_permits(&self) -> usize {
        self.cache.permits().available_permits()
    }

    /// Cached response for `query`, executing it on a miss
    pub async fn resolve(&self, query: &Query) -> Arc<ImpactResponse> {
        let lookup = self.cache.get_or_compute(query.identity(), || self.execute(query)).await;
        if lookup.is_hit() {
            self.metrics.record_cache_hit();
        } else {
            self.metrics.record_cache_miss();
        }
        lookup.into_response()
    }

    /// One network call, bypassing the cache
    pub async fn execute(&self, query: &Query) -> ImpactResponse {
        let _permit = match self.cache.permits().acquire().await {
            Ok(permit) => permit,
            Err(_) => {
                warn!(query = %query.identity(), "Request permits closed");
                return ImpactResponse::network_failure();
            }
        };

        let url = query.url();
        let form = query.form_pairs();
        self.metrics.record_call_started();
        let started = Instant::now();

        let outcome = match tokio::time::timeout(self.request_timeout, self.transport.post_form(&url, &form)).await {
            Ok(result) => result,
            Err(_) => Err(TransportError::Timeout),
        };
        let elapsed = started.elapsed();

        let (response, transport_failure) = match outcome {
            Ok(raw) => (ImpactResponse::from_raw(&raw), false),
            Err(e) => {
                warn!(
                    url = %url,
                    error = %e,
                    elapsed_ms = elapsed.as_millis(),
                    "Transport failure"
                );
                (ImpactResponse::network_failure(), true)
            }
        };

        self.metrics
            .record_call_finished(elapsed, response.success, transport_failure);

        if !response.success && !transport_failure {
            warn!(
                url = %url,
                status = response.status,
                "Service returned an error"
            );
        }
        debug!(
            url = %url,
            status = response.status,
            success = response.success,
            elapsed_ms = elapsed.as_millis(),
            "Executed query"
        );

        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{CarbonConfig, RawResponse, NETWORK_ERROR_MESSAGE};
    use crate::params;
    use crate::ports::SystemTimeSource;
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Records requests and replies with a fixed outcome
    struct FixedTransport {
        outcome: Result<RawResponse, TransportError>,
        delay: Duration,
        calls: AtomicUsize,
        seen: Mutex<Vec<(String, Vec<(String, String)>)>>,
    }

    impl FixedTransport {
        fn new(outcome: Result<RawResponse, TransportError>) -> Self {
            Self {
                outcome,
                delay: Duration::ZERO,
                calls: AtomicUsize::new(0),
                seen: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl Transport for FixedTransport {
        async fn post_form(&self, url: &str, form: &[(String, String)]) -> Result<RawResponse, TransportError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.seen.lock().push((url.to_string(), form.to_vec()));
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            self.outcome.clone()
        }
    }

    fn create_executor(transport: FixedTransport, timeout: Duration) -> (QueryExecutor<FixedTransport>, Arc<FixedTransport>) {
        let transport = Arc::new(transport);
        let cache = Arc::new(ResultCache::with_ceiling(
            Duration::from_secs(3_600),
            Arc::new(SystemTimeSource),
            4,
        ));
        let executor = QueryExecutor::new(Arc::clone(&transport), cache, timeout, Arc::new(Metrics::new()));
        (executor, transport)
    }

    fn flight() -> Query {
        let config = CarbonConfig::default().with_api_key("abc");
        Query::new("Flight", params! { "origin_airport" => "LAX" }, &config).unwrap()
    }

    #[tokio::test]
    async fn test_posts_form_to_resource_url() {
        let (executor, transport) = create_executor(
            FixedTransport::new(Ok(RawResponse::new(200, r#"{"emitter":"Flight"}"#))),
            Duration::from_secs(5),
        );

        let response = executor.resolve(&flight()).await;
        assert!(response.success);

        let seen = transport.seen.lock();
        assert_eq!(seen[0].0, "http://impact.brighterplanet.com/flights.json");
        assert!(seen[0].1.contains(&("key".to_string(), "abc".to_string())));
        assert!(seen[0].1.contains(&("origin_airport".to_string(), "LAX".to_string())));
    }

    #[tokio::test]
    async fn test_second_resolve_is_cached() {
        let (executor, transport) = create_executor(
            FixedTransport::new(Ok(RawResponse::new(200, "{}"))),
            Duration::from_secs(5),
        );

        let a = executor.resolve(&flight()).await;
        let b = executor.resolve(&flight()).await;
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(transport.calls.load(Ordering::SeqCst), 1);

        let snap = executor.metrics().snapshot();
        assert_eq!(snap.cache_hits, 1);
        assert_eq!(snap.cache_misses, 1);
        assert_eq!(snap.network_calls, 1);
    }

    #[tokio::test]
    async fn test_connection_error_becomes_failure() {
        let (executor, _) = create_executor(
            FixedTransport::new(Err(TransportError::Connection("refused".into()))),
            Duration::from_secs(5),
        );

        let response = executor.resolve(&flight()).await;
        assert!(!response.success);
        assert_eq!(response.errors, vec![NETWORK_ERROR_MESSAGE.to_string()]);
        assert_eq!(executor.metrics().snapshot().transport_failures, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_becomes_failure() {
        let mut transport = FixedTransport::new(Ok(RawResponse::new(200, "{}")));
        transport.delay = Duration::from_secs(60);
        let (executor, _) = create_executor(transport, Duration::from_secs(1));

        let response = executor.execute(&flight()).await;
        assert!(!response.success);
        assert_eq!(response.errors, vec![NETWORK_ERROR_MESSAGE.to_string()]);
        assert_eq!(executor.available_permits(), 4);
    }

    #[tokio::test]
    async fn test_remote_error_keeps_status() {
        let (executor, _) = create_executor(
            FixedTransport::new(Ok(RawResponse::new(422, "Bad characteristic"))),
            Duration::from_secs(5),
        );

        let response = executor.execute(&flight()).await;
        assert_eq!(response.status, 422);
        assert_eq!(response.errors, vec!["Bad characteristic".to_string()]);
        assert_eq!(executor.metrics().snapshot().failed_calls, 1);
        assert_eq!(executor.metrics().snapshot().transport_failures, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_executors_on_one_cache_share_permits() {
        let mut transport = FixedTransport::new(Ok(RawResponse::new(200, "{}")));
        transport.delay = Duration::from_secs(10);
        let (first, transport) = create_executor(transport, Duration::from_secs(30));
        let second = QueryExecutor::new(
            Arc::clone(&transport),
            Arc::clone(first.cache()),
            Duration::from_secs(30),
            Arc::new(Metrics::new()),
        );

        let config = CarbonConfig::default();
        let queries: Vec<Query> = (0..6)
            .map(|i| Query::new("Flight", params! { "segment" => i }, &config).unwrap())
            .collect();

        let run = futures::future::join(
            futures::future::join_all(queries[..3].iter().map(|q| first.execute(q))),
            futures::future::join_all(queries[3..].iter().map(|q| second.execute(q))),
        );
        tokio::pin!(run);

        assert!(futures::poll!(run.as_mut()).is_pending());
        assert_eq!(first.available_permits(), 0);
        assert_eq!(second.available_permits(), 0);
        assert_eq!(transport.calls.load(Ordering::SeqCst), 4);

        run.await;
        assert_eq!(transport.calls.load(Ordering::SeqCst), 6);
        assert_eq!(second.available_permits(), 4);
    }
}
