//! Impact service - the facade implementing [`ImpactApi`].
//!
//! Owns the executor and scheduler; the registry and cache are injected so
//! several services can share them. Services sharing a cache also share its
//! concurrency ceiling.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::adapters::HttpTransport;
use crate::domain::{
    BatchResults, CarbonConfig, ImpactInput, ImpactOutcome, ImpactRequest, ImpactResponse, Mappable, MappingRegistry,
    Params, Query, RawQuery,
};
use crate::error::{CarbonResult, ConfigError};
use crate::metrics::Metrics;
use crate::ports::{ImpactApi, SystemTimeSource, TimeSource, Transport};
use crate::service::cache::{cleanup_task, ResultCache};
use crate::service::executor::QueryExecutor;
use crate::service::pending::to_query;
use crate::service::scheduler::QueryScheduler;

/// Impact query service
pub struct ImpactService<T: Transport> {
    config: Arc<CarbonConfig>,
    registry: Arc<MappingRegistry>,
    executor: Arc<QueryExecutor<T>>,
    scheduler: QueryScheduler<T>,
}

impl<T: Transport + 'static> ImpactService<T> {
    /// Create a service with a private cache on the tokio clock
    pub fn new(config: CarbonConfig, registry: Arc<MappingRegistry>, transport: Arc<T>) -> Result<Self, ConfigError> {
        let cache = Arc::new(ResultCache::with_ceiling(
            config.cache_ttl,
            Arc::new(SystemTimeSource),
            config.concurrency,
        ));
        Self::with_cache(config, registry, transport, cache)
    }

    /// Create a service with a private cache on the given clock
    pub fn with_time_source(
        config: CarbonConfig,
        registry: Arc<MappingRegistry>,
        transport: Arc<T>,
        clock: Arc<dyn TimeSource>,
    ) -> Result<Self, ConfigError> {
        let cache = Arc::new(ResultCache::with_ceiling(config.cache_ttl, clock, config.concurrency));
        Self::with_cache(config, registry, transport, cache)
    }

    /// Create a service on a shared cache.
    ///
    /// In-flight calls are bounded by the cache's ceiling across every
    /// service using it; `config.concurrency` can only lower the batch round
    /// size for this service.
    pub fn with_cache(
        config: CarbonConfig,
        registry: Arc<MappingRegistry>,
        transport: Arc<T>,
        cache: Arc<ResultCache>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        let config = Arc::new(config);

        if config.concurrency > cache.ceiling() {
            warn!(
                requested = config.concurrency,
                ceiling = cache.ceiling(),
                "Concurrency above the shared cache ceiling, using the cache ceiling"
            );
        }

        let executor = Arc::new(QueryExecutor::new(
            transport,
            cache,
            config.request_timeout,
            Arc::new(Metrics::new()),
        ));
        let scheduler = QueryScheduler::new(Arc::clone(&executor), Arc::clone(&registry), Arc::clone(&config));

        info!(
            endpoint = %config.endpoint,
            concurrency = config.concurrency,
            cache_ttl_secs = config.cache_ttl.as_secs(),
            keyed = config.api_key.is_some(),
            "Impact service ready"
        );

        Ok(Self {
            config,
            registry,
            executor,
            scheduler,
        })
    }

    pub fn config(&self) -> &CarbonConfig {
        &self.config
    }

    pub fn registry(&self) -> &Arc<MappingRegistry> {
        &self.registry
    }

    pub fn cache(&self) -> &Arc<ResultCache> {
        self.executor.cache()
    }

    pub fn metrics(&self) -> &Arc<Metrics> {
        self.executor.metrics()
    }

    /// Map `object` to the query it would send, without sending it
    pub fn as_impact_query<M: Mappable>(&self, object: &M, overrides: Params) -> CarbonResult<Query> {
        let (emitter, params) = self.registry.to_query(object, overrides)?;
        Query::new(&emitter, params, &self.config)
    }

    /// Resolve a single mappable object
    pub async fn impact<M: Mappable>(&self, object: &M, overrides: Params) -> CarbonResult<Arc<ImpactResponse>> {
        let query = self.as_impact_query(object, overrides)?;
        Ok(self.executor.resolve(&query).await)
    }

    /// Spawn the background task purging expired cache entries
    pub fn spawn_cache_cleanup(&self, interval: Duration) -> JoinHandle<()> {
        debug!(interval_secs = interval.as_secs(), "Spawning cache cleanup task");
        tokio::spawn(cleanup_task(Arc::clone(self.cache()), interval))
    }

    async fn resolve_one(&self, input: &ImpactInput) -> CarbonResult<Arc<ImpactResponse>> {
        let query = to_query(input, &self.registry, &self.config)?;
        Ok(self.executor.resolve(&query).await)
    }
}

impl ImpactService<HttpTransport> {
    /// Service talking to the real endpoint over HTTP
    pub fn http(config: CarbonConfig, registry: Arc<MappingRegistry>) -> CarbonResult<Self> {
        let transport = HttpTransport::new(config.request_timeout)?;
        Ok(Self::new(config, registry, Arc::new(transport))?)
    }
}

#[async_trait]
impl<T: Transport + 'static> ImpactApi for ImpactService<T> {
    async fn perform(&self, request: ImpactRequest) -> CarbonResult<ImpactOutcome> {
        match request {
            ImpactRequest::Single(input) => Ok(ImpactOutcome::Single(self.resolve_one(&input).await?)),
            ImpactRequest::Batch(inputs) => Ok(ImpactOutcome::Batch(self.scheduler.resolve(inputs).await?)),
        }
    }

    async fn query(&self, emitter: &str, params: Params) -> CarbonResult<Arc<ImpactResponse>> {
        let query = Query::new(emitter, params, &self.config)?;
        Ok(self.executor.resolve(&query).await)
    }

    async fn multi(&self, queries: Vec<RawQuery>) -> CarbonResult<Vec<Arc<ImpactResponse>>> {
        let inputs = queries.into_iter().map(ImpactInput::Query).collect();
        Ok(self.scheduler.resolve(inputs).await?.responses())
    }

    async fn resolve_batch(&self, inputs: Vec<ImpactInput>) -> CarbonResult<BatchResults> {
        self.scheduler.resolve(inputs).await
    }
}

impl<T: Transport> std::fmt::Debug for ImpactService<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImpactService")
            .field("endpoint", &self.config.endpoint)
            .field("concurrency", &self.config.concurrency)
            .field("cached", &self.executor.cache().len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ParamValue, ProvideOptions, RawResponse};
    use crate::error::{CarbonError, MappingError, TransportError};
    use crate::params;

    struct EchoTransport;

    #[async_trait]
    impl Transport for EchoTransport {
        async fn post_form(&self, url: &str, form: &[(String, String)]) -> Result<RawResponse, TransportError> {
            let fields: serde_json::Map<String, serde_json::Value> = form
                .iter()
                .map(|(k, v)| (k.clone(), serde_json::Value::String(v.clone())))
                .collect();
            let body = serde_json::json!({ "url": url, "form": fields });
            Ok(RawResponse::new(200, body.to_string()))
        }
    }

    struct Pet {
        species: &'static str,
    }

    impl Mappable for Pet {
        fn characteristic(&self, accessor: &str) -> Option<ParamValue> {
            (accessor == "species").then(|| self.species.into())
        }
    }

    fn create_service() -> ImpactService<EchoTransport> {
        let registry = Arc::new(MappingRegistry::new());
        registry
            .register::<Pet>("pet", |r| {
                r.provide("species", ProvideOptions::default());
            })
            .unwrap();
        ImpactService::new(CarbonConfig::default().with_api_key("k"), registry, Arc::new(EchoTransport)).unwrap()
    }

    #[test]
    fn test_invalid_config_rejected() {
        let err = ImpactService::new(
            CarbonConfig::default().with_concurrency(0),
            Arc::new(MappingRegistry::new()),
            Arc::new(EchoTransport),
        )
        .unwrap_err();
        assert_eq!(err, ConfigError::InvalidConcurrency(0));
    }

    #[test]
    fn test_as_impact_query() {
        let service = create_service();
        let query = service
            .as_impact_query(&Pet { species: "dog" }, params! { "weight" => 12 })
            .unwrap();
        assert_eq!(query.emitter(), "Pet");
        assert_eq!(query.params()["species"], ParamValue::from("dog"));
        assert_eq!(query.params()["weight"], ParamValue::from(12));
        assert_eq!(query.params()["key"], ParamValue::from("k"));
    }

    #[tokio::test]
    async fn test_impact_single_object() {
        let service = create_service();
        let response = service.impact(&Pet { species: "cat" }, Params::new()).await.unwrap();
        assert!(response.success);
        assert_eq!(
            response.pointer("/url").and_then(|v| v.as_str()),
            Some("http://impact.brighterplanet.com/pets.json")
        );
        assert_eq!(response.pointer("/form/species").and_then(|v| v.as_str()), Some("cat"));
    }

    #[tokio::test]
    async fn test_perform_matches_request_shape() {
        let service = create_service();

        let single = service
            .perform(ImpactRequest::Single(ImpactInput::query("Flight", params! {})))
            .await
            .unwrap();
        assert!(single.into_single().is_some());

        let batch = service
            .perform(ImpactRequest::Batch(vec![
                ImpactInput::query("Flight", params! {}),
                ImpactInput::object(Arc::new(Pet { species: "dog" })),
            ]))
            .await
            .unwrap()
            .into_batch()
            .unwrap();
        assert_eq!(batch.len(), 2);
    }

    #[tokio::test]
    async fn test_unregistered_object_is_mapping_error() {
        struct Rock;
        impl Mappable for Rock {}

        let service = create_service();
        let err = service.impact(&Rock, Params::new()).await.unwrap_err();
        assert!(matches!(err, CarbonError::Mapping(MappingError::Unregistered { .. })));
        assert_eq!(service.metrics().snapshot().network_calls, 0);
    }

    #[test]
    fn test_private_cache_takes_configured_ceiling() {
        let service = ImpactService::new(
            CarbonConfig::default().with_concurrency(5),
            Arc::new(MappingRegistry::new()),
            Arc::new(EchoTransport),
        )
        .unwrap();
        assert_eq!(service.cache().ceiling(), 5);
        assert_eq!(service.cache().permits().available_permits(), 5);
    }

    #[tokio::test]
    async fn test_cleanup_task_is_spawned() {
        let service = create_service();
        let handle = service.spawn_cache_cleanup(Duration::from_secs(60));
        assert!(!handle.is_finished());
        handle.abort();
    }
}
