//! Shared fixtures: a scripted transport standing in for the service.

#![allow(dead_code)]

use async_trait::async_trait;
use impact_client::{CarbonConfig, ImpactService, MappingRegistry, RawResponse, TimeSource, Transport, TransportError};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// A request as seen on the wire
#[derive(Debug, Clone)]
pub struct Recorded {
    pub url: String,
    pub form: Vec<(String, String)>,
}

/// Replies after a fixed delay, counting calls and tracking concurrency.
///
/// The `monkeys` resource answers 404; everything else answers 200 with
/// the resource name and the posted form echoed back.
pub struct ScriptedTransport {
    delay: Duration,
    calls: AtomicUsize,
    in_flight: AtomicUsize,
    peak: AtomicUsize,
    recorded: Mutex<Vec<Recorded>>,
}

impl ScriptedTransport {
    pub fn new(delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            delay,
            calls: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
            recorded: Mutex::new(Vec::new()),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    pub fn recorded(&self) -> Vec<Recorded> {
        self.recorded.lock().clone()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn post_form(&self, url: &str, form: &[(String, String)]) -> Result<RawResponse, TransportError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        self.recorded.lock().push(Recorded {
            url: url.to_string(),
            form: form.to_vec(),
        });

        tokio::time::sleep(self.delay).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        let resource = url
            .rsplit('/')
            .next()
            .unwrap_or_default()
            .trim_end_matches(".json")
            .to_string();
        if resource == "monkeys" {
            return Ok(RawResponse::new(404, "Emitter Monkey not found"));
        }

        let echo: serde_json::Map<String, serde_json::Value> = form
            .iter()
            .map(|(k, v)| (k.clone(), serde_json::Value::String(v.clone())))
            .collect();
        let body = serde_json::json!({
            "resource": resource,
            "echo": echo,
            "decisions": { "carbon": { "object": { "value": form.len() as f64 * 10.0 } } },
            "errors": []
        });
        Ok(RawResponse::new(200, body.to_string()))
    }
}

/// Replies only after `delay`, which is meant to exceed the request timeout
pub struct StalledTransport {
    pub delay: Duration,
}

#[async_trait]
impl Transport for StalledTransport {
    async fn post_form(&self, _url: &str, _form: &[(String, String)]) -> Result<RawResponse, TransportError> {
        tokio::time::sleep(self.delay).await;
        Ok(RawResponse::new(200, "{}"))
    }
}

pub fn create_service<T: Transport + 'static>(
    transport: Arc<T>,
    config: CarbonConfig,
    registry: MappingRegistry,
) -> ImpactService<T> {
    ImpactService::new(config, Arc::new(registry), transport).expect("valid config")
}

pub fn create_service_with_clock<T: Transport + 'static>(
    transport: Arc<T>,
    config: CarbonConfig,
    clock: Arc<dyn TimeSource>,
) -> ImpactService<T> {
    ImpactService::with_time_source(config, Arc::new(MappingRegistry::new()), transport, clock).expect("valid config")
}

pub fn test_config() -> CarbonConfig {
    CarbonConfig::default()
        .with_api_key("carbon_test")
        .with_endpoint("http://impact.example.com")
}
