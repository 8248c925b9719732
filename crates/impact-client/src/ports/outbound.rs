//! Outbound Ports (Driven Ports)
//!
//! Dependencies the engine needs from the outside world: a wire transport
//! and a clock.

use async_trait::async_trait;
use std::time::Duration;
use tokio::time::Instant;

use crate::domain::response::RawResponse;
use crate::error::TransportError;

/// Performs one form POST against the service
#[async_trait]
pub trait Transport: Send + Sync {
    /// POST `form` to `url`, returning the raw status and body.
    ///
    /// Non-2xx statuses are `Ok`; only transport-level failures are `Err`.
    async fn post_form(&self, url: &str, form: &[(String, String)]) -> Result<RawResponse, TransportError>;
}

/// Time source trait for testability
pub trait TimeSource: Send + Sync {
    fn now(&self) -> Instant;
}

/// Tokio clock. Honors `tokio::time::pause` in tests.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemTimeSource;

impl TimeSource for SystemTimeSource {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Manually advanced clock
#[derive(Debug)]
pub struct ManualTimeSource {
    start: Instant,
    offset: parking_lot::Mutex<Duration>,
}

impl ManualTimeSource {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
            offset: parking_lot::Mutex::new(Duration::ZERO),
        }
    }

    pub fn advance(&self, by: Duration) {
        *self.offset.lock() += by;
    }
}

impl Default for ManualTimeSource {
    fn default() -> Self {
        Self::new()
    }
}

impl TimeSource for ManualTimeSource {
    fn now(&self) -> Instant {
        self.start + *self.offset.lock()
    }
}
