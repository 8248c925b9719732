//! Service Layer
//!
//! Wires the domain to the ports: the result cache, the executor making
//! network calls, batch correlation, the scheduler and the
//! [`ImpactService`] facade.

pub mod cache;
pub mod executor;
pub mod impact_service;
pub mod pending;
pub mod scheduler;

pub use cache::{cleanup_task, CacheStats, Lookup, ResultCache};
pub use executor::QueryExecutor;
pub use impact_service::ImpactService;
pub use pending::PendingBatch;
pub use scheduler::QueryScheduler;
