//! Ports Layer
//!
//! - Driving Ports (inbound) - API for callers
//! - Driven Ports (outbound) - transport and clock

pub mod inbound;
pub mod outbound;

pub use inbound::ImpactApi;
pub use outbound::{ManualTimeSource, SystemTimeSource, TimeSource, Transport};
