//! Adapters Layer
//!
//! Concrete implementations of the outbound ports.

pub mod http;

pub use http::HttpTransport;
