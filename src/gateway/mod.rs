//! Remote gateway module.
//!
//! Uniform, failure-tolerant access to the global tracing network:
//! - `client` - Circuit-breaking gateway (fetch, search, push)
//! - `cache` - Injected fallback cache used in simulation mode and on failure
//! - `request` - Outbound headers and per-request trace ids
//! - `transport` - Transport seam and the reqwest implementation
//! - `wire` - Network record format

pub mod cache;
pub mod client;
pub mod request;
pub mod transport;
pub mod wire;

pub use cache::*;
pub use client::*;
pub use transport::*;
