//! Process-local observability for the interceptor.
//!
//! Metrics are kept in memory and rendered on demand. Payloads are never
//! aggregated here; each request still produces its own datagram.

pub mod metrics;

pub use metrics::Metrics;
