use crate::domain::errors::TransmitError;
use crate::domain::payload::{RequestInfo, ResponseInfo};
use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;

/// Computes what to report for a finished request.
///
/// Returning `None` skips transmission for that request.
pub trait Resolver: Send + Sync {
    fn resolve(
        &self,
        request: &RequestInfo,
        response: &ResponseInfo,
        duration: Duration,
    ) -> Option<Value>;
}

impl<F> Resolver for F
where
    F: Fn(&RequestInfo, &ResponseInfo, Duration) -> Option<Value> + Send + Sync,
{
    fn resolve(
        &self,
        request: &RequestInfo,
        response: &ResponseInfo,
        duration: Duration,
    ) -> Option<Value> {
        self(request, response, duration)
    }
}

/// Observes failed sends. Never called for successful ones.
pub trait ErrorHandler: Send + Sync {
    fn handle(&self, error: &TransmitError);
}

impl<F> ErrorHandler for F
where
    F: Fn(&TransmitError) + Send + Sync,
{
    fn handle(&self, error: &TransmitError) {
        self(error)
    }
}

/// Connectionless, unacknowledged delivery of one datagram.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Sends `bytes` as a single datagram to `host:port`, returning the number
    /// of bytes the socket accepted.
    async fn send(&self, host: &str, port: u16, bytes: &[u8]) -> Result<usize, TransmitError>;
}
