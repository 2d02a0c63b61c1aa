//! Built-in resolver and error handler.

use crate::domain::errors::TransmitError;
use crate::domain::payload::{DefaultPayload, RequestInfo, ResponseInfo};
use crate::domain::ports::{ErrorHandler, Resolver};
use serde_json::Value;
use std::time::Duration;
use tracing::warn;

/// Reports `{"response_time", "response_status"}` for every request.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultResolver;

impl Resolver for DefaultResolver {
    fn resolve(
        &self,
        _request: &RequestInfo,
        response: &ResponseInfo,
        duration: Duration,
    ) -> Option<Value> {
        serde_json::to_value(DefaultPayload::new(duration, response)).ok()
    }
}

/// Logs each failed send with a wall-clock timestamp.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogErrorHandler;

impl ErrorHandler for LogErrorHandler {
    fn handle(&self, error: &TransmitError) {
        warn!(
            "[ {} ] Failed to send UDP packet(s), {}",
            chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true),
            error
        );
    }
}
