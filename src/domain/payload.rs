//! Request/response snapshots handed to resolvers, and the default payload shape.

use http::{HeaderMap, Method, StatusCode, Uri};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;

/// Owned view of the request being timed.
#[derive(Debug, Clone, Default)]
pub struct RequestInfo {
    pub method: Method,
    pub uri: Uri,
    pub headers: HeaderMap,
}

impl RequestInfo {
    pub fn from_request<B>(request: &http::Request<B>) -> Self {
        Self {
            method: request.method().clone(),
            uri: request.uri().clone(),
            headers: request.headers().clone(),
        }
    }
}

/// Owned view of the finished response.
///
/// `status` is `None` when the host never produced a status line.
#[derive(Debug, Clone, Default)]
pub struct ResponseInfo {
    pub status: Option<StatusCode>,
    pub headers: HeaderMap,
}

impl ResponseInfo {
    pub fn from_response<B>(response: &http::Response<B>) -> Self {
        Self {
            status: Some(response.status()),
            headers: response.headers().clone(),
        }
    }

    /// Numeric status code, `0` when unknown.
    pub fn status_code(&self) -> u16 {
        self.status.map(|s| s.as_u16()).unwrap_or(0)
    }
}

/// Payload produced by the default resolver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DefaultPayload {
    /// Whole milliseconds between request entry and response finish
    pub response_time: u64,
    pub response_status: u16,
}

impl DefaultPayload {
    pub fn new(duration: Duration, response: &ResponseInfo) -> Self {
        Self {
            response_time: u64::try_from(duration.as_millis()).unwrap_or(u64::MAX),
            response_status: response.status_code(),
        }
    }
}

/// Drops payloads that mean "do not report this request".
///
/// `null` and `false` are treated like `None`, so resolvers written in terms of
/// JSON values can filter requests the same way.
pub fn reportable(payload: Option<Value>) -> Option<Value> {
    payload.filter(|v| !matches!(v, Value::Null | Value::Bool(false)))
}
