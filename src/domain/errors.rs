use thiserror::Error;

/// Errors raised while delivering a payload to the collector.
///
/// None of these ever reach the request/response cycle: they are handed to the
/// configured [`ErrorHandler`](crate::domain::ports::ErrorHandler) and dropped.
#[derive(Debug, Error)]
pub enum TransmitError {
    #[error("Failed to encode payload: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("Socket error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Could not resolve collector address {host}:{port}")]
    Unresolvable { host: String, port: u16 },

    #[error("Datagram truncated: sent {sent} of {expected} bytes")]
    Truncated { sent: usize, expected: usize },

    #[error("No tokio runtime to send on: {0}")]
    NoRuntime(#[from] tokio::runtime::TryCurrentError),
}
