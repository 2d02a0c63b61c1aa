//! UDP delivery of payloads to the collector.
//!
//! One socket is bound at startup and shared by every request. Each payload is
//! one datagram; nothing is acknowledged, retried or buffered.

use crate::domain::errors::TransmitError;
use crate::domain::ports::Transport;
use async_trait::async_trait;
use serde_json::Value;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::UdpSocket;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::debug;

/// Shared IPv4 datagram socket.
#[derive(Clone, Debug)]
pub struct UdpTransmitter {
    socket: Arc<UdpSocket>,
}

impl UdpTransmitter {
    /// Bind an ephemeral IPv4 socket. Must be called inside a tokio runtime.
    pub async fn bind() -> Result<Self, TransmitError> {
        Self::bind_to(SocketAddr::from(([0, 0, 0, 0], 0))).await
    }

    pub async fn bind_to(local: SocketAddr) -> Result<Self, TransmitError> {
        let socket = UdpSocket::bind(local).await?;
        debug!("UdpTransmitter: bound to {}", socket.local_addr()?);
        Ok(Self {
            socket: Arc::new(socket),
        })
    }

    pub fn from_socket(socket: UdpSocket) -> Self {
        Self {
            socket: Arc::new(socket),
        }
    }

    pub fn local_addr(&self) -> Result<SocketAddr, TransmitError> {
        Ok(self.socket.local_addr()?)
    }

    /// First address for `host:port` in the socket's address family.
    async fn resolve(&self, host: &str, port: u16) -> Result<SocketAddr, TransmitError> {
        let want_v4 = self.socket.local_addr()?.is_ipv4();
        tokio::net::lookup_host((host, port))
            .await?
            .find(|addr| addr.is_ipv4() == want_v4)
            .ok_or_else(|| TransmitError::Unresolvable {
                host: host.to_string(),
                port,
            })
    }
}

#[async_trait]
impl Transport for UdpTransmitter {
    async fn send(&self, host: &str, port: u16, bytes: &[u8]) -> Result<usize, TransmitError> {
        let target = self.resolve(host, port).await?;
        let sent = self.socket.send_to(bytes, target).await?;
        if sent != bytes.len() {
            return Err(TransmitError::Truncated {
                sent,
                expected: bytes.len(),
            });
        }
        debug!("UdpTransmitter: sent {} bytes to {}", sent, target);
        Ok(sent)
    }
}

/// UTF-8 JSON text of a payload.
pub fn encode_payload(payload: &Value) -> Result<Vec<u8>, TransmitError> {
    Ok(serde_json::to_vec(payload)?)
}

/// Fire-and-forget send of one payload.
///
/// The send runs on a detached task; `callback` is invoked exactly once with
/// its outcome. Encoding failures are reported through the same callback, and
/// so is the absence of a tokio runtime, in which case no task is started and
/// `None` is returned. The handle exists for tests and is never joined by the
/// interceptor.
pub fn dispatch<F>(
    transport: Arc<dyn Transport>,
    host: String,
    port: u16,
    payload: &Value,
    callback: F,
) -> Option<JoinHandle<()>>
where
    F: FnOnce(Result<usize, TransmitError>) + Send + 'static,
{
    let runtime = match Handle::try_current() {
        Ok(runtime) => runtime,
        Err(e) => {
            callback(Err(e.into()));
            return None;
        }
    };
    let encoded = encode_payload(payload);
    Some(runtime.spawn(async move {
        let result = match encoded {
            Ok(bytes) => transport.send(&host, port, &bytes).await,
            Err(e) => Err(e),
        };
        callback(result);
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::time::Duration;

    async fn loopback_pair() -> (UdpTransmitter, UdpSocket) {
        let receiver = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let transmitter = UdpTransmitter::bind_to("127.0.0.1:0".parse().unwrap())
            .await
            .unwrap();
        (transmitter, receiver)
    }

    #[test]
    fn test_encode_is_json_text() {
        let bytes = encode_payload(&json!({"response_time": 42, "response_status": 200})).unwrap();
        let text = std::str::from_utf8(&bytes).unwrap();
        assert_eq!(text, r#"{"response_status":200,"response_time":42}"#);
    }

    #[tokio::test]
    async fn test_round_trip_over_loopback() {
        let (transmitter, receiver) = loopback_pair().await;
        let port = receiver.local_addr().unwrap().port();
        let payload = json!({"response_time": 42, "response_status": 200});

        let bytes = encode_payload(&payload).unwrap();
        let sent = transmitter.send("127.0.0.1", port, &bytes).await.unwrap();
        assert_eq!(sent, bytes.len());

        let mut buf = [0u8; 1024];
        let (n, _) = tokio::time::timeout(Duration::from_secs(2), receiver.recv_from(&mut buf))
            .await
            .expect("datagram should arrive")
            .unwrap();
        let decoded: Value = serde_json::from_slice(&buf[..n]).unwrap();
        assert_eq!(decoded, payload);
    }

    #[tokio::test]
    async fn test_dispatch_invokes_callback_once() {
        let (transmitter, receiver) = loopback_pair().await;
        let port = receiver.local_addr().unwrap().port();
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();

        let handle = dispatch(
            Arc::new(transmitter),
            "127.0.0.1".to_string(),
            port,
            &json!({"ok": true}),
            move |result| {
                tx.send(result.map_err(|e| e.to_string())).unwrap();
            },
        );
        handle.expect("runtime is available").await.unwrap();

        assert_eq!(rx.recv().await, Some(Ok(11)));
        assert!(rx.recv().await.is_none());
    }

    struct UnreachableTransport;

    #[async_trait]
    impl Transport for UnreachableTransport {
        async fn send(&self, _: &str, _: u16, _: &[u8]) -> Result<usize, TransmitError> {
            panic!("no send may be attempted without a runtime");
        }
    }

    #[test]
    fn test_dispatch_without_runtime_reports_error() {
        let outcome = Arc::new(std::sync::Mutex::new(Vec::new()));
        let sink = Arc::clone(&outcome);

        let handle = dispatch(
            Arc::new(UnreachableTransport),
            "127.0.0.1".to_string(),
            9,
            &json!({"ok": true}),
            move |result| sink.lock().unwrap().push(result),
        );

        assert!(handle.is_none());
        let outcome = outcome.lock().unwrap();
        assert_eq!(outcome.len(), 1);
        assert!(matches!(outcome[0], Err(TransmitError::NoRuntime(_))));
    }

    #[tokio::test]
    async fn test_unresolvable_host_reports_error() {
        let (transmitter, _receiver) = loopback_pair().await;
        let result = transmitter.send("host.invalid", 8000, b"{}").await;
        assert!(result.is_err());
    }
}
