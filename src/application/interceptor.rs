//! Per-request response timing.
//!
//! [`Interceptor`] is built once at startup and cloned into the request path.
//! For each request it hands out a [`RequestObserver`] that captures the start
//! time and reacts to the first terminal event:
//!
//! - `finish`: resolve a payload and send it (unless the resolver skips it)
//! - `error` / `close`: clean up only, nothing is sent
//!
//! Dropping an observer that never saw a terminal event counts as `close`.
//!
//! After `finish` the observer is released only once the detached send has
//! completed and any failure has reached the error handler.

use crate::config::{JarmoConfig, enabled_from_env};
use crate::domain::lifecycle::{Lifecycle, LifecycleState, TerminalEvent};
use crate::domain::payload::{RequestInfo, ResponseInfo, reportable};
use crate::domain::ports::{ErrorHandler, Resolver, Transport};
use crate::infrastructure::observability::Metrics;
use crate::infrastructure::transmitter::dispatch;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info};

struct Shared {
    config: JarmoConfig,
    transport: Arc<dyn Transport>,
    metrics: Option<Metrics>,
}

/// Response-time interceptor.
///
/// A disabled interceptor is a pass-through: its observers do nothing and the
/// transport is never touched.
#[derive(Clone)]
pub struct Interceptor {
    shared: Option<Arc<Shared>>,
}

impl Interceptor {
    /// Build an interceptor whose on/off switch comes from `JARMO_ENABLE`.
    pub fn from_env(config: Option<JarmoConfig>, transport: Arc<dyn Transport>) -> Self {
        Self::new(config, transport, enabled_from_env())
    }

    pub fn new(config: Option<JarmoConfig>, transport: Arc<dyn Transport>, enabled: bool) -> Self {
        if !enabled {
            return Self::disabled();
        }

        let config = config.unwrap_or_default();
        info!(
            "Jarmo: reporting response times to {}:{}",
            config.host, config.port
        );
        Self {
            shared: Some(Arc::new(Shared {
                config,
                transport,
                metrics: None,
            })),
        }
    }

    pub fn disabled() -> Self {
        info!(
            "Jarmo is disabled by default, you can enable it by setting the JARMO_ENABLE environment variable."
        );
        Self { shared: None }
    }

    /// Attach process-local counters. No effect on a disabled interceptor.
    pub fn with_metrics(self, metrics: Metrics) -> Self {
        let Some(shared) = self.shared else {
            return Self { shared: None };
        };
        Self {
            shared: Some(Arc::new(Shared {
                config: shared.config.clone(),
                transport: Arc::clone(&shared.transport),
                metrics: Some(metrics),
            })),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.shared.is_some()
    }

    pub fn config(&self) -> Option<&JarmoConfig> {
        self.shared.as_ref().map(|s| &s.config)
    }

    /// Start timing `request`.
    pub fn observe<B>(&self, request: &http::Request<B>) -> RequestObserver {
        match &self.shared {
            Some(_) => self.observe_info(RequestInfo::from_request(request)),
            None => RequestObserver { active: None },
        }
    }

    /// Start timing a request described by an already captured snapshot.
    pub fn observe_info(&self, request: RequestInfo) -> RequestObserver {
        RequestObserver {
            active: self.shared.as_ref().map(|shared| Active {
                shared: Arc::clone(shared),
                request,
                start: Instant::now(),
                lifecycle: Arc::new(Mutex::new(Lifecycle::new())),
            }),
        }
    }
}

struct Active {
    shared: Arc<Shared>,
    request: RequestInfo,
    start: Instant,
    lifecycle: Arc<Mutex<Lifecycle>>,
}

impl Active {
    fn lifecycle(&self) -> MutexGuard<'_, Lifecycle> {
        lock(&self.lifecycle)
    }
}

fn lock(lifecycle: &Mutex<Lifecycle>) -> MutexGuard<'_, Lifecycle> {
    lifecycle.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Observer for one request.
///
/// Only the first terminal event is acted on, and cleanup happens exactly once.
/// The default observer is inert, like one from a disabled interceptor.
#[derive(Default)]
pub struct RequestObserver {
    active: Option<Active>,
}

impl RequestObserver {
    /// `None` for observers handed out by a disabled interceptor.
    ///
    /// A finished request stays `Finished` until its send task has reported,
    /// then moves to `Cleaned`.
    pub fn state(&self) -> Option<LifecycleState> {
        self.active.as_ref().map(|a| a.lifecycle().state())
    }

    /// `true` while no terminal event has been seen.
    pub fn is_pending(&self) -> bool {
        self.active.as_ref().is_some_and(|a| a.lifecycle().is_pending())
    }

    /// Normal completion of an `http::Response`.
    ///
    /// The response snapshot is only taken when this is the first terminal event.
    pub fn finish_response<B>(&mut self, response: &http::Response<B>) -> Option<JoinHandle<()>> {
        if !self.is_pending() {
            return None;
        }
        self.finish(&ResponseInfo::from_response(response))
    }

    /// Normal completion. Resolves the payload and dispatches it.
    ///
    /// Returns the handle of the detached send task, if one was started. Outside
    /// a tokio runtime nothing is sent and the error handler is told why.
    pub fn finish(&mut self, response: &ResponseInfo) -> Option<JoinHandle<()>> {
        let active = self.active.as_mut()?;
        active.lifecycle().on_event(TerminalEvent::Finish)?;

        let duration = active.start.elapsed();
        let shared = Arc::clone(&active.shared);
        if let Some(metrics) = &shared.metrics {
            metrics.observe_event(TerminalEvent::Finish);
            metrics.observe_response_time(duration);
        }

        let payload = reportable(
            shared
                .config
                .resolver
                .resolve(&active.request, response, duration),
        );

        match payload {
            Some(payload) => {
                let error_handler = Arc::clone(&shared.config.error_handler);
                let metrics = shared.metrics.clone();
                let lifecycle = Arc::clone(&active.lifecycle);
                dispatch(
                    Arc::clone(&shared.transport),
                    shared.config.host.clone(),
                    shared.config.port,
                    &payload,
                    move |result| {
                        match result {
                            Ok(_) => {
                                if let Some(metrics) = &metrics {
                                    metrics.datagrams_sent_total.inc();
                                }
                            }
                            Err(e) => {
                                if let Some(metrics) = &metrics {
                                    metrics.send_errors_total.inc();
                                }
                                error_handler.handle(&e);
                            }
                        }
                        lock(&lifecycle).cleanup();
                    },
                )
            }
            None => {
                debug!("Jarmo: resolver skipped {}", active.request.uri);
                if let Some(metrics) = &shared.metrics {
                    metrics.datagrams_skipped_total.inc();
                }
                self.cleanup();
                None
            }
        }
    }

    /// The host reported an error while producing the response.
    pub fn error(&mut self) {
        self.terminate(TerminalEvent::Error);
    }

    /// The response was abandoned before completion.
    pub fn close(&mut self) {
        self.terminate(TerminalEvent::Close);
    }

    /// Stop observing this request. Returns `true` only the first time.
    pub fn cleanup(&mut self) -> bool {
        self.active
            .as_mut()
            .is_some_and(|active| active.lifecycle().cleanup())
    }

    fn terminate(&mut self, event: TerminalEvent) {
        let Some(active) = self.active.as_mut() else {
            return;
        };
        if active.lifecycle().on_event(event).is_none() {
            return;
        }
        debug!(
            "Jarmo: {} {} ended with {}",
            active.request.method,
            active.request.uri,
            event.as_str()
        );
        if let Some(metrics) = &active.shared.metrics {
            metrics.observe_event(event);
        }
        self.cleanup();
    }
}

impl Drop for RequestObserver {
    fn drop(&mut self) {
        if self.is_pending() {
            self.close();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::errors::TransmitError;
    use crate::domain::payload::DefaultPayload;
    use async_trait::async_trait;
    use http::StatusCode;
    use serde_json::{Value, json};
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[derive(Default)]
    struct RecordingTransport {
        sent: Mutex<Vec<(String, u16, Vec<u8>)>>,
    }

    #[async_trait]
    impl Transport for RecordingTransport {
        async fn send(&self, host: &str, port: u16, bytes: &[u8]) -> Result<usize, TransmitError> {
            self.sent
                .lock()
                .unwrap()
                .push((host.to_string(), port, bytes.to_vec()));
            Ok(bytes.len())
        }
    }

    struct FailingTransport;

    #[async_trait]
    impl Transport for FailingTransport {
        async fn send(&self, _: &str, _: u16, _: &[u8]) -> Result<usize, TransmitError> {
            Err(std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "refused").into())
        }
    }

    fn ok_response(status: StatusCode) -> ResponseInfo {
        ResponseInfo {
            status: Some(status),
            ..Default::default()
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_finish_sends_default_payload() {
        let transport = Arc::new(RecordingTransport::default());
        let interceptor = Interceptor::new(None, transport.clone(), true);

        let mut observer = interceptor.observe_info(RequestInfo::default());
        tokio::time::sleep(Duration::from_millis(123)).await;
        let handle = observer.finish(&ok_response(StatusCode::NOT_FOUND));
        assert_eq!(observer.state(), Some(LifecycleState::Finished));
        handle.expect("payload should be dispatched").await.unwrap();

        let sent = transport.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        let (host, port, bytes) = &sent[0];
        assert_eq!(host, "localhost");
        assert_eq!(*port, 8000);
        let decoded: DefaultPayload = serde_json::from_slice(bytes).unwrap();
        assert_eq!(
            decoded,
            DefaultPayload {
                response_time: 123,
                response_status: 404
            }
        );
        assert_eq!(observer.state(), Some(LifecycleState::Cleaned));
    }

    #[tokio::test]
    async fn test_skipped_payload_sends_nothing() {
        let transport = Arc::new(RecordingTransport::default());
        let config = JarmoConfig::builder()
            .resolver(|_: &RequestInfo, _: &ResponseInfo, _: Duration| -> Option<Value> { None })
            .build();
        let metrics = Metrics::new().unwrap();
        let interceptor =
            Interceptor::new(Some(config), transport.clone(), true).with_metrics(metrics.clone());

        let mut observer = interceptor.observe_info(RequestInfo::default());
        assert!(observer.finish(&ok_response(StatusCode::OK)).is_none());

        assert!(transport.sent.lock().unwrap().is_empty());
        assert_eq!(metrics.datagrams_skipped_total.get(), 1);
        assert_eq!(observer.state(), Some(LifecycleState::Cleaned));
    }

    #[tokio::test]
    async fn test_error_and_close_never_send() {
        let transport = Arc::new(RecordingTransport::default());
        let interceptor = Interceptor::new(None, transport.clone(), true);

        let mut errored = interceptor.observe_info(RequestInfo::default());
        errored.error();
        assert_eq!(errored.state(), Some(LifecycleState::Cleaned));
        assert!(errored.finish(&ok_response(StatusCode::OK)).is_none());

        let mut closed = interceptor.observe_info(RequestInfo::default());
        closed.close();
        assert!(closed.finish(&ok_response(StatusCode::OK)).is_none());

        tokio::task::yield_now().await;
        assert!(transport.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_cleanup_runs_once() {
        let transport = Arc::new(RecordingTransport::default());
        let metrics = Metrics::new().unwrap();
        let interceptor = Interceptor::new(None, transport, true).with_metrics(metrics.clone());

        let mut observer = interceptor.observe_info(RequestInfo::default());
        observer.close();
        assert!(!observer.cleanup());
        observer.error();
        observer.close();
        drop(observer);

        assert_eq!(metrics.event_count(TerminalEvent::Close), 1);
        assert_eq!(metrics.event_count(TerminalEvent::Error), 0);
    }

    #[tokio::test]
    async fn test_drop_without_event_counts_as_close() {
        let transport = Arc::new(RecordingTransport::default());
        let metrics = Metrics::new().unwrap();
        let interceptor =
            Interceptor::new(None, transport.clone(), true).with_metrics(metrics.clone());

        drop(interceptor.observe_info(RequestInfo::default()));

        assert_eq!(metrics.event_count(TerminalEvent::Close), 1);
        assert!(transport.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_send_failure_reaches_error_handler() {
        let calls = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&calls);
        let config = JarmoConfig::builder()
            .error_handler(move |e: &TransmitError| {
                assert!(matches!(e, TransmitError::Io(_)));
                seen.fetch_add(1, Ordering::SeqCst);
            })
            .build();
        let metrics = Metrics::new().unwrap();
        let interceptor = Interceptor::new(Some(config), Arc::new(FailingTransport), true)
            .with_metrics(metrics.clone());

        let mut observer = interceptor.observe_info(RequestInfo::default());
        let handle = observer.finish(&ok_response(StatusCode::OK)).unwrap();
        assert_eq!(observer.state(), Some(LifecycleState::Finished));
        handle.await.unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(metrics.send_errors_total.get(), 1);
        assert_eq!(metrics.datagrams_sent_total.get(), 0);
        assert_eq!(observer.state(), Some(LifecycleState::Cleaned));
    }

    #[test]
    fn test_finish_outside_runtime_reports_error() {
        let failures = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&failures);
        let config = JarmoConfig::builder()
            .error_handler(move |e: &TransmitError| {
                sink.lock().unwrap().push(matches!(e, TransmitError::NoRuntime(_)))
            })
            .build();
        let transport = Arc::new(RecordingTransport::default());
        let interceptor = Interceptor::new(Some(config), transport.clone(), true);

        let mut observer = interceptor.observe_info(RequestInfo::default());
        assert!(observer.finish(&ok_response(StatusCode::OK)).is_none());

        assert_eq!(*failures.lock().unwrap(), vec![true]);
        assert!(transport.sent.lock().unwrap().is_empty());
        assert_eq!(observer.state(), Some(LifecycleState::Cleaned));
    }

    #[tokio::test]
    async fn test_custom_payload_is_sent_verbatim() {
        let transport = Arc::new(RecordingTransport::default());
        let config = JarmoConfig::builder()
            .host("127.0.0.1")
            .port(9125)
            .resolver(|req: &RequestInfo, res: &ResponseInfo, _: Duration| {
                Some(json!({"path": req.uri.path(), "status": res.status_code(), "tags": ["a", "b"]}))
            })
            .build();
        let interceptor = Interceptor::new(Some(config), transport.clone(), true);

        let request = http::Request::get("/health").body(()).unwrap();
        let mut observer = interceptor.observe(&request);
        let response = http::Response::builder().status(204).body(()).unwrap();
        observer.finish_response(&response).unwrap().await.unwrap();

        let sent = transport.sent.lock().unwrap();
        let (host, port, bytes) = &sent[0];
        assert_eq!((host.as_str(), *port), ("127.0.0.1", 9125));
        let decoded: Value = serde_json::from_slice(bytes).unwrap();
        assert_eq!(
            decoded,
            json!({"path": "/health", "status": 204, "tags": ["a", "b"]})
        );
    }

    #[tokio::test]
    async fn test_disabled_interceptor_is_inert() {
        let transport = Arc::new(RecordingTransport::default());
        let interceptor = Interceptor::new(None, transport.clone(), false);
        assert!(!interceptor.is_enabled());
        assert!(interceptor.config().is_none());

        let mut observer = interceptor.observe_info(RequestInfo::default());
        assert_eq!(observer.state(), None);
        assert!(observer.finish(&ok_response(StatusCode::OK)).is_none());
        assert!(!observer.cleanup());

        assert!(transport.sent.lock().unwrap().is_empty());
    }
}
