//! Tower integration.
//!
//! The wrapped service is the continuation: it is called synchronously from
//! [`Service::call`], right after the observer starts timing. Outcomes map onto
//! terminal events:
//!
//! - the response body reaching its end is `finish`
//! - `Err(_)` from the service, or an error frame from the body, is `error`;
//!   either is passed through untouched
//! - dropping the future, or the body before its end, is `close`
//!
//! A response whose body is already empty when the head arrives finishes
//! right away.

use crate::application::interceptor::{Interceptor, RequestObserver};
use crate::domain::payload::ResponseInfo;
use http::{Request, Response};
use http_body::{Body, Frame, SizeHint};
use pin_project_lite::pin_project;
use std::future::Future;
use std::mem;
use std::pin::Pin;
use std::task::{Context, Poll, ready};
use tower::{Layer, Service};

/// Layer that reports the response time of every request.
#[derive(Clone)]
pub struct ResponseTimeLayer {
    interceptor: Interceptor,
}

impl ResponseTimeLayer {
    pub fn new(interceptor: Interceptor) -> Self {
        Self { interceptor }
    }
}

impl<S> Layer<S> for ResponseTimeLayer {
    type Service = ResponseTime<S>;

    fn layer(&self, inner: S) -> Self::Service {
        ResponseTime {
            inner,
            interceptor: self.interceptor.clone(),
        }
    }
}

/// Service produced by [`ResponseTimeLayer`].
#[derive(Clone)]
pub struct ResponseTime<S> {
    inner: S,
    interceptor: Interceptor,
}

impl<S, ReqBody, ResBody> Service<Request<ReqBody>> for ResponseTime<S>
where
    S: Service<Request<ReqBody>, Response = Response<ResBody>>,
    ResBody: Body,
{
    type Response = Response<ObservedBody<ResBody>>;
    type Error = S::Error;
    type Future = ResponseFuture<S::Future>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, request: Request<ReqBody>) -> Self::Future {
        let observer = self.interceptor.observe(&request);
        ResponseFuture {
            inner: self.inner.call(request),
            observer,
        }
    }
}

pin_project! {
    /// Response future of [`ResponseTime`].
    pub struct ResponseFuture<F> {
        #[pin]
        inner: F,
        observer: RequestObserver,
    }
}

impl<F, ResBody, E> Future for ResponseFuture<F>
where
    F: Future<Output = Result<Response<ResBody>, E>>,
    ResBody: Body,
{
    type Output = Result<Response<ObservedBody<ResBody>>, E>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.project();
        let result = ready!(this.inner.poll(cx));
        let mut observer = mem::take(this.observer);
        match result {
            Ok(response) => {
                if response.body().is_end_stream() {
                    observer.finish_response(&response);
                }
                let head = observer
                    .is_pending()
                    .then(|| ResponseInfo::from_response(&response));
                Poll::Ready(Ok(response.map(|inner| ObservedBody {
                    inner,
                    observer,
                    head,
                })))
            }
            Err(e) => {
                observer.error();
                Poll::Ready(Err(e))
            }
        }
    }
}

pin_project! {
    /// Response body of [`ResponseTime`]. Frames pass through unchanged.
    pub struct ObservedBody<B> {
        #[pin]
        inner: B,
        observer: RequestObserver,
        head: Option<ResponseInfo>,
    }
}

impl<B: std::fmt::Debug> std::fmt::Debug for ObservedBody<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObservedBody")
            .field("inner", &self.inner)
            .field("head", &self.head)
            .finish_non_exhaustive()
    }
}

impl<B: Body> Body for ObservedBody<B> {
    type Data = B::Data;
    type Error = B::Error;

    fn poll_frame(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Option<Result<Frame<Self::Data>, Self::Error>>> {
        let mut this = self.project();
        let frame = ready!(this.inner.as_mut().poll_frame(cx));
        let ended = match &frame {
            None => true,
            Some(Ok(_)) => this.inner.is_end_stream(),
            Some(Err(_)) => {
                this.observer.error();
                false
            }
        };
        if ended {
            if let Some(head) = this.head.take() {
                this.observer.finish(&head);
            }
        }
        Poll::Ready(frame)
    }

    fn is_end_stream(&self) -> bool {
        self.inner.is_end_stream()
    }

    fn size_hint(&self) -> SizeHint {
        self.inner.size_hint()
    }
}
