//! Route handler trait and the latency/error instrumentation wrapper.
//!
//! `Instrumented` holds the inner handler, the route label, and the shared
//! `HttpMetrics`. It awaits the inner handler in-line and records the elapsed
//! time under the route label whatever the outcome: a request whose future is
//! dropped mid-flight, or whose handler panics, is still observed exactly
//! once. The response is returned untouched. No metric lock is held while
//! the handler runs.
//!
//! Error counting follows `ErrorAccounting`: in `Handler` mode a failing
//! handler reports itself via `HttpMetrics::record_error`; in `ServerErrors`
//! mode the wrapper also counts every 5xx response.

use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use axum::extract::Request;
use axum::response::Response;

use crate::config::ErrorAccounting;
use crate::obs::HttpMetrics;

/// Request in, response out. Failures are expressed as the response.
#[async_trait]
pub trait RouteHandler: Send + Sync + 'static {
    async fn call(&self, req: Request) -> Response;
}

/// Adapter turning an async closure into a [`RouteHandler`].
pub struct HandlerFn<F>(F);

pub fn handler_fn<F, Fut>(f: F) -> HandlerFn<F>
where
    F: Fn(Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Response> + Send + 'static,
{
    HandlerFn(f)
}

#[async_trait]
impl<F, Fut> RouteHandler for HandlerFn<F>
where
    F: Fn(Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Response> + Send + 'static,
{
    async fn call(&self, req: Request) -> Response {
        (self.0)(req).await
    }
}

/// Times `inner` and records the result under `route`.
pub struct Instrumented<H> {
    route: String,
    inner: H,
    metrics: Arc<HttpMetrics>,
    accounting: ErrorAccounting,
}

impl<H: RouteHandler> Instrumented<H> {
    pub fn new(route: impl Into<String>, inner: H, metrics: Arc<HttpMetrics>) -> Self {
        Self {
            route: route.into(),
            inner,
            metrics,
            accounting: ErrorAccounting::Handler,
        }
    }

    pub fn with_error_accounting(mut self, accounting: ErrorAccounting) -> Self {
        self.accounting = accounting;
        self
    }

    pub fn route(&self) -> &str {
        &self.route
    }
}

#[async_trait]
impl<H: RouteHandler> RouteHandler for Instrumented<H> {
    async fn call(&self, req: Request) -> Response {
        let timer = LatencyTimer::start(&self.route, &self.metrics);
        let resp = self.inner.call(req).await;
        let elapsed = timer.finish();

        if self.accounting == ErrorAccounting::ServerErrors && resp.status().is_server_error() {
            self.metrics.record_error(&self.route);
        }

        tracing::debug!(
            route = %self.route,
            status = resp.status().as_u16(),
            elapsed_ms = elapsed.as_secs_f64() * 1000.0,
            "request handled"
        );
        resp
    }
}

/// Observes the elapsed time when dropped, so cancellation and unwinding
/// are recorded like completion.
struct LatencyTimer<'a> {
    route: &'a str,
    metrics: &'a HttpMetrics,
    start: Instant,
    finished: bool,
}

impl<'a> LatencyTimer<'a> {
    fn start(route: &'a str, metrics: &'a HttpMetrics) -> Self {
        Self {
            route,
            metrics,
            start: Instant::now(),
            finished: false,
        }
    }

    /// Record now and return the recorded duration.
    fn finish(mut self) -> Duration {
        self.finished = true;
        let elapsed = self.start.elapsed();
        self.metrics.observe_latency(self.route, elapsed);
        elapsed
    }
}

impl Drop for LatencyTimer<'_> {
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        let elapsed = self.start.elapsed();
        self.metrics.observe_latency(self.route, elapsed);
        tracing::debug!(
            route = %self.route,
            elapsed_ms = elapsed.as_secs_f64() * 1000.0,
            "request abandoned before completion"
        );
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::expect_used)]
    #![allow(clippy::panic)]

    use axum::body::{to_bytes, Body};
    use axum::http::{header, StatusCode};
    use axum::response::IntoResponse;
    use routewatch_core::metrics::MetricRegistry;

    use super::*;
    use crate::config::MetricsSection;

    fn metrics() -> Arc<HttpMetrics> {
        let registry = Arc::new(MetricRegistry::new());
        Arc::new(HttpMetrics::new(registry, &MetricsSection::default()).unwrap())
    }

    fn get(uri: &str) -> Request {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn passes_response_through_unchanged() {
        let m = metrics();
        let h = Instrumented::new(
            "/teapot",
            handler_fn(|req: Request| async move {
                let body = format!("you asked for {}", req.uri().path());
                let headers = [(header::CACHE_CONTROL, "no-store")];
                (StatusCode::IM_A_TEAPOT, headers, body).into_response()
            }),
            Arc::clone(&m),
        );

        let resp = h.call(get("/teapot")).await;
        assert_eq!(resp.status(), StatusCode::IM_A_TEAPOT);
        assert_eq!(resp.headers()[header::CACHE_CONTROL], "no-store");
        let body = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&body[..], b"you asked for /teapot");

        assert_eq!(m.latency().sample(&["/teapot"]).unwrap().count, 1);
    }

    #[tokio::test]
    async fn measures_the_inner_handler() {
        let m = metrics();
        let h = Instrumented::new(
            "/nap",
            handler_fn(|_req: Request| async {
                tokio::time::sleep(Duration::from_millis(60)).await;
                StatusCode::OK.into_response()
            }),
            Arc::clone(&m),
        );
        h.call(get("/nap")).await;

        let s = m.latency().sample(&["/nap"]).unwrap();
        assert_eq!(s.count, 1);
        assert!(s.sum >= 0.06, "sum = {}", s.sum);
        assert_eq!(s.bucket(0.05), Some(0));
        assert_eq!(s.bucket(10.0), Some(1));
    }

    #[tokio::test]
    async fn abandoned_request_is_still_timed() {
        let m = metrics();
        let h = Instrumented::new(
            "/slow",
            handler_fn(|_req: Request| async {
                tokio::time::sleep(Duration::from_millis(200)).await;
                StatusCode::OK.into_response()
            }),
            Arc::clone(&m),
        );

        let res = tokio::time::timeout(Duration::from_millis(50), h.call(get("/slow"))).await;
        assert!(res.is_err(), "handler should still be sleeping");

        let s = m.latency().sample(&["/slow"]).unwrap();
        assert_eq!(s.count, 1);
        assert!(s.sum >= 0.05, "sum = {}", s.sum);
    }

    #[tokio::test]
    async fn panicking_handler_is_still_timed() {
        let m = metrics();
        let h = Arc::new(Instrumented::new(
            "/panic",
            handler_fn(|_req: Request| async {
                if true {
                    panic!("handler blew up");
                }
                StatusCode::OK.into_response()
            }),
            Arc::clone(&m),
        ));

        let joined = tokio::spawn(async move { h.call(get("/panic")).await }).await;
        assert!(joined.unwrap_err().is_panic());
        assert_eq!(m.latency().sample(&["/panic"]).unwrap().count, 1);
    }

    #[tokio::test]
    async fn failures_are_timed_but_not_counted_by_default() {
        let m = metrics();
        let h = Instrumented::new(
            "/boom",
            handler_fn(|_req: Request| async { StatusCode::INTERNAL_SERVER_ERROR.into_response() }),
            Arc::clone(&m),
        );
        let resp = h.call(get("/boom")).await;
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(m.latency().sample(&["/boom"]).unwrap().count, 1);
        assert_eq!(m.errors().get(&["/boom"]), 0);
    }

    #[tokio::test]
    async fn server_errors_mode_counts_5xx_only() {
        let m = metrics();
        let failing = Instrumented::new(
            "/boom",
            handler_fn(|_req: Request| async { StatusCode::BAD_GATEWAY.into_response() }),
            Arc::clone(&m),
        )
        .with_error_accounting(ErrorAccounting::ServerErrors);
        let rejected = Instrumented::new(
            "/missing",
            handler_fn(|_req: Request| async { StatusCode::NOT_FOUND.into_response() }),
            Arc::clone(&m),
        )
        .with_error_accounting(ErrorAccounting::ServerErrors);

        failing.call(get("/boom")).await;
        failing.call(get("/boom")).await;
        rejected.call(get("/missing")).await;

        assert_eq!(m.errors().get(&["/boom"]), 2);
        assert_eq!(m.errors().get(&["/missing"]), 0);
    }

    #[tokio::test]
    async fn concurrent_requests_are_all_recorded() {
        let m = metrics();
        let h = Arc::new(Instrumented::new(
            "/",
            handler_fn(|_req: Request| async { StatusCode::OK.into_response() }),
            Arc::clone(&m),
        ));

        let tasks: Vec<_> = (0..200)
            .map(|_| {
                let h = Arc::clone(&h);
                tokio::spawn(async move { h.call(get("/")).await })
            })
            .collect();
        for t in tasks {
            t.await.unwrap();
        }
        assert_eq!(m.latency().sample(&["/"]).unwrap().count, 200);
    }
}
