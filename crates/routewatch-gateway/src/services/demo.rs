use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::extract::Request;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use rand::Rng;

use crate::instrument::RouteHandler;
use crate::obs::HttpMetrics;

/// Always `200 ok`.
pub struct OkHandler;

#[async_trait]
impl RouteHandler for OkHandler {
    async fn call(&self, _req: Request) -> Response {
        (StatusCode::OK, "ok\n").into_response()
    }
}

/// Sleeps a random delay in `[min, max)` before answering.
pub struct SlowHandler {
    min: Duration,
    max: Duration,
}

impl SlowHandler {
    pub fn new(min: Duration, max: Duration) -> Self {
        Self { min, max }
    }

    fn delay(&self) -> Duration {
        if self.max <= self.min {
            return self.min;
        }
        rand::thread_rng().gen_range(self.min..self.max)
    }
}

#[async_trait]
impl RouteHandler for SlowHandler {
    async fn call(&self, _req: Request) -> Response {
        let delay = self.delay();
        tracing::debug!(delay_ms = delay.as_millis() as u64, "slow handler sleeping");
        tokio::time::sleep(delay).await;
        (StatusCode::OK, "slow response\n").into_response()
    }
}

/// Always fails with `500`.
///
/// When built with `reporting`, it counts its own failure under `route`
/// before answering.
pub struct ErrorHandler {
    route: String,
    metrics: Option<Arc<HttpMetrics>>,
}

impl ErrorHandler {
    pub fn reporting(route: impl Into<String>, metrics: Arc<HttpMetrics>) -> Self {
        Self {
            route: route.into(),
            metrics: Some(metrics),
        }
    }

    pub fn silent(route: impl Into<String>) -> Self {
        Self {
            route: route.into(),
            metrics: None,
        }
    }
}

#[async_trait]
impl RouteHandler for ErrorHandler {
    async fn call(&self, _req: Request) -> Response {
        if let Some(metrics) = &self.metrics {
            metrics.record_error(&self.route);
        }
        (StatusCode::INTERNAL_SERVER_ERROR, "error\n").into_response()
    }
}
