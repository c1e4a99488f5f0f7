//! Shared application state for the routewatch gateway.
//!
//! The metric registry is created once here and handed to every component
//! that records or exports metrics.

use std::sync::Arc;

use routewatch_core::error::Result;
use routewatch_core::metrics::MetricRegistry;

use crate::config::RouteWatchConfig;
use crate::obs::HttpMetrics;

#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
    metrics: Arc<HttpMetrics>,
}

struct AppStateInner {
    cfg: RouteWatchConfig,
}

impl AppState {
    /// Build application state with a fresh registry.
    /// Returns Result so main can fail startup on a metric registration error.
    pub fn new(cfg: RouteWatchConfig) -> Result<Self> {
        Self::with_registry(cfg, Arc::new(MetricRegistry::new()))
    }

    /// Build application state on an existing registry.
    pub fn with_registry(cfg: RouteWatchConfig, registry: Arc<MetricRegistry>) -> Result<Self> {
        let metrics = HttpMetrics::new(registry, &cfg.metrics)?;
        Ok(Self {
            inner: Arc::new(AppStateInner { cfg }),
            metrics: Arc::new(metrics),
        })
    }

    pub fn cfg(&self) -> &RouteWatchConfig {
        &self.inner.cfg
    }

    pub fn metrics(&self) -> Arc<HttpMetrics> {
        Arc::clone(&self.metrics)
    }

    pub fn set_draining(&self) {
        self.metrics.set_draining();
    }

    pub fn is_draining(&self) -> bool {
        self.metrics.is_draining()
    }
}
