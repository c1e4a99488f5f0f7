use std::net::SocketAddr;

use serde::Deserialize;
use routewatch_core::error::{Result, RouteWatchError};

use crate::router::{DEMO_ROUTES, HEALTHZ_PATH, READYZ_PATH};

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RouteWatchConfig {
    pub version: u32,

    #[serde(default)]
    pub server: ServerSection,

    #[serde(default)]
    pub metrics: MetricsSection,

    #[serde(default)]
    pub demo: DemoSection,
}

impl Default for RouteWatchConfig {
    fn default() -> Self {
        Self {
            version: 1,
            server: ServerSection::default(),
            metrics: MetricsSection::default(),
            demo: DemoSection::default(),
        }
    }
}

impl RouteWatchConfig {
    pub fn validate(&self) -> Result<()> {
        if self.version != 1 {
            return Err(RouteWatchError::Config(format!(
                "unsupported config version: {}",
                self.version
            )));
        }

        self.server.validate()?;
        self.metrics.validate()?;
        self.demo.validate()?;

        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerSection {
    #[serde(default = "default_listen")]
    pub listen: String,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            listen: default_listen(),
        }
    }
}

impl ServerSection {
    pub fn listen_addr(&self) -> Result<SocketAddr> {
        self.listen.parse().map_err(|e| {
            RouteWatchError::Config(format!(
                "server.listen must be a valid socket address ({}): {e}",
                self.listen
            ))
        })
    }

    pub fn validate(&self) -> Result<()> {
        self.listen_addr().map(|_| ())
    }
}

/// Who increments the per-route error counter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorAccounting {
    /// Handlers report their own failures; the wrapper only records latency.
    #[default]
    Handler,
    /// The wrapper also counts every 5xx response.
    ServerErrors,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MetricsSection {
    #[serde(default = "default_namespace")]
    pub namespace: String,

    #[serde(default = "default_subsystem")]
    pub subsystem: String,

    /// Scrape endpoint path.
    #[serde(default = "default_metrics_path")]
    pub path: String,

    /// Latency bucket upper bounds in seconds; default buckets when absent.
    #[serde(default)]
    pub buckets: Option<Vec<f64>>,

    #[serde(default)]
    pub error_accounting: ErrorAccounting,
}

impl Default for MetricsSection {
    fn default() -> Self {
        Self {
            namespace: default_namespace(),
            subsystem: default_subsystem(),
            path: default_metrics_path(),
            buckets: None,
            error_accounting: ErrorAccounting::default(),
        }
    }
}

impl MetricsSection {
    pub fn validate(&self) -> Result<()> {
        if !self.path.starts_with('/') {
            return Err(RouteWatchError::Config(
                "metrics.path must start with '/'".into(),
            ));
        }
        let mut reserved = DEMO_ROUTES.iter().copied().chain([HEALTHZ_PATH, READYZ_PATH]);
        if let Some(clash) = reserved.find(|p| *p == self.path) {
            return Err(RouteWatchError::Config(format!(
                "metrics.path collides with route {clash}"
            )));
        }

        if let Some(buckets) = &self.buckets {
            if buckets.is_empty() {
                return Err(RouteWatchError::Config(
                    "metrics.buckets must not be empty".into(),
                ));
            }
            if buckets.iter().any(|b| !b.is_finite() || *b < 0.0) {
                return Err(RouteWatchError::Config(
                    "metrics.buckets must be finite and non-negative".into(),
                ));
            }
            if buckets.windows(2).any(|w| w[0] >= w[1]) {
                return Err(RouteWatchError::Config(
                    "metrics.buckets must be strictly increasing".into(),
                ));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DemoSection {
    #[serde(default = "default_slow_min_ms")]
    pub slow_min_ms: u64,

    #[serde(default = "default_slow_max_ms")]
    pub slow_max_ms: u64,
}

impl Default for DemoSection {
    fn default() -> Self {
        Self {
            slow_min_ms: default_slow_min_ms(),
            slow_max_ms: default_slow_max_ms(),
        }
    }
}

impl DemoSection {
    pub fn validate(&self) -> Result<()> {
        if self.slow_min_ms > self.slow_max_ms {
            return Err(RouteWatchError::Config(
                "demo.slow_min_ms must not exceed demo.slow_max_ms".into(),
            ));
        }
        if self.slow_max_ms > 60_000 {
            return Err(RouteWatchError::Config(
                "demo.slow_max_ms must be at most 60000".into(),
            ));
        }
        Ok(())
    }
}

fn default_listen() -> String {
    "0.0.0.0:8080".into()
}
fn default_namespace() -> String {
    "demo".into()
}
fn default_subsystem() -> String {
    "http".into()
}
fn default_metrics_path() -> String {
    "/metrics".into()
}
fn default_slow_min_ms() -> u64 {
    500
}
fn default_slow_max_ms() -> u64 {
    1500
}
