//! Per-route HTTP latency and error metrics behind a single dependency.
//!
//! [`core`] holds the instruments and the scrape text format and can be used
//! without any HTTP stack:
//!
//! ```
//! use routewatch::core::metrics::{MetricOpts, MetricRegistry};
//!
//! let registry = MetricRegistry::new();
//! let latency = registry.register_histogram(
//!     &MetricOpts::new("request_duration_seconds", "HTTP request latency").namespace("shop"),
//!     &["path"],
//!     None,
//! )?;
//! latency.observe(&["/checkout"], 0.042);
//!
//! let body = registry.render(&[]);
//! assert!(body.contains("shop_request_duration_seconds_count{path=\"/checkout\"} 1\n"));
//! # Ok::<(), routewatch::core::RouteWatchError>(())
//! ```
//!
//! [`gateway`] wires those instruments into an axum service. A second
//! registration of the same metric names fails startup:
//!
//! ```
//! use std::sync::Arc;
//!
//! use routewatch::core::metrics::MetricRegistry;
//! use routewatch::gateway::app_state::AppState;
//! use routewatch::gateway::config::RouteWatchConfig;
//! use routewatch::gateway::router::build_router;
//!
//! let registry = Arc::new(MetricRegistry::new());
//! let state = AppState::with_registry(RouteWatchConfig::default(), Arc::clone(&registry))?;
//! let _app = build_router(state);
//!
//! assert!(AppState::with_registry(RouteWatchConfig::default(), registry).is_err());
//! # Ok::<(), routewatch::core::RouteWatchError>(())
//! ```

pub mod core {
    pub use routewatch_core::*;
}

pub mod gateway {
    pub use routewatch_gateway::*;
}
