//! routewatch gateway library entry.
//!
//! This crate wires configuration, the per-route HTTP metrics, the
//! instrumentation wrapper, the demo handlers, and the scrape endpoint into an
//! axum service. It is consumed by the binary (`main.rs`) and by integration
//! tests.

pub mod app_state;
pub mod config;
pub mod instrument;
pub mod obs;
pub mod ops;
pub mod router;
pub mod services;
