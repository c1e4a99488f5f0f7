//! routewatch core: metric instruments, the registry, and the scrape text format.
//!
//! This crate owns the in-process metric state shared by the gateway's
//! instrumentation wrapper and its scrape endpoint. It intentionally carries
//! no transport or runtime dependencies so it can be reused in multiple
//! contexts.
//!
//! # Defensive guarantees
//! Panics, `unwrap`, and `expect` are compile-denied here
//! (`#![deny(clippy::panic, clippy::unwrap_used, clippy::expect_used)]`).
//! Observation paths never fail; registration and rendering surface problems
//! as `RouteWatchError`/`Result`.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

pub mod error;
pub mod exposition;
pub mod metrics;

/// Shared result type.
pub use error::{Result, RouteWatchError};
