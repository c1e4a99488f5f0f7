//! Built-in demonstration handlers mounted behind the instrumentation wrapper.

pub mod demo;

pub use demo::{ErrorHandler, OkHandler, SlowHandler};
