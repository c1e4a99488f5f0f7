//! Shared error type across routewatch crates.

use thiserror::Error;

/// Stable error codes, used in logs and startup failure messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    /// A metric with the same fully-qualified name is already registered.
    DuplicateMetric,
    /// Malformed metric name, label name, or bucket layout.
    InvalidDescriptor,
    /// One metric could not be rendered for a scrape.
    RenderFault,
    /// Scrape text did not follow the exposition grammar.
    Parse,
    /// Configuration could not be read or failed validation.
    Config,
    /// Internal error.
    Internal,
}

impl ErrorCode {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorCode::DuplicateMetric => "DUPLICATE_METRIC",
            ErrorCode::InvalidDescriptor => "INVALID_DESCRIPTOR",
            ErrorCode::RenderFault => "RENDER_FAULT",
            ErrorCode::Parse => "PARSE",
            ErrorCode::Config => "CONFIG",
            ErrorCode::Internal => "INTERNAL",
        }
    }
}

/// Shared result type.
pub type Result<T> = std::result::Result<T, RouteWatchError>;

/// Unified error type used by core and gateway.
#[derive(Debug, Error)]
pub enum RouteWatchError {
    #[error("metric already registered: {0}")]
    DuplicateMetric(String),
    #[error("invalid metric descriptor: {0}")]
    InvalidDescriptor(String),
    #[error("render fault in {metric}: {reason}")]
    Render { metric: String, reason: String },
    #[error("parse error at line {line}: {reason}")]
    Parse { line: usize, reason: String },
    #[error("config: {0}")]
    Config(String),
    #[error("internal: {0}")]
    Internal(String),
}

impl RouteWatchError {
    pub fn code(&self) -> ErrorCode {
        match self {
            RouteWatchError::DuplicateMetric(_) => ErrorCode::DuplicateMetric,
            RouteWatchError::InvalidDescriptor(_) => ErrorCode::InvalidDescriptor,
            RouteWatchError::Render { .. } => ErrorCode::RenderFault,
            RouteWatchError::Parse { .. } => ErrorCode::Parse,
            RouteWatchError::Config(_) => ErrorCode::Config,
            RouteWatchError::Internal(_) => ErrorCode::Internal,
        }
    }

    pub fn render(metric: &str, reason: impl Into<String>) -> Self {
        RouteWatchError::Render {
            metric: metric.to_string(),
            reason: reason.into(),
        }
    }
}
