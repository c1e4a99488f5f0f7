//! Gateway config loader (strict parsing).

pub mod schema;

use std::fs;

use routewatch_core::error::{Result, RouteWatchError};

pub use schema::{DemoSection, ErrorAccounting, MetricsSection, RouteWatchConfig, ServerSection};

/// Config file read when no path is given on the command line.
pub const DEFAULT_CONFIG_PATH: &str = "routewatch.yaml";

pub fn load_from_file(path: &str) -> Result<RouteWatchConfig> {
    let s = fs::read_to_string(path)
        .map_err(|e| RouteWatchError::Config(format!("read {path} failed: {e}")))?;
    load_from_str(&s)
}

pub fn load_from_str(s: &str) -> Result<RouteWatchConfig> {
    let cfg: RouteWatchConfig = serde_yaml::from_str(s)
        .map_err(|e| RouteWatchError::Config(format!("invalid yaml: {e}")))?;
    cfg.validate()?;
    Ok(cfg)
}
