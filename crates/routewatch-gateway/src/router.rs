//! Axum router wiring.
//!
//! Demo routes are wrapped with `Instrumented` using the same path string
//! they are mounted on; ops endpoints are not instrumented. `/` is a
//! catch-all: any path without its own route is answered by the root handler
//! and recorded under `path="/"`.

use std::sync::Arc;
use std::time::Duration;

use axum::extract::Request;
use axum::routing::{any, get};
use axum::Router;

use crate::app_state::AppState;
use crate::config::ErrorAccounting;
use crate::instrument::{Instrumented, RouteHandler};
use crate::ops;
use crate::services::{ErrorHandler, OkHandler, SlowHandler};

pub const ROOT_PATH: &str = "/";
pub const SLOW_PATH: &str = "/slow";
pub const ERROR_PATH: &str = "/error";
pub const HEALTHZ_PATH: &str = "/healthz";
pub const READYZ_PATH: &str = "/readyz";

/// Instrumented demo routes.
pub const DEMO_ROUTES: [&str; 3] = [ROOT_PATH, SLOW_PATH, ERROR_PATH];

pub fn build_router(state: AppState) -> Router {
    let cfg = state.cfg();
    let metrics = state.metrics();

    let error_handler = match cfg.metrics.error_accounting {
        ErrorAccounting::Handler => ErrorHandler::reporting(ERROR_PATH, Arc::clone(&metrics)),
        ErrorAccounting::ServerErrors => ErrorHandler::silent(ERROR_PATH),
    };
    let slow_handler = SlowHandler::new(
        Duration::from_millis(cfg.demo.slow_min_ms),
        Duration::from_millis(cfg.demo.slow_max_ms),
    );

    let router = Router::new()
        .route(HEALTHZ_PATH, get(ops::healthz))
        .route(READYZ_PATH, get(ops::readyz))
        .route(&cfg.metrics.path, get(ops::metrics));

    let router = mount_fallback(router, &state, ROOT_PATH, OkHandler);
    let router = mount(router, &state, SLOW_PATH, slow_handler);
    let router = mount(router, &state, ERROR_PATH, error_handler);

    router.with_state(state)
}

/// Wrap `handler` under `path` and bind it to the same `path`.
pub fn mount<H: RouteHandler>(
    router: Router<AppState>,
    state: &AppState,
    path: &str,
    handler: H,
) -> Router<AppState> {
    let wrapped = instrument(state, path, handler);
    router.route(
        path,
        any(move |req: Request| {
            let wrapped = Arc::clone(&wrapped);
            async move { wrapped.call(req).await }
        }),
    )
}

/// Wrap `handler` under `label` and answer every unrouted path with it.
pub fn mount_fallback<H: RouteHandler>(
    router: Router<AppState>,
    state: &AppState,
    label: &str,
    handler: H,
) -> Router<AppState> {
    let wrapped = instrument(state, label, handler);
    router.fallback(move |req: Request| {
        let wrapped = Arc::clone(&wrapped);
        async move { wrapped.call(req).await }
    })
}

fn instrument<H: RouteHandler>(state: &AppState, route: &str, handler: H) -> Arc<Instrumented<H>> {
    Arc::new(
        Instrumented::new(route, handler, state.metrics())
            .with_error_accounting(state.cfg().metrics.error_accounting),
    )
}
