//! Router assembly.

pub mod api;
pub mod common;

pub use api::api_routes;
pub use common::common_routes_with_ready;

use crate::config::Settings;
use crate::state::AppState;
use axum::Router;
use tower_http::limit::RequestBodyLimitLayer;

/// Probes at the root, the generic API under `/{api_prefix}`.
pub fn app(state: AppState, settings: &Settings) -> Router {
    Router::new()
        .merge(common_routes_with_ready(state.clone()))
        .nest(&format!("/{}", settings.api_prefix), api_routes(state))
        .layer(RequestBodyLimitLayer::new(settings.max_body_bytes))
}
