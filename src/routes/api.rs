//! Generic API routes: every method, any depth, one handler.

use crate::handlers::dispatch;
use crate::state::AppState;
use axum::{routing::any, Router};

pub fn api_routes(state: AppState) -> Router {
    Router::new()
        .route("/", any(dispatch))
        .route("/*path", any(dispatch))
        .with_state(state)
}
