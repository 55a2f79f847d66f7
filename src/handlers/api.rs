//! The single handler behind every route under the API prefix.

use crate::error::AppError;
use crate::extractors::ApiRoute;
use crate::response::Outcome;
use crate::service::Dispatcher;
use crate::state::AppState;
use axum::{
    body::Bytes,
    extract::{Query, State},
};

pub async fn dispatch(
    State(state): State<AppState>,
    route: ApiRoute,
    Query(params): Query<Vec<(String, String)>>,
    body: Bytes,
) -> Result<Outcome, AppError> {
    tracing::debug!(verb = ?route.verb, shape = ?route.shape, "api request");
    let request = route.into_request(params)?;
    Dispatcher::new(&state.registry, state.store.as_ref())
        .dispatch(request, &body)
        .await
}
