use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;

use crate::http::response::HttpResponse;
use crate::state::AppState;

/// `GET /diagnostics/subscriptions` -- a snapshot of every registered set,
/// for observability. Access keys are never included (see
/// [`pubsub_model::SubscriptionSet::as_doc`]... the registry's snapshot
/// strips them before this handler ever sees them).
pub async fn list_subscriptions(State(state): State<AppState>) -> HttpResponse {
    Json(state.registry.snapshot().await).into_response()
}
