use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use bytes::Bytes;
use pubsub_registry::RegistryError;

use crate::http::response::{self, HttpResponse};
use crate::state::AppState;

/// `POST /publish` -- ingest and dispatch an event. Publishing to a
/// `pubsub`-scheme channel is always forbidden: those channels name
/// combined-set propagation, not application data (see
/// [`pubsub_registry::propagation`]).
pub async fn post_publish(State(state): State<AppState>, headers: HeaderMap, body: Bytes) -> HttpResponse {
    let event = match pubsub_wire::decode_event(&headers, body) {
        Ok(event) => event,
        Err(err) => return response::wire_error(err),
    };

    if event.channel.scheme.eq_ignore_ascii_case("pubsub") {
        return response::registry_error(RegistryError::MetaChannelPublish);
    }

    let combined = state.registry.combined_set().await;
    match pubsub_registry::dispatch(state.registry.clone(), state.transport.clone(), combined, event, state.dispatch_config.clone()).await {
        Ok(()) => StatusCode::ACCEPTED.into_response(),
        Err(err) => response::registry_error(err),
    }
}
