use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use pubsub_registry::RegistryError;
use pubsub_wire::{ErrorEnvelope, WireError};

pub type HttpResponse = Response;

pub(crate) fn json_error(status: StatusCode, code: impl Into<String>, message: impl Into<String>) -> HttpResponse {
    (status, Json(ErrorEnvelope::new(code, message))).into_response()
}

pub fn bad_request(message: impl Into<String>) -> HttpResponse {
    json_error(StatusCode::BAD_REQUEST, "BAD_REQUEST", message)
}

pub fn forbidden(message: impl Into<String>) -> HttpResponse {
    json_error(StatusCode::FORBIDDEN, "FORBIDDEN", message)
}

pub fn conflict(message: impl Into<String>) -> HttpResponse {
    json_error(StatusCode::CONFLICT, "CONFLICT", message)
}

/// Maps a [`RegistryError`] onto the REST surface's error contract (see
/// the error-kind table in the design notes): `MalformedDoc` -> 400,
/// everything else that can propagate out of the registry -> 403.
pub fn registry_error(err: RegistryError) -> HttpResponse {
    match err {
        RegistryError::Malformed(e) => bad_request(e.to_string()),
        RegistryError::Forbidden | RegistryError::OwnerMismatch | RegistryError::MetaChannelPublish => forbidden(err.to_string()),
        RegistryError::Loop => bad_request(err.to_string()),
    }
}

pub fn wire_error(err: WireError) -> HttpResponse {
    bad_request(err.to_string())
}
