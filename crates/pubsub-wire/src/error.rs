use pubsub_uri::UriError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised while moving a domain value across the wire boundary:
/// decoding a request body, building outbound headers, or parsing
/// inbound ones.
#[derive(Debug, Error)]
pub enum WireError {
    #[error("malformed {0}: {1}")]
    MalformedUri(String, UriError),

    #[error("invalid subscription-set xml: {0}")]
    Xml(#[from] quick_xml::DeError),

    #[error("invalid subscription-set json: {0}")]
    Json(#[from] serde_json::Error),

    #[error("missing required header {0}")]
    MissingHeader(&'static str),

    #[error("header {0} is not valid utf-8")]
    NonUtf8Header(&'static str),

    #[error("malformed header {0}: {1}")]
    MalformedHeader(&'static str, UriError),
}

/// The envelope every REST error response carries: a stable machine
/// code, a human message, and an optional structured detail blob.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorEnvelope {
    pub code: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ErrorEnvelope {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self { code: code.into(), message: message.into(), details: None }
    }

    pub fn with_details(code: impl Into<String>, message: impl Into<String>, details: serde_json::Value) -> Self {
        Self { code: code.into(), message: message.into(), details: Some(details) }
    }
}
