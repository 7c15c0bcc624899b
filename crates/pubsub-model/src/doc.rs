//! The subscription-set "document": a serialization-agnostic mirror of
//! the logical tree in the wire format (see the pubsub-wire crate for the
//! actual XML encoding). `from_doc`/`derive` consume these; `as_doc`
//! produces them back out for a response.

use pubsub_uri::Uri;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriptionSetDoc {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_failures: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<i64>,
    pub owner: Uri,
    #[serde(default)]
    pub subscriptions: Vec<SubscriptionDoc>,
    /// Present only on a server response, never accepted on input.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<Uri>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriptionDoc {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub channels: Vec<Uri>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub resources: Vec<Uri>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proxy: Option<Uri>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub cookies: Vec<String>,
    pub recipients: Vec<RecipientDoc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecipientDoc {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth_token: Option<String>,
    pub uri: Uri,
}
