//! Shared test doubles and document builders for the pubsub crates: a
//! recording [`pubsub_registry::Transport`] double, and small builders
//! for the subscription-set and event values most tests need.
//!
//! Kept as its own crate so `pubsub-registry` and `pubsub-server`'s
//! test modules don't each hand-roll their own copy.

use std::sync::Mutex as StdMutex;

use async_trait::async_trait;
use pubsub_model::doc::{RecipientDoc, SubscriptionDoc, SubscriptionSetDoc};
use pubsub_model::{Event, Payload};
use pubsub_registry::{Transport, TransportError};
use pubsub_uri::Uri;

/// Parses a URI literal, panicking on malformed input -- only meant for
/// test fixtures where the string is known-good.
pub fn uri(s: &str) -> Uri {
    s.parse().unwrap_or_else(|e| panic!("invalid test uri {s:?}: {e}"))
}

/// Builds a minimal single-subscription document: one channel, one
/// recipient, no cookies or proxy. Good enough for the common case;
/// callers needing more set the extra fields on the returned value.
pub fn subscription_set_doc(owner: &str, channel: &str, recipient: &str) -> SubscriptionSetDoc {
    SubscriptionSetDoc {
        max_failures: None,
        version: None,
        owner: uri(owner),
        subscriptions: vec![SubscriptionDoc {
            id: None,
            channels: vec![uri(channel)],
            resources: vec![],
            proxy: None,
            cookies: vec![],
            recipients: vec![RecipientDoc { auth_token: None, uri: uri(recipient) }],
        }],
        access_key: None,
        location: None,
    }
}

/// A minimal event on `channel`, originating from `origin`, with an
/// `application/xml` payload.
pub fn sample_event(channel: &str, origin: &str, body: &'static [u8]) -> Event {
    Event::new(Some("evt-test".to_owned()), uri(channel), vec![uri(origin)], vec![], vec![], Payload::new(Some("application/xml".to_owned()), bytes::Bytes::from_static(body)))
}

/// A [`Transport`] double that records every call it receives and
/// replays a queue of canned responses (defaulting to `Ok(200)` once
/// the queue is drained).
pub struct RecordingTransport {
    responses: StdMutex<Vec<Result<u16, TransportError>>>,
    calls: StdMutex<Vec<(Uri, Option<String>)>>,
}

impl RecordingTransport {
    pub fn new(responses: Vec<Result<u16, TransportError>>) -> Self {
        Self { responses: StdMutex::new(responses), calls: StdMutex::new(Vec::new()) }
    }

    pub fn calls(&self) -> Vec<(Uri, Option<String>)> {
        self.calls.lock().unwrap().clone()
    }
}

impl Default for RecordingTransport {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

#[async_trait]
impl Transport for RecordingTransport {
    async fn send(&self, destination: &Uri, _event: &Event, cookie: Option<&str>) -> Result<u16, TransportError> {
        self.calls.lock().unwrap().push((destination.clone(), cookie.map(str::to_owned)));
        let mut responses = self.responses.lock().unwrap();
        if responses.is_empty() {
            Ok(200)
        } else {
            responses.remove(0)
        }
    }
}
