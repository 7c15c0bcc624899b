use bytes::Bytes;
use pubsub_uri::Uri;
use uuid::Uuid;

/// An immutable event message. `payload` is opaque to the core: the
/// dispatcher never inspects it, only replays it verbatim to every
/// matching destination.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    pub id: String,
    pub channel: Uri,
    pub origins: Vec<Uri>,
    pub recipients: Vec<Uri>,
    pub via: Vec<Uri>,
    pub payload: Payload,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Payload {
    pub content_type: Option<String>,
    pub bytes: Bytes,
}

impl Payload {
    pub fn new(content_type: Option<String>, bytes: impl Into<Bytes>) -> Self {
        Self {
            content_type,
            bytes: bytes.into(),
        }
    }
}

impl Event {
    /// Builds an event, generating an id when the caller doesn't supply
    /// one. `origins` must be non-empty per the data model.
    pub fn new(
        id: Option<String>,
        channel: Uri,
        origins: Vec<Uri>,
        recipients: Vec<Uri>,
        via: Vec<Uri>,
        payload: Payload,
    ) -> Self {
        Self {
            id: id.filter(|s| !s.is_empty()).unwrap_or_else(|| Uuid::new_v4().to_string()),
            channel,
            origins,
            recipients,
            via,
            payload,
        }
    }

    /// Returns a clone of this event with `service` appended to `via`.
    /// Used by the delivery engine to mark the traversal trail before a
    /// send, and by [`Event::has_visited`] for the loop check.
    pub fn with_via(&self, service: &Uri) -> Event {
        let mut via = self.via.clone();
        via.push(service.clone());
        Event {
            via,
            ..self.clone()
        }
    }

    /// `true` if `service` already appears in this event's `via` chain --
    /// the loop-prevention check run before dispatch.
    pub fn has_visited(&self, service: &Uri) -> bool {
        self.via.iter().any(|v| pubsub_uri::matches_strict(v, service))
    }
}
