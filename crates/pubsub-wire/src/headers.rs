//! Event metadata travels as headers on a `POST .../publish` request; the
//! body is the raw payload bytes, untouched. This mirrors the host
//! framework's own header-carried-metadata convention for binary bodies.

use http::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE};
use pubsub_model::{Event, Payload};

use crate::WireError;

pub static EVENT_ID: HeaderName = HeaderName::from_static("dream-event-id");
pub static EVENT_CHANNEL: HeaderName = HeaderName::from_static("dream-event-channel");
pub static EVENT_ORIGIN: HeaderName = HeaderName::from_static("dream-event-origin");
pub static EVENT_RECIPIENTS: HeaderName = HeaderName::from_static("dream-event-recipients");
pub static EVENT_VIA: HeaderName = HeaderName::from_static("dream-event-via");

/// Builds the outbound header set for `event`, excluding the payload
/// (the caller sends that as the request body).
pub fn encode_headers(event: &Event) -> Result<HeaderMap, WireError> {
    let mut headers = HeaderMap::new();
    headers.insert(EVENT_ID.clone(), HeaderValue::from_str(&event.id).map_err(|_| WireError::NonUtf8Header("dream-event-id"))?);
    headers.insert(
        EVENT_CHANNEL.clone(),
        HeaderValue::from_str(&event.channel.to_string()).map_err(|_| WireError::NonUtf8Header("dream-event-channel"))?,
    );
    for origin in &event.origins {
        headers.append(
            EVENT_ORIGIN.clone(),
            HeaderValue::from_str(&origin.to_string()).map_err(|_| WireError::NonUtf8Header("dream-event-origin"))?,
        );
    }
    for recipient in &event.recipients {
        headers.append(
            EVENT_RECIPIENTS.clone(),
            HeaderValue::from_str(&recipient.to_string()).map_err(|_| WireError::NonUtf8Header("dream-event-recipients"))?,
        );
    }
    for hop in &event.via {
        headers.append(
            EVENT_VIA.clone(),
            HeaderValue::from_str(&hop.to_string()).map_err(|_| WireError::NonUtf8Header("dream-event-via"))?,
        );
    }
    if let Some(content_type) = &event.payload.content_type {
        headers.insert(CONTENT_TYPE, HeaderValue::from_str(content_type).map_err(|_| WireError::NonUtf8Header("content-type"))?);
    }
    Ok(headers)
}

/// Reconstructs an [`Event`] from inbound headers and body bytes.
/// `dream-event-channel` is the only header this rejects the request
/// for when missing; the rest default to empty.
pub fn decode_event(headers: &HeaderMap, body: bytes::Bytes) -> Result<Event, WireError> {
    let id = header_str(headers, &EVENT_ID, "dream-event-id")?.map(str::to_owned);
    let channel_str = header_str(headers, &EVENT_CHANNEL, "dream-event-channel")?.ok_or(WireError::MissingHeader("dream-event-channel"))?;
    let channel = channel_str.parse().map_err(|e| WireError::MalformedHeader("dream-event-channel", e))?;

    let origins = header_uris(headers, &EVENT_ORIGIN, "dream-event-origin")?;
    let recipients = header_uris(headers, &EVENT_RECIPIENTS, "dream-event-recipients")?;
    let via = header_uris(headers, &EVENT_VIA, "dream-event-via")?;
    let content_type = headers
        .get(CONTENT_TYPE)
        .map(|v| v.to_str().map(str::to_owned).map_err(|_| WireError::NonUtf8Header("content-type")))
        .transpose()?;

    Ok(Event::new(id, channel, origins, recipients, via, Payload::new(content_type, body)))
}

fn header_str<'a>(headers: &'a HeaderMap, name: &HeaderName, label: &'static str) -> Result<Option<&'a str>, WireError> {
    headers.get(name).map(|v| v.to_str().map_err(|_| WireError::NonUtf8Header(label))).transpose()
}

fn header_uris(headers: &HeaderMap, name: &HeaderName, label: &'static str) -> Result<Vec<pubsub_uri::Uri>, WireError> {
    headers
        .get_all(name)
        .into_iter()
        .map(|v| {
            let s = v.to_str().map_err(|_| WireError::NonUtf8Header(label))?;
            s.parse().map_err(|e| WireError::MalformedHeader(label, e))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn uri(s: &str) -> pubsub_uri::Uri {
        s.parse().unwrap()
    }

    fn sample_event() -> Event {
        Event::new(
            Some("evt-1".to_owned()),
            uri("channel:///foo/bar"),
            vec![uri("http://foobar.com/page")],
            vec![uri("http://test.com/sub1"), uri("http://test.com/sub2")],
            vec![uri("http://upstream.local/")],
            Payload::new(Some("application/xml".to_owned()), bytes::Bytes::from_static(b"<foo/>")),
        )
    }

    #[test]
    fn round_trips_event_through_headers() {
        let event = sample_event();
        let headers = encode_headers(&event).unwrap();
        let decoded = decode_event(&headers, event.payload.bytes.clone()).unwrap();
        assert_eq!(decoded, event);
    }

    #[test]
    fn missing_channel_header_is_rejected() {
        let headers = HeaderMap::new();
        assert!(decode_event(&headers, bytes::Bytes::new()).is_err());
    }

    #[test]
    fn repeatable_headers_preserve_order() {
        let event = sample_event();
        let headers = encode_headers(&event).unwrap();
        let recipients: Vec<_> = headers.get_all(&EVENT_RECIPIENTS).into_iter().map(|v| v.to_str().unwrap()).collect();
        assert_eq!(recipients, vec!["http://test.com/sub1", "http://test.com/sub2"]);
    }
}
