use async_trait::async_trait;
use pubsub_model::Event;
use pubsub_uri::Uri;

use crate::dispatch::{Transport, TransportError};

/// The production [`Transport`]: a plain `reqwest::Client` POSTing the
/// event's payload bytes with its `Dream-Event-*` headers attached.
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

impl Default for ReqwestTransport {
    fn default() -> Self {
        Self::new(reqwest::Client::new())
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, destination: &Uri, event: &Event, cookie: Option<&str>) -> Result<u16, TransportError> {
        let headers = pubsub_wire::encode_headers(event).map_err(|e| TransportError::Request(e.to_string()))?;
        let mut request = self.client.post(destination.to_string()).headers(headers).body(event.payload.bytes.clone());
        if let Some(cookie) = cookie {
            request = request.header(reqwest::header::COOKIE, cookie);
        }
        let response = request.send().await.map_err(|e| TransportError::Request(e.to_string()))?;
        Ok(response.status().as_u16())
    }
}
