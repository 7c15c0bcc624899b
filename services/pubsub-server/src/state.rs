use std::collections::HashSet;
use std::sync::Arc;

use pubsub_registry::{DispatchConfig, ReqwestTransport, Transport};
use pubsub_uri::Uri;

/// The server's shared application state, passed to every handler via
/// axum's `State` extractor.
#[derive(Clone)]
pub struct AppState {
    pub registry: pubsub_registry::Registry,
    pub transport: Arc<dyn Transport>,
    pub http_client: reqwest::Client,
    pub dispatch_config: DispatchConfig,
    pub subscribers_uri: Uri,
    /// Upstream peers this service self-subscribed to -- a combined-set
    /// push whose `owner` matches one of these is routed to
    /// [`pubsub_registry::Registry::ingest_downstream`] instead of the
    /// public `register` path.
    pub upstream_peers: HashSet<Uri>,
}

impl AppState {
    pub fn new(registry: pubsub_registry::Registry, subscribers_uri: Uri, dispatch_config: DispatchConfig, upstream_peers: HashSet<Uri>) -> Self {
        Self {
            registry,
            transport: Arc::new(ReqwestTransport::default()),
            http_client: reqwest::Client::new(),
            dispatch_config,
            subscribers_uri,
            upstream_peers,
        }
    }
}
