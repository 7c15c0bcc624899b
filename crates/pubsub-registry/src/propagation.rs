use std::sync::Arc;

use pubsub_model::doc::{RecipientDoc, SubscriptionDoc, SubscriptionSetDoc};
use pubsub_model::Payload;
use pubsub_uri::Uri;
use tracing::{debug, warn};

use crate::dispatch::{send_with_retry, DeliveryGroup, DispatchConfig, Transport};
use crate::registry::Registry;

/// The well-known channel every downstream self-subscription uses to ask
/// an upstream peer for its combined set: matches every channel, on every
/// host.
pub const META_CHANNEL: &str = "pubsub://*/*";

fn meta_channel_uri() -> Uri {
    META_CHANNEL.parse().expect("META_CHANNEL is a valid uri literal")
}

/// Builds the self-subscription document a service POSTs to an upstream
/// peer at startup: one subscription to the meta-channel, recipient is
/// this service's own `/subscribers` endpoint.
pub fn self_subscription_doc(service_uri: &Uri, subscribers_uri: &Uri) -> SubscriptionSetDoc {
    SubscriptionSetDoc {
        max_failures: None,
        version: None,
        owner: service_uri.clone(),
        subscriptions: vec![SubscriptionDoc {
            id: None,
            channels: vec![meta_channel_uri()],
            resources: vec![],
            proxy: None,
            cookies: vec![],
            recipients: vec![RecipientDoc {
                auth_token: None,
                uri: subscribers_uri.clone(),
            }],
        }],
        access_key: None,
        location: None,
    }
}

/// Sends this service's self-subscription document to `peer`'s
/// `/subscribers` endpoint. Run once per configured upstream peer at
/// startup; failures are logged and otherwise ignored -- a peer that is
/// unreachable at boot still receives pushes later once its combined set
/// eventually changes and the retrying delivery engine catches up, so
/// there is nothing useful to retry here beyond the one attempt.
pub async fn subscribe_upstream(client: &reqwest::Client, service_uri: &Uri, subscribers_uri: &Uri, peer: &Uri) {
    let doc = self_subscription_doc(service_uri, subscribers_uri);
    let body = match pubsub_wire::encode_subscription_set(&doc) {
        Ok(body) => body,
        Err(err) => {
            warn!(%peer, %err, "failed to encode self-subscription document");
            return;
        }
    };
    match client.post(peer.to_string()).header(reqwest::header::CONTENT_TYPE, "application/xml").body(body).send().await {
        Ok(response) if response.status().is_success() => {
            debug!(%peer, "sent self-subscription to upstream peer");
        }
        Ok(response) => warn!(%peer, status = %response.status(), "upstream peer rejected self-subscription"),
        Err(err) => warn!(%peer, %err, "failed to reach upstream peer for self-subscription"),
    }
}

/// Pushes the current combined set to every destination subscribed to the
/// meta-channel, using the same retry policy and failure accounting as an
/// ordinary event delivery (see [`crate::dispatch`]). Fire-and-forget: one
/// task per destination.
pub async fn push_combined_set(registry: Registry, transport: Arc<dyn Transport>, config: DispatchConfig) {
    let combined = registry.combined_set().await;
    let doc = combined.as_doc();
    let body = match pubsub_wire::encode_subscription_set(&doc) {
        Ok(body) => body,
        Err(err) => {
            warn!(%err, "failed to encode combined set for meta-channel push");
            return;
        }
    };

    for destination in registry.meta_channel_destinations().await {
        let registry = registry.clone();
        let transport = transport.clone();
        let config = config.clone();
        let payload = Payload::new(Some("application/xml".to_owned()), body.clone());
        let event = pubsub_model::Event::new(None, meta_channel_uri(), vec![registry.service_uri().clone()], vec![destination.destination.clone()], vec![], payload);
        let group = DeliveryGroup {
            destination: destination.destination.clone(),
            event,
            cookie: destination.cookie.clone(),
            source_locations: destination.source_locations.clone(),
        };
        tokio::spawn(async move {
            let success = send_with_retry(transport.as_ref(), &group, &config).await;
            let evicted = registry.record_send_outcome(&group.source_locations, success).await;
            if !evicted.is_empty() {
                debug!(destination = %group.destination, ?evicted, "meta-channel subscribers evicted after push failures");
            }
        });
    }
}
