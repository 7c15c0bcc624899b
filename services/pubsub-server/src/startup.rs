//! Propagation bootstrap: self-subscribe to configured upstream peers at
//! startup, then keep pushing the combined set to every meta-channel
//! subscriber as it changes (see [`pubsub_registry::propagation`]).

use pubsub_registry::{push_combined_set, subscribe_upstream, DispatchConfig};
use pubsub_uri::Uri;
use tracing::info;

use crate::state::AppState;

/// Sends this service's self-subscription to every configured upstream
/// peer. Run once, at startup, before the listener accepts traffic isn't
/// required -- peers that are briefly unreachable catch up once they
/// themselves push (or once this service retries on a future restart).
pub async fn self_subscribe_to_upstream_peers(state: &AppState, peers: &[Uri]) {
    for peer in peers {
        info!(%peer, "self-subscribing to upstream peer");
        subscribe_upstream(&state.http_client, state.registry.service_uri(), &state.subscribers_uri, peer).await;
    }
}

/// Spawns the background task that reacts to `combined_set_updated` by
/// pushing the current combined set to every meta-channel subscriber.
pub fn spawn_upstream_push_reactor(state: AppState, dispatch_config: DispatchConfig) {
    let mut updates = state.registry.subscribe_updates();
    tokio::spawn(async move {
        loop {
            match updates.recv().await {
                Ok(()) => {
                    push_combined_set(state.registry.clone(), state.transport.clone(), dispatch_config.clone()).await;
                }
                Err(tokio::sync::broadcast::error::RecvError::Lagged(_)) => continue,
                Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
            }
        }
    });
}
