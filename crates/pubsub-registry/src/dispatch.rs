use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use backoff::ExponentialBackoffBuilder;
use pubsub_model::{select_candidates, CombinedSubscriptionSet, Event, Location, Recipient};
use pubsub_uri::Uri;
use tracing::{debug, warn};

use crate::error::RegistryError;
use crate::registry::Registry;

/// The delivery engine's only external dependency: a capability to send
/// a request to a URI and observe its status. Production code wires
/// [`crate::transport::ReqwestTransport`]; tests inject a recording
/// double.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, destination: &Uri, event: &Event, cookie: Option<&str>) -> Result<u16, TransportError>;
}

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("request failed: {0}")]
    Request(String),
    #[error("non-success status {0}")]
    Status(u16),
}

#[derive(Debug, Clone)]
pub struct DispatchConfig {
    /// Per-call timeout before a send is treated as a failure.
    pub send_timeout: Duration,
    /// Total wall-clock budget for retries of a single delivery group.
    pub retry_budget: Duration,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            send_timeout: Duration::from_secs(5),
            retry_budget: Duration::from_secs(10),
        }
    }
}

pub(crate) struct DeliveryGroup {
    pub(crate) destination: Uri,
    pub(crate) event: Event,
    pub(crate) cookie: Option<String>,
    pub(crate) source_locations: Vec<Location>,
}

/// Runs the delivery engine for `event` against the given combined-set
/// snapshot: the loop check, candidate selection, coalescing by
/// destination, and (fire-and-forget, one task per destination) send
/// with retry and failure accounting against `registry`.
///
/// Returns as soon as the work is enqueued -- per the concurrency model,
/// the caller does not wait for outbound sends to complete.
pub async fn dispatch(registry: Registry, transport: Arc<dyn Transport>, combined: CombinedSubscriptionSet, event: Event, config: DispatchConfig) -> Result<(), RegistryError> {
    if event.has_visited(registry.service_uri()) {
        return Err(RegistryError::Loop);
    }

    for group in group_deliveries(&combined, &event, registry.service_uri()) {
        let registry = registry.clone();
        let transport = transport.clone();
        let config = config.clone();
        tokio::spawn(async move {
            let success = send_with_retry(transport.as_ref(), &group, &config).await;
            let evicted = registry.record_send_outcome(&group.source_locations, success).await;
            if !evicted.is_empty() {
                debug!(destination = %group.destination, ?evicted, "sets evicted after delivery failures");
            }
        });
    }
    Ok(())
}

fn group_deliveries(combined: &CombinedSubscriptionSet, event: &Event, service_uri: &Uri) -> Vec<DeliveryGroup> {
    struct Accum {
        cookies: BTreeSet<String>,
        recipients: Option<Vec<Recipient>>,
        source_locations: Vec<Location>,
    }

    let mut groups: HashMap<Uri, Accum> = HashMap::new();
    for matched in select_candidates(combined, event) {
        let sub = matched.subscription;
        let accum = groups.entry(sub.destination.clone()).or_insert_with(|| Accum {
            cookies: BTreeSet::new(),
            recipients: None,
            source_locations: Vec::new(),
        });
        accum.cookies.extend(sub.cookies.iter().cloned());
        for location in &sub.source_locations {
            if !accum.source_locations.contains(location) {
                accum.source_locations.push(location.clone());
            }
        }
        if let Some(recipients) = matched.recipients {
            let merged = accum.recipients.get_or_insert_with(Vec::new);
            for recipient in recipients {
                if !merged.contains(&recipient) {
                    merged.push(recipient);
                }
            }
        }
    }

    let via_event = event.with_via(service_uri);
    groups
        .into_iter()
        .map(|(destination, accum)| {
            let recipients = accum.recipients.map(|rs| rs.into_iter().map(|r| r.uri).collect()).unwrap_or_default();
            let cookie = if accum.cookies.is_empty() { None } else { Some(accum.cookies.into_iter().collect::<Vec<_>>().join("; ")) };
            DeliveryGroup {
                destination,
                event: Event { recipients, ..via_event.clone() },
                cookie,
                source_locations: accum.source_locations,
            }
        })
        .collect()
}

pub(crate) async fn send_with_retry(transport: &dyn Transport, group: &DeliveryGroup, config: &DispatchConfig) -> bool {
    let policy = ExponentialBackoffBuilder::new().with_initial_interval(Duration::from_millis(100)).with_max_elapsed_time(Some(config.retry_budget)).build();

    let outcome = backoff::future::retry(policy, || async {
        let send = transport.send(&group.destination, &group.event, group.cookie.as_deref());
        match tokio::time::timeout(config.send_timeout, send).await {
            Ok(Ok(status)) if (200..300).contains(&status) => Ok(status),
            Ok(Ok(status)) => Err(backoff::Error::transient(TransportError::Status(status))),
            Ok(Err(err)) => Err(backoff::Error::transient(err)),
            Err(_elapsed) => Err(backoff::Error::transient(TransportError::Request("send timed out".to_owned()))),
        }
    })
    .await;

    if let Err(err) = &outcome {
        warn!(destination = %group.destination, %err, "delivery failed after exhausting retry budget");
    }
    outcome.is_ok()
}
