use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use pubsub_model::doc::SubscriptionSetDoc;
use pubsub_model::{combine, derive, documents_equivalent, from_doc, AccessKey, CombinedSubscriptionSet, DeriveOutcome, Location, Subscription, SubscriptionSet};
use pubsub_uri::Uri;
use tokio::sync::{broadcast, Notify, RwLock};
use tracing::{debug, info, warn};

use crate::error::RegistryError;

/// The outcome of [`Registry::replace`].
pub enum ReplaceOutcome {
    Replaced(SubscriptionSet),
    NotModified(SubscriptionSet),
}

struct Inner {
    sets: HashMap<Location, SubscriptionSet>,
    by_owner: HashMap<Uri, Vec<Location>>,
    combined: CombinedSubscriptionSet,
    failures: HashMap<Location, u32>,
    /// Peer URI -> the local location holding that peer's most recent
    /// pushed combined set, for [`Registry::ingest_downstream`].
    downstream: HashMap<Uri, Location>,
}

/// The subscription registry: owner of every registered [`SubscriptionSet`]
/// and of the derived [`CombinedSubscriptionSet`] used as the dispatch
/// table. Mutations take a single write lock held only long enough to
/// update local maps -- never across an outbound send; recomputing the
/// combined set happens on a dedicated background task so a burst of
/// mutations coalesces into one recompute.
#[derive(Clone)]
pub struct Registry {
    inner: Arc<RwLock<Inner>>,
    service_uri: Uri,
    default_cookie: Option<String>,
    recompute_notify: Arc<Notify>,
    updated_tx: broadcast::Sender<()>,
}

impl Registry {
    /// Builds an empty registry and starts its background recompute task.
    /// `service_uri` is this instance's own canonical URI, used both as
    /// the combined set's nominal owner and for the dispatch loop check.
    pub fn new(service_uri: Uri, default_cookie: Option<String>) -> Self {
        let inner = Arc::new(RwLock::new(Inner {
            sets: HashMap::new(),
            by_owner: HashMap::new(),
            combined: combine(std::iter::empty(), service_uri.clone(), default_cookie.as_deref()),
            failures: HashMap::new(),
            downstream: HashMap::new(),
        }));
        let recompute_notify = Arc::new(Notify::new());
        let (updated_tx, _) = broadcast::channel(64);

        tokio::spawn(recompute_loop(
            inner.clone(),
            recompute_notify.clone(),
            service_uri.clone(),
            default_cookie.clone(),
            updated_tx.clone(),
        ));

        Self {
            inner,
            service_uri,
            default_cookie,
            recompute_notify,
            updated_tx,
        }
    }

    pub fn service_uri(&self) -> &Uri {
        &self.service_uri
    }

    /// Subscribes to `combined_set_updated` notifications. Each recompute
    /// that actually runs sends exactly one signal.
    pub fn subscribe_updates(&self) -> broadcast::Receiver<()> {
        self.updated_tx.subscribe()
    }

    /// Registers a brand-new subscription-set document. If an existing
    /// set from the same owner normalizes to the same document, that set
    /// is returned unchanged with `already_existed = true` (the caller
    /// maps this to `409 Conflict`). Otherwise a fresh location and
    /// access key are assigned.
    pub async fn register(&self, doc: SubscriptionSetDoc) -> Result<(SubscriptionSet, bool), RegistryError> {
        {
            let inner = self.inner.read().await;
            if let Some(locations) = inner.by_owner.get(&doc.owner) {
                for location in locations {
                    if let Some(existing) = inner.sets.get(location) {
                        if documents_equivalent(&existing.as_doc(), &doc) {
                            return Ok((existing.clone(), true));
                        }
                    }
                }
            }
        }

        let set = from_doc(doc)?;
        let mut inner = self.inner.write().await;
        inner.by_owner.entry(set.owner.clone()).or_default().push(set.location.clone());
        inner.sets.insert(set.location.clone(), set.clone());
        drop(inner);
        self.recompute_notify.notify_one();
        info!(location = %set.location, owner = %set.owner, "subscription set registered");
        Ok((set, false))
    }

    /// Replaces the set at `location`, provided `access_key` matches.
    pub async fn replace(&self, location: &Location, access_key: &str, doc: SubscriptionSetDoc) -> Result<ReplaceOutcome, RegistryError> {
        let mut inner = self.inner.write().await;
        let prev = inner.sets.get(location).ok_or(RegistryError::Forbidden)?;
        if prev.access_key.as_str() != access_key {
            return Err(RegistryError::Forbidden);
        }
        match derive(prev, doc) {
            Ok(DeriveOutcome::Replaced(next)) => {
                inner.sets.insert(location.clone(), next.clone());
                drop(inner);
                self.recompute_notify.notify_one();
                debug!(%location, "subscription set replaced");
                Ok(ReplaceOutcome::Replaced(next))
            }
            Ok(DeriveOutcome::NotModified(current)) => Ok(ReplaceOutcome::NotModified(current)),
            Err(pubsub_model::ModelError::OwnerMismatch { .. }) => Err(RegistryError::OwnerMismatch),
            Err(other) => Err(RegistryError::Malformed(other)),
        }
    }

    /// Removes the set at `location`, provided `access_key` matches.
    pub async fn remove(&self, location: &Location, access_key: &str) -> Result<(), RegistryError> {
        let mut inner = self.inner.write().await;
        let matches = inner.sets.get(location).is_some_and(|s| s.access_key.as_str() == access_key);
        if !matches {
            return Err(RegistryError::Forbidden);
        }
        if let Some(set) = inner.sets.remove(location) {
            if let Some(locations) = inner.by_owner.get_mut(&set.owner) {
                locations.retain(|l| l != location);
            }
        }
        inner.failures.remove(location);
        drop(inner);
        self.recompute_notify.notify_one();
        info!(%location, "subscription set removed");
        Ok(())
    }

    /// Returns the set at `location`, provided `access_key` matches.
    pub async fn get(&self, location: &Location, access_key: &str) -> Result<SubscriptionSet, RegistryError> {
        let inner = self.inner.read().await;
        inner
            .sets
            .get(location)
            .filter(|s| s.access_key.as_str() == access_key)
            .cloned()
            .ok_or(RegistryError::Forbidden)
    }

    /// The current combined (dispatch-table) view. Unauthenticated --
    /// this is the server-side view returned by `GET /subscribers`.
    pub async fn combined_set(&self) -> CombinedSubscriptionSet {
        self.inner.read().await.combined.clone()
    }

    /// A diagnostics snapshot of every registered set, for `GET
    /// /diagnostics/subscriptions`. Access keys are never included.
    pub async fn snapshot(&self) -> Vec<SubscriptionSetDoc> {
        self.inner
            .read()
            .await
            .sets
            .values()
            .map(|set| {
                let mut doc = set.as_doc();
                doc.access_key = None;
                doc
            })
            .collect()
    }

    /// Merges a combined-set document pushed by an upstream peer into the
    /// local registry, rooted at whatever location this peer's prior
    /// pushes landed at (a fresh one on the first push). `peer` is forced
    /// as the owner regardless of what the document claims, since the
    /// provenance is the transport layer (the peer that POSTed to us),
    /// not the document body.
    ///
    /// Unlike [`Registry::register`]/[`Registry::replace`], this path is
    /// reached only from the propagation protocol, never directly from a
    /// public caller, so it bypasses the access-key capability check and
    /// tolerates an empty subscription list (a peer with no subscribers
    /// yet still pushes a valid, empty combined set).
    pub async fn ingest_downstream(&self, peer: Uri, mut doc: SubscriptionSetDoc) -> Location {
        doc.owner = peer.clone();
        let subscriptions: Vec<Subscription> = doc.subscriptions.into_iter().filter_map(|d| Subscription::from_doc(d).ok()).collect();

        let mut inner = self.inner.write().await;
        let location = match inner.downstream.get(&peer).cloned() {
            Some(location) => {
                if let Some(prev) = inner.sets.get(&location) {
                    let next = SubscriptionSet {
                        owner: peer.clone(),
                        location: prev.location.clone(),
                        access_key: prev.access_key.clone(),
                        version: doc.version,
                        max_failures: doc.max_failures.unwrap_or(prev.max_failures),
                        subscriptions,
                    };
                    inner.sets.insert(location.clone(), next);
                }
                location
            }
            None => {
                let set = SubscriptionSet {
                    owner: peer.clone(),
                    location: Location::generate(),
                    access_key: AccessKey::generate(),
                    version: doc.version,
                    max_failures: doc.max_failures.unwrap_or(0),
                    subscriptions,
                };
                let location = set.location.clone();
                inner.by_owner.entry(peer.clone()).or_default().push(location.clone());
                inner.sets.insert(location.clone(), set);
                inner.downstream.insert(peer, location.clone());
                location
            }
        };
        drop(inner);
        self.recompute_notify.notify_one();
        location
    }

    /// Records the outcome of an outbound send against every location
    /// that contributed a subscription to it. Returns the locations
    /// evicted as a result (exceeded their own `max_failures`).
    pub(crate) async fn record_send_outcome(&self, locations: &[Location], success: bool) -> Vec<Location> {
        let mut inner = self.inner.write().await;
        let mut evicted = Vec::new();
        for location in locations {
            let Some(max_failures) = inner.sets.get(location).map(|s| s.max_failures) else {
                continue;
            };
            if success {
                inner.failures.insert(location.clone(), 0);
            } else {
                let counter = inner.failures.entry(location.clone()).or_insert(0);
                *counter += 1;
                if *counter > max_failures {
                    evicted.push(location.clone());
                }
            }
        }
        for location in &evicted {
            if let Some(set) = inner.sets.remove(location) {
                if let Some(owned) = inner.by_owner.get_mut(&set.owner) {
                    owned.retain(|l| l != location);
                }
            }
            inner.failures.remove(location);
            warn!(%location, "subscription set evicted after exceeding max-failures");
        }
        drop(inner);
        if !evicted.is_empty() {
            self.recompute_notify.notify_one();
        }
        evicted
    }

    /// The destinations subscribed to the meta-channel (`pubsub://*/*`),
    /// gathered from the raw per-owner sets rather than the combined set --
    /// [`combine`] drops `pubsub`-scheme subscriptions from its output, so
    /// this is the only place the propagation protocol can find them.
    pub async fn meta_channel_destinations(&self) -> Vec<MetaDestination> {
        let inner = self.inner.read().await;
        let mut groups: HashMap<Uri, (BTreeSet<String>, Vec<Location>)> = HashMap::new();
        for set in inner.sets.values() {
            for sub in &set.subscriptions {
                if !sub.channels.iter().any(|c| c.scheme.eq_ignore_ascii_case("pubsub")) {
                    continue;
                }
                let destination = sub
                    .proxy
                    .clone()
                    .or_else(|| sub.recipients.first().map(|r| r.uri.clone()))
                    .unwrap_or_else(|| set.owner.clone());
                let entry = groups.entry(destination).or_insert_with(|| (BTreeSet::new(), Vec::new()));
                entry.0.extend(sub.cookies.iter().cloned());
                if !entry.1.contains(&set.location) {
                    entry.1.push(set.location.clone());
                }
            }
        }
        groups
            .into_iter()
            .map(|(destination, (cookies, source_locations))| MetaDestination {
                destination,
                cookie: if cookies.is_empty() { None } else { Some(cookies.into_iter().collect::<Vec<_>>().join("; ")) },
                source_locations,
            })
            .collect()
    }
}

/// One peer subscribed to the meta-channel, with the locations whose
/// subscriptions contributed to that destination -- so a push failure can
/// be charged against the same failure accounting as ordinary deliveries.
#[derive(Debug, Clone)]
pub struct MetaDestination {
    pub destination: Uri,
    pub cookie: Option<String>,
    pub source_locations: Vec<Location>,
}

async fn recompute_loop(
    inner: Arc<RwLock<Inner>>,
    notify: Arc<Notify>,
    service_uri: Uri,
    default_cookie: Option<String>,
    updated_tx: broadcast::Sender<()>,
) {
    loop {
        notify.notified().await;
        let snapshot: Vec<SubscriptionSet> = inner.read().await.sets.values().cloned().collect();
        let combined = combine(&snapshot, service_uri.clone(), default_cookie.as_deref());
        inner.write().await.combined = combined;
        let _ = updated_tx.send(());
    }
}
