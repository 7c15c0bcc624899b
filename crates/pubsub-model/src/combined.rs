use std::collections::{BTreeMap, BTreeSet};

use pubsub_uri::Uri;

use crate::doc::{RecipientDoc, SubscriptionDoc, SubscriptionSetDoc};
use crate::identity::Location;
use crate::recipient::Recipient;
use crate::subscription_set::SubscriptionSet;

/// One entry of a [`CombinedSubscriptionSet`]: a single channel, its
/// resource filter, the coalesced destination, and the union of
/// recipients and cookies of every subscription that merged into it.
///
/// `source_locations` is provenance, not part of the public document --
/// it lets the dispatcher charge a failed send against every contributing
/// [`Location`]'s failure counter even though the send itself was made
/// once, to a single destination.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CombinedSubscription {
    pub channel: Uri,
    pub resources: Option<Vec<Uri>>,
    pub destination: Uri,
    pub recipients: Vec<Recipient>,
    pub cookies: BTreeSet<String>,
    pub source_locations: Vec<Location>,
}

/// The normalized, merged dispatch table produced by [`combine`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CombinedSubscriptionSet {
    pub owner: Uri,
    pub subscriptions: Vec<CombinedSubscription>,
    pub cookies: BTreeSet<String>,
}

impl CombinedSubscriptionSet {
    pub fn as_doc(&self) -> SubscriptionSetDoc {
        SubscriptionSetDoc {
            max_failures: None,
            version: None,
            owner: self.owner.clone(),
            subscriptions: self
                .subscriptions
                .iter()
                .map(|sub| SubscriptionDoc {
                    id: None,
                    channels: vec![sub.channel.clone()],
                    resources: sub.resources.clone().unwrap_or_default(),
                    proxy: None,
                    cookies: sub.cookies.iter().cloned().collect(),
                    recipients: sub
                        .recipients
                        .iter()
                        .map(|r| RecipientDoc {
                            auth_token: r.auth_token.clone(),
                            uri: r.uri.clone(),
                        })
                        .collect(),
                })
                .collect(),
            access_key: None,
            location: None,
        }
    }
}

fn publish_uri_for(owner: &Uri) -> Uri {
    let mut uri = owner.clone();
    uri.path.push("publish".to_owned());
    uri.query = None;
    uri.fragment = None;
    uri
}

#[derive(PartialEq, Eq, PartialOrd, Ord)]
struct MergeKey {
    channel: String,
    resources: Option<Vec<String>>,
    proxy: Option<String>,
}

/// An entry still under construction: recipients/cookies/provenance are
/// accumulated per [`MergeKey`] before `destination` is resolved, since
/// the owner's `.../publish` proxy URI is the same regardless of which
/// owner contributed but a non-proxied destination depends on the full,
/// merged recipient list.
struct Building {
    channel: Uri,
    resources: Option<Vec<Uri>>,
    proxy_owner: Option<Uri>,
    recipients: Vec<Recipient>,
    cookies: BTreeSet<String>,
    source_locations: Vec<Location>,
}

/// Derives the [`CombinedSubscriptionSet`] from every set currently held
/// by the registry:
///
/// 1. subscriptions with N channels are expanded into N single-channel
///    entries;
/// 2. subscriptions whose channel scheme is `pubsub` are dropped (they
///    are meta-subscriptions, not data to echo back out);
/// 3. entries sharing an identical `(channel, resources, proxy)` key have
///    their recipients merged -- `proxy` is `None` for every non-proxied
///    subscription, so those always merge regardless of their individual
///    recipients;
/// 4. once merged, a group's destination is resolved: a proxy group
///    coalesces onto its owning set's canonical `.../publish` URI, and a
///    non-proxy group's destination is its first (post-merge) recipient;
/// 5. `default_cookie`, when given, is attached to any merged entry that
///    otherwise carries no cookie at all.
///
/// `owner` becomes the combined set's own nominal owner -- this
/// registry's own service URI -- since the combined set is itself a
/// valid subscription-set document that can be handed to a peer.
pub fn combine<'a>(
    sets: impl IntoIterator<Item = &'a SubscriptionSet>,
    owner: Uri,
    default_cookie: Option<&str>,
) -> CombinedSubscriptionSet {
    let mut merged: BTreeMap<MergeKey, Building> = BTreeMap::new();

    for set in sets {
        for sub in &set.subscriptions {
            let proxy_owner = sub.proxy.as_ref().map(|_| set.owner.clone());
            let mut resources_sorted = sub.resources.clone();
            if let Some(r) = &mut resources_sorted {
                r.sort();
            }
            let resources_key = resources_sorted.as_ref().map(|rs| rs.iter().map(ToString::to_string).collect());

            for channel in &sub.channels {
                if channel.scheme.eq_ignore_ascii_case("pubsub") {
                    continue;
                }
                let key = MergeKey {
                    channel: channel.to_string(),
                    resources: resources_key.clone(),
                    proxy: proxy_owner.as_ref().map(ToString::to_string),
                };
                let entry = merged.entry(key).or_insert_with(|| Building {
                    channel: channel.clone(),
                    resources: resources_sorted.clone(),
                    proxy_owner: proxy_owner.clone(),
                    recipients: Vec::new(),
                    cookies: BTreeSet::new(),
                    source_locations: Vec::new(),
                });
                for recipient in &sub.recipients {
                    if !entry.recipients.contains(recipient) {
                        entry.recipients.push(recipient.clone());
                    }
                }
                entry.cookies.extend(sub.cookies.iter().cloned());
                if !entry.source_locations.contains(&set.location) {
                    entry.source_locations.push(set.location.clone());
                }
            }
        }
    }

    let mut subscriptions: Vec<CombinedSubscription> = merged
        .into_values()
        .map(|building| {
            let destination = match &building.proxy_owner {
                Some(owner) => publish_uri_for(owner),
                None => building.recipients.first().map(|r| r.uri.clone()).unwrap_or_else(|| owner.clone()),
            };
            CombinedSubscription {
                channel: building.channel,
                resources: building.resources,
                destination,
                recipients: building.recipients,
                cookies: building.cookies,
                source_locations: building.source_locations,
            }
        })
        .collect();
    for sub in &mut subscriptions {
        if sub.cookies.is_empty() {
            if let Some(cookie) = default_cookie {
                sub.cookies.insert(cookie.to_owned());
            }
        }
        sub.recipients.sort_by(|a, b| a.uri.cmp(&b.uri));
    }
    subscriptions.sort_by(|a, b| a.channel.cmp(&b.channel).then_with(|| a.destination.cmp(&b.destination)));

    let cookies = subscriptions.iter().flat_map(|s| s.cookies.iter().cloned()).collect();
    CombinedSubscriptionSet {
        owner,
        subscriptions,
        cookies,
    }
}
