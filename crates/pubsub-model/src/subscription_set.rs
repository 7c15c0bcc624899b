use std::collections::BTreeSet;

use pubsub_uri::Uri;

use crate::doc::SubscriptionSetDoc;
use crate::error::ModelError;
use crate::identity::{AccessKey, Location};
use crate::subscription::Subscription;

/// An owner-scoped collection of subscriptions, as stored in the
/// registry. Immutable once built: [`derive`] produces a fresh value
/// rather than mutating in place.
#[derive(Debug, Clone)]
pub struct SubscriptionSet {
    pub owner: Uri,
    pub location: Location,
    pub access_key: AccessKey,
    pub version: Option<i64>,
    pub max_failures: u32,
    pub subscriptions: Vec<Subscription>,
}

impl SubscriptionSet {
    /// The unique cookies referenced by this set's subscriptions.
    pub fn cookies(&self) -> BTreeSet<String> {
        self.subscriptions
            .iter()
            .flat_map(|s| s.cookies.iter().cloned())
            .collect()
    }

    pub fn as_doc(&self) -> SubscriptionSetDoc {
        SubscriptionSetDoc {
            max_failures: Some(self.max_failures),
            version: self.version,
            owner: self.owner.clone(),
            subscriptions: self.subscriptions.iter().map(Subscription::as_doc).collect(),
            access_key: Some(self.access_key.as_str().to_owned()),
            location: None,
        }
    }
}

fn validate_subscriptions(doc: &SubscriptionSetDoc) -> Result<(), ModelError> {
    if doc.subscriptions.is_empty() {
        return Err(ModelError::NoSubscriptions);
    }
    Ok(())
}

/// Builds a brand-new [`SubscriptionSet`] from a freshly-POSTed document,
/// assigning it a fresh [`Location`] and [`AccessKey`].
pub fn from_doc(doc: SubscriptionSetDoc) -> Result<SubscriptionSet, ModelError> {
    validate_subscriptions(&doc)?;
    let subscriptions = doc
        .subscriptions
        .into_iter()
        .map(Subscription::from_doc)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(SubscriptionSet {
        owner: doc.owner,
        location: Location::generate(),
        access_key: AccessKey::generate(),
        version: doc.version,
        max_failures: doc.max_failures.unwrap_or(0),
        subscriptions,
    })
}

/// The outcome of [`derive`]: either a brand-new value sharing `prev`'s
/// identity, or `prev` itself, unchanged, because the incoming version
/// was not newer.
pub enum DeriveOutcome {
    Replaced(SubscriptionSet),
    NotModified(SubscriptionSet),
}

/// Applies a PUT document against the previously-stored set, following
/// the replacement rule in the data model: a set with version `v_new`
/// replaces `v_old` only if `v_old` is unset, `v_new` is unset, or
/// `v_new > v_old`.
pub fn derive(prev: &SubscriptionSet, doc: SubscriptionSetDoc) -> Result<DeriveOutcome, ModelError> {
    if doc.owner != prev.owner {
        return Err(ModelError::OwnerMismatch {
            existing: prev.owner.to_string(),
            incoming: doc.owner.to_string(),
        });
    }
    if let (Some(new_version), Some(old_version)) = (doc.version, prev.version) {
        if new_version <= old_version {
            return Ok(DeriveOutcome::NotModified(prev.clone()));
        }
    }
    validate_subscriptions(&doc)?;
    let subscriptions = doc
        .subscriptions
        .into_iter()
        .map(Subscription::from_doc)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(DeriveOutcome::Replaced(SubscriptionSet {
        owner: prev.owner.clone(),
        location: prev.location.clone(),
        access_key: prev.access_key.clone(),
        version: doc.version,
        max_failures: doc.max_failures.unwrap_or(0),
        subscriptions,
    }))
}

/// A normalized fingerprint of a document's content, used by the
/// registry's register() conflict check: two documents from the same
/// owner are "the same subscription set" if they normalize to the same
/// fingerprint, independent of the order subscriptions/recipients were
/// listed in.
#[derive(Debug, PartialEq, Eq)]
struct Fingerprint {
    owner: String,
    max_failures: u32,
    version: Option<i64>,
    subscriptions: Vec<(
        Vec<String>,       // channels, sorted
        Option<Vec<String>>, // resources, sorted
        Option<String>,     // proxy
        Vec<String>,         // cookies, sorted
        Vec<String>,         // recipient uris, sorted
    )>,
}

fn fingerprint(doc: &SubscriptionSetDoc) -> Fingerprint {
    let mut subscriptions: Vec<_> = doc
        .subscriptions
        .iter()
        .map(|sub| {
            let mut channels: Vec<String> = sub.channels.iter().map(ToString::to_string).collect();
            channels.sort();
            let resources = if sub.resources.is_empty() {
                None
            } else {
                let mut r: Vec<String> = sub.resources.iter().map(ToString::to_string).collect();
                r.sort();
                Some(r)
            };
            let mut cookies = sub.cookies.clone();
            cookies.sort();
            let mut recipients: Vec<String> = sub.recipients.iter().map(|r| r.uri.to_string()).collect();
            recipients.sort();
            (channels, resources, sub.proxy.as_ref().map(ToString::to_string), cookies, recipients)
        })
        .collect();
    subscriptions.sort();
    Fingerprint {
        owner: doc.owner.to_string(),
        max_failures: doc.max_failures.unwrap_or(0),
        version: doc.version,
        subscriptions,
    }
}

/// Are `a` and `b` the same subscription set, up to ordering?
pub fn documents_equivalent(a: &SubscriptionSetDoc, b: &SubscriptionSetDoc) -> bool {
    fingerprint(a) == fingerprint(b)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::doc::{RecipientDoc, SubscriptionDoc};

    fn uri(s: &str) -> Uri {
        s.parse().unwrap()
    }

    fn doc(owner: &str, version: Option<i64>) -> SubscriptionSetDoc {
        SubscriptionSetDoc {
            max_failures: None,
            version,
            owner: uri(owner),
            subscriptions: vec![SubscriptionDoc {
                id: None,
                channels: vec![uri("channel:///foo/*")],
                resources: vec![],
                proxy: None,
                cookies: vec![],
                recipients: vec![RecipientDoc {
                    auth_token: None,
                    uri: uri("http://test.com/foo/sub1"),
                }],
            }],
            access_key: None,
            location: None,
        }
    }

    #[test]
    fn from_doc_assigns_fresh_location_and_access_key() {
        let a = from_doc(doc("http:///owner1", None)).unwrap();
        let b = from_doc(doc("http:///owner1", None)).unwrap();
        assert_ne!(a.location, b.location);
        assert_ne!(a.access_key.as_str(), b.access_key.as_str());
    }

    #[test]
    fn from_doc_rejects_no_subscriptions() {
        let mut d = doc("http:///owner1", None);
        d.subscriptions.clear();
        assert_eq!(from_doc(d), Err(ModelError::NoSubscriptions));
    }

    #[test]
    fn derive_rejects_owner_mismatch() {
        let prev = from_doc(doc("http:///owner1", None)).unwrap();
        let result = derive(&prev, doc("http:///owner2", None));
        assert!(matches!(result, Err(ModelError::OwnerMismatch { .. })));
    }

    #[test]
    fn derive_keeps_location_and_access_key() {
        let prev = from_doc(doc("http:///owner1", Some(1))).unwrap();
        match derive(&prev, doc("http:///owner1", Some(2))).unwrap() {
            DeriveOutcome::Replaced(next) => {
                assert_eq!(next.location, prev.location);
                assert_eq!(next.access_key.as_str(), prev.access_key.as_str());
                assert_eq!(next.version, Some(2));
            }
            DeriveOutcome::NotModified(_) => panic!("expected replacement"),
        }
    }

    #[test]
    fn derive_is_not_modified_when_version_does_not_advance() {
        let prev = from_doc(doc("http:///owner1", Some(10))).unwrap();
        match derive(&prev, doc("http:///owner1", Some(9))).unwrap() {
            DeriveOutcome::NotModified(set) => assert_eq!(set.version, Some(10)),
            DeriveOutcome::Replaced(_) => panic!("expected not-modified"),
        }
        match derive(&prev, doc("http:///owner1", Some(10))).unwrap() {
            DeriveOutcome::NotModified(set) => assert_eq!(set.version, Some(10)),
            DeriveOutcome::Replaced(_) => panic!("expected not-modified"),
        }
    }

    #[test]
    fn derive_replaces_when_either_side_has_no_version() {
        let prev = from_doc(doc("http:///owner1", Some(10))).unwrap();
        assert!(matches!(derive(&prev, doc("http:///owner1", None)).unwrap(), DeriveOutcome::Replaced(_)));

        let prev_unversioned = from_doc(doc("http:///owner1", None)).unwrap();
        assert!(matches!(
            derive(&prev_unversioned, doc("http:///owner1", Some(1))).unwrap(),
            DeriveOutcome::Replaced(_)
        ));
    }

    #[test]
    fn documents_equivalent_ignores_subscription_and_recipient_order() {
        let mut a = doc("http:///owner1", None);
        a.subscriptions.push(SubscriptionDoc {
            id: None,
            channels: vec![uri("channel:///bar")],
            resources: vec![],
            proxy: None,
            cookies: vec![],
            recipients: vec![RecipientDoc { auth_token: None, uri: uri("http://test.com/bar") }],
        });
        let mut b = doc("http:///owner1", None);
        b.subscriptions.insert(
            0,
            SubscriptionDoc {
                id: None,
                channels: vec![uri("channel:///bar")],
                resources: vec![],
                proxy: None,
                cookies: vec![],
                recipients: vec![RecipientDoc { auth_token: None, uri: uri("http://test.com/bar") }],
            },
        );
        assert!(documents_equivalent(&a, &b));
    }

    #[test]
    fn documents_equivalent_detects_real_differences() {
        let a = doc("http:///owner1", None);
        let mut b = doc("http:///owner1", None);
        b.subscriptions[0].channels.push(uri("channel:///extra"));
        assert!(!documents_equivalent(&a, &b));
    }
}
