use uuid::Uuid;

use crate::doc::SubscriptionDoc;
use crate::error::ModelError;
use crate::recipient::Recipient;
use pubsub_uri::Uri;

/// A `(channels, resources?, proxy?, recipients, cookies)` tuple as
/// described in the glossary. Immutable once built: any change produces
/// a new value via [`crate::derive`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subscription {
    pub id: String,
    pub channels: Vec<Uri>,
    pub resources: Option<Vec<Uri>>,
    pub proxy: Option<Uri>,
    pub recipients: Vec<Recipient>,
    pub cookies: Vec<String>,
}

impl Subscription {
    /// Validates and builds a [`Subscription`] from its wire-agnostic
    /// document form, assigning a fresh id if none was supplied.
    pub fn from_doc(doc: SubscriptionDoc) -> Result<Self, ModelError> {
        if doc.channels.is_empty() {
            return Err(ModelError::SubscriptionMissingChannels);
        }
        if doc.recipients.is_empty() {
            return Err(ModelError::SubscriptionMissingRecipients);
        }
        if doc.proxy.is_none() && doc.recipients.len() > 1 {
            return Err(ModelError::AmbiguousDestination);
        }
        let recipients = doc
            .recipients
            .into_iter()
            .map(|r| Recipient::new(r.uri, r.auth_token))
            .collect();
        let resources = if doc.resources.is_empty() {
            None
        } else {
            Some(doc.resources)
        };
        Ok(Subscription {
            id: doc.id.filter(|s| !s.is_empty()).unwrap_or_else(|| Uuid::new_v4().to_string()),
            channels: doc.channels,
            resources,
            proxy: doc.proxy,
            recipients,
            cookies: doc.cookies,
        })
    }

    pub fn as_doc(&self) -> SubscriptionDoc {
        SubscriptionDoc {
            id: Some(self.id.clone()),
            channels: self.channels.clone(),
            resources: self.resources.clone().unwrap_or_default(),
            proxy: self.proxy.clone(),
            cookies: self.cookies.clone(),
            recipients: self
                .recipients
                .iter()
                .map(|r| crate::doc::RecipientDoc {
                    auth_token: r.auth_token.clone(),
                    uri: r.uri.clone(),
                })
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::doc::RecipientDoc;

    fn uri(s: &str) -> Uri {
        s.parse().unwrap()
    }

    fn sample_doc() -> SubscriptionDoc {
        SubscriptionDoc {
            id: None,
            channels: vec![uri("channel:///foo/*")],
            resources: vec![],
            proxy: None,
            cookies: vec![],
            recipients: vec![RecipientDoc {
                auth_token: None,
                uri: uri("http://test.com/foo/sub1"),
            }],
        }
    }

    #[test]
    fn generates_id_when_absent() {
        let sub = Subscription::from_doc(sample_doc()).unwrap();
        assert!(!sub.id.is_empty());
    }

    #[test]
    fn rejects_empty_channels() {
        let mut doc = sample_doc();
        doc.channels.clear();
        assert_eq!(Subscription::from_doc(doc), Err(ModelError::SubscriptionMissingChannels));
    }

    #[test]
    fn rejects_empty_recipients() {
        let mut doc = sample_doc();
        doc.recipients.clear();
        assert_eq!(Subscription::from_doc(doc), Err(ModelError::SubscriptionMissingRecipients));
    }

    #[test]
    fn rejects_multiple_recipients_without_proxy() {
        let mut doc = sample_doc();
        doc.recipients.push(RecipientDoc {
            auth_token: None,
            uri: uri("http://test.com/foo/sub2"),
        });
        assert_eq!(Subscription::from_doc(doc), Err(ModelError::AmbiguousDestination));
    }

    #[test]
    fn allows_multiple_recipients_with_proxy() {
        let mut doc = sample_doc();
        doc.proxy = Some(uri("http://test.com/proxy"));
        doc.recipients.push(RecipientDoc {
            auth_token: None,
            uri: uri("http://test.com/foo/sub2"),
        });
        assert!(Subscription::from_doc(doc).is_ok());
    }

    #[test]
    fn empty_resources_become_none() {
        let sub = Subscription::from_doc(sample_doc()).unwrap();
        assert_eq!(sub.resources, None);
    }
}
