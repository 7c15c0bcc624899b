//! The `<subscription-set>` wire format (see the design's §6.1) and its
//! conversion to/from [`pubsub_model::doc::SubscriptionSetDoc`].
//!
//! The XML shape mirrors the host framework's existing document
//! conventions (`uri.owner`, `uri.resource`, `uri.proxy`) verbatim so
//! that a peer running the same service recognizes the document without
//! translation.

use pubsub_model::doc::{RecipientDoc, SubscriptionDoc, SubscriptionSetDoc};
use serde::{Deserialize, Serialize};

use crate::WireError;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename = "subscription-set")]
pub struct SubscriptionSetXml {
    #[serde(rename = "@max-failures", skip_serializing_if = "Option::is_none", default)]
    pub max_failures: Option<u32>,
    #[serde(rename = "@version", skip_serializing_if = "Option::is_none", default)]
    pub version: Option<i64>,
    #[serde(rename = "uri.owner")]
    pub owner: String,
    #[serde(rename = "access-key", skip_serializing_if = "Option::is_none", default)]
    pub access_key: Option<String>,
    #[serde(rename = "uri.location", skip_serializing_if = "Option::is_none", default)]
    pub location: Option<String>,
    #[serde(rename = "subscription", default)]
    pub subscriptions: Vec<SubscriptionXml>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SubscriptionXml {
    #[serde(rename = "@id", skip_serializing_if = "Option::is_none", default)]
    pub id: Option<String>,
    #[serde(rename = "channel")]
    pub channels: Vec<String>,
    #[serde(rename = "uri.resource", default)]
    pub resources: Vec<String>,
    #[serde(rename = "uri.proxy", skip_serializing_if = "Option::is_none", default)]
    pub proxy: Option<String>,
    #[serde(rename = "set-cookie", default)]
    pub cookies: Vec<String>,
    #[serde(rename = "recipient")]
    pub recipients: Vec<RecipientXml>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RecipientXml {
    #[serde(rename = "@auth-token", skip_serializing_if = "Option::is_none", default)]
    pub auth_token: Option<String>,
    pub uri: String,
}

impl TryFrom<&SubscriptionSetDoc> for SubscriptionSetXml {
    type Error = WireError;

    fn try_from(doc: &SubscriptionSetDoc) -> Result<Self, Self::Error> {
        Ok(SubscriptionSetXml {
            max_failures: doc.max_failures,
            version: doc.version,
            owner: doc.owner.to_string(),
            access_key: doc.access_key.clone(),
            location: doc.location.as_ref().map(ToString::to_string),
            subscriptions: doc.subscriptions.iter().map(SubscriptionXml::from).collect(),
        })
    }
}

impl From<&SubscriptionDoc> for SubscriptionXml {
    fn from(sub: &SubscriptionDoc) -> Self {
        SubscriptionXml {
            id: sub.id.clone(),
            channels: sub.channels.iter().map(ToString::to_string).collect(),
            resources: sub.resources.iter().map(ToString::to_string).collect(),
            proxy: sub.proxy.as_ref().map(ToString::to_string),
            cookies: sub.cookies.clone(),
            recipients: sub.recipients.iter().map(RecipientXml::from).collect(),
        }
    }
}

impl From<&RecipientDoc> for RecipientXml {
    fn from(recipient: &RecipientDoc) -> Self {
        RecipientXml {
            auth_token: recipient.auth_token.clone(),
            uri: recipient.uri.to_string(),
        }
    }
}

impl TryFrom<SubscriptionSetXml> for SubscriptionSetDoc {
    type Error = WireError;

    fn try_from(xml: SubscriptionSetXml) -> Result<Self, Self::Error> {
        Ok(SubscriptionSetDoc {
            max_failures: xml.max_failures,
            version: xml.version,
            owner: xml.owner.parse().map_err(|e| WireError::MalformedUri("uri.owner".into(), e))?,
            subscriptions: xml
                .subscriptions
                .into_iter()
                .map(SubscriptionDoc::try_from)
                .collect::<Result<_, _>>()?,
            access_key: xml.access_key,
            location: xml
                .location
                .map(|l| l.parse().map_err(|e| WireError::MalformedUri("uri.location".into(), e)))
                .transpose()?,
        })
    }
}

impl TryFrom<SubscriptionXml> for SubscriptionDoc {
    type Error = WireError;

    fn try_from(xml: SubscriptionXml) -> Result<Self, Self::Error> {
        Ok(SubscriptionDoc {
            id: xml.id,
            channels: xml
                .channels
                .into_iter()
                .map(|c| c.parse().map_err(|e| WireError::MalformedUri("channel".into(), e)))
                .collect::<Result<_, _>>()?,
            resources: xml
                .resources
                .into_iter()
                .map(|r| r.parse().map_err(|e| WireError::MalformedUri("uri.resource".into(), e)))
                .collect::<Result<_, _>>()?,
            proxy: xml
                .proxy
                .map(|p| p.parse().map_err(|e| WireError::MalformedUri("uri.proxy".into(), e)))
                .transpose()?,
            cookies: xml.cookies,
            recipients: xml
                .recipients
                .into_iter()
                .map(RecipientDoc::try_from)
                .collect::<Result<_, _>>()?,
        })
    }
}

impl TryFrom<RecipientXml> for RecipientDoc {
    type Error = WireError;

    fn try_from(xml: RecipientXml) -> Result<Self, Self::Error> {
        Ok(RecipientDoc {
            auth_token: xml.auth_token,
            uri: xml.uri.parse().map_err(|e| WireError::MalformedUri("recipient uri".into(), e))?,
        })
    }
}

/// Parses a `<subscription-set>` document body.
pub fn decode(body: &str) -> Result<SubscriptionSetDoc, WireError> {
    let xml: SubscriptionSetXml = quick_xml::de::from_str(body)?;
    xml.try_into()
}

/// Serializes a subscription-set document to its wire XML form.
pub fn encode(doc: &SubscriptionSetDoc) -> Result<String, WireError> {
    let xml = SubscriptionSetXml::try_from(doc)?;
    Ok(quick_xml::se::to_string(&xml)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn sample() -> SubscriptionSetDoc {
        SubscriptionSetDoc {
            max_failures: Some(3),
            version: Some(10),
            owner: "http:///owner1".parse().unwrap(),
            subscriptions: vec![SubscriptionDoc {
                id: Some("sub-1".to_owned()),
                channels: vec!["channel:///foo/*".parse().unwrap()],
                resources: vec!["http://foobar.com/*".parse().unwrap()],
                proxy: None,
                cookies: vec!["service-key=1234".to_owned()],
                recipients: vec![RecipientDoc {
                    auth_token: Some("tok".to_owned()),
                    uri: "http://test.com/foo/sub1".parse().unwrap(),
                }],
            }],
            access_key: None,
            location: None,
        }
    }

    #[test]
    fn encodes_and_decodes_round_trip() {
        let doc = sample();
        let xml = encode(&doc).unwrap();
        assert!(xml.contains("<uri.owner>http:///owner1</uri.owner>"));
        assert!(xml.contains("max-failures=\"3\""));
        let decoded = decode(&xml).unwrap();
        assert_eq!(decoded, doc);
    }

    #[test]
    fn rejects_malformed_owner_uri() {
        let xml = r#"<subscription-set><uri.owner>not-a-uri</uri.owner></subscription-set>"#;
        assert!(decode(xml).is_err());
    }
}
