//! The wire boundary: subscription-set XML document encoding and
//! event/header mapping, plus the shared REST error envelope. Nothing
//! here holds state -- every function is a pure translation between a
//! [`pubsub_model`] value and its over-the-wire representation.

mod error;
mod headers;
mod xml_doc;

pub use error::{ErrorEnvelope, WireError};
pub use headers::{decode_event, encode_headers, EVENT_CHANNEL, EVENT_ID, EVENT_ORIGIN, EVENT_RECIPIENTS, EVENT_VIA};
pub use xml_doc::{decode as decode_subscription_set, encode as encode_subscription_set, RecipientXml, SubscriptionSetXml, SubscriptionXml};
