//! Immutable value objects for the pubsub core: events, recipients,
//! subscriptions, subscription sets, and the derived combined set, plus
//! the pure document conversion and combination algebra described in
//! the design's §3/§4.2.
//!
//! Nothing in this crate knows about HTTP, wire serialization, or
//! concurrency -- those live in `pubsub-wire` and `pubsub-registry`
//! respectively. Everything here is a plain value and a pure function
//! over values.

mod combined;
pub mod doc;
mod error;
mod event;
mod identity;
mod matching;
mod recipient;
mod subscription;
mod subscription_set;

pub use combined::{combine, CombinedSubscription, CombinedSubscriptionSet};
pub use error::ModelError;
pub use event::{Event, Payload};
pub use identity::{AccessKey, Location};
pub use matching::{select_candidates, MatchedDelivery};
pub use recipient::Recipient;
pub use subscription::Subscription;
pub use subscription_set::{derive, documents_equivalent, from_doc, DeriveOutcome, SubscriptionSet};
