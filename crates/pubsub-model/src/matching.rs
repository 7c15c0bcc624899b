use crate::combined::{CombinedSubscription, CombinedSubscriptionSet};
use crate::event::Event;
use crate::recipient::Recipient;

/// One [`CombinedSubscription`] matched against an event. `recipients`
/// is `Some` only when the event restricted delivery to a subset of
/// recipients (`event.recipients` non-empty); the intersection is then
/// what the caller should forward, not the subscription's full list.
#[derive(Debug, Clone)]
pub struct MatchedDelivery<'a> {
    pub subscription: &'a CombinedSubscription,
    pub recipients: Option<Vec<Recipient>>,
}

/// Candidate selection per the delivery engine (§4.4 step 2): channel
/// match, resource filter, and recipient intersection.
pub fn select_candidates<'a>(combined: &'a CombinedSubscriptionSet, event: &Event) -> Vec<MatchedDelivery<'a>> {
    combined
        .subscriptions
        .iter()
        .filter_map(|sub| match_one(sub, event))
        .collect()
}

fn match_one<'a>(sub: &'a CombinedSubscription, event: &Event) -> Option<MatchedDelivery<'a>> {
    if !pubsub_uri::matches(&sub.channel, &event.channel) {
        return None;
    }

    if !event.origins.is_empty() {
        let accepted = match &sub.resources {
            // No resource filter: accept every origin, http or https alike.
            None => true,
            Some(patterns) => event
                .origins
                .iter()
                .any(|origin| patterns.iter().any(|pattern| pubsub_uri::matches(pattern, origin))),
        };
        if !accepted {
            return None;
        }
    }

    let recipients = if event.recipients.is_empty() {
        None
    } else {
        let intersected: Vec<Recipient> = sub
            .recipients
            .iter()
            .filter(|r| event.recipients.iter().any(|requested| requested == &r.uri))
            .cloned()
            .collect();
        if intersected.is_empty() {
            return None;
        }
        Some(intersected)
    };

    Some(MatchedDelivery {
        subscription: sub,
        recipients,
    })
}
