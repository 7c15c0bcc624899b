/// Errors raised while turning a wire document into a domain value, or
/// while deriving a new [`crate::SubscriptionSet`] from an existing one.
///
/// These map directly onto the error kinds in the host REST surface
/// (`MalformedDoc` -> 400, `Forbidden` -> 403); the mapping itself lives
/// in the registry crate, which is the only layer that knows about HTTP.
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum ModelError {
    #[error("subscription-set document has no owner")]
    MissingOwner,
    #[error("subscription-set document has no subscriptions")]
    NoSubscriptions,
    #[error("subscription has no channels")]
    SubscriptionMissingChannels,
    #[error("subscription has no recipients")]
    SubscriptionMissingRecipients,
    #[error("subscription has no proxy and more than one recipient; destination would be ambiguous")]
    AmbiguousDestination,
    #[error("owner {incoming} does not match the existing set's owner {existing}")]
    OwnerMismatch { existing: String, incoming: String },
}
