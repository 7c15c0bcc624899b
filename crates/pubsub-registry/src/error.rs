use pubsub_model::ModelError;

/// Registry-level errors -- the only ones that ever propagate out of a
/// public operation. Everything recoverable (a failed send, a timed-out
/// transport call) is absorbed into failure accounting instead; see
/// [`crate::dispatch`].
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error(transparent)]
    Malformed(#[from] ModelError),

    /// Unknown location or a mismatched access key. Deliberately a single
    /// variant: a caller must not be able to distinguish "no such set"
    /// from "wrong key" by the error it gets back.
    #[error("unknown location or wrong access key")]
    Forbidden,

    /// A PUT whose `owner` differs from the stored set's owner.
    #[error("owner does not match the stored set")]
    OwnerMismatch,

    /// `POST /publish` targeting a `pubsub`-scheme channel.
    #[error("publishing to the meta-channel is forbidden")]
    MetaChannelPublish,

    /// The event's `via` chain already contains this service's own URI.
    #[error("event has already passed through this service")]
    Loop,
}
