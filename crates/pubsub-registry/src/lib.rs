//! The subscription registry and delivery engine: the stateful core that
//! turns registered subscription-set documents into a combined dispatch
//! table, and events into outbound HTTP pushes with retry and per-location
//! failure accounting.
//!
//! This crate knows nothing about HTTP request parsing or routing -- that
//! lives in the server binary. It exposes the operations the REST surface
//! needs ([`Registry::register`], [`Registry::replace`], [`Registry::remove`],
//! [`Registry::get`], [`Registry::combined_set`], [`Registry::snapshot`]),
//! the delivery engine ([`dispatch`]), and the upstream/downstream
//! propagation helpers ([`propagation`]).

mod dispatch;
mod error;
mod propagation;
mod registry;
mod transport;

pub use dispatch::{dispatch, DispatchConfig, Transport, TransportError};
pub use error::RegistryError;
pub use propagation::{push_combined_set, self_subscription_doc, subscribe_upstream, META_CHANNEL};
pub use registry::{MetaDestination, Registry, ReplaceOutcome};
pub use transport::ReqwestTransport;
