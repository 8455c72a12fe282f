//! Stanza core: the envelope shared by every XMPP-style stanza.
//!
//! This crate provides the addressing envelope (`id`, `to`, `from`), the
//! optional error payload slot, the ordered extension list and the typed
//! property map, plus the XML fragment those extensions and properties
//! render to. Concrete stanza kinds implement [`Stanza`] on top of it.
//!
//! # Defensive guarantees
//! Panics, `unwrap`, and `expect` are compile-denied here. Fallible paths
//! surface as `StanzaError`/`Result`; poisoned locks are recovered.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

pub mod config;
pub mod error;
pub mod extension;
pub mod id;
pub mod property;
pub mod stanza;
pub mod xml;

pub use error::{ErrorCode, Result, StanzaError};
pub use extension::{DefaultExtension, Extension, ExtensionRef};
pub use id::{IdGenerator, SequentialIdGenerator};
pub use property::{JsonPayload, OpaquePayload, OpaqueValue, PropertyValue, TypeTag};
pub use stanza::{Envelope, ErrorPayload, Stanza, StanzaId, ID_NOT_AVAILABLE};
