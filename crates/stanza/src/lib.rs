//! Top-level facade crate for the stanza envelope core.
//!
//! Re-exports the core types so users can depend on a single crate.

pub mod core {
    pub use stanza_core::*;
}

pub use stanza_core::{
    Envelope, Extension, ExtensionRef, IdGenerator, PropertyValue, Result, Stanza, StanzaError,
    StanzaId,
};
