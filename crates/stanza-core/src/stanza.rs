//! The stanza envelope shared by every concrete stanza kind.
//!
//! An [`Envelope`] owns the addressing (`id`, `to`, `from`), an optional
//! error payload, the attached extensions and the typed properties. Every
//! accessor takes `&self`: an envelope is routinely shared between a sending
//! thread and a processing thread, so each field group sits behind its own
//! lock.
//!
//! Locks are never held while extension or payload code runs: rendering
//! works on snapshots taken under the lock.

use std::fmt;
use std::sync::{
    Arc, Mutex, MutexGuard, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard,
};

use serde::Serialize;

use crate::error::Result;
use crate::extension::{Extension, ExtensionRef};
use crate::id::{self, IdGenerator};
use crate::property::{render_properties, OpaqueFailure, PropertyMap, PropertyValue};

/// Legacy id literal meaning "this stanza has no id".
pub const ID_NOT_AVAILABLE: &str = "ID_NOT_AVAILABLE";

/// Value for [`Envelope::set_id`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StanzaId {
    /// The stanza carries no id; [`Envelope::id`] reports `None`.
    NotAvailable,
    Id(String),
}

impl From<String> for StanzaId {
    fn from(s: String) -> Self {
        if s == ID_NOT_AVAILABLE {
            StanzaId::NotAvailable
        } else {
            StanzaId::Id(s)
        }
    }
}

impl From<&str> for StanzaId {
    fn from(s: &str) -> Self {
        StanzaId::from(s.to_string())
    }
}

/// Error payload attached to a stanza. Rendered by the concrete stanza.
pub trait ErrorPayload: fmt::Debug + Send + Sync {
    fn to_xml(&self) -> String;
}

/// A concrete stanza kind (message, presence, iq, ...).
///
/// Implementations render their own element, attributes and body. The body
/// must include [`Envelope::render_extensions_and_properties`] and, when
/// present, the error's XML ([`Envelope::error_xml`]).
pub trait Stanza: Send + Sync {
    fn envelope(&self) -> &Envelope;
    fn to_xml(&self) -> String;
}

#[derive(Debug, Clone)]
enum IdSlot {
    /// Nothing assigned yet; generated on first read.
    Unset,
    NotAvailable,
    Assigned(String),
}

/// Addressing, error, extensions and properties of one stanza.
pub struct Envelope {
    ids: Arc<dyn IdGenerator>,
    id: Mutex<IdSlot>,
    to: RwLock<Option<String>>,
    from: RwLock<Option<String>>,
    error: RwLock<Option<Arc<dyn ErrorPayload>>>,
    // Both collections stay unallocated until first insert.
    extensions: Mutex<Option<Vec<ExtensionRef>>>,
    properties: Mutex<Option<PropertyMap>>,
}

impl Envelope {
    /// Envelope drawing ids from the process-wide generator.
    pub fn new() -> Self {
        Self::with_id_generator(id::global())
    }

    pub fn with_id_generator(ids: Arc<dyn IdGenerator>) -> Self {
        Self {
            ids,
            id: Mutex::new(IdSlot::Unset),
            to: RwLock::new(None),
            from: RwLock::new(None),
            error: RwLock::new(None),
            extensions: Mutex::new(None),
            properties: Mutex::new(None),
        }
    }

    // ---- identity ----

    /// The stanza id.
    ///
    /// `None` when the id was set to [`StanzaId::NotAvailable`]. An unset id
    /// is generated on the first call and kept from then on.
    pub fn id(&self) -> Option<String> {
        let mut slot = lock(&self.id);
        match &*slot {
            IdSlot::NotAvailable => None,
            IdSlot::Assigned(id) => Some(id.clone()),
            IdSlot::Unset => {
                let id = self.ids.next_id();
                tracing::debug!(%id, "generated stanza id");
                *slot = IdSlot::Assigned(id.clone());
                Some(id)
            }
        }
    }

    /// Replace the id, including any generated one.
    pub fn set_id(&self, id: impl Into<StanzaId>) {
        *lock(&self.id) = match id.into() {
            StanzaId::NotAvailable => IdSlot::NotAvailable,
            StanzaId::Id(id) => IdSlot::Assigned(id),
        };
    }

    pub fn to(&self) -> Option<String> {
        read(&self.to).clone()
    }

    pub fn set_to(&self, to: Option<String>) {
        *write(&self.to) = to;
    }

    pub fn from(&self) -> Option<String> {
        read(&self.from).clone()
    }

    pub fn set_from(&self, from: Option<String>) {
        *write(&self.from) = from;
    }

    pub fn error(&self) -> Option<Arc<dyn ErrorPayload>> {
        read(&self.error).clone()
    }

    pub fn set_error(&self, error: Option<Arc<dyn ErrorPayload>>) {
        *write(&self.error) = error;
    }

    /// XML of the attached error, if any.
    pub fn error_xml(&self) -> Option<String> {
        self.error().map(|e| e.to_xml())
    }

    // ---- extensions ----

    /// Snapshot of the attached extensions in insertion order.
    pub fn extensions(&self) -> Vec<ExtensionRef> {
        lock(&self.extensions).clone().unwrap_or_default()
    }

    pub fn has_extensions(&self) -> bool {
        lock(&self.extensions).as_ref().is_some_and(|v| !v.is_empty())
    }

    /// First extension with exactly this element name and namespace.
    pub fn find_extension(&self, element_name: &str, namespace: &str) -> Option<ExtensionRef> {
        lock(&self.extensions)
            .as_ref()?
            .iter()
            .find(|e| e.element_name() == element_name && e.namespace() == namespace)
            .cloned()
    }

    pub fn add_extension(&self, extension: ExtensionRef) {
        lock(&self.extensions)
            .get_or_insert_with(Vec::new)
            .push(extension);
    }

    /// Remove the first occurrence of this exact extension instance.
    ///
    /// Returns `false` when it was not attached.
    pub fn remove_extension(&self, extension: &ExtensionRef) -> bool {
        let mut guard = lock(&self.extensions);
        let Some(list) = guard.as_mut() else {
            return false;
        };
        match list.iter().position(|e| Arc::ptr_eq(e, extension)) {
            Some(idx) => {
                list.remove(idx);
                true
            }
            None => false,
        }
    }

    // ---- properties ----

    pub fn property(&self, name: &str) -> Option<PropertyValue> {
        lock(&self.properties).as_ref()?.get(name).cloned()
    }

    /// Set a property, overwriting an existing value in place.
    pub fn set_property(&self, name: impl Into<String>, value: impl Into<PropertyValue>) {
        lock(&self.properties)
            .get_or_insert_with(PropertyMap::new)
            .insert(name.into(), value.into());
    }

    /// Set a property from any serializable value.
    ///
    /// Scalars keep their kind; anything else is stored as an opaque JSON
    /// payload. Fails with `InvalidPropertyValue` for null or for values that
    /// cannot be serialized.
    pub fn set_serialized_property<T: Serialize + ?Sized>(
        &self,
        name: impl Into<String>,
        value: &T,
    ) -> Result<()> {
        let value = PropertyValue::from_serialize(value)?;
        self.set_property(name, value);
        Ok(())
    }

    pub fn delete_property(&self, name: &str) {
        if let Some(props) = lock(&self.properties).as_mut() {
            props.remove(name);
        }
    }

    /// Snapshot of the property names in iteration order.
    pub fn property_names(&self) -> Vec<String> {
        lock(&self.properties)
            .as_ref()
            .map(|p| p.names().map(str::to_string).collect())
            .unwrap_or_default()
    }

    // ---- rendering ----

    /// XML of all extensions followed by the `<properties>` block.
    ///
    /// Returns an empty string when there is nothing to render. A property
    /// whose opaque payload fails to encode is logged and left out; the rest
    /// of the fragment is still produced.
    pub fn render_extensions_and_properties(&self) -> String {
        // Skip never reports an error.
        self.render_with(OpaqueFailure::Skip).unwrap_or_default()
    }

    /// Like [`render_extensions_and_properties`](Self::render_extensions_and_properties),
    /// but fails with `OpaqueEncoding` instead of dropping a property.
    pub fn try_render_extensions_and_properties(&self) -> Result<String> {
        self.render_with(OpaqueFailure::Fail)
    }

    fn render_with(&self, on_failure: OpaqueFailure) -> Result<String> {
        let extensions = self.extensions();
        let properties = lock(&self.properties).clone();

        let mut out = String::new();
        for ext in &extensions {
            out.push_str(&ext.to_xml());
        }
        if let Some(props) = properties {
            render_properties(&props, &mut out, on_failure)?;
        }
        Ok(out)
    }
}

impl Default for Envelope {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Envelope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Envelope")
            .field("id", &*lock(&self.id))
            .field("to", &*read(&self.to))
            .field("from", &*read(&self.from))
            .field("error", &*read(&self.error))
            .field("extensions", &*lock(&self.extensions))
            .field("properties", &*lock(&self.properties))
            .finish()
    }
}

// Every critical section leaves its data valid, so a poisoned lock is
// recovered instead of propagated.
fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

fn read<T>(l: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    l.read().unwrap_or_else(PoisonError::into_inner)
}

fn write<T>(l: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    l.write().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use crate::extension::DefaultExtension;
    use crate::id::SequentialIdGenerator;

    fn envelope() -> Envelope {
        Envelope::with_id_generator(Arc::new(SequentialIdGenerator::with_prefix("unit-")))
    }

    #[derive(Debug)]
    struct Conflict;

    impl ErrorPayload for Conflict {
        fn to_xml(&self) -> String {
            "<error type=\"cancel\"><conflict/></error>".into()
        }
    }

    #[test]
    fn id_generated_once_on_first_read() {
        let env = envelope();
        assert_eq!(env.id().as_deref(), Some("unit-0"));
        assert_eq!(env.id().as_deref(), Some("unit-0"));
    }

    #[test]
    fn explicit_id_replaces_generated() {
        let env = envelope();
        env.id();
        env.set_id("abc");
        assert_eq!(env.id().as_deref(), Some("abc"));
    }

    #[test]
    fn not_available_is_sticky() {
        let env = envelope();
        env.set_id(StanzaId::NotAvailable);
        assert_eq!(env.id(), None);
        assert_eq!(env.id(), None);
        env.set_id("again");
        assert_eq!(env.id().as_deref(), Some("again"));
    }

    #[test]
    fn legacy_literal_maps_to_not_available() {
        let env = envelope();
        env.set_id(ID_NOT_AVAILABLE);
        assert_eq!(env.id(), None);
    }

    #[test]
    fn addressing_and_error() {
        let env = envelope();
        assert_eq!(env.to(), None);
        env.set_to(Some("juliet@example.com".into()));
        env.set_from(Some("romeo@example.net/orchard".into()));
        assert_eq!(env.to().as_deref(), Some("juliet@example.com"));
        assert_eq!(env.from().as_deref(), Some("romeo@example.net/orchard"));
        env.set_to(None);
        assert_eq!(env.to(), None);

        assert!(env.error().is_none());
        env.set_error(Some(Arc::new(Conflict)));
        assert_eq!(
            env.error_xml().as_deref(),
            Some("<error type=\"cancel\"><conflict/></error>")
        );
        env.set_error(None);
        assert!(env.error_xml().is_none());
    }

    #[test]
    fn extension_snapshot_is_independent() {
        let env = envelope();
        assert!(env.extensions().is_empty());
        assert!(!env.has_extensions());

        env.add_extension(Arc::new(DefaultExtension::new("a", "ns").unwrap()));
        let snap = env.extensions();
        env.add_extension(Arc::new(DefaultExtension::new("b", "ns").unwrap()));
        assert_eq!(snap.len(), 1);
        assert_eq!(env.extensions().len(), 2);
    }

    #[test]
    fn find_and_remove_by_identity() {
        let env = envelope();
        let first: ExtensionRef = Arc::new(DefaultExtension::new("x", "jabber:x:event").unwrap());
        let twin: ExtensionRef = Arc::new(DefaultExtension::new("x", "jabber:x:event").unwrap());
        env.add_extension(first.clone());
        env.add_extension(twin.clone());

        let found = env.find_extension("x", "jabber:x:event").unwrap();
        assert!(Arc::ptr_eq(&found, &first));
        assert!(env.find_extension("x", "other").is_none());
        assert!(env.find_extension("y", "jabber:x:event").is_none());

        assert!(env.remove_extension(&first));
        let found = env.find_extension("x", "jabber:x:event").unwrap();
        assert!(Arc::ptr_eq(&found, &twin));

        assert!(env.remove_extension(&twin));
        assert!(!env.remove_extension(&twin));
        assert!(env.find_extension("x", "jabber:x:event").is_none());
    }

    #[test]
    fn remove_on_unallocated_is_noop() {
        let env = envelope();
        let ext: ExtensionRef = Arc::new(DefaultExtension::new("x", "ns").unwrap());
        assert!(!env.remove_extension(&ext));
    }

    #[test]
    fn scalar_properties_round_trip() {
        let env = envelope();
        env.set_property("i", 42i32);
        env.set_property("l", 1i64 << 40);
        env.set_property("f", 0.25f32);
        env.set_property("d", -1.5f64);
        env.set_property("b", true);
        env.set_property("s", "text");

        assert_eq!(env.property("i"), Some(PropertyValue::Int(42)));
        assert_eq!(env.property("l"), Some(PropertyValue::Long(1 << 40)));
        assert_eq!(env.property("f"), Some(PropertyValue::Float(0.25)));
        assert_eq!(env.property("d"), Some(PropertyValue::Double(-1.5)));
        assert_eq!(env.property("b"), Some(PropertyValue::Bool(true)));
        assert_eq!(env.property("s").unwrap().as_str(), Some("text"));
        assert_eq!(env.property_names(), ["i", "l", "f", "d", "b", "s"]);
    }

    #[test]
    fn delete_and_missing_properties() {
        let env = envelope();
        assert!(env.property("nope").is_none());
        assert!(env.property_names().is_empty());
        env.delete_property("nope");

        env.set_property("k", 1i32);
        env.delete_property("k");
        assert!(env.property("k").is_none());
        assert!(env.property_names().is_empty());
    }

    #[test]
    fn serialized_property_rejects_null() {
        let env = envelope();
        let err = env.set_serialized_property("n", &()).unwrap_err();
        assert_eq!(err.code().as_str(), "INVALID_PROPERTY_VALUE");
        assert!(env.property("n").is_none());

        env.set_serialized_property("v", &vec![1, 2, 3]).unwrap();
        let v = env.property("v").unwrap();
        assert_eq!(v.type_tag().as_str(), "java-object");
    }

    #[test]
    fn empty_envelope_renders_empty() {
        let env = envelope();
        assert_eq!(env.render_extensions_and_properties(), "");
        env.set_property("k", 1i32);
        env.delete_property("k");
        assert_eq!(env.render_extensions_and_properties(), "");
    }

    #[test]
    fn extensions_render_before_properties() {
        let env = envelope();
        env.set_property("k", true);
        env.add_extension(Arc::new(DefaultExtension::new("ping", "urn:xmpp:ping").unwrap()));
        assert_eq!(
            env.render_extensions_and_properties(),
            "<ping xmlns=\"urn:xmpp:ping\"/>\
             <properties xmlns=\"http://www.jivesoftware.com/xmlns/xmpp/properties\">\
             <property><name>k</name><value type=\"boolean\">true</value></property>\
             </properties>"
        );
    }
}
