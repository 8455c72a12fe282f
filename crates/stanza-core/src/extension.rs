//! Stanza extensions: namespaced XML sub-fragments attached to a stanza.

use std::fmt;
use std::sync::Arc;

use crate::error::{Result, StanzaError};
use crate::xml;

/// A namespaced XML fragment carried inside a stanza.
///
/// Concrete types come from whoever understands the namespace; the stanza
/// itself only needs the element name, the namespace and the rendering.
pub trait Extension: fmt::Debug + Send + Sync {
    fn element_name(&self) -> &str;
    fn namespace(&self) -> &str;
    fn to_xml(&self) -> String;
}

/// Shared extension handle. Removal matches on instance identity.
pub type ExtensionRef = Arc<dyn Extension>;

/// Generic extension for namespaces with no dedicated type.
///
/// Holds a flat, insertion-ordered list of named text values and renders
/// them as child elements. The element name and every value name must be
/// valid XML names; values and the namespace are escaped on output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DefaultExtension {
    element_name: String,
    namespace: String,
    values: Vec<(String, String)>,
}

impl DefaultExtension {
    pub fn new(element_name: impl Into<String>, namespace: impl Into<String>) -> Result<Self> {
        Ok(Self {
            element_name: checked_name(element_name.into())?,
            namespace: namespace.into(),
            values: Vec::new(),
        })
    }

    pub fn value(&self, name: &str) -> Option<&str> {
        self.values
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// Set a named value; an existing name is overwritten in place.
    pub fn set_value(&mut self, name: impl Into<String>, value: impl Into<String>) -> Result<()> {
        let name = checked_name(name.into())?;
        let value = value.into();
        match self.values.iter_mut().find(|(k, _)| *k == name) {
            Some((_, slot)) => *slot = value,
            None => self.values.push((name, value)),
        }
        Ok(())
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.values.iter().map(|(k, _)| k.as_str())
    }
}

fn checked_name(name: String) -> Result<String> {
    if xml::is_name(&name) {
        Ok(name)
    } else {
        Err(StanzaError::InvalidXmlName(name))
    }
}

impl Extension for DefaultExtension {
    fn element_name(&self) -> &str {
        &self.element_name
    }

    fn namespace(&self) -> &str {
        &self.namespace
    }

    fn to_xml(&self) -> String {
        let mut out = String::new();
        out.push('<');
        out.push_str(&self.element_name);
        out.push_str(" xmlns=\"");
        out.push_str(&xml::escape(&self.namespace));
        out.push('"');
        if self.values.is_empty() {
            out.push_str("/>");
            return out;
        }
        out.push('>');
        for (name, value) in &self.values {
            xml::push_text_element(&mut out, name, value);
        }
        out.push_str("</");
        out.push_str(&self.element_name);
        out.push('>');
        out
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    #[test]
    fn renders_children_in_order() {
        let mut ext = DefaultExtension::new("x", "jabber:x:data").unwrap();
        ext.set_value("b", "2").unwrap();
        ext.set_value("a", "<1>").unwrap();
        ext.set_value("b", "3").unwrap();
        assert_eq!(
            ext.to_xml(),
            "<x xmlns=\"jabber:x:data\"><b>3</b><a>&lt;1&gt;</a></x>"
        );
        assert_eq!(ext.value("a"), Some("<1>"));
        assert_eq!(ext.names().collect::<Vec<_>>(), ["b", "a"]);
    }

    #[test]
    fn empty_extension_self_closes() {
        let ext = DefaultExtension::new("ping", "urn:xmpp:ping").unwrap();
        assert_eq!(ext.to_xml(), "<ping xmlns=\"urn:xmpp:ping\"/>");
        assert_eq!(ext.element_name(), "ping");
        assert_eq!(ext.namespace(), "urn:xmpp:ping");
    }

    #[test]
    fn rejects_names_that_break_markup() {
        let err = DefaultExtension::new("bad name", "ns").unwrap_err();
        assert_eq!(err.code().as_str(), "INVALID_XML_NAME");
        assert!(DefaultExtension::new("a<b", "ns").is_err());
        assert!(DefaultExtension::new("", "ns").is_err());

        let mut ext = DefaultExtension::new("x", "urn:test").unwrap();
        let err = ext.set_value("k v", "1").unwrap_err();
        assert_eq!(err.code().as_str(), "INVALID_XML_NAME");
        assert!(ext.set_value("k>", "1").is_err());
        assert_eq!(ext.names().count(), 0);
        assert_eq!(ext.to_xml(), "<x xmlns=\"urn:test\"/>");

        // Values and namespaces are escaped rather than rejected.
        let mut ext = DefaultExtension::new("x", "urn:a&b").unwrap();
        ext.set_value("k", "<v>").unwrap();
        assert_eq!(ext.to_xml(), "<x xmlns=\"urn:a&amp;b\"><k>&lt;v&gt;</k></x>");
    }
}
