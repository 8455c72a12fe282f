//! Stanza properties: named, typed values carried in a `<properties>` block.
//!
//! The value space has a closed fast path (six scalar kinds) and an opaque
//! slow path for everything else. Opaque values hold a host-supplied
//! [`OpaquePayload`]; its bytes are produced at render time and emitted as
//! base64 under the `java-object` type tag.

use std::fmt;
use std::sync::Arc;

use base64::Engine;
use bytes::Bytes;
use serde::Serialize;

use crate::error::{Result, StanzaError};
use crate::xml;

mod classify;

use classify::{Classify, ScalarSerializer};

/// Namespace of the `<properties>` container element.
pub const PROPERTIES_NAMESPACE: &str = "http://www.jivesoftware.com/xmlns/xmpp/properties";

/// Boxed error returned by opaque payload encoders.
pub type EncodeError = Box<dyn std::error::Error + Send + Sync>;

/// Serialization strategy for values outside the scalar kinds.
pub trait OpaquePayload: fmt::Debug + Send + Sync {
    fn encode(&self) -> std::result::Result<Bytes, EncodeError>;
}

/// Pre-serialized bytes; encoding never fails.
impl OpaquePayload for Bytes {
    fn encode(&self) -> std::result::Result<Bytes, EncodeError> {
        Ok(self.clone())
    }
}

/// Structured value encoded as JSON bytes.
#[derive(Debug, Clone, PartialEq)]
pub struct JsonPayload(pub serde_json::Value);

impl OpaquePayload for JsonPayload {
    fn encode(&self) -> std::result::Result<Bytes, EncodeError> {
        Ok(Bytes::from(serde_json::to_vec(&self.0)?))
    }
}

/// Shared handle to an opaque payload. Equality is instance identity.
#[derive(Debug, Clone)]
pub struct OpaqueValue(Arc<dyn OpaquePayload>);

impl OpaqueValue {
    pub fn new(payload: impl OpaquePayload + 'static) -> Self {
        Self(Arc::new(payload))
    }

    pub fn payload(&self) -> &dyn OpaquePayload {
        self.0.as_ref()
    }

    pub fn encode(&self) -> std::result::Result<Bytes, EncodeError> {
        self.0.encode()
    }
}

impl PartialEq for OpaqueValue {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

/// Wire type tag of a property value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeTag {
    Integer,
    Long,
    Float,
    Double,
    Boolean,
    String,
    JavaObject,
}

impl TypeTag {
    pub fn as_str(self) -> &'static str {
        match self {
            TypeTag::Integer => "integer",
            TypeTag::Long => "long",
            TypeTag::Float => "float",
            TypeTag::Double => "double",
            TypeTag::Boolean => "boolean",
            TypeTag::String => "string",
            TypeTag::JavaObject => "java-object",
        }
    }
}

/// A typed property value.
#[derive(Debug, Clone, PartialEq)]
pub enum PropertyValue {
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    Bool(bool),
    Text(String),
    Opaque(OpaqueValue),
}

impl PropertyValue {
    /// Wrap a host-serialized value.
    pub fn opaque(payload: impl OpaquePayload + 'static) -> Self {
        PropertyValue::Opaque(OpaqueValue::new(payload))
    }

    /// Classify any serializable value.
    ///
    /// Primitive values keep their kind (`i64` stays `Long`, `f32` stays
    /// `Float`; narrower integers become `Int`), strings and chars become
    /// `Text`, byte buffers become opaque bytes. Compound values fall back to
    /// a JSON opaque payload. Null, and values whose `Serialize` impl fails,
    /// are rejected.
    pub fn from_serialize<T: Serialize + ?Sized>(value: &T) -> Result<Self> {
        match value.serialize(ScalarSerializer) {
            Ok(v) => Ok(v),
            Err(Classify::Compound) => {
                let v = serde_json::to_value(value)
                    .map_err(|e| StanzaError::InvalidPropertyValue(e.to_string()))?;
                Ok(PropertyValue::opaque(JsonPayload(v)))
            }
            Err(e) => Err(StanzaError::InvalidPropertyValue(e.to_string())),
        }
    }

    pub fn type_tag(&self) -> TypeTag {
        match self {
            PropertyValue::Int(_) => TypeTag::Integer,
            PropertyValue::Long(_) => TypeTag::Long,
            PropertyValue::Float(_) => TypeTag::Float,
            PropertyValue::Double(_) => TypeTag::Double,
            PropertyValue::Bool(_) => TypeTag::Boolean,
            PropertyValue::Text(_) => TypeTag::String,
            PropertyValue::Opaque(_) => TypeTag::JavaObject,
        }
    }

    pub fn as_i32(&self) -> Option<i32> {
        match self {
            PropertyValue::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            PropertyValue::Long(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_f32(&self) -> Option<f32> {
        match self {
            PropertyValue::Float(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            PropertyValue::Double(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            PropertyValue::Bool(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            PropertyValue::Text(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_opaque(&self) -> Option<&OpaqueValue> {
        match self {
            PropertyValue::Opaque(v) => Some(v),
            _ => None,
        }
    }

    /// Text content of the `<value>` element (before XML escaping).
    fn value_text(&self) -> std::result::Result<String, EncodeError> {
        Ok(match self {
            PropertyValue::Int(v) => v.to_string(),
            PropertyValue::Long(v) => v.to_string(),
            PropertyValue::Float(v) => {
                format_float(v.is_nan(), v.is_infinite(), format!("{v:e}"))
            }
            PropertyValue::Double(v) => {
                format_float(v.is_nan(), v.is_infinite(), format!("{v:e}"))
            }
            PropertyValue::Bool(v) => v.to_string(),
            PropertyValue::Text(v) => v.clone(),
            PropertyValue::Opaque(v) => {
                base64::engine::general_purpose::STANDARD.encode(v.encode()?)
            }
        })
    }
}

/// Float text in the peer's `toString` form.
///
/// `sci` is Rust's shortest round-trip scientific text (`{:e}`), so the
/// digits are exactly the ones needed to read the value back. Decimal
/// exponents from -3 to 6 print as plain decimals (`0.001`, `3.0`,
/// `1234567.0`), everything else as `d.dddEn` (`1.0E7`, `1.5E-7`).
fn format_float(nan: bool, infinite: bool, sci: String) -> String {
    if nan {
        return "NaN".into();
    }
    let (sign, rest) = match sci.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", sci.as_str()),
    };
    if infinite {
        return format!("{sign}Infinity");
    }
    let (mantissa, exp) = rest.split_once('e').unwrap_or((rest, "0"));
    let exp: i32 = exp.parse().unwrap_or(0);
    let digits: String = mantissa.chars().filter(|c| *c != '.').collect();

    let mut out = String::from(sign);
    if (-3..7).contains(&exp) {
        if exp < 0 {
            out.push_str("0.");
            out.extend(std::iter::repeat('0').take((-exp - 1) as usize));
            out.push_str(&digits);
        } else {
            let int_len = exp as usize + 1;
            if digits.len() > int_len {
                out.push_str(&digits[..int_len]);
                out.push('.');
                out.push_str(&digits[int_len..]);
            } else {
                out.push_str(&digits);
                out.extend(std::iter::repeat('0').take(int_len - digits.len()));
                out.push_str(".0");
            }
        }
    } else {
        let (lead, tail) = digits.split_at(digits.len().min(1));
        out.push_str(lead);
        out.push('.');
        out.push_str(if tail.is_empty() { "0" } else { tail });
        out.push('E');
        out.push_str(&exp.to_string());
    }
    out
}

impl TryFrom<serde_json::Value> for PropertyValue {
    type Error = StanzaError;

    fn try_from(v: serde_json::Value) -> Result<Self> {
        use serde_json::Value;

        match v {
            Value::Null => Err(StanzaError::InvalidPropertyValue(
                "null is not a property value".into(),
            )),
            Value::Bool(b) => Ok(PropertyValue::Bool(b)),
            Value::String(s) => Ok(PropertyValue::Text(s)),
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Ok(match i32::try_from(i) {
                        Ok(small) => PropertyValue::Int(small),
                        Err(_) => PropertyValue::Long(i),
                    })
                } else if n.is_u64() {
                    // Above i64::MAX: no scalar holds it exactly.
                    Ok(PropertyValue::opaque(JsonPayload(Value::Number(n))))
                } else if let Some(f) = n.as_f64() {
                    Ok(PropertyValue::Double(f))
                } else {
                    Err(StanzaError::InvalidPropertyValue(format!(
                        "unrepresentable number {n}"
                    )))
                }
            }
            other @ (Value::Array(_) | Value::Object(_)) => {
                Ok(PropertyValue::opaque(JsonPayload(other)))
            }
        }
    }
}

impl From<i32> for PropertyValue {
    fn from(v: i32) -> Self {
        PropertyValue::Int(v)
    }
}

impl From<i64> for PropertyValue {
    fn from(v: i64) -> Self {
        PropertyValue::Long(v)
    }
}

impl From<f32> for PropertyValue {
    fn from(v: f32) -> Self {
        PropertyValue::Float(v)
    }
}

impl From<f64> for PropertyValue {
    fn from(v: f64) -> Self {
        PropertyValue::Double(v)
    }
}

impl From<bool> for PropertyValue {
    fn from(v: bool) -> Self {
        PropertyValue::Bool(v)
    }
}

impl From<String> for PropertyValue {
    fn from(v: String) -> Self {
        PropertyValue::Text(v)
    }
}

impl From<&str> for PropertyValue {
    fn from(v: &str) -> Self {
        PropertyValue::Text(v.to_string())
    }
}

impl From<OpaqueValue> for PropertyValue {
    fn from(v: OpaqueValue) -> Self {
        PropertyValue::Opaque(v)
    }
}

/// Insertion-ordered name -> value map with unique keys.
///
/// Overwriting a key keeps its original position, so iteration order (and
/// therefore rendered XML) only depends on when each key was first set.
#[derive(Debug, Clone, Default)]
pub struct PropertyMap {
    entries: Vec<(String, PropertyValue)>,
}

impl PropertyMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&PropertyValue> {
        self.entries.iter().find(|(k, _)| k == name).map(|(_, v)| v)
    }

    /// Insert or overwrite in place. Returns the previous value.
    pub fn insert(&mut self, name: String, value: PropertyValue) -> Option<PropertyValue> {
        match self.entries.iter_mut().find(|(k, _)| *k == name) {
            Some((_, slot)) => Some(std::mem::replace(slot, value)),
            None => {
                self.entries.push((name, value));
                None
            }
        }
    }

    pub fn remove(&mut self, name: &str) -> Option<PropertyValue> {
        let idx = self.entries.iter().position(|(k, _)| k == name)?;
        Some(self.entries.remove(idx).1)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &PropertyValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// What to do when an opaque value fails to encode during rendering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpaqueFailure {
    /// Log the failure and leave the property out.
    Skip,
    /// Abort the render with `OpaqueEncoding`.
    Fail,
}

/// Append the `<properties>` block for `props` to `out`.
///
/// Nothing is written for an empty map.
pub fn render_properties(
    props: &PropertyMap,
    out: &mut String,
    on_failure: OpaqueFailure,
) -> Result<()> {
    if props.is_empty() {
        return Ok(());
    }

    out.push_str("<properties xmlns=\"");
    out.push_str(PROPERTIES_NAMESPACE);
    out.push_str("\">");

    for (name, value) in props.iter() {
        let text = match value.value_text() {
            Ok(t) => t,
            Err(e) => {
                let err = StanzaError::OpaqueEncoding {
                    name: name.to_string(),
                    reason: e.to_string(),
                };
                match on_failure {
                    OpaqueFailure::Fail => return Err(err),
                    OpaqueFailure::Skip => {
                        tracing::warn!(property = %name, error = %err, "skipping property");
                        continue;
                    }
                }
            }
        };

        out.push_str("<property>");
        xml::push_text_element(out, "name", name);
        out.push_str("<value type=\"");
        out.push_str(value.type_tag().as_str());
        out.push_str("\">");
        out.push_str(&xml::escape(&text));
        out.push_str("</value></property>");
    }

    out.push_str("</properties>");
    Ok(())
}
