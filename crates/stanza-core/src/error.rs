//! Shared error type for the stanza core.

use thiserror::Error;

/// Stable error codes (safe to match on from callers and tests).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    /// Property value cannot be stored.
    InvalidPropertyValue,
    /// Opaque property payload failed to encode at render time.
    OpaqueEncodingFailure,
    /// String is not usable as an XML element name.
    InvalidXmlName,
    /// Invalid configuration.
    BadConfig,
    /// Unsupported config version.
    UnsupportedVersion,
}

impl ErrorCode {
    /// String representation used in logs and test vectors.
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorCode::InvalidPropertyValue => "INVALID_PROPERTY_VALUE",
            ErrorCode::OpaqueEncodingFailure => "OPAQUE_ENCODING_FAILURE",
            ErrorCode::InvalidXmlName => "INVALID_XML_NAME",
            ErrorCode::BadConfig => "BAD_CONFIG",
            ErrorCode::UnsupportedVersion => "UNSUPPORTED_VERSION",
        }
    }
}

/// Shared result type.
pub type Result<T> = std::result::Result<T, StanzaError>;

/// Unified error type of the stanza core.
#[derive(Debug, Error)]
pub enum StanzaError {
    #[error("invalid property value: {0}")]
    InvalidPropertyValue(String),
    #[error("opaque encoding failed for property `{name}`: {reason}")]
    OpaqueEncoding { name: String, reason: String },
    #[error("invalid xml name: {0:?}")]
    InvalidXmlName(String),
    #[error("bad config: {0}")]
    BadConfig(String),
    #[error("unsupported config version")]
    UnsupportedVersion,
}

impl StanzaError {
    /// Map the error to its stable code.
    pub fn code(&self) -> ErrorCode {
        match self {
            StanzaError::InvalidPropertyValue(_) => ErrorCode::InvalidPropertyValue,
            StanzaError::OpaqueEncoding { .. } => ErrorCode::OpaqueEncodingFailure,
            StanzaError::InvalidXmlName(_) => ErrorCode::InvalidXmlName,
            StanzaError::BadConfig(_) => ErrorCode::BadConfig,
            StanzaError::UnsupportedVersion => ErrorCode::UnsupportedVersion,
        }
    }
}
