//! Error types for XML cursor, codec and mapping operations.
//!
//! The taxonomy separates structural problems in the document (`Format`),
//! values that cannot travel to or from text (`Conversion`) and misuse of a
//! released enumerator (`UseAfterDispose`). Parser, serde and I/O failures from
//! the underlying libraries are carried through unchanged.

use quick_xml::events::attributes::AttrError;
use thiserror::Error;

/// Error type for all XML utility operations.
#[derive(Error, Debug)]
pub enum XmlError {
    /// The document structure does not match what the operation expects.
    #[error("XML format error: {message}")]
    Format {
        /// Description of the structural problem.
        message: String,
    },

    /// A value could not be converted to or from its textual form.
    #[error("cannot convert {type_name}: {message}")]
    Conversion {
        /// Rust type the conversion targeted.
        type_name: &'static str,
        /// Description of the failure.
        message: String,
    },

    /// An operation was attempted on a released cursor or enumerator.
    #[error("{operation} called after the element stream was disposed")]
    UseAfterDispose {
        /// The operation that was attempted.
        operation: &'static str,
    },

    /// Malformed markup reported by the parser.
    #[error("XML parse error: {0}")]
    Xml(#[from] quick_xml::Error),

    /// Malformed attribute list reported by the parser.
    #[error("XML attribute error: {0}")]
    Attribute(#[from] AttrError),

    /// Serde serialization through quick-xml failed.
    #[error("XML serialization error: {0}")]
    Serialize(#[from] quick_xml::SeError),

    /// Serde deserialization through quick-xml failed.
    #[error("XML deserialization error: {0}")]
    Deserialize(#[from] quick_xml::DeError),

    /// I/O failure while opening, reading or writing a document.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl XmlError {
    /// Creates a [`XmlError::Format`] from any displayable message.
    pub fn format(message: impl Into<String>) -> Self {
        XmlError::Format {
            message: message.into(),
        }
    }

    /// Creates a [`XmlError::Conversion`] for the given target type.
    pub fn conversion(type_name: &'static str, message: impl Into<String>) -> Self {
        XmlError::Conversion {
            type_name,
            message: message.into(),
        }
    }

    /// Returns true for errors caused by the document's structure or markup.
    pub fn is_format(&self) -> bool {
        matches!(
            self,
            XmlError::Format { .. } | XmlError::Xml(_) | XmlError::Attribute(_)
        )
    }
}

/// Result type alias for XML utility operations.
pub type Result<T> = std::result::Result<T, XmlError>;
