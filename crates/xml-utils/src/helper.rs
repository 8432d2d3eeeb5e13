//! Document-level helpers.
//!
//! Root element probes read only as far as the first content element, which
//! makes them cheap enough to sniff the kind of a document before choosing a
//! loader. The serde helpers map a whole document to and from any
//! `Serialize`/`Deserialize` type.

use crate::cursor::{NodeKind, XmlCursor, decode_name};
use crate::error::{Result, XmlError};
use crate::value::short_type_name;
use quick_xml::events::{BytesDecl, BytesStart, Event};
use quick_xml::{Reader, Writer};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use tracing::{debug, trace};

/// Options for [`serialize_to_string`] and [`serialize_to_file`].
#[derive(Debug, Clone)]
pub struct SerializeOptions {
    /// Root element name. Defaults to the short type name of the value.
    pub root_name: Option<String>,
    /// Prefix bound to `namespace`; `None` declares the default namespace.
    pub namespace_prefix: Option<String>,
    /// Namespace URI declared on the root element.
    pub namespace: Option<String>,
    /// Spaces per nesting level; `0` writes compact output.
    pub indent: usize,
}

impl Default for SerializeOptions {
    fn default() -> Self {
        Self {
            root_name: None,
            namespace_prefix: None,
            namespace: None,
            indent: 2,
        }
    }
}

impl SerializeOptions {
    pub fn with_root_name(mut self, root_name: impl Into<String>) -> Self {
        self.root_name = Some(root_name.into());
        self
    }

    /// Declares `namespace` on the root, bound to `prefix` when given.
    pub fn with_namespace(mut self, prefix: Option<&str>, namespace: impl Into<String>) -> Self {
        self.namespace_prefix = prefix.map(str::to_string);
        self.namespace = Some(namespace.into());
        self
    }

    pub fn with_indent(mut self, indent: usize) -> Self {
        self.indent = indent;
        self
    }

    fn declare_namespace<'a>(&self, mut root: BytesStart<'a>) -> BytesStart<'a> {
        if let Some(namespace) = &self.namespace {
            let key = match self.namespace_prefix.as_deref() {
                Some(prefix) if !prefix.is_empty() => format!("xmlns:{}", prefix),
                _ => "xmlns".to_string(),
            };
            root.push_attribute((key.as_str(), namespace.as_str()));
        }
        root
    }
}

fn first_element_name<R: BufRead>(cursor: &mut XmlCursor<R>) -> Result<String> {
    match cursor.move_to_content()? {
        NodeKind::StartTag | NodeKind::EmptyElement => cursor.local_name(),
        other => Err(XmlError::format(format!(
            "document has no root element, found {}",
            other
        ))),
    }
}

/// Local name of the root element of the document at `path`.
pub fn root_element_name(path: impl AsRef<Path>) -> Result<String> {
    let mut cursor = XmlCursor::from_file(path)?;
    first_element_name(&mut cursor)
}

/// Local name of the root element of an in-memory document.
pub fn root_element_name_str(xml: &str) -> Result<String> {
    first_element_name(&mut XmlCursor::from_xml_str(xml))
}

/// Returns true if the root element of `path` is named `expected`.
pub fn validate_root_element(path: impl AsRef<Path>, expected: &str) -> Result<bool> {
    let path = path.as_ref();
    let found = root_element_name(path)?;
    trace!(path = %path.display(), expected, found = %found, "Validated root element");
    Ok(found == expected)
}

pub fn validate_root_element_str(xml: &str, expected: &str) -> Result<bool> {
    Ok(root_element_name_str(xml)? == expected)
}

/// Async variant of [`root_element_name`]. Reads only up to the first
/// content node.
pub async fn root_element_name_async(path: impl AsRef<Path>) -> Result<String> {
    let file = tokio::fs::File::open(path.as_ref()).await?;
    let mut reader = Reader::from_reader(tokio::io::BufReader::new(file));
    let mut buf = Vec::new();
    loop {
        buf.clear();
        match reader.read_event_into_async(&mut buf).await? {
            Event::Start(start) | Event::Empty(start) => {
                return Ok(decode_name(start.local_name().as_ref()));
            }
            Event::Text(text) if !text.iter().all(u8::is_ascii_whitespace) => {
                return Err(XmlError::format("document has no root element, found text"));
            }
            Event::End(_) | Event::CData(_) | Event::GeneralRef(_) => {
                return Err(XmlError::format("document has no root element, found content"));
            }
            Event::Eof => {
                return Err(XmlError::format(
                    "document has no root element, found end of document",
                ));
            }
            _ => {}
        }
    }
}

/// Async variant of [`validate_root_element`].
pub async fn validate_root_element_async(path: impl AsRef<Path>, expected: &str) -> Result<bool> {
    let found = root_element_name_async(path).await?;
    Ok(found == expected)
}

/// Serializes `value` as a complete document with an XML declaration.
pub fn serialize_to_string<T: Serialize>(value: &T, options: &SerializeOptions) -> Result<String> {
    let root = options
        .root_name
        .clone()
        .unwrap_or_else(|| short_type_name::<T>().to_string());

    let mut fragment = String::new();
    let serializer = quick_xml::se::Serializer::with_root(&mut fragment, Some(root.as_str()))?;
    value.serialize(serializer)?;

    // Re-emit through a writer to add the declaration, namespace and indentation.
    let mut reader = Reader::from_str(&fragment);
    let mut writer = if options.indent > 0 {
        Writer::new_with_indent(Vec::new(), b' ', options.indent)
    } else {
        Writer::new(Vec::new())
    };
    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("utf-8"), None)))?;
    let mut root_written = false;
    loop {
        match reader.read_event()? {
            Event::Eof => break,
            Event::Start(start) if !root_written => {
                root_written = true;
                writer.write_event(Event::Start(options.declare_namespace(start)))?;
            }
            Event::Empty(start) if !root_written => {
                root_written = true;
                writer.write_event(Event::Empty(options.declare_namespace(start)))?;
            }
            event => writer.write_event(event)?,
        }
    }

    String::from_utf8(writer.into_inner()).map_err(|e| XmlError::format(e.to_string()))
}

/// Serializes `value` to `path` as UTF-8 without a byte order mark.
pub fn serialize_to_file<T: Serialize>(
    path: impl AsRef<Path>,
    value: &T,
    options: &SerializeOptions,
) -> Result<()> {
    let path = path.as_ref();
    let xml = serialize_to_string(value, options)?;
    std::fs::write(path, xml)?;
    debug!(path = %path.display(), root = short_type_name::<T>(), "Serialized document");
    Ok(())
}

pub fn deserialize_from_str<T: DeserializeOwned>(xml: &str) -> Result<T> {
    Ok(quick_xml::de::from_str(xml)?)
}

/// Deserializes the document at `path`.
pub fn deserialize_from_file<T: DeserializeOwned>(path: impl AsRef<Path>) -> Result<T> {
    let path = path.as_ref();
    let reader = BufReader::new(File::open(path)?);
    let value = quick_xml::de::from_reader(reader)?;
    debug!(path = %path.display(), type_name = short_type_name::<T>(), "Deserialized document");
    Ok(value)
}
