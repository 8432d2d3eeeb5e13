//! Count-prefixed collection codecs.
//!
//! A counted collection is a container element whose `count` attribute
//! announces the number of child elements that follow:
//!
//! ```xml
//! <points count="2">
//!   <Point><x>1</x><y>2</y></Point>
//!   <Point><x>3</x><y>4</y></Point>
//! </points>
//! ```
//!
//! An empty collection is written as `<points count="0"/>`. On read the
//! container's end tag, not the `count`, decides where the collection stops;
//! the count only sizes the storage up front. [`CountPolicy::Strict`] turns a
//! disagreement into an error.
//!
//! Two codecs share this shape:
//!
//! - [`CountList`] and [`read_counted`]/[`write_counted`] encode each element
//!   with an externally supplied [`ElementCodec`]; the element's tag is derived
//!   from its type name.
//! - [`NamedCountList`] and [`read_elements`]/[`write_elements`] let the element
//!   type encode itself through [`XmlSerializable`] while the collection
//!   chooses the element tag.

use crate::cursor::{CountPolicy, NodeKind, XmlCursor};
use crate::error::{Result, XmlError};
use crate::value::{XmlValue, short_type_name};
use crate::writer::XmlWriter;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::io::{BufRead, Write};
use std::ops::{Deref, DerefMut};
use tracing::{debug, trace, warn};

/// Name of the attribute carrying the element count.
pub const COUNT_ATTRIBUTE: &str = "count";

/// A type that reads and writes itself against the cursor primitives.
pub trait XmlSerializable {
    /// Reads one element. The cursor is positioned on the element's start tag
    /// and must be left directly after its end tag (or after the empty element).
    fn read_xml<R: BufRead>(&mut self, cursor: &mut XmlCursor<R>) -> Result<()>;

    /// Writes attributes and content into an element the caller has opened.
    fn write_xml<W: Write>(&self, writer: &mut XmlWriter<W>) -> Result<()>;

    /// Writes a complete element named `name` around [`write_xml`](Self::write_xml).
    fn write_element<W: Write>(&self, name: &str, writer: &mut XmlWriter<W>) -> Result<()> {
        writer.write_start_tag(name)?;
        self.write_xml(writer)?;
        writer.write_end_tag()
    }
}

/// Type-directed codec for elements of type `T`.
///
/// `encode` emits exactly one complete element; `decode` consumes exactly one.
pub trait ElementCodec<T> {
    /// Writes `value` as one element.
    fn encode<W: Write>(&self, value: &T, writer: &mut XmlWriter<W>) -> Result<()>;

    /// Reads one element positioned at the cursor.
    fn decode<R: BufRead>(&self, cursor: &mut XmlCursor<R>) -> Result<T>;
}

/// [`ElementCodec`] backed by serde and quick-xml's serializer.
///
/// Elements are tagged with the short type name of `T` (no namespace prefix);
/// decoding rejects any other tag. Decoding materializes the element first, so
/// a failing element never leaves the cursor inside it.
#[derive(Debug, Clone, Copy, Default)]
pub struct SerdeCodec;

impl<T> ElementCodec<T> for SerdeCodec
where
    T: Serialize + DeserializeOwned,
{
    fn encode<W: Write>(&self, value: &T, writer: &mut XmlWriter<W>) -> Result<()> {
        let fragment = quick_xml::se::to_string_with_root(short_type_name::<T>(), value)?;
        writer.write_raw(&fragment)
    }

    fn decode<R: BufRead>(&self, cursor: &mut XmlCursor<R>) -> Result<T> {
        let element = cursor.read_element()?;
        let expected = short_type_name::<T>();
        if element.local_name() != expected {
            return Err(XmlError::format(format!(
                "expected <{}> element, found <{}>",
                expected,
                element.name()
            )));
        }
        let xml = element.to_xml_string()?;
        quick_xml::de::from_str(&xml).map_err(|e| {
            XmlError::format(format!(
                "cannot decode <{}> as {}: {}",
                element.name(),
                short_type_name::<T>(),
                e
            ))
        })
    }
}

/// Writes the `count` attribute followed by one codec-encoded element per item.
///
/// The container start tag must already be open on `writer`.
pub fn write_counted<T, C, W>(writer: &mut XmlWriter<W>, items: &[T], codec: &C) -> Result<()>
where
    C: ElementCodec<T>,
    W: Write,
{
    writer.write_attribute(COUNT_ATTRIBUTE, &items.len().to_xml_text()?)?;
    for item in items {
        codec.encode(item, writer)?;
    }
    Ok(())
}

/// Reads a counted collection whose container is the current element.
pub fn read_counted<T, C, R>(cursor: &mut XmlCursor<R>, codec: &C) -> Result<Vec<T>>
where
    C: ElementCodec<T>,
    R: BufRead,
{
    read_container(cursor, |cursor| codec.decode(cursor))
}

/// Writes the `count` attribute followed by one `<element_name>` per item.
///
/// The container start tag must already be open on `writer`.
pub fn write_elements<T, W>(writer: &mut XmlWriter<W>, element_name: &str, items: &[T]) -> Result<()>
where
    T: XmlSerializable,
    W: Write,
{
    writer.write_attribute(COUNT_ATTRIBUTE, &items.len().to_xml_text()?)?;
    for item in items {
        item.write_element(element_name, writer)?;
    }
    Ok(())
}

/// Reads a counted collection of self-describing elements.
pub fn read_elements<T, R>(cursor: &mut XmlCursor<R>) -> Result<Vec<T>>
where
    T: XmlSerializable + Default,
    R: BufRead,
{
    read_container(cursor, |cursor| {
        let mut item = T::default();
        item.read_xml(cursor)?;
        Ok(item)
    })
}

/// Shared container loop of both codecs.
///
/// Consumes the container element completely. `read_item` is called with the
/// cursor on each child element and must consume exactly that element.
fn read_container<T, R, F>(cursor: &mut XmlCursor<R>, mut read_item: F) -> Result<Vec<T>>
where
    R: BufRead,
    F: FnMut(&mut XmlCursor<R>) -> Result<T>,
{
    if !cursor.is_start_element()? {
        return Err(XmlError::format(format!(
            "expected a counted collection element, found {}",
            cursor.node_kind()?
        )));
    }
    let container = cursor.name()?;
    let declared = read_count_hint(cursor, &container)?;

    if cursor.is_empty_element()? {
        cursor.read_start_tag()?;
        trace!(container = %container, "Counted collection is an empty element");
        check_count(cursor, &container, declared, 0)?;
        return Ok(Vec::new());
    }

    cursor.read_start_tag()?;
    let capacity = declared
        .unwrap_or(0)
        .min(cursor.config().max_capacity_hint);
    let mut items = Vec::with_capacity(capacity);

    loop {
        match cursor.move_to_content()? {
            NodeKind::EndTag => break,
            NodeKind::StartTag | NodeKind::EmptyElement => {
                let before = cursor.position();
                let item = read_item(cursor)?;
                if cursor.position() == before {
                    return Err(XmlError::format(format!(
                        "element reader consumed nothing inside <{}>",
                        container
                    )));
                }
                items.push(item);
            }
            NodeKind::Eof => {
                return Err(XmlError::format(format!(
                    "unexpected end of document inside <{}>",
                    container
                )));
            }
            other => {
                return Err(XmlError::format(format!(
                    "unexpected {} inside <{}>",
                    other, container
                )));
            }
        }
    }

    cursor.read_end_tag()?;
    check_count(cursor, &container, declared, items.len())?;
    debug!(container = %container, count = items.len(), "Read counted collection");
    Ok(items)
}

/// Parses the `count` attribute of the current container.
///
/// An unparsable value is logged and treated as absent.
fn read_count_hint<R: BufRead>(cursor: &mut XmlCursor<R>, container: &str) -> Result<Option<usize>> {
    let Some(text) = cursor.get_attribute(COUNT_ATTRIBUTE)? else {
        return Ok(None);
    };
    match usize::from_xml_text(&text) {
        Ok(count) => Ok(Some(count)),
        Err(err) => {
            warn!(container = %container, count = %text, error = %err, "Ignoring unparsable count attribute");
            Ok(None)
        }
    }
}

fn check_count<R: BufRead>(
    cursor: &XmlCursor<R>,
    container: &str,
    declared: Option<usize>,
    actual: usize,
) -> Result<()> {
    let Some(declared) = declared else {
        return Ok(());
    };
    if declared == actual {
        return Ok(());
    }
    match cursor.config().count_policy {
        CountPolicy::Lenient => {
            debug!(
                container = %container,
                declared,
                actual,
                "Count attribute disagrees with element count; using elements"
            );
            Ok(())
        }
        CountPolicy::Strict => Err(XmlError::format(format!(
            "<{}> declares count=\"{}\" but contains {} elements",
            container, declared, actual
        ))),
    }
}

/// A list serialized as a counted collection of serde-encoded elements.
///
/// Each element is tagged with the short type name of `T`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CountList<T> {
    items: Vec<T>,
}

impl<T> Default for CountList<T> {
    fn default() -> Self {
        Self { items: Vec::new() }
    }
}

impl<T> CountList<T> {
    /// Creates an empty list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty list with room for `capacity` elements.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            items: Vec::with_capacity(capacity),
        }
    }

    /// Returns the underlying vector.
    pub fn into_inner(self) -> Vec<T> {
        self.items
    }
}

impl<T> Deref for CountList<T> {
    type Target = Vec<T>;

    fn deref(&self) -> &Self::Target {
        &self.items
    }
}

impl<T> DerefMut for CountList<T> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.items
    }
}

impl<T> From<Vec<T>> for CountList<T> {
    fn from(items: Vec<T>) -> Self {
        Self { items }
    }
}

impl<T> FromIterator<T> for CountList<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Self {
            items: iter.into_iter().collect(),
        }
    }
}

impl<T> IntoIterator for CountList<T> {
    type Item = T;
    type IntoIter = std::vec::IntoIter<T>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}

impl<T> XmlSerializable for CountList<T>
where
    T: Serialize + DeserializeOwned,
{
    fn read_xml<R: BufRead>(&mut self, cursor: &mut XmlCursor<R>) -> Result<()> {
        self.items = read_counted(cursor, &SerdeCodec)?;
        Ok(())
    }

    fn write_xml<W: Write>(&self, writer: &mut XmlWriter<W>) -> Result<()> {
        write_counted(writer, &self.items, &SerdeCodec)
    }
}

/// A list of self-describing elements written under a configurable tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamedCountList<T> {
    element_name: String,
    items: Vec<T>,
}

impl<T> NamedCountList<T> {
    /// Creates an empty list whose elements are written as `<element_name>`.
    pub fn new(element_name: impl Into<String>) -> Self {
        Self::with_capacity(element_name, 0)
    }

    /// Creates an empty list with room for `capacity` elements.
    pub fn with_capacity(element_name: impl Into<String>, capacity: usize) -> Self {
        Self {
            element_name: element_name.into(),
            items: Vec::with_capacity(capacity),
        }
    }

    /// Creates a list from existing items.
    pub fn from_items(element_name: impl Into<String>, items: Vec<T>) -> Self {
        Self {
            element_name: element_name.into(),
            items,
        }
    }

    /// Tag used for each element.
    pub fn element_name(&self) -> &str {
        &self.element_name
    }

    /// Returns the underlying vector.
    pub fn into_inner(self) -> Vec<T> {
        self.items
    }
}

impl<T> Deref for NamedCountList<T> {
    type Target = Vec<T>;

    fn deref(&self) -> &Self::Target {
        &self.items
    }
}

impl<T> DerefMut for NamedCountList<T> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.items
    }
}

impl<T> XmlSerializable for NamedCountList<T>
where
    T: XmlSerializable + Default,
{
    fn read_xml<R: BufRead>(&mut self, cursor: &mut XmlCursor<R>) -> Result<()> {
        self.items = read_elements(cursor)?;
        Ok(())
    }

    fn write_xml<W: Write>(&self, writer: &mut XmlWriter<W>) -> Result<()> {
        write_elements(writer, &self.element_name, &self.items)
    }
}
