//! # Helios XML Utilities
//!
//! Small building blocks for mapping in-memory data to and from XML documents
//! and for reading large documents one element at a time.
//!
//! ## Features
//!
//! - **Cursor primitives**: [`XmlCursor`] is a forward-only reader with one-node
//!   lookahead over `quick-xml` events; [`XmlWriter`] is its writing counterpart.
//! - **Counted collections**: [`CountList`] and [`NamedCountList`] encode ordered
//!   collections as a container with a `count` attribute followed by the elements.
//!   Element encoding is either supplied externally ([`ElementCodec`]) or by the
//!   element type itself ([`XmlSerializable`]).
//! - **Attribute mapping**: types implementing [`AttributeMapped`] are saved as one
//!   child element per property, each carrying a single `value` attribute.
//! - **Streaming**: [`ElementStream`] yields detached [`Element`] snapshots of every
//!   element with a given name without loading the whole document.
//! - **Helpers**: root element probes and serde-driven document serialization in
//!   [`helper`].
//!
//! ## Wire Shapes
//!
//! | Shape | XML |
//! |-------|-----|
//! | counted collection | `<points count="2"><Point>..</Point><Point>..</Point></points>` |
//! | empty counted collection | `<points count="0"/>` |
//! | mapped object | `<Settings><Port value="8080"/><Mode value="Fast"/></Settings>` |
//!
//! ## Cursor Discipline
//!
//! Every read operation leaves the cursor directly after the construct it read.
//! A reader that consumed one element leaves the next sibling (or the parent's
//! end tag) as the current node, for empty, nested and repeated elements alike.
//!
//! ## Examples
//!
//! ```ignore
//! use helios_xml_utils::{NamedCountList, XmlCursor, XmlSerializable, XmlWriter};
//!
//! let mut writer = XmlWriter::new(Vec::new());
//! list.write_element("items", &mut writer)?;
//! let xml = String::from_utf8(writer.finish()?)?;
//!
//! let mut cursor = XmlCursor::from_xml_str(&xml);
//! let mut decoded = NamedCountList::<Item>::new("Item");
//! decoded.read_xml(&mut cursor)?;
//! ```

pub mod collection;
pub mod cursor;
pub mod element;
pub mod error;
pub mod helper;
pub mod reflect;
pub mod stream;
pub mod value;
pub mod writer;

pub use collection::{
    COUNT_ATTRIBUTE, CountList, ElementCodec, NamedCountList, SerdeCodec, XmlSerializable,
    read_counted, read_elements, write_counted, write_elements,
};
pub use cursor::{CountPolicy, NodeKind, ReaderConfig, XmlCursor};
pub use element::{Element, Node};
pub use error::{Result, XmlError};
pub use helper::{
    SerializeOptions, deserialize_from_file, deserialize_from_str, root_element_name,
    root_element_name_async, root_element_name_str, serialize_to_file, serialize_to_string,
    validate_root_element, validate_root_element_async, validate_root_element_str,
};
pub use reflect::{
    AttributeMapped, Property, VALUE_ATTRIBUTE, load_from_file, load_from_reader, load_from_str,
    read_object, save_to_file, save_to_string, save_to_writer, write_object,
};
pub use stream::{ElementStream, StreamState};
pub use value::{XmlValue, short_type_name};
pub use writer::XmlWriter;
