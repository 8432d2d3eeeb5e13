//! Detached in-memory XML elements.
//!
//! An [`Element`] is a snapshot of one element and its subtree. It owns all
//! of its data and stays valid after the cursor that produced it has moved on.

use crate::cursor::{decode_name, unescape};
use crate::error::{Result, XmlError};
use crate::writer::XmlWriter;
use quick_xml::events::BytesStart;
use std::fmt;
use std::io::Write;

/// A child node of an [`Element`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    /// Nested element
    Element(Element),
    /// Unescaped character data
    Text(String),
    /// CDATA section content
    CData(String),
    /// Comment content
    Comment(String),
}

/// An XML element with its attributes and children.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    name: String,
    attributes: Vec<(String, String)>,
    children: Vec<Node>,
}

impl Element {
    /// Creates an element without attributes or children.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attributes: Vec::new(),
            children: Vec::new(),
        }
    }

    /// Builds an element from a parsed start tag, unescaping attribute values.
    pub(crate) fn from_start(start: &BytesStart<'_>) -> Result<Self> {
        let mut element = Element::new(decode_name(start.name().as_ref()));
        for attr in start.attributes() {
            let attr = attr?;
            let key = decode_name(attr.key.as_ref());
            let value = unescape(&attr.value)?;
            element.attributes.push((key, value));
        }
        Ok(element)
    }

    /// Adds an attribute, replacing an existing one with the same name.
    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.set_attribute(name, value);
        self
    }

    /// Adds a child element.
    pub fn with_child(mut self, child: Element) -> Self {
        self.children.push(Node::Element(child));
        self
    }

    /// Adds a text child.
    pub fn with_text(mut self, text: impl AsRef<str>) -> Self {
        self.push_text(text.as_ref());
        self
    }

    /// Sets an attribute, replacing an existing one with the same name.
    pub fn set_attribute(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.attributes.iter_mut().find(|(key, _)| *key == name) {
            Some(existing) => existing.1 = value,
            None => self.attributes.push((name, value)),
        }
    }

    pub(crate) fn push_node(&mut self, node: Node) {
        self.children.push(node);
    }

    /// Appends text, merging with a directly preceding text node.
    pub(crate) fn push_text(&mut self, text: &str) {
        if let Some(Node::Text(last)) = self.children.last_mut() {
            last.push_str(text);
        } else {
            self.children.push(Node::Text(text.to_string()));
        }
    }

    /// Qualified name, including any namespace prefix.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Name without its namespace prefix.
    pub fn local_name(&self) -> &str {
        match self.name.split_once(':') {
            Some((_, local)) => local,
            None => &self.name,
        }
    }

    /// Value of the attribute with the given qualified name.
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// All attributes in document order.
    pub fn attributes(&self) -> &[(String, String)] {
        &self.attributes
    }

    /// All child nodes in document order.
    pub fn children(&self) -> &[Node] {
        &self.children
    }

    /// Child elements in document order.
    pub fn elements(&self) -> impl Iterator<Item = &Element> {
        self.children.iter().filter_map(|node| match node {
            Node::Element(element) => Some(element),
            _ => None,
        })
    }

    /// First child element with the given qualified name.
    pub fn child(&self, name: &str) -> Option<&Element> {
        self.elements().find(|element| element.name == name)
    }

    /// Concatenated text and CDATA content of the direct children.
    pub fn text(&self) -> String {
        self.children
            .iter()
            .filter_map(|node| match node {
                Node::Text(text) | Node::CData(text) => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }

    /// True if the element has no child nodes.
    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    /// Writes this element and its subtree.
    pub fn write_to<W: Write>(&self, writer: &mut XmlWriter<W>) -> Result<()> {
        writer.write_start_tag(&self.name)?;
        for (key, value) in &self.attributes {
            writer.write_attribute(key, value)?;
        }
        for node in &self.children {
            match node {
                Node::Element(element) => element.write_to(writer)?,
                Node::Text(text) => writer.write_text(text)?,
                Node::CData(text) => writer.write_cdata(text)?,
                Node::Comment(text) => writer.write_comment(text)?,
            }
        }
        writer.write_end_tag()
    }

    /// Serializes the element without indentation or declaration.
    pub fn to_xml_string(&self) -> Result<String> {
        let mut writer = XmlWriter::new(Vec::new());
        self.write_to(&mut writer)?;
        let bytes = writer.finish()?;
        String::from_utf8(bytes).map_err(|e| XmlError::format(e.to_string()))
    }
}

impl fmt::Display for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let xml = self.to_xml_string().map_err(|_| fmt::Error)?;
        f.write_str(&xml)
    }
}
