//! Cursor-style XML writer.
//!
//! [`XmlWriter`] mirrors the reading cursor: tags are opened and closed one at
//! a time and attributes are added to the most recently opened tag until any
//! content is written into it. An element that is closed without content is
//! written in its self-closing form, so an empty counted collection becomes
//! `<items count="0"/>`.

use crate::error::{Result, XmlError};
use quick_xml::Writer;
use quick_xml::events::{BytesCData, BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use std::io::Write;

/// Writes XML events with explicit start tag / attribute / end tag calls.
pub struct XmlWriter<W: Write> {
    writer: Writer<W>,
    /// Names of the open elements, innermost last
    open: Vec<String>,
    /// Start tag that may still receive attributes
    pending: Option<BytesStart<'static>>,
}

impl<W: Write> XmlWriter<W> {
    /// Creates a writer that emits compact output.
    pub fn new(inner: W) -> Self {
        Self {
            writer: Writer::new(inner),
            open: Vec::new(),
            pending: None,
        }
    }

    /// Creates a writer that indents nested elements with `size` spaces.
    pub fn with_indent(inner: W, size: usize) -> Self {
        Self {
            writer: Writer::new_with_indent(inner, b' ', size),
            open: Vec::new(),
            pending: None,
        }
    }

    /// Number of currently open elements.
    pub fn depth(&self) -> usize {
        self.open.len()
    }

    /// Writes `<?xml version="1.0" encoding="utf-8"?>`.
    pub fn write_declaration(&mut self) -> Result<()> {
        if self.depth() > 0 {
            return Err(XmlError::format(
                "XML declaration must precede the root element",
            ));
        }
        self.writer
            .write_event(Event::Decl(BytesDecl::new("1.0", Some("utf-8"), None)))?;
        Ok(())
    }

    /// Opens an element. Attributes may be added until content is written.
    pub fn write_start_tag(&mut self, name: &str) -> Result<()> {
        if name.is_empty() {
            return Err(XmlError::format("element name must not be empty"));
        }
        self.flush_pending()?;
        self.pending = Some(BytesStart::new(name.to_string()));
        self.open.push(name.to_string());
        Ok(())
    }

    /// Adds an attribute to the element opened by the last `write_start_tag`.
    pub fn write_attribute(&mut self, name: &str, value: &str) -> Result<()> {
        match self.pending.as_mut() {
            Some(start) => {
                start.push_attribute((name, value));
                Ok(())
            }
            None => Err(XmlError::format(format!(
                "attribute '{}' written outside of a start tag",
                name
            ))),
        }
    }

    /// Closes the innermost open element.
    pub fn write_end_tag(&mut self) -> Result<()> {
        let name = self
            .open
            .pop()
            .ok_or_else(|| XmlError::format("end tag written with no open element"))?;
        match self.pending.take() {
            Some(start) => self.writer.write_event(Event::Empty(start))?,
            None => self.writer.write_event(Event::End(BytesEnd::new(name)))?,
        }
        Ok(())
    }

    /// Writes escaped character data into the innermost open element.
    pub fn write_text(&mut self, text: &str) -> Result<()> {
        self.flush_pending()?;
        self.writer.write_event(Event::Text(BytesText::new(text)))?;
        Ok(())
    }

    /// Writes a CDATA section.
    pub fn write_cdata(&mut self, text: &str) -> Result<()> {
        self.flush_pending()?;
        self.writer.write_event(Event::CData(BytesCData::new(text)))?;
        Ok(())
    }

    /// Writes a comment. Text containing `--` or ending in `-` cannot be
    /// represented and is rejected.
    pub fn write_comment(&mut self, text: &str) -> Result<()> {
        if text.contains("--") || text.ends_with('-') {
            return Err(XmlError::format(format!(
                "comment text '{}' cannot contain '--' or end with '-'",
                text
            )));
        }
        self.flush_pending()?;
        self.writer
            .write_event(Event::Comment(BytesText::from_escaped(text)))?;
        Ok(())
    }

    /// Writes an already well-formed fragment verbatim.
    pub fn write_raw(&mut self, fragment: &str) -> Result<()> {
        self.flush_pending()?;
        self.writer
            .write_event(Event::Text(BytesText::from_escaped(fragment)))?;
        Ok(())
    }

    /// Writes a complete `<name attr="..."/>` element.
    pub fn write_empty_element(&mut self, name: &str, attributes: &[(&str, &str)]) -> Result<()> {
        self.write_start_tag(name)?;
        for (key, value) in attributes {
            self.write_attribute(key, value)?;
        }
        self.write_end_tag()
    }

    fn flush_pending(&mut self) -> Result<()> {
        if let Some(start) = self.pending.take() {
            self.writer.write_event(Event::Start(start))?;
        }
        Ok(())
    }

    /// Checks that every element was closed and returns the inner writer.
    pub fn finish(mut self) -> Result<W> {
        if let Some(name) = self.open.last() {
            return Err(XmlError::format(format!(
                "element <{}> was never closed",
                name
            )));
        }
        self.flush_pending()?;
        Ok(self.writer.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn finish_string(writer: XmlWriter<Vec<u8>>) -> Result<String> {
        let bytes = writer.finish()?;
        Ok(String::from_utf8(bytes).expect("writer output is UTF-8"))
    }

    #[test]
    fn test_element_without_content_self_closes() -> Result<()> {
        let mut writer = XmlWriter::new(Vec::new());
        writer.write_start_tag("items")?;
        writer.write_attribute("count", "0")?;
        writer.write_end_tag()?;
        assert_eq!(finish_string(writer)?, r#"<items count="0"/>"#);
        Ok(())
    }

    #[test]
    fn test_nested_elements() -> Result<()> {
        let mut writer = XmlWriter::new(Vec::new());
        writer.write_start_tag("a")?;
        writer.write_attribute("x", "1")?;
        writer.write_empty_element("b", &[("value", "2")])?;
        writer.write_start_tag("c")?;
        writer.write_text("t")?;
        writer.write_end_tag()?;
        writer.write_end_tag()?;
        assert_eq!(
            finish_string(writer)?,
            r#"<a x="1"><b value="2"/><c>t</c></a>"#
        );
        Ok(())
    }

    #[test]
    fn test_attribute_after_content_is_rejected() -> Result<()> {
        let mut writer = XmlWriter::new(Vec::new());
        writer.write_start_tag("a")?;
        writer.write_text("body")?;
        let err = writer.write_attribute("late", "1").unwrap_err();
        assert!(err.is_format());
        Ok(())
    }

    #[test]
    fn test_finish_with_open_element_fails() -> Result<()> {
        let mut writer = XmlWriter::new(Vec::new());
        writer.write_start_tag("open")?;
        assert!(writer.finish().is_err());
        Ok(())
    }

    #[test]
    fn test_depth_tracks_open_elements() -> Result<()> {
        let mut writer = XmlWriter::new(Vec::new());
        assert_eq!(writer.depth(), 0);
        writer.write_start_tag("a")?;
        writer.write_start_tag("b")?;
        assert_eq!(writer.depth(), 2);
        assert!(writer.write_declaration().is_err());
        writer.write_end_tag()?;
        assert_eq!(writer.depth(), 1);
        writer.write_end_tag()?;
        assert_eq!(finish_string(writer)?, "<a><b/></a>");
        Ok(())
    }

    #[test]
    fn test_comment_with_double_hyphen_is_rejected() -> Result<()> {
        let mut writer = XmlWriter::new(Vec::new());
        writer.write_start_tag("a")?;
        assert!(writer.write_comment("x -- y").unwrap_err().is_format());
        assert!(writer.write_comment("trailing-").unwrap_err().is_format());
        writer.write_comment(" fine - here ")?;
        writer.write_end_tag()?;
        assert_eq!(finish_string(writer)?, "<a><!-- fine - here --></a>");
        Ok(())
    }

    #[test]
    fn test_unbalanced_end_tag_fails() {
        let mut writer = XmlWriter::new(Vec::new());
        assert!(writer.write_end_tag().is_err());
    }
}
