//! Forward-only cursor over an XML document.
//!
//! [`XmlCursor`] wraps a `quick_xml::Reader` and keeps exactly one node of
//! lookahead: the *current* node is read from the parser but not yet consumed.
//! Inspection methods (`node_kind`, `local_name`, `get_attribute`, ...) look at
//! the current node; reading methods consume it and leave the cursor on the
//! node that follows.
//!
//! Whitespace-only text, comments, processing instructions, the XML
//! declaration and doctypes are *non-content*. [`XmlCursor::move_to_content`]
//! skips them. Every structural read calls it first, and again after consuming,
//! so a finished read leaves the following sibling (or the parent's end tag)
//! as the current node even in indented documents.

use crate::element::{Element, Node};
use crate::error::{Result, XmlError};
use quick_xml::Reader;
use quick_xml::events::{BytesText, Event};
use std::fmt;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use tracing::trace;

/// Upper bound applied to `count` capacity hints unless configured otherwise.
pub const DEFAULT_MAX_CAPACITY_HINT: usize = 4096;

/// Kind of the node the cursor is positioned on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    /// `<name ...>`
    StartTag,
    /// `<name .../>`
    EmptyElement,
    /// `</name>`
    EndTag,
    /// Character data, CDATA or an entity reference.
    Text,
    /// Comment, processing instruction, declaration or doctype.
    Other,
    /// The document is exhausted.
    Eof,
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            NodeKind::StartTag => "start tag",
            NodeKind::EmptyElement => "empty element",
            NodeKind::EndTag => "end tag",
            NodeKind::Text => "text",
            NodeKind::Other => "markup",
            NodeKind::Eof => "end of document",
        };
        f.write_str(label)
    }
}

/// How counted collections treat a `count` attribute that disagrees with the
/// number of elements actually present.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CountPolicy {
    /// The end tag decides; a mismatching count is logged and ignored.
    #[default]
    Lenient,
    /// A present count must equal the number of elements read.
    Strict,
}

/// Reader configuration shared by everything that reads through a cursor.
#[derive(Debug, Clone)]
pub struct ReaderConfig {
    /// Trim leading and trailing whitespace of text nodes.
    pub trim_text: bool,
    /// Treatment of `count` attributes on counted collections.
    pub count_policy: CountPolicy,
    /// Largest capacity a `count` hint may pre-allocate.
    pub max_capacity_hint: usize,
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self {
            trim_text: false,
            count_policy: CountPolicy::Lenient,
            max_capacity_hint: DEFAULT_MAX_CAPACITY_HINT,
        }
    }
}

impl ReaderConfig {
    /// Returns a configuration that rejects mismatching `count` attributes.
    pub fn strict() -> Self {
        Self {
            count_policy: CountPolicy::Strict,
            ..Default::default()
        }
    }
}

/// Forward-only XML reader with one node of lookahead.
pub struct XmlCursor<R: BufRead> {
    reader: Reader<R>,
    buf: Vec<u8>,
    /// Node read from the parser but not yet consumed
    current: Option<Event<'static>>,
    /// Number of open start tags consumed so far
    depth: usize,
    /// Number of nodes consumed so far
    position: u64,
    config: ReaderConfig,
}

impl<'a> XmlCursor<&'a [u8]> {
    /// Creates a cursor over an in-memory document.
    pub fn from_xml_str(xml: &'a str) -> Self {
        Self::from_reader(xml.as_bytes())
    }
}

impl XmlCursor<BufReader<File>> {
    /// Opens a file and creates a cursor over it.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        Self::from_file_with_config(path, ReaderConfig::default())
    }

    /// Opens a file and creates a cursor with the given configuration.
    pub fn from_file_with_config(path: impl AsRef<Path>, config: ReaderConfig) -> Result<Self> {
        let path = path.as_ref();
        trace!(path = %path.display(), "Opening XML document");
        let file = File::open(path)?;
        Ok(Self::with_config(BufReader::new(file), config))
    }
}

impl<R: BufRead> XmlCursor<R> {
    /// Creates a cursor over any buffered reader.
    pub fn from_reader(reader: R) -> Self {
        Self::with_config(reader, ReaderConfig::default())
    }

    /// Creates a cursor with an explicit configuration.
    pub fn with_config(reader: R, config: ReaderConfig) -> Self {
        let mut reader = Reader::from_reader(reader);
        reader.config_mut().trim_text(config.trim_text);
        Self {
            reader,
            buf: Vec::new(),
            current: None,
            depth: 0,
            position: 0,
            config,
        }
    }

    /// The configuration this cursor was created with.
    pub fn config(&self) -> &ReaderConfig {
        &self.config
    }

    /// Number of start tags consumed whose end tag has not been consumed yet.
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Number of nodes consumed so far. Strictly increases with every read.
    pub fn position(&self) -> u64 {
        self.position
    }

    fn read_next(&mut self) -> Result<Event<'static>> {
        self.buf.clear();
        let event = self.reader.read_event_into(&mut self.buf)?;
        Ok(event.into_owned())
    }

    /// Returns the current node, pulling it from the parser if needed.
    fn current(&mut self) -> Result<&Event<'static>> {
        let event = match self.current.take() {
            Some(event) => event,
            None => self.read_next()?,
        };
        let current: &Event<'static> = self.current.insert(event);
        Ok(current)
    }

    /// Consumes the current node and returns it.
    fn consume(&mut self) -> Result<Event<'static>> {
        let event = match self.current.take() {
            Some(event) => event,
            None => self.read_next()?,
        };
        match &event {
            Event::Start(_) => self.depth += 1,
            Event::End(end) => {
                if self.depth == 0 {
                    return Err(XmlError::format(format!(
                        "unexpected closing tag </{}>",
                        decode_name(end.name().as_ref())
                    )));
                }
                self.depth -= 1;
            }
            _ => {}
        }
        self.position += 1;
        Ok(event)
    }

    /// Kind of the current node.
    pub fn node_kind(&mut self) -> Result<NodeKind> {
        Ok(kind_of(self.current()?))
    }

    /// Consumes the current node and returns the kind of the next one.
    ///
    /// At the end of the document this is a no-op returning [`NodeKind::Eof`].
    pub fn advance(&mut self) -> Result<NodeKind> {
        if self.node_kind()? == NodeKind::Eof {
            return Ok(NodeKind::Eof);
        }
        self.consume()?;
        self.node_kind()
    }

    /// Skips non-content nodes and returns the kind of the first content node.
    pub fn move_to_content(&mut self) -> Result<NodeKind> {
        loop {
            let skip = match self.current()? {
                Event::Text(text) => is_whitespace(text),
                event => kind_of(event) == NodeKind::Other,
            };
            if !skip {
                return self.node_kind();
            }
            self.consume()?;
        }
    }

    /// Returns true if the next content node is a start tag or an empty element.
    pub fn is_start_element(&mut self) -> Result<bool> {
        Ok(matches!(
            self.move_to_content()?,
            NodeKind::StartTag | NodeKind::EmptyElement
        ))
    }

    /// Returns true if the current node is an empty element (`<name/>`).
    pub fn is_empty_element(&mut self) -> Result<bool> {
        Ok(matches!(self.current()?, Event::Empty(_)))
    }

    /// Qualified name of the current tag, or an empty string for other nodes.
    pub fn name(&mut self) -> Result<String> {
        Ok(match self.current()? {
            Event::Start(start) | Event::Empty(start) => decode_name(start.name().as_ref()),
            Event::End(end) => decode_name(end.name().as_ref()),
            _ => String::new(),
        })
    }

    /// Local name (without prefix) of the current tag, or an empty string.
    pub fn local_name(&mut self) -> Result<String> {
        Ok(match self.current()? {
            Event::Start(start) | Event::Empty(start) => decode_name(start.local_name().as_ref()),
            Event::End(end) => decode_name(end.local_name().as_ref()),
            _ => String::new(),
        })
    }

    /// Unescaped value of the named attribute on the current start tag.
    ///
    /// Returns `None` when the attribute is absent or the current node is not a
    /// start tag or empty element.
    pub fn get_attribute(&mut self, name: &str) -> Result<Option<String>> {
        match self.current()? {
            Event::Start(start) | Event::Empty(start) => {
                for attr in start.attributes() {
                    let attr = attr?;
                    if attr.key.as_ref() == name.as_bytes() {
                        return unescape(&attr.value).map(Some);
                    }
                }
                Ok(None)
            }
            _ => Ok(None),
        }
    }

    /// Consumes the current start tag. An empty element is consumed entirely.
    pub fn read_start_tag(&mut self) -> Result<()> {
        match self.move_to_content()? {
            NodeKind::StartTag | NodeKind::EmptyElement => {
                self.consume()?;
                self.settle()
            }
            _ => Err(XmlError::format(format!(
                "expected a start tag, found {}",
                self.describe()?
            ))),
        }
    }

    /// Consumes the current end tag.
    pub fn read_end_tag(&mut self) -> Result<()> {
        match self.move_to_content()? {
            NodeKind::EndTag => {
                self.consume()?;
                self.settle()
            }
            _ => Err(XmlError::format(format!(
                "expected an end tag, found {}",
                self.describe()?
            ))),
        }
    }

    /// Consumes the current element including all of its content.
    ///
    /// On any other content node only that node is consumed.
    pub fn skip(&mut self) -> Result<()> {
        match self.move_to_content()? {
            NodeKind::StartTag => {
                let name = self.name()?;
                let target = self.depth;
                self.consume()?;
                while self.depth > target {
                    if self.node_kind()? == NodeKind::Eof {
                        return Err(XmlError::format(format!(
                            "unexpected end of document inside <{}>",
                            name
                        )));
                    }
                    self.consume()?;
                }
                self.settle()
            }
            NodeKind::Eof => Ok(()),
            _ => {
                self.consume()?;
                self.settle()
            }
        }
    }

    /// Scans forward, descending into children, until the current node is a
    /// start tag or empty element with the given qualified name.
    ///
    /// The current node itself is tested first. Returns false when the document
    /// ends without a match.
    pub fn read_to_following(&mut self, name: &str) -> Result<bool> {
        loop {
            match self.current()? {
                Event::Start(start) | Event::Empty(start)
                    if start.name().as_ref() == name.as_bytes() =>
                {
                    return Ok(true);
                }
                Event::Eof => return Ok(false),
                _ => {}
            }
            self.consume()?;
        }
    }

    /// Materializes the current element and its subtree into a detached
    /// [`Element`], leaving the cursor after the element's end tag.
    pub fn read_element(&mut self) -> Result<Element> {
        match self.move_to_content()? {
            NodeKind::StartTag | NodeKind::EmptyElement => {}
            _ => {
                return Err(XmlError::format(format!(
                    "expected an element, found {}",
                    self.describe()?
                )));
            }
        }

        let root = match self.consume()? {
            Event::Empty(start) => {
                let element = Element::from_start(&start)?;
                self.settle()?;
                return Ok(element);
            }
            Event::Start(start) => Element::from_start(&start)?,
            _ => return Err(XmlError::format("cursor lost its position on a start tag")),
        };
        let root_name = root.name().to_string();
        let mut stack = vec![root];
        let mut run = TextRun::default();

        loop {
            if self.node_kind()? == NodeKind::Eof {
                return Err(XmlError::format(format!(
                    "unexpected end of document inside <{}>",
                    root_name
                )));
            }
            match self.consume()? {
                Event::Start(start) => {
                    run.flush(&mut stack, false);
                    stack.push(Element::from_start(&start)?);
                }
                Event::Empty(start) => {
                    run.flush(&mut stack, false);
                    let child = Element::from_start(&start)?;
                    push_node(&mut stack, Node::Element(child));
                }
                Event::End(_) => {
                    // Blank text is the whole content of an element without children.
                    let text_only = stack
                        .last()
                        .is_some_and(|element| element.elements().next().is_none());
                    run.flush(&mut stack, text_only);
                    let finished = stack.pop().ok_or_else(|| {
                        XmlError::format(format!("unbalanced content inside <{}>", root_name))
                    })?;
                    match stack.last_mut() {
                        Some(parent) => parent.push_node(Node::Element(finished)),
                        None => {
                            self.settle()?;
                            return Ok(finished);
                        }
                    }
                }
                Event::Text(text) => run.push_text(&unescape(&text)?),
                Event::GeneralRef(reference) => {
                    let raw = format!("&{};", String::from_utf8_lossy(&reference));
                    run.push_reference(&unescape(raw.as_bytes())?);
                }
                Event::CData(data) => run.push_cdata(String::from_utf8_lossy(&data).into_owned()),
                Event::Comment(comment) => {
                    run.flush(&mut stack, false);
                    let text = String::from_utf8_lossy(&comment).into_owned();
                    push_node(&mut stack, Node::Comment(text));
                }
                _ => {}
            }
        }
    }

    /// Skips non-content nodes after a structural read.
    fn settle(&mut self) -> Result<()> {
        self.move_to_content()?;
        Ok(())
    }

    /// Short description of the current node for error messages.
    fn describe(&mut self) -> Result<String> {
        Ok(match self.current()? {
            Event::Start(start) => format!("<{}>", decode_name(start.name().as_ref())),
            Event::Empty(start) => format!("<{}/>", decode_name(start.name().as_ref())),
            Event::End(end) => format!("</{}>", decode_name(end.name().as_ref())),
            event => kind_of(event).to_string(),
        })
    }
}

fn kind_of(event: &Event<'_>) -> NodeKind {
    match event {
        Event::Start(_) => NodeKind::StartTag,
        Event::Empty(_) => NodeKind::EmptyElement,
        Event::End(_) => NodeKind::EndTag,
        Event::Text(_) | Event::CData(_) | Event::GeneralRef(_) => NodeKind::Text,
        Event::Eof => NodeKind::Eof,
        _ => NodeKind::Other,
    }
}

fn is_whitespace(text: &BytesText<'_>) -> bool {
    text.iter().all(|b| b.is_ascii_whitespace())
}

fn push_node(stack: &mut [Element], node: Node) {
    if let Some(parent) = stack.last_mut() {
        parent.push_node(node);
    }
}

/// Consecutive character data (text, entity references and CDATA) between
/// two pieces of markup.
#[derive(Default)]
struct TextRun {
    nodes: Vec<Node>,
    has_content: bool,
}

impl TextRun {
    fn push_text(&mut self, text: &str) {
        if !text.chars().all(|c| matches!(c, ' ' | '\t' | '\r' | '\n')) {
            self.has_content = true;
        }
        self.append(text);
    }

    fn push_reference(&mut self, resolved: &str) {
        self.has_content = true;
        self.append(resolved);
    }

    fn push_cdata(&mut self, data: String) {
        self.has_content = true;
        self.nodes.push(Node::CData(data));
    }

    fn append(&mut self, text: &str) {
        match self.nodes.last_mut() {
            Some(Node::Text(last)) => last.push_str(text),
            _ => self.nodes.push(Node::Text(text.to_string())),
        }
    }

    /// Moves the run into the innermost open element. A run of only
    /// whitespace is formatting and is dropped unless `keep_blank` is set.
    fn flush(&mut self, stack: &mut [Element], keep_blank: bool) {
        let nodes = std::mem::take(&mut self.nodes);
        let keep = self.has_content || keep_blank;
        self.has_content = false;
        if !keep {
            return;
        }
        if let Some(parent) = stack.last_mut() {
            for node in nodes {
                match node {
                    Node::Text(text) => parent.push_text(&text),
                    node => parent.push_node(node),
                }
            }
        }
    }
}

pub(crate) fn decode_name(raw: &[u8]) -> String {
    String::from_utf8_lossy(raw).into_owned()
}

/// Decodes raw attribute or text bytes and resolves entity references.
pub(crate) fn unescape(raw: &[u8]) -> Result<String> {
    let text = String::from_utf8_lossy(raw);
    quick_xml::escape::unescape(&text)
        .map(|value| value.into_owned())
        .map_err(|e| XmlError::format(format!("invalid escape sequence: {}", e)))
}
