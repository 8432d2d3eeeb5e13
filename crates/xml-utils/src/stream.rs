//! Lazy enumeration of same-named elements.
//!
//! [`ElementStream`] scans a document depth-first for elements with a given
//! qualified name and yields each one as a detached [`Element`]. Only the
//! element currently being materialized is held in memory, so arbitrarily
//! large documents can be processed one record at a time:
//!
//! ```ignore
//! let mut stream = ElementStream::from_file("patients.xml", "Patient")?
//!     .include_empty_elements(false);
//! while stream.move_next()? {
//!     let patient = stream.current()?.expect("positioned");
//!     println!("{}", patient.attribute("id").unwrap_or("?"));
//! }
//! ```
//!
//! A matching element nested inside another match is not reported separately;
//! it is part of the outer element's snapshot.

use crate::cursor::XmlCursor;
use crate::element::Element;
use crate::error::{Result, XmlError};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::iter::FusedIterator;
use std::path::Path;
use tracing::{debug, trace};

/// Lifecycle of an [`ElementStream`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamState {
    /// Created, `move_next` not called yet.
    Idle,
    /// An element is current.
    Positioned,
    /// No further elements; also entered after a read error.
    Exhausted,
    /// The underlying cursor has been released.
    Disposed,
}

/// Single-pass enumerator over elements named `element_name`.
pub struct ElementStream<R: BufRead> {
    cursor: Option<XmlCursor<R>>,
    element_name: String,
    include_empty_elements: bool,
    current: Option<Element>,
    state: StreamState,
    yielded: usize,
    dispose_reported: bool,
}

impl<'a> ElementStream<&'a [u8]> {
    /// Enumerates elements of an in-memory document.
    pub fn from_xml_str(xml: &'a str, element_name: impl Into<String>) -> Self {
        Self::new(XmlCursor::from_xml_str(xml), element_name)
    }
}

impl ElementStream<BufReader<File>> {
    /// Opens `path` and enumerates its elements. The file is closed when the
    /// stream is disposed or dropped.
    pub fn from_file(path: impl AsRef<Path>, element_name: impl Into<String>) -> Result<Self> {
        Ok(Self::new(XmlCursor::from_file(path)?, element_name))
    }
}

impl<R: BufRead> ElementStream<R> {
    /// Takes ownership of `cursor` and enumerates from its current position.
    pub fn new(cursor: XmlCursor<R>, element_name: impl Into<String>) -> Self {
        Self {
            cursor: Some(cursor),
            element_name: element_name.into(),
            include_empty_elements: true,
            current: None,
            state: StreamState::Idle,
            yielded: 0,
            dispose_reported: false,
        }
    }

    /// Sets whether self-closing matches (`<name/>`) are reported. Defaults to
    /// `true`.
    pub fn include_empty_elements(mut self, include: bool) -> Self {
        self.include_empty_elements = include;
        self
    }

    /// Changes the empty-element setting of a live stream.
    pub fn set_include_empty_elements(&mut self, include: bool) -> Result<()> {
        self.ensure_live("set_include_empty_elements")?;
        self.include_empty_elements = include;
        Ok(())
    }

    pub fn element_name(&self) -> &str {
        &self.element_name
    }

    pub fn state(&self) -> StreamState {
        self.state
    }

    /// The element produced by the last successful `move_next`.
    pub fn current(&self) -> Result<Option<&Element>> {
        self.ensure_live("current")?;
        Ok(self.current.as_ref())
    }

    /// Moves the current element out of the stream.
    pub fn take_current(&mut self) -> Result<Option<Element>> {
        self.ensure_live("take_current")?;
        Ok(self.current.take())
    }

    /// Advances to the next matching element.
    ///
    /// Returns `false` once the document holds no further match. Any error
    /// exhausts the stream.
    pub fn move_next(&mut self) -> Result<bool> {
        match self.state {
            StreamState::Disposed => {
                return Err(XmlError::UseAfterDispose {
                    operation: "move_next",
                });
            }
            StreamState::Exhausted => return Ok(false),
            StreamState::Idle | StreamState::Positioned => {}
        }

        self.current = None;
        match self.find_next() {
            Ok(Some(element)) => {
                self.current = Some(element);
                self.state = StreamState::Positioned;
                self.yielded += 1;
                Ok(true)
            }
            Ok(None) => {
                self.state = StreamState::Exhausted;
                debug!(element = %self.element_name, count = self.yielded, "Element stream exhausted");
                Ok(false)
            }
            Err(err) => {
                self.state = StreamState::Exhausted;
                Err(err)
            }
        }
    }

    fn find_next(&mut self) -> Result<Option<Element>> {
        let cursor = self.cursor.as_mut().ok_or(XmlError::UseAfterDispose {
            operation: "move_next",
        })?;
        loop {
            if !cursor.read_to_following(&self.element_name)? {
                return Ok(None);
            }
            if !self.include_empty_elements && cursor.is_empty_element()? {
                trace!(element = %self.element_name, "Skipping empty element");
                cursor.skip()?;
                continue;
            }
            return cursor.read_element().map(Some);
        }
    }

    /// Releases the cursor and its source. Later operations fail with
    /// [`XmlError::UseAfterDispose`]; disposing twice is a no-op.
    pub fn dispose(&mut self) {
        if self.state == StreamState::Disposed {
            return;
        }
        self.cursor = None;
        self.current = None;
        self.state = StreamState::Disposed;
        debug!(element = %self.element_name, count = self.yielded, "Element stream disposed");
    }

    fn ensure_live(&self, operation: &'static str) -> Result<()> {
        if self.state == StreamState::Disposed {
            Err(XmlError::UseAfterDispose { operation })
        } else {
            Ok(())
        }
    }
}

/// Yields owned elements. After disposal the first call yields the
/// [`XmlError::UseAfterDispose`] error and later calls yield `None`.
impl<R: BufRead> Iterator for ElementStream<R> {
    type Item = Result<Element>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.state == StreamState::Disposed {
            if self.dispose_reported {
                return None;
            }
            self.dispose_reported = true;
            return Some(Err(XmlError::UseAfterDispose { operation: "next" }));
        }
        match self.move_next() {
            Ok(true) => self.current.take().map(Ok),
            Ok(false) => None,
            Err(err) => Some(Err(err)),
        }
    }
}

impl<R: BufRead> FusedIterator for ElementStream<R> {}
