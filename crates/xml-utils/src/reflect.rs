//! Flat object-to-attribute mapping for configuration objects.
//!
//! A type implementing [`AttributeMapped`] publishes a table of [`Property`]
//! accessors. Saving writes one child element per writable property, each with
//! a single `value` attribute:
//!
//! ```xml
//! <?xml version="1.0" encoding="utf-8"?>
//! <Settings>
//!   <Port value="8080"/>
//!   <Mode value="Fast"/>
//! </Settings>
//! ```
//!
//! Loading is tolerant: unknown children are skipped with their subtree,
//! children without a `value` attribute leave the property untouched and the
//! root element's name is not checked.

use crate::cursor::{NodeKind, XmlCursor};
use crate::error::{Result, XmlError};
use crate::value::{XmlValue, short_type_name};
use crate::writer::XmlWriter;
use std::fs::File;
use std::io::{BufRead, BufWriter, Write};
use std::path::Path;
use tracing::{debug, trace};

/// Name of the attribute that carries a property's value.
pub const VALUE_ATTRIBUTE: &str = "value";

type Getter<T> = Box<dyn Fn(&T) -> Result<String>>;
type Setter<T> = Box<dyn Fn(&mut T, &str) -> Result<()>>;

/// One entry of a type's property table.
pub struct Property<T> {
    name: &'static str,
    get: Getter<T>,
    set: Option<Setter<T>>,
}

impl<T> Property<T> {
    /// A property that is both saved and loaded.
    pub fn read_write<V, G, S>(name: &'static str, getter: G, setter: S) -> Self
    where
        V: XmlValue,
        G: Fn(&T) -> V + 'static,
        S: Fn(&mut T, V) + 'static,
    {
        Self {
            name,
            get: Box::new(move |object| getter(object).to_xml_text()),
            set: Some(Box::new(move |object, text| {
                setter(object, V::from_xml_text(text)?);
                Ok(())
            })),
        }
    }

    /// A property that is exposed but never written or assigned.
    pub fn read_only<V, G>(name: &'static str, getter: G) -> Self
    where
        V: XmlValue,
        G: Fn(&T) -> V + 'static,
    {
        Self {
            name,
            get: Box::new(move |object| getter(object).to_xml_text()),
            set: None,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn is_writable(&self) -> bool {
        self.set.is_some()
    }

    /// Current value of the property on `object` as attribute text.
    pub fn get(&self, object: &T) -> Result<String> {
        (self.get)(object)
    }
}

/// A type whose public state is described by a property table.
///
/// ```ignore
/// impl AttributeMapped for Settings {
///     fn properties() -> Vec<Property<Self>> {
///         vec![
///             Property::read_write("Port", |s: &Settings| s.port, |s, v| s.port = v),
///             Property::read_write("Mode", |s: &Settings| s.mode, |s, v| s.mode = v),
///         ]
///     }
/// }
/// ```
pub trait AttributeMapped: Sized + 'static {
    /// Name of the container element. Defaults to the short type name.
    fn element_name() -> &'static str {
        short_type_name::<Self>()
    }

    /// Property table in declaration order.
    fn properties() -> Vec<Property<Self>>;
}

/// Writes `object` as a container with one `value`-carrying child per
/// writable property.
pub fn write_object<T, W>(writer: &mut XmlWriter<W>, object: &T) -> Result<()>
where
    T: AttributeMapped,
    W: Write,
{
    writer.write_start_tag(T::element_name())?;
    for property in T::properties().iter().filter(|p| p.is_writable()) {
        let text = property.get(object)?;
        writer.write_empty_element(property.name(), &[(VALUE_ATTRIBUTE, text.as_str())])?;
    }
    writer.write_end_tag()
}

/// Reads the element at the cursor into `object`, leaving the cursor after
/// the element.
pub fn read_object<T, R>(cursor: &mut XmlCursor<R>, object: &mut T) -> Result<()>
where
    T: AttributeMapped,
    R: BufRead,
{
    if !cursor.is_start_element()? {
        return Err(XmlError::format(format!(
            "expected a <{}> element, found {}",
            T::element_name(),
            cursor.node_kind()?
        )));
    }
    let root = cursor.local_name()?;
    if root != T::element_name() {
        debug!(
            expected = T::element_name(),
            found = %root,
            "Root element name differs from type name; loading anyway"
        );
    }
    if cursor.is_empty_element()? {
        cursor.read_start_tag()?;
        return Ok(());
    }
    cursor.read_start_tag()?;

    let properties = T::properties();
    let mut assigned = 0usize;
    loop {
        match cursor.move_to_content()? {
            NodeKind::EndTag => break,
            NodeKind::StartTag | NodeKind::EmptyElement => {
                let name = cursor.local_name()?;
                match properties.iter().find(|p| p.name() == name) {
                    Some(Property { set: Some(set), .. }) => {
                        match cursor.get_attribute(VALUE_ATTRIBUTE)? {
                            Some(text) => {
                                set(object, &text)?;
                                assigned += 1;
                            }
                            None => trace!(property = %name, "No value attribute; property unchanged"),
                        }
                    }
                    Some(_) => trace!(property = %name, "Ignoring read-only property"),
                    None => trace!(element = %name, "Skipping unknown element"),
                }
                cursor.skip()?;
            }
            NodeKind::Eof => {
                return Err(XmlError::format(format!(
                    "unexpected end of document inside <{}>",
                    root
                )));
            }
            NodeKind::Text | NodeKind::Other => cursor.skip()?,
        }
    }
    cursor.read_end_tag()?;
    debug!(element = %root, assigned, "Loaded attribute-mapped object");
    Ok(())
}

/// Writes a complete document with declaration and two-space indentation,
/// returning the inner writer.
pub fn save_to_writer<T, W>(inner: W, object: &T) -> Result<W>
where
    T: AttributeMapped,
    W: Write,
{
    let mut writer = XmlWriter::with_indent(inner, 2);
    writer.write_declaration()?;
    write_object(&mut writer, object)?;
    writer.finish()
}

pub fn save_to_string<T: AttributeMapped>(object: &T) -> Result<String> {
    let bytes = save_to_writer(Vec::new(), object)?;
    String::from_utf8(bytes).map_err(|e| XmlError::format(e.to_string()))
}

/// Saves `object` to `path`, replacing any existing file.
pub fn save_to_file<T: AttributeMapped>(path: impl AsRef<Path>, object: &T) -> Result<()> {
    let path = path.as_ref();
    let file = File::create(path)?;
    let mut out = save_to_writer(BufWriter::new(file), object)?;
    out.flush()?;
    debug!(path = %path.display(), element = T::element_name(), "Saved attribute-mapped object");
    Ok(())
}

/// Loads the first element of a document into `object`.
pub fn load_from_reader<T, R>(reader: R, object: &mut T) -> Result<()>
where
    T: AttributeMapped,
    R: BufRead,
{
    let mut cursor = XmlCursor::from_reader(reader);
    read_object(&mut cursor, object)
}

pub fn load_from_str<T: AttributeMapped>(xml: &str, object: &mut T) -> Result<()> {
    load_from_reader(xml.as_bytes(), object)
}

/// Loads `path` into `object`. A missing file is an I/O error.
pub fn load_from_file<T: AttributeMapped>(path: impl AsRef<Path>, object: &mut T) -> Result<()> {
    let path = path.as_ref();
    let mut cursor = XmlCursor::from_file(path)?;
    read_object(&mut cursor, object)?;
    debug!(path = %path.display(), element = T::element_name(), "Loaded attribute-mapped file");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Copy, PartialEq, Default)]
    enum Mode {
        #[default]
        Fast,
        Safe,
    }

    crate::xml_enum!(Mode { Fast, Safe });

    #[derive(Debug, Clone, PartialEq, Default)]
    struct Settings {
        port: u16,
        mode: Mode,
        ratio: f64,
    }

    impl AttributeMapped for Settings {
        fn properties() -> Vec<Property<Self>> {
            vec![
                Property::read_write("Port", |s: &Settings| s.port, |s, v| s.port = v),
                Property::read_write("Mode", |s: &Settings| s.mode, |s, v| s.mode = v),
                Property::read_write("Ratio", |s: &Settings| s.ratio, |s, v| s.ratio = v),
                Property::read_only("Summary", |s: &Settings| format!("{}:{}", s.port, s.ratio)),
            ]
        }
    }

    #[test]
    fn test_save_writes_one_child_per_writable_property() -> Result<()> {
        let settings = Settings {
            port: 8080,
            mode: Mode::Safe,
            ratio: 0.5,
        };
        let xml = save_to_string(&settings)?;
        assert!(xml.starts_with("<?xml version=\"1.0\" encoding=\"utf-8\"?>"));
        assert!(xml.contains("<Settings>"));
        assert!(xml.contains(r#"<Port value="8080"/>"#));
        assert!(xml.contains(r#"<Mode value="Safe"/>"#));
        assert!(xml.contains(r#"<Ratio value="0.5"/>"#));
        assert!(!xml.contains("Summary"));
        Ok(())
    }

    #[test]
    fn test_save_then_load_reproduces_values() -> Result<()> {
        let settings = Settings {
            port: 443,
            mode: Mode::Safe,
            ratio: -1.25,
        };
        let xml = save_to_string(&settings)?;
        let mut loaded = Settings::default();
        load_from_str(&xml, &mut loaded)?;
        assert_eq!(loaded, settings);
        Ok(())
    }

    #[test]
    fn test_load_tolerates_unknown_and_valueless_children() -> Result<()> {
        let xml = r#"<Settings>
            <Extra value="1"><Nested><Port value="1"/></Nested></Extra>
            <Port/>
            <Mode value="Safe"/>
            <Summary value="ignored"/>
        </Settings>"#;
        let mut loaded = Settings {
            port: 21,
            ..Default::default()
        };
        load_from_str(xml, &mut loaded)?;
        assert_eq!(loaded.port, 21);
        assert_eq!(loaded.mode, Mode::Safe);
        Ok(())
    }

    #[test]
    fn test_property_names_are_case_sensitive() -> Result<()> {
        let mut loaded = Settings::default();
        load_from_str(r#"<Settings><port value="99"/></Settings>"#, &mut loaded)?;
        assert_eq!(loaded.port, 0);
        Ok(())
    }

    #[test]
    fn test_unparsable_value_is_fatal() {
        let mut loaded = Settings::default();
        let err = load_from_str(r#"<Settings><Port value="eighty"/></Settings>"#, &mut loaded)
            .unwrap_err();
        assert!(err.is_format());

        let err = load_from_str(r#"<Settings><Mode value="Slow"/></Settings>"#, &mut loaded)
            .unwrap_err();
        assert!(matches!(err, XmlError::Conversion { .. }));
    }

    #[test]
    fn test_root_name_is_not_validated() -> Result<()> {
        let mut loaded = Settings::default();
        load_from_str(r#"<OldSettings><Port value="7"/></OldSettings>"#, &mut loaded)?;
        assert_eq!(loaded.port, 7);
        Ok(())
    }

    #[test]
    fn test_read_object_leaves_cursor_on_next_sibling() -> Result<()> {
        let mut cursor = XmlCursor::from_xml_str(
            r#"<all><Settings><Port value="1"/></Settings><Settings/><tail/></all>"#,
        );
        cursor.read_start_tag()?;
        let mut first = Settings::default();
        read_object(&mut cursor, &mut first)?;
        let mut second = Settings::default();
        read_object(&mut cursor, &mut second)?;
        assert_eq!(first.port, 1);
        assert_eq!(second, Settings::default());
        assert_eq!(cursor.local_name()?, "tail");
        Ok(())
    }

    #[test]
    fn test_indented_objects_leave_cursor_on_next_sibling() -> Result<()> {
        let first = Settings {
            port: 1,
            mode: Mode::Safe,
            ratio: 2.5,
        };
        let mut writer = XmlWriter::with_indent(Vec::new(), 2);
        writer.write_start_tag("all")?;
        write_object(&mut writer, &first)?;
        write_object(&mut writer, &Settings::default())?;
        writer.write_empty_element("tail", &[])?;
        writer.write_end_tag()?;
        let xml = String::from_utf8(writer.finish()?).expect("UTF-8 output");
        assert!(xml.contains("\n    <Port value=\"1\"/>"));

        let mut cursor = XmlCursor::from_xml_str(&xml);
        cursor.read_start_tag()?;
        let mut loaded = Settings::default();
        read_object(&mut cursor, &mut loaded)?;
        assert_eq!(loaded, first);
        assert_eq!(cursor.local_name()?, "Settings");
        let mut second = first.clone();
        read_object(&mut cursor, &mut second)?;
        assert_eq!(second, Settings::default());
        assert_eq!(cursor.node_kind()?, NodeKind::EmptyElement);
        assert_eq!(cursor.local_name()?, "tail");
        Ok(())
    }

    #[test]
    fn test_truncated_document_is_format_error() {
        let mut loaded = Settings::default();
        let err = load_from_str(r#"<Settings><Port value="1"/>"#, &mut loaded).unwrap_err();
        assert!(err.is_format());
    }

    #[test]
    fn test_unset_option_aborts_save() {
        #[derive(Default)]
        struct Limits {
            max: Option<u32>,
        }

        impl AttributeMapped for Limits {
            fn properties() -> Vec<Property<Self>> {
                vec![Property::read_write("Max", |l: &Limits| l.max, |l, v| l.max = v)]
            }
        }

        let err = save_to_string(&Limits::default()).unwrap_err();
        assert!(matches!(err, XmlError::Conversion { .. }));
        assert!(save_to_string(&Limits { max: Some(3) }).is_ok());
    }
}
