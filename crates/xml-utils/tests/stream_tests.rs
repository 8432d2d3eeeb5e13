//! Element stream tests against files on disk.

use std::fs;
use std::path::Path;

use tempfile::TempDir;

use helios_xml_utils::{
    CountList, ElementStream, Result, StreamState, XmlCursor, XmlError, XmlSerializable,
};
use serde::{Deserialize, Serialize};

const CATALOG: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<catalog>
  <Item sku="A-1"><name>Widget</name><price>2.50</price></Item>
  <group>
    <Item sku="B-2"/>
    <Item sku="C-3"><name>Gadget &amp; Co</name></Item>
  </group>
  <footer/>
</catalog>"#;

fn write_catalog(dir: &TempDir) -> std::path::PathBuf {
    let path = dir.path().join("catalog.xml");
    fs::write(&path, CATALOG).expect("Failed to write catalog");
    path
}

fn skus(path: &Path, include_empty: bool) -> Result<Vec<String>> {
    ElementStream::from_file(path, "Item")?
        .include_empty_elements(include_empty)
        .map(|item| item.map(|e| e.attribute("sku").unwrap_or_default().to_string()))
        .collect()
}

#[test]
fn test_enumerates_in_document_order() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let path = write_catalog(&dir);

    assert_eq!(skus(&path, true)?, vec!["A-1", "B-2", "C-3"]);
    assert_eq!(skus(&path, false)?, vec!["A-1", "C-3"]);
    Ok(())
}

#[test]
fn test_yielded_elements_outlive_stream() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let path = write_catalog(&dir);

    let items = {
        let stream = ElementStream::from_file(&path, "Item")?;
        stream.collect::<Result<Vec<_>>>()?
    };
    assert_eq!(items.len(), 3);
    assert_eq!(
        items[2].child("name").map(|n| n.text()).as_deref(),
        Some("Gadget & Co")
    );
    Ok(())
}

#[test]
fn test_missing_file_is_io_error() {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let result = ElementStream::from_file(dir.path().join("none.xml"), "Item");
    assert!(matches!(result, Err(XmlError::Io(_))));
}

#[test]
fn test_dispose_releases_stream() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let path = write_catalog(&dir);

    let mut stream = ElementStream::from_file(&path, "Item")?;
    assert!(stream.move_next()?);
    stream.dispose();
    assert_eq!(stream.state(), StreamState::Disposed);
    assert!(matches!(
        stream.move_next(),
        Err(XmlError::UseAfterDispose { .. })
    ));
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Reading {
    sensor: String,
    celsius: f64,
}

#[test]
fn test_stream_composes_with_counted_collections() -> Result<()> {
    let xml = r#"<log>
  <batch count="2"><Reading><sensor>s1</sensor><celsius>20.5</celsius></Reading><Reading><sensor>s2</sensor><celsius>-3</celsius></Reading></batch>
  <batch count="0"/>
  <batch count="1"><Reading><sensor>s3</sensor><celsius>0</celsius></Reading></batch>
</log>"#;

    let mut totals = Vec::new();
    for batch in ElementStream::from_xml_str(xml, "batch") {
        let snapshot = batch?.to_xml_string()?;
        let mut cursor = XmlCursor::from_xml_str(&snapshot);
        let mut readings = CountList::<Reading>::new();
        readings.read_xml(&mut cursor)?;
        totals.push(readings.len());
    }
    assert_eq!(totals, vec![2, 0, 1]);
    Ok(())
}
