//! Root probe and serde helper tests.

use std::fs;

use serde::{Deserialize, Serialize};

use helios_xml_utils::{
    Result, SerializeOptions, XmlError, deserialize_from_file, root_element_name,
    root_element_name_async, serialize_to_file, validate_root_element,
    validate_root_element_async,
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Endpoint {
    #[serde(rename = "@name")]
    name: String,
    url: String,
    tags: Vec<String>,
}

const CONFIG: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<!-- generated -->
<Config version="2">
  <Port value="80"/>
</Config>"#;

#[test]
fn test_validate_root_element() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("config.xml");
    fs::write(&path, CONFIG)?;

    assert!(validate_root_element(&path, "Config")?);
    assert!(!validate_root_element(&path, "Settings")?);
    assert_eq!(root_element_name(&path)?, "Config");
    Ok(())
}

#[tokio::test]
async fn test_validate_root_element_async() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("config.xml");
    fs::write(&path, CONFIG)?;

    assert!(validate_root_element_async(&path, "Config").await?);
    assert!(!validate_root_element_async(&path, "Other").await?);
    assert_eq!(root_element_name_async(&path).await?, "Config");
    Ok(())
}

#[tokio::test]
async fn test_async_probe_on_empty_document_fails() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("empty.xml");
    fs::write(&path, "<?xml version=\"1.0\"?>\n")?;

    let err = root_element_name_async(&path).await.unwrap_err();
    assert!(err.is_format());
    Ok(())
}

#[test]
fn test_probe_of_missing_file_is_io_error() {
    let err = root_element_name("/definitely/not/here.xml").unwrap_err();
    assert!(matches!(err, XmlError::Io(_)));
}

#[test]
fn test_serialize_file_round_trip() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("endpoint.xml");
    let endpoint = Endpoint {
        name: "primary".to_string(),
        url: "https://fhir.example.org/r4?x=1&y=2".to_string(),
        tags: vec!["read".to_string(), "write".to_string()],
    };

    let options = SerializeOptions::default().with_namespace(None, "urn:helios:endpoint");
    serialize_to_file(&path, &endpoint, &options)?;

    let bytes = fs::read(&path)?;
    assert!(bytes.starts_with(b"<?xml"));
    let text = String::from_utf8(bytes).expect("UTF-8 document");
    assert!(text.contains(r#"<Endpoint name="primary" xmlns="urn:helios:endpoint">"#));
    assert!(validate_root_element(&path, "Endpoint")?);

    let decoded: Endpoint = deserialize_from_file(&path)?;
    assert_eq!(decoded, endpoint);
    Ok(())
}
