//! Attribute-mapped configuration file tests.

use std::fs;

use tempfile::TempDir;

use helios_xml_utils::{
    AttributeMapped, Property, Result, XmlError, load_from_file, load_from_str, save_to_file,
    validate_root_element, xml_enum,
};

#[derive(Debug, Clone, Copy, PartialEq, Default)]
enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
}

xml_enum!(LogLevel { Error, Warn, Info, Debug });

#[derive(Debug, Clone, PartialEq)]
struct ServerSettings {
    host: String,
    port: u16,
    level: LogLevel,
    verbose: bool,
    timeout_secs: Option<u32>,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 8080,
            level: LogLevel::Info,
            verbose: false,
            timeout_secs: Some(30),
        }
    }
}

impl AttributeMapped for ServerSettings {
    fn properties() -> Vec<Property<Self>> {
        vec![
            Property::read_write("Host", |s: &Self| s.host.clone(), |s, v| s.host = v),
            Property::read_write("Port", |s: &Self| s.port, |s, v| s.port = v),
            Property::read_write("Level", |s: &Self| s.level, |s, v| s.level = v),
            Property::read_write("Verbose", |s: &Self| s.verbose, |s, v| s.verbose = v),
            Property::read_write(
                "TimeoutSecs",
                |s: &Self| s.timeout_secs,
                |s, v| s.timeout_secs = v,
            ),
            Property::read_only("Address", |s: &Self| format!("{}:{}", s.host, s.port)),
        ]
    }
}

fn temp_dir() -> TempDir {
    tempfile::tempdir().expect("Failed to create temp dir")
}

#[test]
fn test_save_and_load_file() -> Result<()> {
    let dir = temp_dir();
    let path = dir.path().join("server.xml");
    let settings = ServerSettings {
        host: "fhir.example.org".to_string(),
        port: 443,
        level: LogLevel::Debug,
        verbose: true,
        timeout_secs: Some(5),
    };

    save_to_file(&path, &settings)?;
    assert!(validate_root_element(&path, "ServerSettings")?);

    let text = fs::read_to_string(&path)?;
    assert!(text.contains(r#"  <Level value="Debug"/>"#));
    assert!(text.contains(r#"<Verbose value="true"/>"#));
    assert!(!text.contains("Address"));

    let mut loaded = ServerSettings::default();
    load_from_file(&path, &mut loaded)?;
    assert_eq!(loaded, settings);
    Ok(())
}

#[test]
fn test_load_missing_file_is_io_error() {
    let dir = temp_dir();
    let mut settings = ServerSettings::default();
    let err = load_from_file(dir.path().join("absent.xml"), &mut settings).unwrap_err();
    assert!(matches!(err, XmlError::Io(_)));
}

#[test]
fn test_load_hand_edited_document() -> Result<()> {
    let xml = r#"<?xml version="1.0" encoding="utf-8"?>
<!-- edited by hand -->
<ServerSettings>
  <Port value=" 9000 "/>
  <Verbose value="True"/>
  <Plugins>
    <Plugin name="audit"/>
  </Plugins>
  <Level/>
</ServerSettings>"#;
    let mut settings = ServerSettings::default();
    load_from_str(xml, &mut settings)?;

    assert_eq!(settings.port, 9000);
    assert!(settings.verbose);
    assert_eq!(settings.level, LogLevel::Info);
    assert_eq!(settings.host, "localhost");
    Ok(())
}

#[test]
fn test_unknown_enum_name_is_conversion_error() {
    let xml = r#"<ServerSettings><Level value="Trace"/></ServerSettings>"#;
    let mut settings = ServerSettings::default();
    let err = load_from_str(xml, &mut settings).unwrap_err();
    assert!(matches!(err, XmlError::Conversion { .. }));
}

#[test]
fn test_unset_optional_value_aborts_save() {
    let dir = temp_dir();
    let settings = ServerSettings {
        timeout_secs: None,
        ..Default::default()
    };
    let err = save_to_file(dir.path().join("server.xml"), &settings).unwrap_err();
    assert!(matches!(err, XmlError::Conversion { .. }));
}
