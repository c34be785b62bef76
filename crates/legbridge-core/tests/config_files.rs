use legbridge_core::prelude::*;
use std::collections::HashMap;
use std::io::Write;
use tempfile::NamedTempFile;

fn write_temp(content: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("create temp file");
    file.write_all(content.as_bytes()).expect("write temp file");
    file
}

#[test]
fn test_link_config_from_file() {
    let file = write_temp(r#"{ "port_name": "/dev/ttyS1", "baud_rate": 9600, "response_timeout_ms": 250 }"#);
    let config = LinkConfig::from_file(file.path()).unwrap();
    assert_eq!(config.port_name, "/dev/ttyS1");
    assert_eq!(config.baud_rate, 9600);
    assert_eq!(config.response_timeout().as_millis(), 250);
    assert_eq!(config.scan_mode, ScanMode::Continuous);
}

#[test]
fn test_link_config_missing_file() {
    let result = LinkConfig::from_file(std::path::Path::new("/nonexistent/legbridge.json"));
    assert!(matches!(result, Err(ProtocolError::LinkIo(_))));
}

#[test]
fn test_link_config_garbage() {
    let file = write_temp("port_name = /dev/ttyS1");
    assert!(matches!(
        LinkConfig::from_file(file.path()),
        Err(ProtocolError::Config(_))
    ));
}

#[tokio::test]
async fn test_extra_commands_reach_the_board() {
    // Status LED is not in the stock table; add it from a command file.
    let json = r#"{
        "status_led": {
            "payload": {
                "kind": "parameterized",
                "register": 75,
                "params": [{ "name": "level", "conversion": { "kind": "range", "in_start": 0, "in_end": 10, "out_start": 0, "out_end": 200 } }]
            }
        }
    }"#;
    let extra = CommandRegistry::from_json(json).unwrap();
    let registry = CommandRegistry::standard().merge(extra);
    assert!(registry.get("body_height").is_some());

    let (link, _board) = SimulatedBoard::seeded(11).spawn();
    let gateway = Gateway::spawn(link, registry, &LinkConfig::default());

    let mut params = HashMap::new();
    params.insert("level".to_string(), "5".to_string());
    assert_eq!(gateway.invoke("status_led", params).await, "ok");
}
