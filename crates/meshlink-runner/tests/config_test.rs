//! Configuration loading tests.

use std::path::PathBuf;
use std::time::Duration;

use meshlink_runner::config::{GatewayConfig, MeshTransport};
use meshlink_runner::ConfigError;
use serial_test::serial;

const FULL_CONFIG: &str = r#"
name: greenhouse
local:
  device: /dev/i2c-3
  address: 8
  write_offset: 1
  frame_size: 128
mesh:
  transport: { kind: serial, port: /dev/ttyUSB0 }
  channel: 2
  app_name: greenhouse-gw
  response_timeout_ms: 1500
gateway:
  ack_timeout_ms: 2000
  poll_interval_ms: 100
  relay_interval_secs: 30
metrics:
  prometheus_listen: "0.0.0.0:9100"
"#;

fn temp_config_path() -> PathBuf {
    std::env::temp_dir().join(format!("meshlink-config-test-{}.yaml", std::process::id()))
}

#[test]
fn test_full_config() {
    let config = GatewayConfig::parse(FULL_CONFIG).unwrap();

    assert_eq!(config.name, "greenhouse");
    assert_eq!(config.local.device, "/dev/i2c-3");
    assert_eq!(config.local.channel_config().write_offset, 1);
    assert_eq!(config.local.channel_config().frame_size, 128);
    assert_eq!(
        config.mesh.transport,
        MeshTransport::Serial {
            port: "/dev/ttyUSB0".to_string(),
            baud_rate: 115_200
        }
    );
    let companion = config.mesh.companion_config();
    assert_eq!(companion.channel, 2);
    assert_eq!(companion.app_name, "greenhouse-gw");
    assert_eq!(companion.response_timeout, Duration::from_millis(1500));

    let engine = config.gateway.engine_config();
    assert_eq!(engine.ack_timeout, Duration::from_secs(2));
    assert_eq!(engine.poll_interval, Duration::from_millis(100));
    assert_eq!(config.gateway.relay_interval(), Duration::from_secs(30));
    assert_eq!(
        config.metrics.prometheus_listen,
        Some("0.0.0.0:9100".parse().unwrap())
    );
}

#[test]
fn test_partial_config_keeps_defaults() {
    let config = GatewayConfig::parse("gateway: { ack_timeout_ms: 1000 }").unwrap();
    let defaults = GatewayConfig::default();

    assert_eq!(config.gateway.ack_timeout_ms, 1000);
    assert_eq!(config.gateway.poll_interval_ms, defaults.gateway.poll_interval_ms);
    assert_eq!(config.local, defaults.local);
    assert_eq!(config.mesh, defaults.mesh);
}

#[test]
fn test_rejects_unknown_fields_and_bad_values() {
    assert!(matches!(
        GatewayConfig::parse("locl: { address: 4 }"),
        Err(ConfigError::Parse(_))
    ));
    assert!(matches!(
        GatewayConfig::parse("local: { address: 200 }"),
        Err(ConfigError::Invalid(_))
    ));
    assert!(matches!(
        GatewayConfig::parse("gateway: { poll_interval_ms: 0 }"),
        Err(ConfigError::Invalid(_))
    ));
    assert!(matches!(
        GatewayConfig::parse("mesh: { transport: { kind: bluetooth } }"),
        Err(ConfigError::Parse(_))
    ));
}

#[test]
fn test_yaml_output_parses_back() {
    let config = GatewayConfig::parse(FULL_CONFIG).unwrap();
    let yaml = config.to_yaml().unwrap();
    assert_eq!(GatewayConfig::parse(&yaml).unwrap(), config);
}

#[test]
#[serial]
fn test_load_from_file() {
    let path = temp_config_path();
    std::fs::write(&path, FULL_CONFIG).unwrap();

    let config = GatewayConfig::load(&path);
    let _ = std::fs::remove_file(&path);

    assert_eq!(config.unwrap().name, "greenhouse");
}

#[test]
#[serial]
fn test_load_missing_file() {
    let path = temp_config_path();
    let _ = std::fs::remove_file(&path);

    match GatewayConfig::load(&path) {
        Err(ConfigError::Read { path: reported, .. }) => assert_eq!(reported, path),
        other => panic!("unexpected result: {:?}", other),
    }
}
