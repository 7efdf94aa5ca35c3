//! YAML configuration for the gateway.
//!
//! Every field is optional; a missing file section takes its defaults.
//!
//! ```yaml
//! name: garden-gw
//! local: { device: /dev/i2c-1, address: 4, write_offset: 0, frame_size: 256 }
//! mesh:
//!   transport: { kind: tcp, address: "127.0.0.1:5000" }
//!   channel: 0
//! gateway: { ack_timeout_ms: 5000, poll_interval_ms: 200, relay_interval_secs: 60 }
//! ```

use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

use meshlink_gateway::EngineConfig;
use meshlink_transport::{CompanionConfig, I2cChannelConfig};
use serde::{Deserialize, Serialize};

use crate::ConfigError;

/// Top-level gateway configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GatewayConfig {
    /// Gateway name, used in logs and metric labels.
    pub name: String,
    /// Local sensor node on the I2C bus.
    pub local: LocalConfig,
    /// Mesh radio.
    pub mesh: MeshConfig,
    /// Handshake and relay timing.
    pub gateway: TimingConfig,
    /// Metrics export.
    pub metrics: MetricsConfig,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            name: "meshlink".to_string(),
            local: LocalConfig::default(),
            mesh: MeshConfig::default(),
            gateway: TimingConfig::default(),
            metrics: MetricsConfig::default(),
        }
    }
}

impl GatewayConfig {
    /// Load and validate a config file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&content)
    }

    /// Parse and validate YAML text.
    pub fn parse(s: &str) -> Result<Self, ConfigError> {
        // An empty document means "all defaults"
        if s.trim().is_empty() {
            return Ok(Self::default());
        }
        let config: Self = serde_yaml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Render the configuration as YAML.
    pub fn to_yaml(&self) -> Result<String, ConfigError> {
        Ok(serde_yaml::to_string(self)?)
    }

    /// Check value ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.local.address > 0x7F {
            return Err(ConfigError::Invalid(format!(
                "local.address 0x{:02X} is not a 7-bit I2C address",
                self.local.address
            )));
        }
        if self.local.frame_size == 0 {
            return Err(ConfigError::Invalid("local.frame_size must be positive".to_string()));
        }
        if self.gateway.poll_interval_ms == 0 {
            return Err(ConfigError::Invalid(
                "gateway.poll_interval_ms must be positive".to_string(),
            ));
        }
        if self.gateway.relay_interval_secs == 0 {
            return Err(ConfigError::Invalid(
                "gateway.relay_interval_secs must be positive".to_string(),
            ));
        }
        if self.mesh.response_timeout_ms == 0 {
            return Err(ConfigError::Invalid(
                "mesh.response_timeout_ms must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// The `local` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LocalConfig {
    /// I2C character device.
    pub device: String,
    /// 7-bit address of the sensor node.
    pub address: u8,
    /// Register offset sent ahead of reads and writes.
    pub write_offset: u8,
    /// Size of one read block.
    ///
    /// Readings are relayed as single mesh texts, which hold at most
    /// `MAX_TEXT_LEN` (160) bytes; a reading longer than that is read but
    /// fails to send.
    pub frame_size: usize,
}

impl Default for LocalConfig {
    fn default() -> Self {
        let channel = I2cChannelConfig::default();
        Self {
            device: "/dev/i2c-1".to_string(),
            address: channel.address,
            write_offset: channel.write_offset,
            frame_size: channel.frame_size,
        }
    }
}

impl LocalConfig {
    /// Adapter configuration for this section.
    pub fn channel_config(&self) -> I2cChannelConfig {
        I2cChannelConfig {
            address: self.address,
            write_offset: self.write_offset,
            frame_size: self.frame_size,
        }
    }
}

/// How the companion radio is attached.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MeshTransport {
    /// Radio reachable over TCP.
    Tcp {
        /// `host:port` of the radio.
        address: String,
    },
    /// Radio on a serial port.
    Serial {
        /// Serial device path.
        port: String,
        /// Baud rate.
        #[serde(default = "default_baud_rate")]
        baud_rate: u32,
    },
}

fn default_baud_rate() -> u32 {
    115_200
}

impl Default for MeshTransport {
    fn default() -> Self {
        MeshTransport::Tcp {
            address: "127.0.0.1:5000".to_string(),
        }
    }
}

impl std::fmt::Display for MeshTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MeshTransport::Tcp { address } => write!(f, "tcp://{}", address),
            MeshTransport::Serial { port, baud_rate } => write!(f, "{}@{}", port, baud_rate),
        }
    }
}

/// The `mesh` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MeshConfig {
    /// Radio attachment.
    pub transport: MeshTransport,
    /// Channel index for outgoing and accepted incoming text.
    pub channel: u8,
    /// Name announced to the radio.
    pub app_name: String,
    /// How long to wait for the radio to answer a request.
    pub response_timeout_ms: u64,
}

impl Default for MeshConfig {
    fn default() -> Self {
        let companion = CompanionConfig::default();
        Self {
            transport: MeshTransport::default(),
            channel: companion.channel,
            app_name: companion.app_name,
            response_timeout_ms: companion.response_timeout.as_millis() as u64,
        }
    }
}

impl MeshConfig {
    /// Adapter configuration for this section.
    pub fn companion_config(&self) -> CompanionConfig {
        CompanionConfig {
            channel: self.channel,
            app_name: self.app_name.clone(),
            response_timeout: Duration::from_millis(self.response_timeout_ms),
        }
    }
}

/// The `gateway` section.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TimingConfig {
    /// How long a command waits for its acknowledgment.
    pub ack_timeout_ms: u64,
    /// Delay between reads while waiting for an acknowledgment.
    pub poll_interval_ms: u64,
    /// Delay between sensor relays.
    pub relay_interval_secs: u64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        let engine = EngineConfig::default();
        Self {
            ack_timeout_ms: engine.ack_timeout.as_millis() as u64,
            poll_interval_ms: engine.poll_interval.as_millis() as u64,
            relay_interval_secs: 60,
        }
    }
}

impl TimingConfig {
    /// Engine configuration for this section.
    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            ack_timeout: Duration::from_millis(self.ack_timeout_ms),
            poll_interval: Duration::from_millis(self.poll_interval_ms),
        }
    }

    /// Delay between sensor relays.
    pub fn relay_interval(&self) -> Duration {
        Duration::from_secs(self.relay_interval_secs)
    }
}

/// The `metrics` section.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MetricsConfig {
    /// Serve Prometheus metrics on this address (needs the `prometheus` feature).
    pub prometheus_listen: Option<SocketAddr>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = GatewayConfig::default();
        assert_eq!(config.local.address, 0x04);
        assert_eq!(config.local.frame_size, 256);
        assert_eq!(config.gateway.engine_config(), EngineConfig::default());
        assert_eq!(config.gateway.relay_interval(), Duration::from_secs(60));
        assert_eq!(config.mesh.companion_config().response_timeout, Duration::from_secs(3));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_empty_document_is_default() {
        assert_eq!(GatewayConfig::parse("").unwrap(), GatewayConfig::default());
        assert_eq!(GatewayConfig::parse("{}").unwrap(), GatewayConfig::default());
    }

    #[test]
    fn test_transport_display() {
        assert_eq!(MeshTransport::default().to_string(), "tcp://127.0.0.1:5000");
        let serial = MeshTransport::Serial {
            port: "/dev/ttyUSB0".to_string(),
            baud_rate: 9600,
        };
        assert_eq!(serial.to_string(), "/dev/ttyUSB0@9600");
    }
}
