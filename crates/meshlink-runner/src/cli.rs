//! Command-line interface.

use std::net::SocketAddr;
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use meshlink_frame::Message;
use serde_json::Value;

use crate::config::{GatewayConfig, MeshTransport};

/// Gateway between an I2C sensor node and a MeshCore mesh.
#[derive(Debug, Parser)]
#[command(name = "meshlink", version, about)]
pub struct Cli {
    /// Log level when RUST_LOG is not set (error, warn, info, debug, trace)
    #[arg(long, global = true, default_value = "info")]
    pub log_level: String,

    /// Path to a YAML configuration file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Run the gateway until interrupted
    Run(RunArgs),

    /// Send one command to the local node and report the acknowledgment
    Send(SendArgs),

    /// Print the effective configuration as YAML
    Config(RunArgs),
}

/// Overrides for the local bus.
#[derive(Debug, Default, Args)]
pub struct LocalArgs {
    /// I2C device path (e.g. /dev/i2c-1)
    #[arg(long)]
    pub i2c_device: Option<String>,

    /// 7-bit address of the sensor node (decimal or 0x-prefixed hex)
    #[arg(long, value_parser = parse_address)]
    pub i2c_address: Option<u8>,
}

impl LocalArgs {
    /// Apply the overrides to `config`.
    pub fn apply(&self, config: &mut GatewayConfig) {
        if let Some(device) = &self.i2c_device {
            config.local.device = device.clone();
        }
        if let Some(address) = self.i2c_address {
            config.local.address = address;
        }
    }
}

/// Overrides for `run` and `config`.
#[derive(Debug, Default, Args)]
pub struct RunArgs {
    #[command(flatten)]
    pub local: LocalArgs,

    /// Companion radio over TCP (host:port)
    #[arg(long, conflicts_with = "mesh_serial")]
    pub mesh_tcp: Option<String>,

    /// Companion radio on a serial port
    #[arg(long)]
    pub mesh_serial: Option<String>,

    /// Serial baud rate
    #[arg(long, requires = "mesh_serial")]
    pub baud_rate: Option<u32>,

    /// Mesh channel index
    #[arg(long)]
    pub channel: Option<u8>,

    /// Seconds between sensor relays
    #[arg(long)]
    pub relay_interval: Option<u64>,

    /// Serve Prometheus metrics on this address
    #[arg(long)]
    pub metrics_listen: Option<SocketAddr>,
}

impl RunArgs {
    /// Apply the overrides to `config`.
    pub fn apply(&self, config: &mut GatewayConfig) {
        self.local.apply(config);
        if let Some(address) = &self.mesh_tcp {
            config.mesh.transport = MeshTransport::Tcp {
                address: address.clone(),
            };
        }
        if let Some(port) = &self.mesh_serial {
            let baud_rate = match (&config.mesh.transport, self.baud_rate) {
                (_, Some(baud_rate)) => baud_rate,
                (MeshTransport::Serial { baud_rate, .. }, None) => *baud_rate,
                (MeshTransport::Tcp { .. }, None) => 115_200,
            };
            config.mesh.transport = MeshTransport::Serial {
                port: port.clone(),
                baud_rate,
            };
        }
        if let Some(channel) = self.channel {
            config.mesh.channel = channel;
        }
        if let Some(secs) = self.relay_interval {
            config.gateway.relay_interval_secs = secs;
        }
        if let Some(addr) = self.metrics_listen {
            config.metrics.prometheus_listen = Some(addr);
        }
    }
}

/// Arguments for `send`.
#[derive(Debug, Args)]
pub struct SendArgs {
    #[command(flatten)]
    pub local: LocalArgs,

    /// Sequence number of the command
    #[arg(long)]
    pub sequence: u64,

    /// Command argument as key=value; values are parsed as JSON when possible
    #[arg(long = "arg", value_parser = parse_command_arg)]
    pub args: Vec<(String, Value)>,

    /// Acknowledgment timeout in milliseconds
    #[arg(long)]
    pub ack_timeout_ms: Option<u64>,
}

impl SendArgs {
    /// Apply the overrides to `config`.
    pub fn apply(&self, config: &mut GatewayConfig) {
        self.local.apply(config);
        if let Some(ms) = self.ack_timeout_ms {
            config.gateway.ack_timeout_ms = ms;
        }
    }

    /// Build the command message.
    pub fn message(&self) -> Message {
        self.args
            .iter()
            .fold(Message::command(self.sequence), |msg, (key, value)| {
                msg.with_field(key.clone(), value.clone())
            })
    }
}

/// Parse an I2C address in decimal or `0x` hex.
pub fn parse_address(s: &str) -> Result<u8, String> {
    let parsed = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => u8::from_str_radix(hex, 16),
        None => s.parse(),
    };
    match parsed {
        Ok(address) if address <= 0x7F => Ok(address),
        Ok(address) => Err(format!("0x{:02X} is not a 7-bit address", address)),
        Err(e) => Err(format!("invalid address '{}': {}", s, e)),
    }
}

/// Parse `key=value`, taking the value as JSON if it parses and as a string
/// otherwise.
pub fn parse_command_arg(s: &str) -> Result<(String, Value), String> {
    let (key, raw) = s
        .split_once('=')
        .ok_or_else(|| format!("expected key=value, got '{}'", s))?;
    if key.is_empty() {
        return Err(format!("empty key in '{}'", s));
    }
    let value = serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()));
    Ok((key.to_string(), value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_address() {
        assert_eq!(parse_address("4"), Ok(4));
        assert_eq!(parse_address("0x48"), Ok(0x48));
        assert!(parse_address("0x80").is_err());
        assert!(parse_address("bus").is_err());
    }

    #[test]
    fn test_parse_command_arg() {
        assert_eq!(
            parse_command_arg("seconds=30"),
            Ok(("seconds".to_string(), serde_json::json!(30)))
        );
        assert_eq!(
            parse_command_arg("action=water"),
            Ok(("action".to_string(), serde_json::json!("water")))
        );
        assert!(parse_command_arg("novalue").is_err());
        assert!(parse_command_arg("=1").is_err());
    }

    #[test]
    fn test_run_overrides() {
        let cli = Cli::try_parse_from([
            "meshlink",
            "run",
            "--i2c-address",
            "0x10",
            "--mesh-serial",
            "/dev/ttyACM0",
            "--channel",
            "2",
        ])
        .unwrap();

        let Commands::Run(args) = cli.command else {
            panic!("expected run");
        };
        let mut config = GatewayConfig::default();
        args.apply(&mut config);

        assert_eq!(config.local.address, 0x10);
        assert_eq!(config.mesh.channel, 2);
        assert_eq!(
            config.mesh.transport,
            MeshTransport::Serial {
                port: "/dev/ttyACM0".to_string(),
                baud_rate: 115_200
            }
        );
    }

    #[test]
    fn test_mesh_transports_conflict() {
        let result = Cli::try_parse_from([
            "meshlink",
            "run",
            "--mesh-tcp",
            "radio:5000",
            "--mesh-serial",
            "/dev/ttyUSB0",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_send_message() {
        let cli = Cli::try_parse_from([
            "meshlink",
            "--log-level",
            "debug",
            "send",
            "--sequence",
            "7",
            "--arg",
            "action=water",
            "--arg",
            "seconds=30",
        ])
        .unwrap();
        assert_eq!(cli.log_level, "debug");

        let Commands::Send(args) = cli.command else {
            panic!("expected send");
        };
        let message = args.message();
        assert_eq!(message.sequence, Some(7));
        assert_eq!(message.field("seconds"), Some(&serde_json::json!(30)));
        assert_eq!(
            meshlink_frame::encode_text(&message).unwrap(),
            r#"{"type":"command","sequence":7,"action":"water","seconds":30}"#
        );
    }
}
