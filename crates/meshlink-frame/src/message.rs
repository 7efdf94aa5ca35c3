//! Message model shared by the local node, the gateway and the mesh.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Field names owned by the message header; never stored in the payload.
pub const RESERVED_FIELDS: &[&str] = &["type", "sequence", "status"];

/// The kind of a message, carried in its `type` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageKind {
    /// Sensor readings published by the local node.
    SensorData,
    /// Reply from the local node to a command.
    Acknowledgment,
    /// Instruction for the local node.
    Command,
}

impl MessageKind {
    /// Returns the wire name of the kind.
    pub const fn as_str(&self) -> &'static str {
        match self {
            MessageKind::SensorData => "sensor_data",
            MessageKind::Acknowledgment => "acknowledgment",
            MessageKind::Command => "command",
        }
    }

    /// Parses a wire name. Unknown names return `None`.
    pub fn from_wire(name: &str) -> Option<Self> {
        match name {
            "sensor_data" => Some(MessageKind::SensorData),
            "acknowledgment" => Some(MessageKind::Acknowledgment),
            "command" => Some(MessageKind::Command),
            _ => None,
        }
    }
}

impl std::fmt::Display for MessageKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome reported by an acknowledgment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AckStatus {
    /// The local node executed the command.
    Success,
    /// The local node rejected or failed the command.
    Failure,
}

impl AckStatus {
    /// Whether this status reports success.
    pub fn is_success(&self) -> bool {
        matches!(self, AckStatus::Success)
    }
}

/// A message exchanged over either transport.
///
/// `sequence` correlates a command with its acknowledgment and `status` is only
/// meaningful on acknowledgments. Everything else (sensor readings, command
/// arguments) lives in `payload`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Message kind (`type` on the wire).
    #[serde(rename = "type")]
    pub kind: MessageKind,

    /// Correlation id for commands and acknowledgments.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sequence: Option<u64>,

    /// Acknowledgment outcome.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<AckStatus>,

    /// Additional fields.
    #[serde(flatten)]
    pub payload: Map<String, Value>,
}

impl Message {
    /// Create an empty message of the given kind.
    pub fn new(kind: MessageKind) -> Self {
        Message {
            kind,
            sequence: None,
            status: None,
            payload: Map::new(),
        }
    }

    /// Create a command with the given sequence number.
    pub fn command(sequence: u64) -> Self {
        Message {
            sequence: Some(sequence),
            ..Message::new(MessageKind::Command)
        }
    }

    /// Create an acknowledgment for the given sequence number.
    pub fn acknowledgment(sequence: u64, status: AckStatus) -> Self {
        Message {
            sequence: Some(sequence),
            status: Some(status),
            ..Message::new(MessageKind::Acknowledgment)
        }
    }

    /// Create an empty sensor reading.
    pub fn sensor_data() -> Self {
        Message::new(MessageKind::SensorData)
    }

    /// Add a payload field. Header names in [`RESERVED_FIELDS`] are ignored.
    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        let key = key.into();
        if !RESERVED_FIELDS.contains(&key.as_str()) {
            self.payload.insert(key, value.into());
        }
        self
    }

    /// Look up a payload field.
    pub fn field(&self, key: &str) -> Option<&Value> {
        self.payload.get(key)
    }

    /// Whether this message answers the command with the given sequence number.
    pub fn acknowledges(&self, sequence: u64) -> bool {
        self.kind == MessageKind::Acknowledgment && self.sequence == Some(sequence)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_wire_names() {
        for kind in [MessageKind::SensorData, MessageKind::Acknowledgment, MessageKind::Command] {
            assert_eq!(MessageKind::from_wire(kind.as_str()), Some(kind));
        }
        assert_eq!(MessageKind::from_wire("telemetry"), None);
    }

    #[test]
    fn test_with_field_skips_reserved_names() {
        let msg = Message::command(3)
            .with_field("relay", "on")
            .with_field("sequence", 99);

        assert_eq!(msg.sequence, Some(3));
        assert_eq!(msg.field("relay"), Some(&Value::from("on")));
        assert!(msg.field("sequence").is_none());
    }

    #[test]
    fn test_acknowledges_requires_matching_sequence() {
        let ack = Message::acknowledgment(5, AckStatus::Success);
        assert!(ack.acknowledges(5));
        assert!(!ack.acknowledges(6));
        assert!(!Message::command(5).acknowledges(5));
    }
}
