//! Classification of frames read from the local node.

use meshlink_frame::{InvalidFrame, Message, MessageKind};

/// What a frame read from the local node turned out to be.
#[derive(Debug, Clone, PartialEq)]
pub enum Classification {
    /// A sensor reading to relay.
    SensorData(Message),
    /// An acknowledgment, possibly for the pending command.
    Acknowledgment(Message),
    /// Nothing usable; discard.
    Invalid(InvalidFrame),
}

impl Classification {
    /// Whether the frame carried a usable message.
    pub fn is_valid(&self) -> bool {
        !matches!(self, Classification::Invalid(_))
    }
}

/// Classify one frame read from the local node.
///
/// Total: every input maps to a classification. A well-formed `command` is
/// invalid in this direction, since only the gateway issues commands.
pub fn classify_inbound(frame: &[u8]) -> Classification {
    match meshlink_frame::decode(frame) {
        Ok(message) => match message.kind {
            MessageKind::SensorData => Classification::SensorData(message),
            MessageKind::Acknowledgment => Classification::Acknowledgment(message),
            MessageKind::Command => Classification::Invalid(InvalidFrame::Unexpected(message.kind)),
        },
        Err(invalid) => Classification::Invalid(invalid),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use meshlink_frame::AckStatus;

    fn padded(text: &str) -> Vec<u8> {
        let mut frame = text.as_bytes().to_vec();
        frame.resize(256, 0);
        frame
    }

    #[test]
    fn test_sensor_data() {
        match classify_inbound(&padded(r#"{"type":"sensor_data","temp":21.5}"#)) {
            Classification::SensorData(msg) => {
                assert_eq!(msg.field("temp"), Some(&serde_json::json!(21.5)));
            }
            other => panic!("unexpected classification: {:?}", other),
        }
    }

    #[test]
    fn test_acknowledgment() {
        let frame = padded(r#"{"type":"acknowledgment","sequence":3,"status":"failure"}"#);
        assert_eq!(
            classify_inbound(&frame),
            Classification::Acknowledgment(Message::acknowledgment(3, AckStatus::Failure))
        );
    }

    #[test]
    fn test_invalid_frames() {
        assert_eq!(
            classify_inbound(&[0u8; 256]),
            Classification::Invalid(InvalidFrame::Empty)
        );
        assert!(matches!(
            classify_inbound(&padded("not-json")),
            Classification::Invalid(InvalidFrame::Malformed(_))
        ));
        assert!(matches!(
            classify_inbound(&padded(r#"{"type":"telemetry"}"#)),
            Classification::Invalid(InvalidFrame::Unclassifiable(_))
        ));
        assert!(!classify_inbound(&[]).is_valid());
    }

    #[test]
    fn test_command_from_local_node_is_unexpected() {
        assert_eq!(
            classify_inbound(&padded(r#"{"type":"command","sequence":1}"#)),
            Classification::Invalid(InvalidFrame::Unexpected(MessageKind::Command))
        );
    }
}
