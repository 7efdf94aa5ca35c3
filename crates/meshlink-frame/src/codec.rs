//! JSON frame encoding/decoding.
//!
//! Frames read from the local node are a fixed-size block: the JSON text,
//! followed by zero bytes up to the block size.
//!
//! ```text
//! +---------------------------------+-----------------+
//! | {"type":"sensor_data",...}      | 00 00 ... 00    |
//! +---------------------------------+-----------------+
//! |<-------------- DEFAULT_FRAME_SIZE --------------->|
//! ```

use serde_json::Value;

use crate::{EncodeError, InvalidFrame, Message, MessageKind};

/// Default size of a frame read from the local node.
pub const DEFAULT_FRAME_SIZE: usize = 256;

/// Encode a message as compact UTF-8 JSON.
pub fn encode(message: &Message) -> Result<Vec<u8>, EncodeError> {
    Ok(serde_json::to_vec(message)?)
}

/// Encode a message as a JSON string (for text transports).
pub fn encode_text(message: &Message) -> Result<String, EncodeError> {
    Ok(serde_json::to_string(message)?)
}

/// Strip the trailing zero padding from a frame.
pub fn trim_padding(frame: &[u8]) -> &[u8] {
    let end = frame.iter().rposition(|&b| b != 0).map_or(0, |i| i + 1);
    &frame[..end]
}

/// Decode a frame read from the local node.
///
/// Never panics; anything that isn't a message is reported as an [`InvalidFrame`].
pub fn decode(frame: &[u8]) -> Result<Message, InvalidFrame> {
    let data = trim_padding(frame);
    if data.is_empty() {
        return Err(InvalidFrame::Empty);
    }

    let text = std::str::from_utf8(data)
        .map_err(|e| InvalidFrame::Malformed(format!("invalid UTF-8: {}", e)))?;
    decode_text(text)
}

/// Decode a message from text (mesh payloads).
pub fn decode_text(text: &str) -> Result<Message, InvalidFrame> {
    let text = text.trim_end_matches('\0');
    if text.is_empty() {
        return Err(InvalidFrame::Empty);
    }

    let value: Value =
        serde_json::from_str(text).map_err(|e| InvalidFrame::Malformed(e.to_string()))?;

    let object = value
        .as_object()
        .ok_or_else(|| InvalidFrame::Unclassifiable("not a JSON object".to_string()))?;

    match object.get("type") {
        Some(Value::String(name)) if MessageKind::from_wire(name).is_some() => {}
        Some(Value::String(name)) => {
            return Err(InvalidFrame::Unclassifiable(format!("unknown type '{}'", name)));
        }
        Some(other) => {
            return Err(InvalidFrame::Unclassifiable(format!("type is not a string: {}", other)));
        }
        None => return Err(InvalidFrame::Unclassifiable("missing type".to_string())),
    }

    serde_json::from_value(value).map_err(|e| InvalidFrame::Malformed(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::AckStatus;

    fn padded(text: &str) -> Vec<u8> {
        let mut frame = text.as_bytes().to_vec();
        frame.resize(DEFAULT_FRAME_SIZE, 0);
        frame
    }

    #[test]
    fn test_encode_field_order() {
        let msg = Message::acknowledgment(1, AckStatus::Success);
        assert_eq!(
            encode_text(&msg).unwrap(),
            r#"{"type":"acknowledgment","sequence":1,"status":"success"}"#
        );

        let reading = Message::sensor_data().with_field("temp", 21.5);
        assert_eq!(encode_text(&reading).unwrap(), r#"{"type":"sensor_data","temp":21.5}"#);
    }

    #[test]
    fn test_round_trip() {
        let messages = [
            Message::command(1),
            Message::command(u64::MAX).with_field("relay", "on").with_field("level", 3),
            Message::acknowledgment(42, AckStatus::Failure).with_field("reason", "busy"),
            Message::sensor_data()
                .with_field("temp", 21.5)
                .with_field("humidity", 40)
                .with_field("tags", serde_json::json!(["a", "b"])),
        ];

        for msg in messages {
            let frame = {
                let mut bytes = encode(&msg).unwrap();
                bytes.resize(DEFAULT_FRAME_SIZE, 0);
                bytes
            };
            assert_eq!(decode(&frame).unwrap(), msg);
        }
    }

    #[test]
    fn test_decode_padded_frame() {
        let msg = decode(&padded(r#"{"type":"sensor_data","temp":21.5}"#)).unwrap();
        assert_eq!(msg.kind, MessageKind::SensorData);
        assert_eq!(msg.field("temp"), Some(&Value::from(21.5)));
        assert_eq!(msg.sequence, None);
    }

    #[test]
    fn test_decode_empty_and_zero_frames() {
        assert_eq!(decode(&[]), Err(InvalidFrame::Empty));
        assert_eq!(decode(&[0u8; DEFAULT_FRAME_SIZE]), Err(InvalidFrame::Empty));
        assert!(decode(&[0u8; 4]).unwrap_err().is_empty());
    }

    #[test]
    fn test_decode_garbage_is_distinct_from_empty() {
        let err = decode(&padded("not-json")).unwrap_err();
        assert!(matches!(err, InvalidFrame::Malformed(_)));
        assert!(!err.is_empty());

        let err = decode(&[0xFF, 0xFE, 0x00]).unwrap_err();
        assert!(matches!(err, InvalidFrame::Malformed(_)));
    }

    #[test]
    fn test_decode_unclassifiable() {
        for text in [
            r#"{"sequence":1}"#,
            r#"{"type":"telemetry"}"#,
            r#"{"type":7}"#,
            r#"[1,2,3]"#,
            r#""command""#,
        ] {
            let err = decode(&padded(text)).unwrap_err();
            assert!(matches!(err, InvalidFrame::Unclassifiable(_)), "{}: {:?}", text, err);
        }
    }

    #[test]
    fn test_decode_wrong_field_shape() {
        let err = decode(&padded(r#"{"type":"command","sequence":"one"}"#)).unwrap_err();
        assert!(matches!(err, InvalidFrame::Malformed(_)));

        let err = decode(&padded(r#"{"type":"acknowledgment","sequence":1,"status":"maybe"}"#))
            .unwrap_err();
        assert!(matches!(err, InvalidFrame::Malformed(_)));
    }

    #[test]
    fn test_decode_text() {
        let msg = decode_text(r#"{"type":"command","sequence":9,"relay":"off"}"#).unwrap();
        assert_eq!(msg, Message::command(9).with_field("relay", "off"));
        assert_eq!(decode_text(""), Err(InvalidFrame::Empty));
    }

    #[test]
    fn test_trim_padding() {
        assert_eq!(trim_padding(b"ab\0\0"), b"ab");
        assert_eq!(trim_padding(b"a\0b\0"), b"a\0b");
        assert_eq!(trim_padding(b"\0\0"), b"");
    }
}
