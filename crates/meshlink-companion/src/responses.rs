//! Responses and push notifications from the companion radio.

use crate::constants::*;
use crate::error::*;
use crate::types::*;

/// Responses received from the companion radio.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    /// Generic OK response.
    Ok,

    /// Error response from firmware.
    Error(FirmwareErrorCode),

    /// Feature disabled.
    Disabled,

    /// Self info (response to AppStart).
    SelfInfo(SelfInfo),

    /// Message sent response.
    Sent {
        /// Whether message was sent as flood.
        is_flood: bool,
        /// Expected ACK hash (or tag).
        expected_ack: u32,
        /// Estimated timeout in milliseconds.
        est_timeout_ms: u32,
    },

    /// No more messages in queue.
    NoMoreMessages,

    /// Contact message received (legacy v2).
    ContactMessageV2(ReceivedContactMessage),

    /// Contact message received (v3+).
    ContactMessageV3(ReceivedContactMessage),

    /// Channel message received (legacy v2).
    ChannelMessageV2(ReceivedChannelMessage),

    /// Channel message received (v3+).
    ChannelMessageV3(ReceivedChannelMessage),
}

/// Push notifications from the radio (unsolicited).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PushNotification {
    /// Message send confirmed (ACK received).
    SendConfirmed {
        /// ACK hash that was confirmed.
        ack_hash: u32,
        /// Round-trip time in milliseconds.
        trip_time_ms: u32,
    },

    /// Message waiting in queue.
    MessageWaiting,

    /// A push the gateway does not act on (adverts, path updates, ...).
    Other {
        /// Push code.
        code: u8,
    },
}

/// Either a response or a push notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    /// A response to a command.
    Response(Response),
    /// An unsolicited push notification.
    Push(PushNotification),
}

impl Message {
    /// Decode a message from a frame.
    pub fn decode(frame: &[u8]) -> Result<Self, ProtocolError> {
        let code = *frame.first().ok_or(ProtocolError::FrameTooShort {
            expected: 1,
            actual: 0,
        })?;

        // Push notifications have high bit set
        if code & 0x80 != 0 {
            Ok(Message::Push(PushNotification::decode(frame)?))
        } else {
            Ok(Message::Response(Response::decode(frame)?))
        }
    }
}

fn require_len(frame: &[u8], expected: usize) -> Result<(), ProtocolError> {
    if frame.len() < expected {
        return Err(ProtocolError::FrameTooShort {
            expected,
            actual: frame.len(),
        });
    }
    Ok(())
}

fn read_u32(data: &[u8], at: usize) -> u32 {
    u32::from_le_bytes([data[at], data[at + 1], data[at + 2], data[at + 3]])
}

impl Response {
    /// Decode a response from a frame.
    pub fn decode(frame: &[u8]) -> Result<Self, ProtocolError> {
        require_len(frame, 1)?;
        let code = frame[0];

        match code {
            RESP_CODE_OK => Ok(Response::Ok),

            RESP_CODE_ERR => {
                require_len(frame, 2)?;
                Ok(Response::Error(FirmwareErrorCode::from(frame[1])))
            }

            RESP_CODE_DISABLED => Ok(Response::Disabled),

            RESP_CODE_SELF_INFO => {
                let info = decode_self_info(&frame[1..])?;
                Ok(Response::SelfInfo(info))
            }

            RESP_CODE_SENT => {
                require_len(frame, 10)?;
                Ok(Response::Sent {
                    is_flood: frame[1] != 0,
                    expected_ack: read_u32(frame, 2),
                    est_timeout_ms: read_u32(frame, 6),
                })
            }

            RESP_CODE_NO_MORE_MESSAGES => Ok(Response::NoMoreMessages),

            RESP_CODE_CONTACT_MSG_RECV => {
                let msg = decode_contact_message(&frame[1..], false)?;
                Ok(Response::ContactMessageV2(msg))
            }

            RESP_CODE_CONTACT_MSG_RECV_V3 => {
                let msg = decode_contact_message(&frame[1..], true)?;
                Ok(Response::ContactMessageV3(msg))
            }

            RESP_CODE_CHANNEL_MSG_RECV => {
                let msg = decode_channel_message(&frame[1..], false)?;
                Ok(Response::ChannelMessageV2(msg))
            }

            RESP_CODE_CHANNEL_MSG_RECV_V3 => {
                let msg = decode_channel_message(&frame[1..], true)?;
                Ok(Response::ChannelMessageV3(msg))
            }

            _ => Err(ProtocolError::UnknownResponse(code)),
        }
    }

    /// Encode the response to bytes (without framing).
    ///
    /// Used by simulated radios; legacy message variants are encoded as-is.
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(MAX_FRAME_SIZE);

        match self {
            Response::Ok => buf.push(RESP_CODE_OK),

            Response::Error(code) => {
                buf.push(RESP_CODE_ERR);
                buf.push((*code).into());
            }

            Response::Disabled => buf.push(RESP_CODE_DISABLED),

            Response::SelfInfo(info) => {
                buf.push(RESP_CODE_SELF_INFO);
                buf.push(info.advert_type);
                buf.push(info.tx_power_dbm);
                buf.push(info.max_tx_power_dbm);
                buf.extend_from_slice(&info.public_key.0);
                // gps_lat, gps_lon
                buf.extend_from_slice(&[0u8; 8]);
                // multi_acks, advert_loc_policy, telemetry_modes, manual_add_contacts
                buf.extend_from_slice(&[0u8; 4]);
                buf.extend_from_slice(&info.freq_khz.to_le_bytes());
                buf.extend_from_slice(&info.bandwidth_hz.to_le_bytes());
                buf.push(info.spreading_factor);
                buf.push(info.coding_rate);
                buf.extend_from_slice(info.node_name.as_bytes());
            }

            Response::Sent {
                is_flood,
                expected_ack,
                est_timeout_ms,
            } => {
                buf.push(RESP_CODE_SENT);
                buf.push(u8::from(*is_flood));
                buf.extend_from_slice(&expected_ack.to_le_bytes());
                buf.extend_from_slice(&est_timeout_ms.to_le_bytes());
            }

            Response::NoMoreMessages => buf.push(RESP_CODE_NO_MORE_MESSAGES),

            Response::ContactMessageV2(msg) | Response::ContactMessageV3(msg) => {
                let v3 = matches!(self, Response::ContactMessageV3(_));
                buf.push(if v3 {
                    RESP_CODE_CONTACT_MSG_RECV_V3
                } else {
                    RESP_CODE_CONTACT_MSG_RECV
                });
                if v3 {
                    buf.push(msg.snr_x4.unwrap_or(0) as u8);
                    buf.extend_from_slice(&[0u8; 2]);
                }
                buf.extend_from_slice(&msg.sender_prefix.0);
                buf.push(msg.path_len);
                buf.push(msg.text_type.into());
                buf.extend_from_slice(&msg.timestamp.to_le_bytes());
                buf.extend_from_slice(msg.text.as_bytes());
            }

            Response::ChannelMessageV2(msg) | Response::ChannelMessageV3(msg) => {
                let v3 = matches!(self, Response::ChannelMessageV3(_));
                buf.push(if v3 {
                    RESP_CODE_CHANNEL_MSG_RECV_V3
                } else {
                    RESP_CODE_CHANNEL_MSG_RECV
                });
                if v3 {
                    buf.push(msg.snr_x4.unwrap_or(0) as u8);
                    buf.extend_from_slice(&[0u8; 2]);
                }
                buf.push(msg.channel_idx);
                buf.push(msg.path_len);
                buf.push(msg.text_type.into());
                buf.extend_from_slice(&msg.timestamp.to_le_bytes());
                buf.extend_from_slice(msg.text.as_bytes());
            }
        }

        buf
    }
}

impl PushNotification {
    /// Decode a push notification from a frame.
    pub fn decode(frame: &[u8]) -> Result<Self, ProtocolError> {
        require_len(frame, 1)?;
        let code = frame[0];

        match code {
            PUSH_CODE_SEND_CONFIRMED => {
                require_len(frame, 9)?;
                Ok(PushNotification::SendConfirmed {
                    ack_hash: read_u32(frame, 1),
                    trip_time_ms: read_u32(frame, 5),
                })
            }

            PUSH_CODE_MSG_WAITING => Ok(PushNotification::MessageWaiting),

            _ => Ok(PushNotification::Other { code }),
        }
    }

    /// Encode the push notification to bytes (without framing).
    pub fn encode(&self) -> Vec<u8> {
        match self {
            PushNotification::SendConfirmed {
                ack_hash,
                trip_time_ms,
            } => {
                let mut buf = vec![PUSH_CODE_SEND_CONFIRMED];
                buf.extend_from_slice(&ack_hash.to_le_bytes());
                buf.extend_from_slice(&trip_time_ms.to_le_bytes());
                buf
            }
            PushNotification::MessageWaiting => vec![PUSH_CODE_MSG_WAITING],
            PushNotification::Other { code } => vec![*code],
        }
    }
}

fn decode_self_info(data: &[u8]) -> Result<SelfInfo, ProtocolError> {
    // Minimum: 1 + 1 + 1 + 32 + 4 + 4 + 1 + 1 + 1 + 1 + 4 + 4 + 1 + 1 = 57
    require_len(data, 57)?;

    let mut info = SelfInfo {
        advert_type: data[0],
        tx_power_dbm: data[1],
        max_tx_power_dbm: data[2],
        ..Default::default()
    };
    let mut i = 3;
    // from_slice only fails on a wrong length, which require_len rules out
    info.public_key = PublicKey::from_slice(&data[i..i + PUB_KEY_SIZE]).unwrap_or_default();
    i += PUB_KEY_SIZE;
    // gps_lat, gps_lon, multi_acks, advert_loc_policy, telemetry_modes, manual_add_contacts
    i += 12;
    info.freq_khz = read_u32(data, i);
    i += 4;
    info.bandwidth_hz = read_u32(data, i);
    i += 4;
    info.spreading_factor = data[i];
    i += 1;
    info.coding_rate = data[i];
    i += 1;

    let name_bytes = &data[i..];
    let name_end = name_bytes.iter().position(|&b| b == 0).unwrap_or(name_bytes.len());
    info.node_name = String::from_utf8_lossy(&name_bytes[..name_end]).to_string();

    Ok(info)
}

fn decode_contact_message(data: &[u8], v3: bool) -> Result<ReceivedContactMessage, ProtocolError> {
    // v3 adds 3 leading bytes (snr + reserved)
    // 6 (prefix) + 1 (path_len) + 1 (txt_type) + 4 (timestamp) = 12
    let (snr_x4, body) = if v3 {
        require_len(data, 15)?;
        (Some(data[0] as i8), &data[3..])
    } else {
        require_len(data, 12)?;
        (None, data)
    };

    let sender_prefix = PublicKeyPrefix::from_slice(&body[0..6]).unwrap_or_default();
    let path_len = body[6];
    let text_type = TextType::from(body[7]);
    let timestamp = read_u32(body, 8);

    // Signed messages carry 4 extra bytes before the text
    let text_start = if text_type == TextType::SignedPlain && body.len() >= 16 {
        16
    } else {
        12
    };

    Ok(ReceivedContactMessage {
        sender_prefix,
        path_len,
        text_type,
        timestamp,
        snr_x4,
        text: String::from_utf8_lossy(&body[text_start..]).to_string(),
    })
}

fn decode_channel_message(data: &[u8], v3: bool) -> Result<ReceivedChannelMessage, ProtocolError> {
    // 1 (channel_idx) + 1 (path_len) + 1 (txt_type) + 4 (timestamp) = 7
    let (snr_x4, body) = if v3 {
        require_len(data, 10)?;
        (Some(data[0] as i8), &data[3..])
    } else {
        require_len(data, 7)?;
        (None, data)
    };

    Ok(ReceivedChannelMessage {
        channel_idx: body[0],
        path_len: body[1],
        text_type: TextType::from(body[2]),
        timestamp: read_u32(body, 3),
        snr_x4,
        text: String::from_utf8_lossy(&body[7..]).to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn channel_message(text: &str) -> ReceivedChannelMessage {
        ReceivedChannelMessage {
            channel_idx: 1,
            path_len: PATH_LEN_FLOOD,
            text_type: TextType::Plain,
            timestamp: 1_700_000_000,
            snr_x4: Some(-8),
            text: text.to_string(),
        }
    }

    #[test]
    fn test_channel_message_v3_round_trip() {
        let resp = Response::ChannelMessageV3(channel_message(r#"{"type":"command"}"#));
        let decoded = Response::decode(&resp.encode()).unwrap();
        assert_eq!(decoded, resp);

        if let Response::ChannelMessageV3(msg) = decoded {
            assert_eq!(msg.path_len, PATH_LEN_FLOOD);
            assert_eq!(msg.snr(), Some(-2.0));
        }
    }

    #[test]
    fn test_channel_message_v2_layout() {
        let mut msg = channel_message("hi");
        msg.snr_x4 = None;
        let frame = Response::ChannelMessageV2(msg.clone()).encode();
        assert_eq!(frame.len(), 1 + 7 + 2);
        assert_eq!(Response::decode(&frame).unwrap(), Response::ChannelMessageV2(msg));
    }

    #[test]
    fn test_contact_message_v3() {
        let msg = ReceivedContactMessage {
            sender_prefix: PublicKeyPrefix([1, 2, 3, 4, 5, 6]),
            path_len: 2,
            text_type: TextType::CliData,
            timestamp: 42,
            snr_x4: Some(12),
            text: "status".to_string(),
        };
        let resp = Response::ContactMessageV3(msg);
        assert_eq!(Response::decode(&resp.encode()).unwrap(), resp);
    }

    #[test]
    fn test_self_info_round_trip() {
        let info = SelfInfo {
            advert_type: 1,
            tx_power_dbm: 20,
            max_tx_power_dbm: 22,
            public_key: PublicKey([7u8; PUB_KEY_SIZE]),
            freq_khz: 910_525,
            bandwidth_hz: 62_500,
            spreading_factor: 7,
            coding_rate: 5,
            node_name: "gateway".to_string(),
        };
        let resp = Response::SelfInfo(info);
        assert_eq!(Response::decode(&resp.encode()).unwrap(), resp);
    }

    #[test]
    fn test_sent_and_error() {
        let sent = Response::Sent {
            is_flood: true,
            expected_ack: 0xDEADBEEF,
            est_timeout_ms: 4000,
        };
        assert_eq!(Response::decode(&sent.encode()).unwrap(), sent);

        assert_eq!(
            Response::decode(&[RESP_CODE_ERR, ERR_CODE_TABLE_FULL]).unwrap(),
            Response::Error(FirmwareErrorCode::TableFull)
        );
        assert!(matches!(
            Response::decode(&[RESP_CODE_ERR]),
            Err(ProtocolError::FrameTooShort { expected: 2, actual: 1 })
        ));
    }

    #[test]
    fn test_message_dispatch() {
        assert_eq!(
            Message::decode(&[PUSH_CODE_MSG_WAITING]).unwrap(),
            Message::Push(PushNotification::MessageWaiting)
        );
        assert_eq!(
            Message::decode(&[0x80, 1, 2]).unwrap(),
            Message::Push(PushNotification::Other { code: 0x80 })
        );
        assert_eq!(
            Message::decode(&[RESP_CODE_NO_MORE_MESSAGES]).unwrap(),
            Message::Response(Response::NoMoreMessages)
        );
        assert_eq!(Message::decode(&[0x55]), Err(ProtocolError::UnknownResponse(0x55)));
    }
}
