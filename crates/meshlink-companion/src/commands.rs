//! Commands that can be sent to the companion radio.

use crate::constants::*;
use crate::error::ProtocolError;
use crate::types::*;

/// Commands that can be sent to the companion radio.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Start the app connection and get self info.
    AppStart {
        /// Reserved bytes (7 bytes).
        reserved: [u8; 7],
        /// App name string.
        app_name: String,
    },

    /// Send a text message to a channel.
    SendChannelTextMessage {
        /// Message type (should be Plain).
        text_type: TextType,
        /// Channel index.
        channel_idx: u8,
        /// Message timestamp.
        timestamp: u32,
        /// Message text.
        text: String,
    },

    /// Get the next message from the queue.
    SyncNextMessage,
}

impl Command {
    /// Build an `AppStart` command for the given app name.
    pub fn app_start(app_name: impl Into<String>) -> Self {
        Command::AppStart {
            reserved: [0u8; 7],
            app_name: app_name.into(),
        }
    }

    /// The command code byte.
    pub fn code(&self) -> u8 {
        match self {
            Command::AppStart { .. } => CMD_APP_START,
            Command::SendChannelTextMessage { .. } => CMD_SEND_CHANNEL_TXT_MSG,
            Command::SyncNextMessage => CMD_SYNC_NEXT_MESSAGE,
        }
    }

    /// Encode the command to bytes (without framing).
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(MAX_FRAME_SIZE);
        buf.push(self.code());

        match self {
            Command::AppStart { reserved, app_name } => {
                buf.extend_from_slice(reserved);
                buf.extend_from_slice(app_name.as_bytes());
            }

            Command::SendChannelTextMessage {
                text_type,
                channel_idx,
                timestamp,
                text,
            } => {
                buf.push((*text_type).into());
                buf.push(*channel_idx);
                buf.extend_from_slice(&timestamp.to_le_bytes());
                buf.extend_from_slice(text.as_bytes());
            }

            Command::SyncNextMessage => {}
        }

        buf
    }

    /// Decode a command from a frame (radio side).
    pub fn decode(frame: &[u8]) -> Result<Self, ProtocolError> {
        let (&code, data) = frame.split_first().ok_or(ProtocolError::FrameTooShort {
            expected: 1,
            actual: 0,
        })?;

        match code {
            CMD_APP_START => {
                if data.len() < 7 {
                    return Err(ProtocolError::FrameTooShort {
                        expected: 8,
                        actual: frame.len(),
                    });
                }
                let mut reserved = [0u8; 7];
                reserved.copy_from_slice(&data[..7]);
                let app_name = String::from_utf8(data[7..].to_vec())
                    .map_err(|_| ProtocolError::InvalidUtf8)?;
                Ok(Command::AppStart { reserved, app_name })
            }

            CMD_SEND_CHANNEL_TXT_MSG => {
                // 1 (txt_type) + 1 (channel_idx) + 4 (timestamp) = 6
                if data.len() < 6 {
                    return Err(ProtocolError::FrameTooShort {
                        expected: 7,
                        actual: frame.len(),
                    });
                }
                let text = String::from_utf8(data[6..].to_vec())
                    .map_err(|_| ProtocolError::InvalidUtf8)?;
                Ok(Command::SendChannelTextMessage {
                    text_type: TextType::from(data[0]),
                    channel_idx: data[1],
                    timestamp: u32::from_le_bytes([data[2], data[3], data[4], data[5]]),
                    text,
                })
            }

            CMD_SYNC_NEXT_MESSAGE => Ok(Command::SyncNextMessage),

            _ => Err(ProtocolError::UnknownCommand(code)),
        }
    }
}
