//! MeshCore Companion UART Protocol (gateway subset)
//!
//! This crate provides the part of the MeshCore companion UART protocol that a
//! gateway needs to use a companion radio as a text transport: starting the
//! app session, sending channel text messages, and draining received messages.
//!
//! # Protocol Overview
//!
//! Messages are framed (see [`FrameCodec`]) and start with a code byte:
//!
//! - **Commands** (host → radio): Start with a `CMD_*` byte
//! - **Responses** (radio → host): Start with a `RESP_CODE_*` byte
//! - **Push notifications** (radio → host): Start with a `PUSH_CODE_*` byte (0x80+)
//!
//! Received text messages are not pushed directly. The radio pushes
//! `PUSH_CODE_MSG_WAITING` and the host pulls each queued message with
//! `CMD_SYNC_NEXT_MESSAGE` until it gets `RESP_CODE_NO_MORE_MESSAGES`.
//!
//! # Example
//!
//! ```rust
//! use meshlink_companion::{Command, FrameCodec, TextType};
//!
//! let cmd = Command::SendChannelTextMessage {
//!     text_type: TextType::Plain,
//!     channel_idx: 0,
//!     timestamp: 1_700_000_000,
//!     text: "{\"type\":\"sensor_data\"}".to_string(),
//! };
//! let frame = FrameCodec::encode(&cmd.encode());
//! assert_eq!(frame[0], b'<');
//! ```

mod commands;
mod constants;
mod error;
mod frame;
mod responses;
mod types;

pub use commands::*;
pub use constants::*;
pub use error::*;
pub use frame::*;
pub use responses::*;
pub use types::*;
