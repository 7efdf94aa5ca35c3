//! Meshlink frame codec
//!
//! This crate defines the [`Message`] exchanged between the gateway, the local
//! sensor node and the mesh, and the codec that turns messages into the
//! fixed-size frames read from and written to the local bus.
//!
//! # Wire Format
//!
//! Every message is a compact UTF-8 JSON object with a mandatory `type` field:
//!
//! ```text
//! {"type":"command","sequence":7,"relay":"on"}
//! {"type":"acknowledgment","sequence":7,"status":"success"}
//! {"type":"sensor_data","temp":21.5}
//! ```
//!
//! Frames read from the bus are a fixed-size block; the JSON text is followed
//! by zero padding which the decoder strips. Decoding is total: anything that
//! isn't a recognizable message comes back as an [`InvalidFrame`] that says
//! whether nothing was received or garbage was received.
//!
//! # Example
//!
//! ```rust
//! use meshlink_frame::{decode, encode, Message, MessageKind};
//!
//! let msg = Message::command(1).with_field("relay", "on");
//! let bytes = encode(&msg).unwrap();
//!
//! let mut frame = bytes.clone();
//! frame.resize(256, 0);
//! let decoded = decode(&frame).unwrap();
//! assert_eq!(decoded.kind, MessageKind::Command);
//! assert_eq!(decoded, msg);
//! ```

mod codec;
mod error;
mod message;

pub use codec::*;
pub use error::*;
pub use message::*;
