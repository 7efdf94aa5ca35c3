//! Gateway engine bridging a local sensor node and a mesh network.
//!
//! The engine owns one [`LocalChannel`](meshlink_transport::LocalChannel) and
//! one [`MeshChannel`](meshlink_transport::MeshChannel) and implements:
//!
//! - the command handshake: write a command to the local node, then poll for
//!   the acknowledgment carrying the same sequence number until a deadline
//!   ([`GatewayEngine::send_command`]);
//! - mesh command intake ([`GatewayEngine::on_mesh_command`]);
//! - sensor relay from the local node to the mesh
//!   ([`GatewayEngine::relay_sensor_reading`]).
//!
//! At most one command is in flight at a time. Frames that are invalid or do
//! not answer the pending command are classification outcomes, never errors.
//!
//! # Example
//!
//! ```rust
//! use meshlink_frame::{AckStatus, Message};
//! use meshlink_gateway::{EngineConfig, GatewayEngine};
//! use meshlink_transport::memory::{MemoryLocalChannel, MemoryMeshChannel};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let local = MemoryLocalChannel::default();
//! local.set_responder(|cmd| {
//!     cmd.sequence.map(|seq| Message::acknowledgment(seq, AckStatus::Success))
//! });
//!
//! let engine = GatewayEngine::new(local, MemoryMeshChannel::new(), EngineConfig::default());
//! assert_eq!(engine.send_command(&Message::command(1)).await.unwrap(), true);
//! # }
//! ```

mod classify;
mod engine;
mod error;

pub use classify::*;
pub use engine::*;
pub use error::*;
