//! Error types for the gateway engine.

use std::time::Duration;

use meshlink_frame::EncodeError;
use meshlink_transport::TransportError;
use thiserror::Error;

/// Errors surfaced by gateway operations.
///
/// `Timeout` and `Transport` are distinct outcomes: the first means the local
/// node never answered, the second that the bus itself failed.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// The local bus or the mesh radio failed.
    #[error("transport failure: {0}")]
    Transport(#[from] TransportError),

    /// No matching acknowledgment arrived before the deadline.
    #[error("no acknowledgment for command {sequence} within {waited:?}")]
    Timeout {
        /// Sequence number of the unanswered command.
        sequence: u64,
        /// How long the engine waited.
        waited: Duration,
    },

    /// Another command is already awaiting its acknowledgment.
    #[error("command {in_flight} is still awaiting acknowledgment")]
    Busy {
        /// Sequence number of the in-flight command.
        in_flight: u64,
    },

    /// The message is not a sendable command.
    #[error("invalid command: {0}")]
    InvalidCommand(String),

    /// The message could not be encoded.
    #[error("failed to encode message: {0}")]
    Encode(#[from] EncodeError),

    /// A blocking adapter call panicked or was cancelled.
    #[error("adapter call aborted: {0}")]
    Worker(#[from] tokio::task::JoinError),
}

impl GatewayError {
    /// Short name used in logs and metric labels.
    pub fn kind(&self) -> &'static str {
        match self {
            GatewayError::Transport(_) => "transport",
            GatewayError::Timeout { .. } => "timeout",
            GatewayError::Busy { .. } => "busy",
            GatewayError::InvalidCommand(_) => "invalid_command",
            GatewayError::Encode(_) => "encode",
            GatewayError::Worker(_) => "worker",
        }
    }
}
