//! Error types for the channel adapters.

use thiserror::Error;

/// A fault on the local bus or the mesh radio.
///
/// Adapters never retry; the first fault of an operation is returned as-is.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The transport could not be opened.
    #[error("failed to open {target}: {reason}")]
    Open {
        /// Device path or address that was being opened.
        target: String,
        /// Why opening failed.
        reason: String,
    },

    /// The peer did not acknowledge its address (absent or not responding).
    #[error("no acknowledgment from device at address 0x{address:02X}")]
    NoAcknowledge {
        /// Bus address of the peer.
        address: u8,
    },

    /// Any other bus-level fault.
    #[error("bus fault: {0}")]
    Bus(String),

    /// I/O error on the underlying stream.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The radio session is down.
    #[error("mesh session is not connected")]
    Disconnected,

    /// The radio refused the request.
    #[error("radio rejected request: {0}")]
    Rejected(String),

    /// The radio did not answer in time.
    #[error("timed out waiting for radio response")]
    ResponseTimeout,

    /// The radio sent something that does not follow the protocol.
    #[error("companion protocol error: {0}")]
    Protocol(#[from] meshlink_companion::ProtocolError),

    /// The payload does not fit the transport's unit size.
    #[error("payload too large: maximum {max} bytes, got {actual}")]
    PayloadTooLarge {
        /// Maximum payload size.
        max: usize,
        /// Actual payload size.
        actual: usize,
    },
}
