//! Mesh radio channel.

use std::sync::Arc;

use crate::TransportError;

/// Longest text, in bytes, one mesh packet carries.
///
/// Local frames may be larger; readings that do not fit fail to send with
/// [`TransportError::PayloadTooLarge`].
pub use meshlink_companion::MAX_TEXT_LEN;

/// Application port a mesh packet was addressed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AppPort {
    /// Plain text messages. The only port the gateway consumes.
    Text,
    /// Any other payload type, tagged with the transport's type code.
    Other(u8),
}

impl AppPort {
    /// Short name used in logs and metric labels.
    pub fn as_str(&self) -> &'static str {
        match self {
            AppPort::Text => "text",
            AppPort::Other(_) => "other",
        }
    }
}

/// One delivery unit received from the mesh.
#[derive(Debug, Clone, PartialEq)]
pub struct Packet {
    /// Application port of the payload.
    pub port: AppPort,
    /// Text payload.
    pub text: String,
    /// Channel the packet arrived on (`None` for direct messages).
    pub channel: Option<u8>,
    /// Receive SNR in dB, when the radio reports it.
    pub snr: Option<f32>,
}

impl Packet {
    /// A plain text packet with no radio metadata.
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            port: AppPort::Text,
            text: text.into(),
            channel: None,
            snr: None,
        }
    }
}

/// Callback invoked for every text packet received from the mesh.
///
/// Runs on the transport's delivery thread and must return quickly.
pub type ReceiveCallback = Box<dyn Fn(Packet) + Send + Sync>;

pub(crate) type SharedCallback = Arc<dyn Fn(Packet) + Send + Sync>;

/// The mesh capability the gateway engine needs.
pub trait MeshChannel: Send + Sync {
    /// Send one text packet to the mesh.
    fn send_text(&self, text: &str) -> Result<(), TransportError>;

    /// Register the receive callback, replacing any previous one.
    ///
    /// Only packets on [`AppPort::Text`] are delivered.
    fn on_receive(&self, callback: ReceiveCallback);

    /// Whether the radio session is up.
    fn is_connected(&self) -> bool;
}

impl<T: MeshChannel + ?Sized> MeshChannel for Box<T> {
    fn send_text(&self, text: &str) -> Result<(), TransportError> {
        (**self).send_text(text)
    }

    fn on_receive(&self, callback: ReceiveCallback) {
        (**self).on_receive(callback)
    }

    fn is_connected(&self) -> bool {
        (**self).is_connected()
    }
}

impl<T: MeshChannel + ?Sized> MeshChannel for Arc<T> {
    fn send_text(&self, text: &str) -> Result<(), TransportError> {
        (**self).send_text(text)
    }

    fn on_receive(&self, callback: ReceiveCallback) {
        (**self).on_receive(callback)
    }

    fn is_connected(&self) -> bool {
        (**self).is_connected()
    }
}
