//! In-memory channels for tests and dry runs.
//!
//! Both types are cheap to clone; clones share state, so a test can keep one
//! handle while the engine owns another.

use std::collections::VecDeque;
use std::sync::Arc;

use meshlink_frame::Message;
use parking_lot::Mutex;

use crate::mesh::SharedCallback;
use crate::{
    AppPort, LocalChannel, MeshChannel, Packet, ReceiveCallback, TransportError, DEFAULT_FRAME_SIZE,
    MAX_TEXT_LEN,
};

// ============================================================================
// Local
// ============================================================================

type Responder = Arc<dyn Fn(&Message) -> Option<Message> + Send + Sync>;

struct LocalState {
    frame_size: usize,
    inbound: VecDeque<Result<Vec<u8>, TransportError>>,
    write_faults: VecDeque<TransportError>,
    writes: Vec<Vec<u8>>,
    reads: usize,
    offline: bool,
    responder: Option<Responder>,
}

/// An in-memory [`LocalChannel`].
///
/// Reads pop queued frames (or faults) in order and return a zero-filled
/// frame when the queue is empty, like an idle node. Writes are recorded.
#[derive(Clone)]
pub struct MemoryLocalChannel {
    state: Arc<Mutex<LocalState>>,
}

impl Default for MemoryLocalChannel {
    fn default() -> Self {
        Self::new(DEFAULT_FRAME_SIZE)
    }
}

impl MemoryLocalChannel {
    /// Create a channel returning frames of `frame_size` bytes.
    pub fn new(frame_size: usize) -> Self {
        Self {
            state: Arc::new(Mutex::new(LocalState {
                frame_size,
                inbound: VecDeque::new(),
                write_faults: VecDeque::new(),
                writes: Vec::new(),
                reads: 0,
                offline: false,
                responder: None,
            })),
        }
    }

    /// Queue raw frame bytes; they are zero-padded to the frame size on read.
    pub fn push_frame(&self, bytes: impl Into<Vec<u8>>) {
        self.state.lock().inbound.push_back(Ok(bytes.into()));
    }

    /// Queue an encoded message.
    pub fn push_message(&self, message: &Message) {
        if let Ok(bytes) = meshlink_frame::encode(message) {
            self.push_frame(bytes);
        }
    }

    /// Queue a fault returned by one read.
    pub fn push_read_error(&self, err: TransportError) {
        self.state.lock().inbound.push_back(Err(err));
    }

    /// Queue a fault returned by the next write.
    pub fn push_write_error(&self, err: TransportError) {
        self.state.lock().write_faults.push_back(err);
    }

    /// While offline, every read and write fails as if the node were unplugged.
    pub fn set_offline(&self, offline: bool) {
        self.state.lock().offline = offline;
    }

    /// Reply to written messages.
    ///
    /// After every successful write that decodes to a message, `responder` is
    /// called and any message it returns is queued for reading.
    pub fn set_responder<F>(&self, responder: F)
    where
        F: Fn(&Message) -> Option<Message> + Send + Sync + 'static,
    {
        self.state.lock().responder = Some(Arc::new(responder));
    }

    /// Everything written so far, in order.
    pub fn writes(&self) -> Vec<Vec<u8>> {
        self.state.lock().writes.clone()
    }

    /// Written payloads that decode as messages.
    pub fn written_messages(&self) -> Vec<Message> {
        self.state
            .lock()
            .writes
            .iter()
            .filter_map(|w| meshlink_frame::decode(w).ok())
            .collect()
    }

    /// Number of read attempts so far.
    pub fn read_count(&self) -> usize {
        self.state.lock().reads
    }

    /// Number of queued frames and faults not yet read.
    pub fn pending_frames(&self) -> usize {
        self.state.lock().inbound.len()
    }
}

fn offline_error() -> TransportError {
    TransportError::Bus("device offline".to_string())
}

impl LocalChannel for MemoryLocalChannel {
    fn write(&self, bytes: &[u8]) -> Result<(), TransportError> {
        let responder = {
            let mut state = self.state.lock();
            if state.offline {
                return Err(offline_error());
            }
            if let Some(err) = state.write_faults.pop_front() {
                return Err(err);
            }
            if bytes.len() > state.frame_size {
                return Err(TransportError::PayloadTooLarge {
                    max: state.frame_size,
                    actual: bytes.len(),
                });
            }
            state.writes.push(bytes.to_vec());
            state.responder.clone()
        };

        // Run the responder unlocked so it may inspect the channel
        if let Some(responder) = responder {
            let reply = meshlink_frame::decode(bytes)
                .ok()
                .and_then(|message| responder(&message));
            if let Some(reply) = reply {
                self.push_message(&reply);
            }
        }
        Ok(())
    }

    fn read_frame(&self) -> Result<Vec<u8>, TransportError> {
        let mut state = self.state.lock();
        state.reads += 1;
        if state.offline {
            return Err(offline_error());
        }
        let frame_size = state.frame_size;
        match state.inbound.pop_front() {
            Some(Ok(mut frame)) => {
                frame.resize(frame_size.max(frame.len()), 0);
                Ok(frame)
            }
            Some(Err(err)) => Err(err),
            None => Ok(vec![0u8; frame_size]),
        }
    }
}

// ============================================================================
// Mesh
// ============================================================================

struct MeshState {
    sent: Vec<String>,
    send_faults: VecDeque<TransportError>,
    callback: Option<SharedCallback>,
    connected: bool,
}

/// An in-memory [`MeshChannel`].
///
/// Sends longer than [`MAX_TEXT_LEN`] fail the way the radio rejects them.
#[derive(Clone)]
pub struct MemoryMeshChannel {
    state: Arc<Mutex<MeshState>>,
}

impl Default for MemoryMeshChannel {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryMeshChannel {
    /// Create a connected channel.
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(MeshState {
                sent: Vec::new(),
                send_faults: VecDeque::new(),
                callback: None,
                connected: true,
            })),
        }
    }

    /// Deliver a packet as if it arrived from the mesh.
    ///
    /// Returns whether a callback received it. Non-text packets are dropped.
    pub fn deliver(&self, packet: Packet) -> bool {
        if packet.port != AppPort::Text {
            return false;
        }
        let callback = self.state.lock().callback.clone();
        match callback {
            Some(callback) => {
                callback(packet);
                true
            }
            None => false,
        }
    }

    /// Deliver a plain text packet.
    pub fn deliver_text(&self, text: impl Into<String>) -> bool {
        self.deliver(Packet::text(text))
    }

    /// Queue a fault returned by the next send.
    pub fn push_send_error(&self, err: TransportError) {
        self.state.lock().send_faults.push_back(err);
    }

    /// Mark the session up or down.
    pub fn set_connected(&self, connected: bool) {
        self.state.lock().connected = connected;
    }

    /// Texts sent so far, in order.
    pub fn sent_texts(&self) -> Vec<String> {
        self.state.lock().sent.clone()
    }

    /// Whether a receive callback is registered.
    pub fn has_callback(&self) -> bool {
        self.state.lock().callback.is_some()
    }
}

impl MeshChannel for MemoryMeshChannel {
    fn send_text(&self, text: &str) -> Result<(), TransportError> {
        let mut state = self.state.lock();
        if !state.connected {
            return Err(TransportError::Disconnected);
        }
        if let Some(err) = state.send_faults.pop_front() {
            return Err(err);
        }
        if text.len() > MAX_TEXT_LEN {
            return Err(TransportError::PayloadTooLarge {
                max: MAX_TEXT_LEN,
                actual: text.len(),
            });
        }
        state.sent.push(text.to_string());
        Ok(())
    }

    fn on_receive(&self, callback: ReceiveCallback) {
        self.state.lock().callback = Some(Arc::from(callback));
    }

    fn is_connected(&self) -> bool {
        self.state.lock().connected
    }
}
