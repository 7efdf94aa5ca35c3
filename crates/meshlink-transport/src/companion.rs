//! Mesh channel backed by a MeshCore companion radio.
//!
//! The radio is driven over the companion UART protocol, carried either by a
//! TCP stream (radios with a WiFi bridge, or a simulator) or a serial port.
//! A dedicated reader thread decodes radio frames: responses to our own
//! requests are handed to the requesting caller over a channel, queued
//! messages are pulled with `SyncNextMessage` and delivered to the receive
//! callback.

use std::io::{self, Read, Write};
use std::net::TcpStream;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};
use meshlink_companion::{
    Command, FrameCodec, PushNotification, ReceivedChannelMessage, ReceivedContactMessage,
    Response, SelfInfo, TextType, MAX_TEXT_LEN,
};
use parking_lot::Mutex;
use tracing::{debug, info, trace, warn};

use crate::mesh::SharedCallback;
use crate::{AppPort, MeshChannel, Packet, ReceiveCallback, TransportError};

/// Read timeout applied to the underlying stream so the reader thread can
/// observe shutdown.
const READ_POLL_TIMEOUT: Duration = Duration::from_millis(250);

/// Configuration for [`CompanionMeshChannel`].
#[derive(Debug, Clone)]
pub struct CompanionConfig {
    /// Channel index used for outgoing text and accepted for incoming text.
    pub channel: u8,
    /// Application name announced in `AppStart`.
    pub app_name: String,
    /// How long to wait for the radio to answer a request.
    pub response_timeout: Duration,
}

impl Default for CompanionConfig {
    fn default() -> Self {
        Self {
            channel: 0,
            app_name: "meshlink".to_string(),
            response_timeout: Duration::from_secs(3),
        }
    }
}

// ============================================================================
// Stream plumbing
// ============================================================================

/// Adapts a boxed serial port to plain `Read`/`Write`.
struct SerialIo(Box<dyn serialport::SerialPort>);

impl Read for SerialIo {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.0.read(buf)
    }
}

impl Write for SerialIo {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.0.flush()
    }
}

// ============================================================================
// Shared state
// ============================================================================

struct Shared {
    writer: Mutex<Box<dyn Write + Send>>,
    callback: Mutex<Option<SharedCallback>>,
    connected: AtomicBool,
    shutdown: AtomicBool,
    config: CompanionConfig,
}

impl Shared {
    fn write_command(&self, command: &Command) -> Result<(), TransportError> {
        let frame = FrameCodec::encode(&command.encode());
        let mut writer = self.writer.lock();
        writer.write_all(&frame)?;
        writer.flush()?;
        trace!(code = command.code(), len = frame.len(), "sent companion frame");
        Ok(())
    }

    fn request_next_message(&self) {
        if let Err(e) = self.write_command(&Command::SyncNextMessage) {
            warn!("failed to request queued message: {}", e);
        }
    }

    fn deliver(&self, packet: Packet) {
        if packet.port != AppPort::Text {
            debug!(port = ?packet.port, "ignoring non-text mesh packet");
            return;
        }
        // Clone the callback out so it runs without the lock held
        let callback = self.callback.lock().clone();
        match callback {
            Some(callback) => callback(packet),
            None => debug!("no receive callback registered, dropping packet"),
        }
    }

    fn handle_frame(&self, frame: &[u8], responses: &Sender<Response>) {
        let message = match meshlink_companion::Message::decode(frame) {
            Ok(message) => message,
            Err(e) => {
                warn!("undecodable companion frame: {}", e);
                return;
            }
        };

        match message {
            meshlink_companion::Message::Push(PushNotification::MessageWaiting) => {
                self.request_next_message();
            }
            meshlink_companion::Message::Push(push) => {
                trace!(?push, "ignoring push notification");
            }
            meshlink_companion::Message::Response(response) => match response {
                Response::ContactMessageV2(msg) | Response::ContactMessageV3(msg) => {
                    self.deliver(contact_packet(msg));
                    self.request_next_message();
                }
                Response::ChannelMessageV2(msg) | Response::ChannelMessageV3(msg) => {
                    if msg.channel_idx == self.config.channel {
                        self.deliver(channel_packet(msg));
                    } else {
                        debug!(channel = msg.channel_idx, "ignoring message on other channel");
                    }
                    self.request_next_message();
                }
                Response::NoMoreMessages => trace!("message queue drained"),
                other => {
                    // Nobody waiting is fine; late answers are dropped
                    let _ = responses.try_send(other);
                }
            },
        }
    }
}

fn port_for(text_type: TextType) -> AppPort {
    match text_type {
        TextType::Plain => AppPort::Text,
        other => AppPort::Other(other.into()),
    }
}

fn contact_packet(msg: ReceivedContactMessage) -> Packet {
    Packet {
        port: port_for(msg.text_type),
        snr: msg.snr(),
        channel: None,
        text: msg.text,
    }
}

fn channel_packet(msg: ReceivedChannelMessage) -> Packet {
    Packet {
        port: port_for(msg.text_type),
        snr: msg.snr(),
        channel: Some(msg.channel_idx),
        text: msg.text,
    }
}

fn reader_loop<R: Read>(shared: Arc<Shared>, mut reader: R, responses: Sender<Response>) {
    let mut codec = FrameCodec::new();
    let mut buf = [0u8; 512];

    while !shared.shutdown.load(Ordering::Acquire) {
        match reader.read(&mut buf) {
            Ok(0) => {
                warn!("companion radio closed the connection");
                break;
            }
            Ok(n) => {
                codec.push(&buf[..n]);
                while let Some(frame) = codec.decode() {
                    shared.handle_frame(&frame, &responses);
                }
            }
            Err(e)
                if matches!(
                    e.kind(),
                    io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock | io::ErrorKind::Interrupted
                ) => {}
            Err(e) => {
                warn!("companion radio read failed: {}", e);
                break;
            }
        }
    }

    shared.connected.store(false, Ordering::Release);
    debug!("companion reader stopped");
}

// ============================================================================
// Channel
// ============================================================================

/// A [`MeshChannel`] talking to a MeshCore companion radio.
pub struct CompanionMeshChannel {
    shared: Arc<Shared>,
    responses: Receiver<Response>,
    /// Serializes request/response exchanges with the radio.
    request_lock: Mutex<()>,
    self_info: SelfInfo,
    reader: Mutex<Option<JoinHandle<()>>>,
}

impl CompanionMeshChannel {
    /// Connect to a companion radio exposed over TCP.
    pub fn connect_tcp(address: &str, config: CompanionConfig) -> Result<Self, TransportError> {
        let stream = TcpStream::connect(address).map_err(|e| TransportError::Open {
            target: address.to_string(),
            reason: e.to_string(),
        })?;
        stream.set_nodelay(true)?;
        stream.set_read_timeout(Some(READ_POLL_TIMEOUT))?;
        let reader = stream.try_clone()?;
        info!(address, "connected to companion radio over TCP");
        Self::establish(reader, stream, config)
    }

    /// Open a companion radio attached to a serial port.
    pub fn open_serial(
        path: &str,
        baud_rate: u32,
        config: CompanionConfig,
    ) -> Result<Self, TransportError> {
        let open_error = |e: serialport::Error| TransportError::Open {
            target: path.to_string(),
            reason: e.to_string(),
        };
        let port = serialport::new(path, baud_rate)
            .timeout(READ_POLL_TIMEOUT)
            .open()
            .map_err(open_error)?;
        let reader = port.try_clone().map_err(open_error)?;
        info!(path, baud_rate, "opened companion radio serial port");
        Self::establish(SerialIo(reader), SerialIo(port), config)
    }

    /// Run the session handshake over an already-open byte stream.
    ///
    /// `reader` should return `TimedOut` or `WouldBlock` periodically rather
    /// than block forever, or the reader thread cannot stop until the peer
    /// closes the stream.
    pub fn establish<R, W>(reader: R, writer: W, config: CompanionConfig) -> Result<Self, TransportError>
    where
        R: Read + Send + 'static,
        W: Write + Send + 'static,
    {
        let shared = Arc::new(Shared {
            writer: Mutex::new(Box::new(writer)),
            callback: Mutex::new(None),
            connected: AtomicBool::new(true),
            shutdown: AtomicBool::new(false),
            config,
        });
        let (tx, rx) = crossbeam_channel::bounded(16);

        let thread_shared = shared.clone();
        let handle = thread::Builder::new()
            .name("companion-reader".to_string())
            .spawn(move || reader_loop(thread_shared, reader, tx))?;

        let mut channel = Self {
            shared,
            responses: rx,
            request_lock: Mutex::new(()),
            self_info: SelfInfo::default(),
            reader: Mutex::new(Some(handle)),
        };

        let app_start = Command::app_start(channel.shared.config.app_name.clone());
        let result = channel.request(&app_start, |response| match response {
            Response::SelfInfo(info) => Some(Ok(info)),
            Response::Error(code) => Some(Err(TransportError::Rejected(code.to_string()))),
            _ => None,
        });

        match result {
            Ok(info) => {
                info!(
                    node = %info.node_name,
                    key = %info.public_key.prefix().to_hex(),
                    freq_khz = info.freq_khz,
                    "companion session established"
                );
                channel.self_info = info;
            }
            Err(e) => {
                channel.close();
                return Err(e);
            }
        }

        Ok(channel)
    }

    /// Node information reported by the radio during the handshake.
    pub fn self_info(&self) -> &SelfInfo {
        &self.self_info
    }

    /// The channel configuration.
    pub fn config(&self) -> &CompanionConfig {
        &self.shared.config
    }

    /// Stop the reader thread and mark the session disconnected.
    pub fn close(&self) {
        self.shared.shutdown.store(true, Ordering::Release);
        self.shared.connected.store(false, Ordering::Release);
        if let Some(handle) = self.reader.lock().take() {
            if handle.join().is_err() {
                warn!("companion reader thread panicked");
            }
        }
    }

    /// Send `command` and wait for the first response `accept` recognizes.
    fn request<T>(
        &self,
        command: &Command,
        accept: impl Fn(Response) -> Option<Result<T, TransportError>>,
    ) -> Result<T, TransportError> {
        let _guard = self.request_lock.lock();

        // Drop answers nobody waited for
        while self.responses.try_recv().is_ok() {}

        self.shared.write_command(command)?;

        let deadline = Instant::now() + self.shared.config.response_timeout;
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match self.responses.recv_timeout(remaining) {
                Ok(response) => match accept(response.clone()) {
                    Some(result) => return result,
                    None => trace!(?response, "ignoring unrelated response"),
                },
                Err(RecvTimeoutError::Timeout) => return Err(TransportError::ResponseTimeout),
                Err(RecvTimeoutError::Disconnected) => return Err(TransportError::Disconnected),
            }
        }
    }
}

impl MeshChannel for CompanionMeshChannel {
    fn send_text(&self, text: &str) -> Result<(), TransportError> {
        if !self.is_connected() {
            return Err(TransportError::Disconnected);
        }
        if text.len() > MAX_TEXT_LEN {
            return Err(TransportError::PayloadTooLarge {
                max: MAX_TEXT_LEN,
                actual: text.len(),
            });
        }

        let command = Command::SendChannelTextMessage {
            text_type: TextType::Plain,
            channel_idx: self.shared.config.channel,
            timestamp: unix_timestamp(),
            text: text.to_string(),
        };
        self.request(&command, |response| match response {
            Response::Ok | Response::Sent { .. } => Some(Ok(())),
            Response::Error(code) => Some(Err(TransportError::Rejected(code.to_string()))),
            Response::Disabled => Some(Err(TransportError::Rejected("disabled".to_string()))),
            _ => None,
        })
    }

    fn on_receive(&self, callback: ReceiveCallback) {
        *self.shared.callback.lock() = Some(Arc::from(callback));
        // Pick up anything the radio queued before we were listening
        if self.is_connected() {
            self.shared.request_next_message();
        }
    }

    fn is_connected(&self) -> bool {
        self.shared.connected.load(Ordering::Acquire)
    }
}

impl Drop for CompanionMeshChannel {
    fn drop(&mut self) {
        // Do not join here; the reader exits on its next poll timeout
        self.shared.shutdown.store(true, Ordering::Release);
    }
}

fn unix_timestamp() -> u32 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as u32)
        .unwrap_or(0)
}
