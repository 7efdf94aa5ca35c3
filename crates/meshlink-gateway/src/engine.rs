//! The gateway engine.

use std::sync::Arc;
use std::time::Duration;

use meshlink_frame::{InvalidFrame, Message, MessageKind};
use meshlink_metrics::{metric_defs, MetricLabels};
use meshlink_transport::{LocalChannel, MeshChannel, TransportError};
use parking_lot::Mutex;
use tokio::time::Instant;
use tracing::{debug, info, trace, warn};

use crate::{classify_inbound, Classification, GatewayError};

/// Default time to wait for a command's acknowledgment.
pub const DEFAULT_ACK_TIMEOUT: Duration = Duration::from_secs(5);

/// Default delay between reads while waiting for an acknowledgment.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(200);

/// Timing configuration for the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineConfig {
    /// How long a command may wait for its acknowledgment.
    pub ack_timeout: Duration,
    /// Delay between local reads while waiting.
    pub poll_interval: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            ack_timeout: DEFAULT_ACK_TIMEOUT,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

/// Where the most recent command stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandState {
    /// No command has completed since startup, or the last one was abandoned.
    Idle,
    /// A command is waiting for its acknowledgment.
    AwaitingAck {
        /// Sequence number of the pending command.
        sequence: u64,
    },
    /// The local node answered.
    Acked {
        /// Sequence number of the command.
        sequence: u64,
        /// Whether the node reported success.
        success: bool,
    },
    /// The deadline passed without a matching acknowledgment.
    TimedOut {
        /// Sequence number of the command.
        sequence: u64,
    },
    /// The local bus failed during the exchange.
    TransportFailed {
        /// Sequence number of the command.
        sequence: u64,
    },
}

impl CommandState {
    /// Whether a new command may start.
    pub fn is_idle(&self) -> bool {
        !matches!(self, CommandState::AwaitingAck { .. })
    }
}

/// The command currently awaiting acknowledgment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingCommand {
    /// Sequence number of the command.
    pub sequence: u64,
    /// When the slot was claimed.
    pub started: Instant,
    /// When the engine stops waiting.
    pub deadline: Instant,
}

#[derive(Debug)]
struct Slot {
    pending: Option<PendingCommand>,
    last: CommandState,
}

/// Releases the pending slot on every exit path, including a dropped future.
struct PendingGuard<'a> {
    slot: &'a Mutex<Slot>,
    pending: PendingCommand,
    outcome: Option<CommandState>,
}

impl PendingGuard<'_> {
    fn finish(&mut self, outcome: CommandState) {
        self.outcome = Some(outcome);
    }
}

impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        let mut slot = self.slot.lock();
        slot.pending = None;
        slot.last = self.outcome.take().unwrap_or(CommandState::Idle);
    }
}

/// Run one adapter call on the blocking pool.
///
/// Adapter calls wait on the bus or the radio, so they stay off the async
/// workers.
async fn run_blocking<T, F>(call: F) -> Result<T, GatewayError>
where
    F: FnOnce() -> Result<T, TransportError> + Send + 'static,
    T: Send + 'static,
{
    Ok(tokio::task::spawn_blocking(call).await??)
}

/// Bridges one local sensor node and one mesh channel.
pub struct GatewayEngine<L, M> {
    local: Arc<L>,
    mesh: Arc<M>,
    config: EngineConfig,
    slot: Mutex<Slot>,
    labels: MetricLabels,
}

impl<L: LocalChannel + 'static, M: MeshChannel + 'static> GatewayEngine<L, M> {
    /// Create an engine over the given adapters.
    pub fn new(local: L, mesh: M, config: EngineConfig) -> Self {
        Self {
            local: Arc::new(local),
            mesh: Arc::new(mesh),
            config,
            slot: Mutex::new(Slot {
                pending: None,
                last: CommandState::Idle,
            }),
            labels: MetricLabels::new("meshlink"),
        }
    }

    /// Set the gateway name used in metric labels.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.labels = MetricLabels::new(name);
        self
    }

    /// The timing configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// The local channel adapter.
    pub fn local(&self) -> &L {
        self.local.as_ref()
    }

    /// The mesh channel adapter.
    pub fn mesh(&self) -> &M {
        self.mesh.as_ref()
    }

    /// Current command state.
    pub fn state(&self) -> CommandState {
        let slot = self.slot.lock();
        match slot.pending {
            Some(pending) => CommandState::AwaitingAck {
                sequence: pending.sequence,
            },
            None => slot.last,
        }
    }

    /// The command awaiting acknowledgment, if any.
    pub fn pending(&self) -> Option<PendingCommand> {
        self.slot.lock().pending
    }

    fn claim(&self, sequence: u64) -> Result<PendingGuard<'_>, GatewayError> {
        let mut slot = self.slot.lock();
        if let Some(in_flight) = slot.pending {
            return Err(GatewayError::Busy {
                in_flight: in_flight.sequence,
            });
        }
        let started = Instant::now();
        let pending = PendingCommand {
            sequence,
            started,
            deadline: started + self.config.ack_timeout,
        };
        slot.pending = Some(pending);
        Ok(PendingGuard {
            slot: &self.slot,
            pending,
            outcome: None,
        })
    }

    /// Send a command to the local node and wait for its acknowledgment.
    ///
    /// Returns `Ok(true)` for a `success` acknowledgment and `Ok(false)` for
    /// anything else with the matching sequence number. Frames that are invalid
    /// or answer a different sequence number are discarded while waiting.
    pub async fn send_command(&self, command: &Message) -> Result<bool, GatewayError> {
        let result = self.exchange(command).await;
        match &result {
            Ok(_) => {}
            Err(GatewayError::Busy { .. }) => {
                metrics::counter!(metric_defs::COMMANDS_BUSY.name, &self.labels.to_labels())
                    .increment(1);
            }
            Err(GatewayError::Timeout { .. }) => {
                metrics::counter!(metric_defs::COMMANDS_TIMED_OUT.name, &self.labels.to_labels())
                    .increment(1);
            }
            Err(GatewayError::Transport(_)) => {
                metrics::counter!(
                    metric_defs::COMMANDS_TRANSPORT_FAILED.name,
                    &self.labels.to_labels()
                )
                .increment(1);
                self.count_transport_error("local");
            }
            Err(_) => {}
        }
        result
    }

    async fn exchange(&self, command: &Message) -> Result<bool, GatewayError> {
        if command.kind != MessageKind::Command {
            return Err(GatewayError::InvalidCommand(format!(
                "expected a command, got {}",
                command.kind
            )));
        }
        let sequence = command
            .sequence
            .ok_or_else(|| GatewayError::InvalidCommand("missing sequence".to_string()))?;

        let mut guard = self.claim(sequence)?;
        let bytes = meshlink_frame::encode(command)?;
        let len = bytes.len();

        if let Err(e) = self.write_local(bytes).await {
            warn!(sequence, "failed to write command: {}", e);
            guard.finish(CommandState::TransportFailed { sequence });
            return Err(e);
        }
        metrics::counter!(metric_defs::COMMANDS_SENT.name, &self.labels.to_labels()).increment(1);
        debug!(sequence, len, "command written, awaiting acknowledgment");

        let PendingCommand {
            started, deadline, ..
        } = guard.pending;

        while Instant::now() < deadline {
            let frame = match self.read_local().await {
                Ok(frame) => frame,
                Err(e) => {
                    warn!(sequence, "read failed while awaiting acknowledgment: {}", e);
                    guard.finish(CommandState::TransportFailed { sequence });
                    return Err(e);
                }
            };

            match classify_inbound(&frame) {
                Classification::Acknowledgment(ack) if ack.acknowledges(sequence) => {
                    let success = ack.status.is_some_and(|s| s.is_success());
                    let elapsed = started.elapsed();
                    metrics::histogram!(
                        metric_defs::COMMAND_ACK_LATENCY.name,
                        &self.labels.to_labels()
                    )
                    .record(elapsed.as_secs_f64() * 1000.0);
                    let outcome = if success {
                        &metric_defs::COMMANDS_ACKED
                    } else {
                        &metric_defs::COMMANDS_REJECTED
                    };
                    metrics::counter!(outcome.name, &self.labels.to_labels()).increment(1);

                    info!(sequence, success, elapsed_ms = elapsed.as_millis() as u64, "command acknowledged");
                    guard.finish(CommandState::Acked { sequence, success });
                    return Ok(success);
                }
                Classification::Acknowledgment(ack) => {
                    debug!(sequence, other = ?ack.sequence, "discarding acknowledgment for another command");
                    self.count_discard("unmatched_ack");
                }
                Classification::SensorData(_) => {
                    debug!(sequence, "discarding sensor data while awaiting acknowledgment");
                    self.count_discard("not_ack");
                }
                Classification::Invalid(InvalidFrame::Empty) => {
                    trace!(sequence, "no data yet");
                }
                Classification::Invalid(invalid) => {
                    debug!(sequence, "discarding frame: {}", invalid);
                    self.count_discard(invalid.reason());
                }
            }

            let remaining = deadline.saturating_duration_since(Instant::now());
            tokio::time::sleep(self.config.poll_interval.min(remaining)).await;
        }

        warn!(sequence, timeout = ?self.config.ack_timeout, "command timed out");
        guard.finish(CommandState::TimedOut { sequence });
        Err(GatewayError::Timeout {
            sequence,
            waited: self.config.ack_timeout,
        })
    }

    /// Handle a text payload received from the mesh.
    ///
    /// Commands are forwarded to the local node and the outcome is logged.
    /// Anything else is discarded. Nothing is sent back to the mesh.
    pub async fn on_mesh_command(&self, payload: &str) {
        let message = match meshlink_frame::decode_text(payload) {
            Ok(message) => message,
            Err(invalid) => {
                debug!("discarding mesh payload: {}", invalid);
                return;
            }
        };
        if message.kind != MessageKind::Command {
            debug!(kind = %message.kind, "ignoring non-command mesh message");
            return;
        }

        match self.send_command(&message).await {
            Ok(true) => info!(sequence = ?message.sequence, "mesh command succeeded"),
            Ok(false) => warn!(sequence = ?message.sequence, "mesh command failed on local node"),
            Err(e) => warn!(sequence = ?message.sequence, "mesh command not delivered: {}", e),
        }
    }

    /// Read one frame from the local node and forward it to the mesh if it is a
    /// sensor reading.
    ///
    /// Returns whether a reading was forwarded. Skips the read while a command
    /// is awaiting acknowledgment so the reply frame is left to the command.
    /// Every call refreshes the mesh connection gauge.
    pub async fn relay_sensor_reading(&self) -> Result<bool, GatewayError> {
        self.record_mesh_state();
        if let Some(pending) = self.pending() {
            trace!(sequence = pending.sequence, "command in flight, skipping relay");
            return Ok(false);
        }

        let frame = self.read_local().await.map_err(|e| {
            self.count_transport_error("local");
            e
        })?;

        let reading = match classify_inbound(&frame) {
            Classification::SensorData(reading) => reading,
            Classification::Invalid(InvalidFrame::Empty) => {
                trace!("no sensor data");
                return Ok(false);
            }
            Classification::Invalid(invalid) => {
                debug!("discarding frame: {}", invalid);
                self.count_discard(invalid.reason());
                return Ok(false);
            }
            Classification::Acknowledgment(ack) => {
                debug!(sequence = ?ack.sequence, "discarding stray acknowledgment");
                self.count_discard("unmatched_ack");
                return Ok(false);
            }
        };

        let text = meshlink_frame::encode_text(&reading)?;
        let len = text.len();
        let mesh = Arc::clone(&self.mesh);
        run_blocking(move || mesh.send_text(&text)).await.map_err(|e| {
            self.count_transport_error("mesh");
            self.record_mesh_state();
            e
        })?;

        metrics::counter!(metric_defs::READINGS_FORWARDED.name, &self.labels.to_labels())
            .increment(1);
        debug!(len, "sensor reading forwarded to mesh");
        Ok(true)
    }

    /// Publish whether the mesh session is up, and return it.
    pub fn record_mesh_state(&self) -> bool {
        let connected = self.mesh.is_connected();
        metrics::gauge!(metric_defs::MESH_CONNECTED.name, &self.labels.to_labels())
            .set(if connected { 1.0 } else { 0.0 });
        connected
    }

    async fn read_local(&self) -> Result<Vec<u8>, GatewayError> {
        let local = Arc::clone(&self.local);
        run_blocking(move || local.read_frame()).await
    }

    async fn write_local(&self, bytes: Vec<u8>) -> Result<(), GatewayError> {
        let local = Arc::clone(&self.local);
        run_blocking(move || local.write(&bytes)).await
    }

    fn count_discard(&self, reason: &'static str) {
        metrics::counter!(
            metric_defs::FRAMES_DISCARDED.name,
            &self.labels.with(&[("reason", reason.to_string())])
        )
        .increment(1);
    }

    fn count_transport_error(&self, channel: &'static str) {
        metrics::counter!(
            metric_defs::TRANSPORT_ERRORS.name,
            &self.labels.with(&[("channel", channel.to_string())])
        )
        .increment(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use meshlink_frame::AckStatus;
    use meshlink_transport::memory::{MemoryLocalChannel, MemoryMeshChannel};

    fn engine() -> (
        GatewayEngine<MemoryLocalChannel, MemoryMeshChannel>,
        MemoryLocalChannel,
        MemoryMeshChannel,
    ) {
        let local = MemoryLocalChannel::default();
        let mesh = MemoryMeshChannel::new();
        let engine = GatewayEngine::new(local.clone(), mesh.clone(), EngineConfig::default());
        (engine, local, mesh)
    }

    #[tokio::test(start_paused = true)]
    async fn test_rejects_non_commands() {
        let (engine, local, _) = engine();

        let err = engine.send_command(&Message::sensor_data()).await.unwrap_err();
        assert!(matches!(err, GatewayError::InvalidCommand(_)));

        let err = engine
            .send_command(&Message::new(MessageKind::Command))
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::InvalidCommand(_)));

        assert!(local.writes().is_empty());
        assert_eq!(engine.state(), CommandState::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn test_write_failure_is_transport() {
        let (engine, local, _) = engine();
        local.push_write_error(TransportError::NoAcknowledge { address: 4 });

        let err = engine.send_command(&Message::command(5)).await.unwrap_err();
        assert!(matches!(err, GatewayError::Transport(_)));
        assert_eq!(engine.state(), CommandState::TransportFailed { sequence: 5 });
        assert_eq!(local.read_count(), 0);
        assert!(engine.pending().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_missing_status_counts_as_failure() {
        let (engine, local, _) = engine();
        local.push_frame(br#"{"type":"acknowledgment","sequence":2}"#.to_vec());

        assert!(!engine.send_command(&Message::command(2)).await.unwrap());
        assert_eq!(
            engine.state(),
            CommandState::Acked {
                sequence: 2,
                success: false
            }
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_failure_status() {
        let (engine, local, _) = engine();
        local.push_message(&Message::acknowledgment(8, AckStatus::Failure));
        assert!(!engine.send_command(&Message::command(8)).await.unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn test_relay_skips_while_command_pending() {
        let (engine, local, mesh) = engine();
        local.push_message(&Message::sensor_data().with_field("temp", 20));

        let _guard = engine.claim(1).unwrap();
        assert!(!engine.relay_sensor_reading().await.unwrap());
        assert_eq!(local.read_count(), 0);
        assert!(mesh.sent_texts().is_empty());
    }

    #[test]
    fn test_state_is_idle_helper() {
        assert!(CommandState::Idle.is_idle());
        assert!(CommandState::TimedOut { sequence: 1 }.is_idle());
        assert!(!CommandState::AwaitingAck { sequence: 1 }.is_idle());
    }
}
