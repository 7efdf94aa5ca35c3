//! Gateway startup and wiring.

use std::sync::Arc;

use meshlink_gateway::GatewayEngine;
use meshlink_metrics::{metric_defs, MetricLabels};
use meshlink_transport::{CompanionMeshChannel, LocalChannel, MeshChannel, Packet};
use tokio::runtime::Handle;
use tokio::sync::watch;
use tracing::{debug, info};

use crate::config::{GatewayConfig, LocalConfig, MeshConfig, MeshTransport};
use crate::poller::run_polling_loop;
use crate::RunnerError;

/// Engine over whatever adapters the configuration selected.
pub type DynEngine = GatewayEngine<Box<dyn LocalChannel>, Box<dyn MeshChannel>>;

/// A running gateway: engine plus mesh intake.
pub struct Gateway {
    engine: Arc<DynEngine>,
    config: GatewayConfig,
}

impl Gateway {
    /// Open both transports from `config` and wire the engine.
    ///
    /// Failing to establish the mesh session is fatal; there is no retry.
    /// Must be called from within a tokio runtime.
    pub fn start(config: GatewayConfig) -> Result<Self, RunnerError> {
        config.validate()?;
        let local = open_local(&config.local)?;
        let mesh = open_mesh(&config.mesh)?;
        Self::with_channels(config, local, mesh)
    }

    /// Wire the engine over already-open adapters.
    ///
    /// Every text packet from the mesh is handed to
    /// [`GatewayEngine::on_mesh_command`] on a fresh tokio task, so the mesh
    /// delivery thread never waits for a command handshake.
    pub fn with_channels(
        config: GatewayConfig,
        local: Box<dyn LocalChannel>,
        mesh: Box<dyn MeshChannel>,
    ) -> Result<Self, RunnerError> {
        let runtime = Handle::try_current().map_err(|e| RunnerError::Runtime(e.to_string()))?;
        let engine = Arc::new(
            GatewayEngine::new(local, mesh, config.gateway.engine_config()).with_name(config.name.clone()),
        );

        let weak = Arc::downgrade(&engine);
        let labels = MetricLabels::new(config.name.clone());
        engine.mesh().on_receive(Box::new(move |packet: Packet| {
            metrics::counter!(
                metric_defs::MESH_PACKETS_RECEIVED.name,
                &labels.with(&[("port", packet.port.as_str().to_string())])
            )
            .increment(1);

            // The gateway is shutting down once the engine is gone
            let Some(engine) = weak.upgrade() else {
                debug!("engine dropped, ignoring mesh packet");
                return;
            };
            runtime.spawn(async move {
                engine.on_mesh_command(&packet.text).await;
            });
        }));

        engine.record_mesh_state();

        info!(name = %config.name, "gateway started");
        Ok(Self { engine, config })
    }

    /// The engine.
    pub fn engine(&self) -> &Arc<DynEngine> {
        &self.engine
    }

    /// The configuration the gateway was started with.
    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    /// Run the sensor relay until `shutdown` turns `true`.
    pub async fn run(&self, shutdown: watch::Receiver<bool>) -> u64 {
        run_polling_loop(
            self.engine.clone(),
            self.config.gateway.relay_interval(),
            shutdown,
        )
        .await
    }
}

/// Open the I2C bus described by `config`.
#[cfg(feature = "linux-i2c")]
pub fn open_local(config: &LocalConfig) -> Result<Box<dyn LocalChannel>, RunnerError> {
    let channel = meshlink_transport::open_linux_i2c(&config.device, config.channel_config())?;
    Ok(Box::new(channel))
}

/// Open the I2C bus described by `config`.
#[cfg(not(feature = "linux-i2c"))]
pub fn open_local(config: &LocalConfig) -> Result<Box<dyn LocalChannel>, RunnerError> {
    Err(RunnerError::Unsupported(format!(
        "cannot open {}: built without the linux-i2c feature",
        config.device
    )))
}

/// Establish the companion radio session described by `config`.
pub fn open_mesh(config: &MeshConfig) -> Result<Box<dyn MeshChannel>, RunnerError> {
    info!(transport = %config.transport, channel = config.channel, "connecting to companion radio");
    let companion = config.companion_config();
    let channel = match &config.transport {
        MeshTransport::Tcp { address } => CompanionMeshChannel::connect_tcp(address, companion)?,
        MeshTransport::Serial { port, baud_rate } => {
            CompanionMeshChannel::open_serial(port, *baud_rate, companion)?
        }
    };
    Ok(Box::new(channel))
}
