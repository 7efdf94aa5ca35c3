//! The periodic sensor relay loop.

use std::sync::Arc;
use std::time::Duration;

use meshlink_gateway::GatewayEngine;
use meshlink_transport::{LocalChannel, MeshChannel};
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

/// Relay sensor readings until `shutdown` turns `true`.
///
/// The first relay happens immediately, then once per `relay_interval`.
/// Failures are logged and the loop carries on. Returns the number of
/// readings forwarded.
pub async fn run_polling_loop<L, M>(
    engine: Arc<GatewayEngine<L, M>>,
    relay_interval: Duration,
    mut shutdown: watch::Receiver<bool>,
) -> u64
where
    L: LocalChannel + 'static,
    M: MeshChannel + 'static,
{
    let mut ticker = tokio::time::interval(relay_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    info!(interval = ?relay_interval, "sensor relay started");
    let mut forwarded = 0u64;

    while !*shutdown.borrow() {
        tokio::select! {
            _ = ticker.tick() => match engine.relay_sensor_reading().await {
                Ok(true) => forwarded += 1,
                Ok(false) => debug!("nothing to relay"),
                Err(e) => warn!("sensor relay failed: {}", e),
            },
            changed = shutdown.changed() => {
                if changed.is_err() {
                    // Sender dropped
                    break;
                }
            }
        }
    }

    info!(forwarded, "sensor relay stopped");
    forwarded
}
