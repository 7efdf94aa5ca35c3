//! End-to-end tests of the wired gateway over in-memory channels.

use std::time::Duration;

use meshlink_frame::{AckStatus, Message};
use meshlink_runner::config::GatewayConfig;
use meshlink_runner::{logging, Gateway, RunnerError};
use meshlink_transport::memory::{MemoryLocalChannel, MemoryMeshChannel};
use meshlink_transport::{AppPort, Packet};
use tokio::sync::watch;

fn start() -> (Gateway, MemoryLocalChannel, MemoryMeshChannel) {
    logging::init_for_tests();
    let local = MemoryLocalChannel::default();
    let mesh = MemoryMeshChannel::new();
    let gateway = Gateway::with_channels(
        GatewayConfig::default(),
        Box::new(local.clone()),
        Box::new(mesh.clone()),
    )
    .unwrap();
    (gateway, local, mesh)
}

#[test]
fn test_requires_runtime() {
    let result = Gateway::with_channels(
        GatewayConfig::default(),
        Box::new(MemoryLocalChannel::default()),
        Box::new(MemoryMeshChannel::new()),
    );
    assert!(matches!(result, Err(RunnerError::Runtime(_))));
}

#[tokio::test(start_paused = true)]
async fn test_mesh_command_reaches_local_node() {
    let (gateway, local, mesh) = start();
    local.set_responder(|cmd| {
        cmd.sequence
            .map(|seq| Message::acknowledgment(seq, AckStatus::Success))
    });

    assert!(mesh.has_callback());
    assert!(mesh.deliver_text(r#"{"type":"command","sequence":5,"led":"on"}"#));

    // The callback only spawns; give the task a chance to run
    tokio::time::sleep(Duration::from_millis(10)).await;

    let written = local.written_messages();
    assert_eq!(written.len(), 1);
    assert_eq!(written[0].sequence, Some(5));
    assert!(gateway.engine().pending().is_none());
    assert!(mesh.sent_texts().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_non_text_packets_never_reach_engine() {
    let (_gateway, local, mesh) = start();

    let delivered = mesh.deliver(Packet {
        port: AppPort::Other(1),
        ..Packet::text(r#"{"type":"command","sequence":1}"#)
    });
    assert!(!delivered);

    tokio::time::sleep(Duration::from_millis(10)).await;
    assert!(local.writes().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_dropped_gateway_ignores_packets() {
    let (gateway, local, mesh) = start();
    drop(gateway);

    assert!(mesh.deliver_text(r#"{"type":"command","sequence":1}"#));
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert!(local.writes().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_polling_loop_relays_each_tick() {
    let (gateway, local, mesh) = start();
    for temp in [20.0, 20.5, 21.0] {
        local.push_message(&Message::sensor_data().with_field("temp", temp));
    }

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let handle = tokio::spawn(async move { gateway.run(shutdown_rx).await });

    // Ticks at 0s, 60s and 120s
    tokio::time::sleep(Duration::from_secs(121)).await;
    shutdown_tx.send(true).unwrap();

    let forwarded = handle.await.unwrap();
    assert_eq!(forwarded, 3);
    assert_eq!(
        mesh.sent_texts(),
        vec![
            r#"{"type":"sensor_data","temp":20.0}"#.to_string(),
            r#"{"type":"sensor_data","temp":20.5}"#.to_string(),
            r#"{"type":"sensor_data","temp":21.0}"#.to_string(),
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn test_polling_loop_survives_faults() {
    let (gateway, local, mesh) = start();
    local.push_read_error(meshlink_transport::TransportError::Bus("glitch".to_string()));
    local.push_frame(b"garbage".to_vec());
    local.push_message(&Message::sensor_data().with_field("soil", 312));

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let handle = tokio::spawn(async move { gateway.run(shutdown_rx).await });

    tokio::time::sleep(Duration::from_secs(150)).await;
    shutdown_tx.send(true).unwrap();

    assert_eq!(handle.await.unwrap(), 1);
    assert_eq!(mesh.sent_texts().len(), 1);
    assert_eq!(local.read_count(), 3);
}

#[tokio::test(start_paused = true)]
async fn test_polling_loop_stops_when_already_shut_down() {
    let (gateway, local, _) = start();
    let (_shutdown_tx, shutdown_rx) = watch::channel(true);

    assert_eq!(gateway.run(shutdown_rx).await, 0);
    assert_eq!(local.read_count(), 0);
}
