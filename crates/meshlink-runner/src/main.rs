//! meshlink binary entry point.

use std::process::ExitCode;

use clap::Parser;
use meshlink_gateway::GatewayEngine;
use meshlink_runner::cli::{Cli, Commands, RunArgs, SendArgs};
use meshlink_runner::{app, logging, Gateway, GatewayConfig, RunnerError};
use meshlink_transport::memory::MemoryMeshChannel;
use tokio::sync::watch;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    logging::init(&cli.log_level);

    let result = match &cli.command {
        Commands::Run(args) => run(&cli, args).await,
        Commands::Send(args) => send(&cli, args).await,
        Commands::Config(args) => print_config(&cli, args),
    };

    match result {
        Ok(code) => code,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

fn load_config(cli: &Cli) -> Result<GatewayConfig, RunnerError> {
    match &cli.config {
        Some(path) => Ok(GatewayConfig::load(path)?),
        None => Ok(GatewayConfig::default()),
    }
}

fn print_config(cli: &Cli, args: &RunArgs) -> Result<ExitCode, RunnerError> {
    let mut config = load_config(cli)?;
    args.apply(&mut config);
    config.validate()?;
    print!("{}", config.to_yaml()?);
    Ok(ExitCode::SUCCESS)
}

async fn run(cli: &Cli, args: &RunArgs) -> Result<ExitCode, RunnerError> {
    let mut config = load_config(cli)?;
    args.apply(&mut config);

    if let Some(addr) = config.metrics.prometheus_listen {
        install_metrics(addr)?;
    }

    let gateway = Gateway::start(config)?;

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    ctrlc::set_handler(move || {
        info!("received Ctrl+C, shutting down");
        let _ = shutdown_tx.send(true);
    })
    .map_err(|e| RunnerError::Runtime(format!("failed to install signal handler: {}", e)))?;

    gateway.run(shutdown_rx).await;
    Ok(ExitCode::SUCCESS)
}

#[cfg(feature = "prometheus")]
fn install_metrics(addr: std::net::SocketAddr) -> Result<(), RunnerError> {
    meshlink_metrics::install_prometheus_exporter(addr)
        .map_err(|e| RunnerError::Runtime(format!("failed to start metrics exporter: {}", e)))?;
    info!(%addr, "serving Prometheus metrics");
    Ok(())
}

#[cfg(not(feature = "prometheus"))]
fn install_metrics(addr: std::net::SocketAddr) -> Result<(), RunnerError> {
    Err(RunnerError::Unsupported(format!(
        "cannot serve metrics on {}: built without the prometheus feature",
        addr
    )))
}

async fn send(cli: &Cli, args: &SendArgs) -> Result<ExitCode, RunnerError> {
    let mut config = load_config(cli)?;
    args.apply(&mut config);
    config.validate()?;

    // Only the local node is involved; the mesh side stays offline
    let local = app::open_local(&config.local)?;
    let engine = GatewayEngine::new(
        local,
        MemoryMeshChannel::new(),
        config.gateway.engine_config(),
    )
    .with_name(config.name.clone());

    let message = args.message();
    if engine.send_command(&message).await? {
        println!("command {} acknowledged: success", args.sequence);
        Ok(ExitCode::SUCCESS)
    } else {
        warn!(sequence = args.sequence, "local node reported failure");
        println!("command {} acknowledged: failure", args.sequence);
        Ok(ExitCode::FAILURE)
    }
}
