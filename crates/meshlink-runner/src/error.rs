//! Error types for the runner.

use std::path::PathBuf;

use meshlink_gateway::GatewayError;
use meshlink_transport::TransportError;
use thiserror::Error;

/// Errors loading or validating the configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The config file could not be read.
    #[error("failed to read config file {path}: {source}")]
    Read {
        /// Path of the config file.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The config file is not valid YAML for this schema.
    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_yaml::Error),

    /// A value is out of range.
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Errors that stop the runner.
#[derive(Debug, Error)]
pub enum RunnerError {
    /// Configuration problem.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// A transport could not be established.
    #[error("transport setup failed: {0}")]
    Transport(#[from] TransportError),

    /// A gateway operation failed.
    #[error(transparent)]
    Gateway(#[from] GatewayError),

    /// The requested feature was not compiled in.
    #[error("unsupported: {0}")]
    Unsupported(String),

    /// Runtime environment problem (no tokio runtime, signal handler, ...).
    #[error("runtime error: {0}")]
    Runtime(String),
}
