//! meshlink runner library.
//!
//! This crate provides the pieces of the `meshlink` binary:
//!
//! - [`config`]: YAML configuration with defaults for every field
//! - [`cli`]: command-line definition and config overrides
//! - [`app`]: opening the transports and wiring the gateway engine
//! - [`poller`]: the periodic sensor relay loop
//! - [`logging`]: tracing subscriber setup

pub mod app;
pub mod cli;
pub mod config;
mod error;
pub mod logging;
pub mod poller;

pub use app::{DynEngine, Gateway};
pub use config::GatewayConfig;
pub use error::*;
pub use poller::run_polling_loop;
