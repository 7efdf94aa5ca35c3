//! Channel adapters for the meshlink gateway.
//!
//! The gateway engine never touches a transport directly. It talks to two
//! narrow capabilities:
//!
//! - [`LocalChannel`]: one write / one fixed-size read against the local
//!   sensor node on the byte bus (I2C in practice, see [`I2cLocalChannel`]).
//! - [`MeshChannel`]: send a text packet, and get a callback per received
//!   text packet (a MeshCore companion radio, see [`CompanionMeshChannel`]).
//!
//! Both surface every fault as a [`TransportError`] and never retry. Each
//! adapter serializes access to its own transport handle.
//!
//! The [`memory`] module provides in-memory adapters for tests and dry runs.

mod companion;
mod error;
mod local;
pub mod memory;
mod mesh;

pub use companion::*;
pub use error::*;
pub use local::*;
pub use mesh::*;
