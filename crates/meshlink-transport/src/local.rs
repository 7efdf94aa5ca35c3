//! Local byte-bus channel to the sensor node.

use std::sync::Arc;

use embedded_hal::i2c::{Error as _, ErrorKind, I2c};
use parking_lot::Mutex;
use tracing::trace;

use crate::TransportError;

/// Default 7-bit address of the local sensor node.
pub const DEFAULT_I2C_ADDRESS: u8 = 0x04;

/// Default size of one frame read from the local node.
pub const DEFAULT_FRAME_SIZE: usize = 256;

/// The local bus capability the gateway engine needs.
///
/// Implementations perform exactly one transport operation per call and never
/// retry.
pub trait LocalChannel: Send + Sync {
    /// Write `bytes` to the local node.
    fn write(&self, bytes: &[u8]) -> Result<(), TransportError>;

    /// Read one fixed-size frame from the local node.
    ///
    /// The frame may be all zeros (nothing to report) or carry a message
    /// followed by zero padding.
    fn read_frame(&self) -> Result<Vec<u8>, TransportError>;
}

impl<T: LocalChannel + ?Sized> LocalChannel for Box<T> {
    fn write(&self, bytes: &[u8]) -> Result<(), TransportError> {
        (**self).write(bytes)
    }

    fn read_frame(&self) -> Result<Vec<u8>, TransportError> {
        (**self).read_frame()
    }
}

impl<T: LocalChannel + ?Sized> LocalChannel for Arc<T> {
    fn write(&self, bytes: &[u8]) -> Result<(), TransportError> {
        (**self).write(bytes)
    }

    fn read_frame(&self) -> Result<Vec<u8>, TransportError> {
        (**self).read_frame()
    }
}

/// Configuration for [`I2cLocalChannel`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct I2cChannelConfig {
    /// 7-bit peer address.
    pub address: u8,
    /// Register offset sent ahead of every write and read.
    pub write_offset: u8,
    /// Size of one read block in bytes.
    pub frame_size: usize,
}

impl Default for I2cChannelConfig {
    fn default() -> Self {
        Self {
            address: DEFAULT_I2C_ADDRESS,
            write_offset: 0,
            frame_size: DEFAULT_FRAME_SIZE,
        }
    }
}

/// A [`LocalChannel`] over any `embedded-hal` I2C bus.
///
/// A write is one transaction carrying `[write_offset] ++ payload`. A read
/// writes the offset and reads `frame_size` bytes in a single repeated-start
/// transaction.
pub struct I2cLocalChannel<B> {
    bus: Mutex<B>,
    config: I2cChannelConfig,
}

impl<B: I2c> I2cLocalChannel<B> {
    /// Wrap an open bus.
    pub fn new(bus: B, config: I2cChannelConfig) -> Self {
        Self {
            bus: Mutex::new(bus),
            config,
        }
    }

    /// The channel configuration.
    pub fn config(&self) -> &I2cChannelConfig {
        &self.config
    }

    /// Give back the bus.
    pub fn into_inner(self) -> B {
        self.bus.into_inner()
    }

    fn map_error(&self, err: B::Error) -> TransportError {
        match err.kind() {
            ErrorKind::NoAcknowledge(_) => TransportError::NoAcknowledge {
                address: self.config.address,
            },
            kind => TransportError::Bus(format!("{:?}", kind)),
        }
    }
}

impl<B: I2c + Send> LocalChannel for I2cLocalChannel<B> {
    fn write(&self, bytes: &[u8]) -> Result<(), TransportError> {
        if bytes.len() > self.config.frame_size {
            return Err(TransportError::PayloadTooLarge {
                max: self.config.frame_size,
                actual: bytes.len(),
            });
        }

        let mut buf = Vec::with_capacity(bytes.len() + 1);
        buf.push(self.config.write_offset);
        buf.extend_from_slice(bytes);

        trace!(address = self.config.address, len = bytes.len(), "i2c write");
        self.bus
            .lock()
            .write(self.config.address, &buf)
            .map_err(|e| self.map_error(e))
    }

    fn read_frame(&self) -> Result<Vec<u8>, TransportError> {
        let mut buf = vec![0u8; self.config.frame_size];
        self.bus
            .lock()
            .write_read(self.config.address, &[self.config.write_offset], &mut buf)
            .map_err(|e| self.map_error(e))?;
        Ok(buf)
    }
}

/// Open a Linux I2C character device (e.g. `/dev/i2c-1`).
#[cfg(feature = "linux-i2c")]
pub fn open_linux_i2c(
    device: &str,
    config: I2cChannelConfig,
) -> Result<I2cLocalChannel<linux_embedded_hal::I2cdev>, TransportError> {
    let bus = linux_embedded_hal::I2cdev::new(device).map_err(|e| TransportError::Open {
        target: device.to_string(),
        reason: e.to_string(),
    })?;
    tracing::info!(device, address = config.address, "opened I2C bus");
    Ok(I2cLocalChannel::new(bus, config))
}
