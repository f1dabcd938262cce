//! # Serial Communication Module
//!
//! Handles the UARTs carrying the ECU and companion tracker links.
//!
//! This module handles:
//! - Opening a serial port (8N1, no flow control) at the configured baud rate
//! - Moving received bytes into a [`QueuedLink`] for the drivers to poll
//! - Flushing bytes the drivers queued back out to the port

pub mod port_trait;

pub use port_trait::{ByteSource, QueuedLink};

use crate::error::{LinkError, Result};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio_serial::SerialPortBuilderExt;
use tracing::{debug, info, warn};

/// Size of the scratch buffer used for one port read
pub const READ_CHUNK_SIZE: usize = 256;

/// Serial port handler for one link
pub struct LinkSerial {
    /// Serial port handle
    port: tokio_serial::SerialStream,
    /// Device path (e.g., /dev/ttyS1)
    device_path: String,
}

impl std::fmt::Debug for LinkSerial {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LinkSerial")
            .field("device_path", &self.device_path)
            .finish_non_exhaustive()
    }
}

impl LinkSerial {
    /// Open the serial port at `path`
    ///
    /// # Errors
    ///
    /// Returns [`LinkError::SerialPortNotFound`] if the port cannot be opened
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use fc_serial_links::serial::LinkSerial;
    ///
    /// fn main() -> anyhow::Result<()> {
    ///     let serial = LinkSerial::open("/dev/ttyS1", 115_200)?;
    ///     println!("ECU link on {}", serial.device_path());
    ///     Ok(())
    /// }
    /// ```
    pub fn open(path: &str, baud_rate: u32) -> Result<Self> {
        Self::open_with_paths(&[path], baud_rate)
    }

    /// Open the first device in `paths` that accepts the configuration
    ///
    /// # Arguments
    ///
    /// * `paths` - Device paths to try in order
    /// * `baud_rate` - Line rate for the link
    pub fn open_with_paths(paths: &[&str], baud_rate: u32) -> Result<Self> {
        for path in paths {
            debug!("Trying to open serial port: {}", path);

            match Self::open_port(path, baud_rate) {
                Ok(port) => {
                    info!("Opened serial link at {} ({} baud)", path, baud_rate);
                    return Ok(Self {
                        port,
                        device_path: path.to_string(),
                    });
                }
                Err(e) => {
                    warn!("Failed to open {}: {}", path, e);
                    continue;
                }
            }
        }

        Err(LinkError::SerialPortNotFound(paths.join(", ")))
    }

    /// Open a specific serial port with 8N1 settings
    fn open_port(path: &str, baud_rate: u32) -> Result<tokio_serial::SerialStream> {
        let port = tokio_serial::new(path, baud_rate)
            .data_bits(tokio_serial::DataBits::Eight)
            .parity(tokio_serial::Parity::None)
            .stop_bits(tokio_serial::StopBits::One)
            .flow_control(tokio_serial::FlowControl::None)
            .open_native_async()
            .map_err(|e| LinkError::Serial(format!("Failed to open {}: {}", path, e)))?;

        Ok(port)
    }

    /// Wait for the next chunk of received bytes
    ///
    /// Cancel safe, so it can sit in a `tokio::select!` branch.
    pub async fn read_chunk(&mut self, buf: &mut [u8]) -> Result<usize> {
        read_chunk(&mut self.port, buf).await
    }

    /// Write out everything the driver queued on `link`
    pub async fn flush_outbound(&mut self, link: &mut QueuedLink) -> Result<usize> {
        flush_outbound(&mut self.port, link).await
    }

    /// Get the device path of the opened serial port
    pub fn device_path(&self) -> &str {
        &self.device_path
    }
}

/// Read one chunk from `reader`
///
/// # Errors
///
/// A zero-length read means the device went away and is reported as
/// [`LinkError::Serial`].
pub async fn read_chunk<R: AsyncRead + Unpin>(reader: &mut R, buf: &mut [u8]) -> Result<usize> {
    let n = reader
        .read(buf)
        .await
        .map_err(|e| LinkError::Serial(format!("Failed to read: {}", e)))?;

    if n == 0 {
        return Err(LinkError::Serial("Serial port closed".to_string()));
    }
    Ok(n)
}

/// Drain the outbound queue of `link` into `writer`
///
/// Returns the number of bytes written, zero if nothing was queued.
pub async fn flush_outbound<W: AsyncWrite + Unpin>(
    writer: &mut W,
    link: &mut QueuedLink,
) -> Result<usize> {
    let pending = link.take_outbound();
    if pending.is_empty() {
        return Ok(0);
    }

    writer
        .write_all(&pending)
        .await
        .map_err(|e| LinkError::Serial(format!("Failed to write: {}", e)))?;

    writer
        .flush()
        .await
        .map_err(|e| LinkError::Serial(format!("Failed to flush serial port: {}", e)))?;

    debug!("Flushed {} outbound bytes", pending.len());
    Ok(pending.len())
}
