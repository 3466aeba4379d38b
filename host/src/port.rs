//! Serial port abstraction for the session layer.
//!
//! The session only ever needs three operations: discard stale input,
//! write a run of bytes, and read an exact count within the phase window.
//! Keeping that behind a trait lets the native `serialport` backend and
//! scripted test doubles swap freely.

use std::io::{Read, Write};
use std::time::Duration;

use crate::error::{Error, Result};

/// Write window per exchange.
pub const WRITE_TIMEOUT: Duration = Duration::from_millis(200);

/// Read window per phase.
pub const READ_TIMEOUT: Duration = Duration::from_millis(500);

/// Minimal port interface consumed by the wire codec.
pub trait Port {
    fn name(&self) -> &str;

    /// Discard unread input: stale error surfaces, bootloader chatter.
    fn clear_input(&mut self) -> Result<()>;

    /// Write all of `data` within the write window.
    fn write_all(&mut self, data: &[u8]) -> Result<()>;

    /// Fill `buf` exactly within the read window.
    fn read_exact(&mut self, buf: &mut [u8]) -> Result<()>;
}

/// Port backed by the operating system's serial stack.
pub struct NativePort {
    inner: Box<dyn serialport::SerialPort>,
    name: String,
}

impl NativePort {
    /// Open `name` at `baud`, 8-N-1.
    pub fn open(name: &str, baud: u32) -> Result<Self> {
        let inner = serialport::new(name, baud)
            .data_bits(serialport::DataBits::Eight)
            .parity(serialport::Parity::None)
            .stop_bits(serialport::StopBits::One)
            .timeout(READ_TIMEOUT)
            .open()?;

        Ok(Self {
            inner,
            name: name.to_string(),
        })
    }
}

impl Port for NativePort {
    fn name(&self) -> &str {
        &self.name
    }

    fn clear_input(&mut self) -> Result<()> {
        self.inner.clear(serialport::ClearBuffer::Input)?;
        Ok(())
    }

    fn write_all(&mut self, data: &[u8]) -> Result<()> {
        self.inner.set_timeout(WRITE_TIMEOUT)?;
        match self.inner.write_all(data) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::TimedOut => return Err(Error::Timeout),
            Err(e) => return Err(e.into()),
        }
        self.inner.flush()?;
        Ok(())
    }

    fn read_exact(&mut self, buf: &mut [u8]) -> Result<()> {
        self.inner.set_timeout(READ_TIMEOUT)?;
        match self.inner.read_exact(buf) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::TimedOut => Err(Error::Timeout),
            Err(e) => Err(e.into()),
        }
    }
}
