//! Serial port trait for abstraction and testability
//!
//! Every phase of the listener loop is "read exactly N bytes within a
//! window", so that is the whole interface: one bounded exact read and one
//! write. The real UART driver and the test mock both implement it.

use core::future::Future;

/// Errors that can occur during serial operations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SerialError {
    /// The requested bytes did not arrive within the window
    Timeout,
    /// Underlying transport failure
    Bus,
}

/// Abstract serial port interface for the listener loop.
pub trait SerialPort {
    /// Fill `buf` exactly.
    ///
    /// A `timeout_ms` of `None` blocks until the bytes arrive; `Some(ms)`
    /// resolves to [`SerialError::Timeout`] if they do not arrive in time.
    fn read_exact(
        &mut self,
        buf: &mut [u8],
        timeout_ms: Option<u32>,
    ) -> impl Future<Output = Result<(), SerialError>>;

    /// Write all of `data`.
    fn write_all(&mut self, data: &[u8]) -> impl Future<Output = Result<(), SerialError>>;
}
