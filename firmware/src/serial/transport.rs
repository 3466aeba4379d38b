//! [`SerialPort`] adapter for async byte transports on real targets.
//!
//! Wraps anything implementing the `embedded-io-async` traits (a HAL UART,
//! USB CDC-ACM) and applies the listener's per-phase windows with
//! `embassy-time`.

use embassy_time::{with_timeout, Duration};
use embedded_io_async::{Read, Write};

use crate::serial::traits::{SerialError, SerialPort};

/// Listener-facing port over an async transport.
pub struct TransportPort<T> {
    transport: T,
}

impl<T> TransportPort<T> {
    pub fn new(transport: T) -> Self {
        Self { transport }
    }

    /// Give the transport back, e.g. to reconfigure the UART.
    pub fn release(self) -> T {
        self.transport
    }
}

impl<T: Read + Write> SerialPort for TransportPort<T> {
    async fn read_exact(
        &mut self,
        buf: &mut [u8],
        timeout_ms: Option<u32>,
    ) -> Result<(), SerialError> {
        match timeout_ms {
            Some(ms) => {
                with_timeout(Duration::from_millis(u64::from(ms)), fill(&mut self.transport, buf))
                    .await
                    .map_err(|_| SerialError::Timeout)?
            }
            None => fill(&mut self.transport, buf).await,
        }
    }

    async fn write_all(&mut self, data: &[u8]) -> Result<(), SerialError> {
        self.transport
            .write_all(data)
            .await
            .map_err(|_| SerialError::Bus)?;
        self.transport.flush().await.map_err(|_| SerialError::Bus)
    }
}

async fn fill<T: Read>(transport: &mut T, buf: &mut [u8]) -> Result<(), SerialError> {
    let mut filled = 0;
    while filled < buf.len() {
        match transport.read(&mut buf[filled..]).await {
            Ok(0) => return Err(SerialError::Bus),
            Ok(n) => filled += n,
            Err(_) => return Err(SerialError::Bus),
        }
    }
    Ok(())
}
