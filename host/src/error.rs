//! Error types for the session layer.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// The port could not be opened, read, or written at OS level.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Failure reported by the serial backend while acquiring the port.
    #[error("serial port error: {0}")]
    Serial(#[from] serialport::Error),

    /// An expected byte count did not arrive within the phase window.
    #[error("timed out waiting for the listener")]
    Timeout,

    /// Received bytes do not conform to the wire contract.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// The listener abandoned the frame and signalled its error surface.
    #[error("listener signalled a frame error")]
    Endpoint,
}
