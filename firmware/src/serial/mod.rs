pub mod traits;

#[cfg(feature = "embedded")]
pub mod transport;

pub use traits::{SerialError, SerialPort};
