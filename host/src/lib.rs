//! Host-side session layer for the eggplot serial protocol.
//!
//! A [`Session`] owns one serial port and sequences every exchange with the
//! listener: synchronize, handshake, then strictly one request/response at
//! a time. The wire is framed with fixed markers and a mod-255 Fletcher
//! complement trailer; see [`eggplot_protocol`] for the byte-level
//! contract.
//!
//! ```no_run
//! use eggplot_host::protocol::{PenState, Point};
//! use eggplot_host::Session;
//!
//! fn main() -> eggplot_host::Result<()> {
//!     let mut session = Session::open("/dev/ttyUSB0")?;
//!     let (major, minor) = session.handshake()?;
//!     println!("listener {major}.{minor}");
//!
//!     session.begin()?;
//!     session.pen(PenState::Down)?;
//!     session.move_points(&[Point::new(100, 0), Point::new(100, 50)])?;
//!     session.end()?;
//!     Ok(())
//! }
//! ```
//!
//! Ports are acquired through the [`port::Port`] trait, so the native
//! `serialport` backend and scripted test doubles interchange freely.

pub mod bootstrap;
pub mod error;
pub mod port;
pub mod session;
pub mod wire;

pub use eggplot_protocol as protocol;

pub use error::{Error, Result};
pub use session::Session;
