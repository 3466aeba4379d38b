//! Listener discovery, version negotiation, and redeploy-on-stale.
//!
//! Connecting means: resolve a port, open it, synchronize, handshake, and
//! compare versions. A listener older than the host is reflashed through
//! the [`Bootstrapper`] collaborator, given a model-dependent grace period
//! to boot, and asked again, exactly once. The flashing tool and the
//! embedded hex images live outside this crate.

use std::thread;
use std::time::Duration;

use log::{debug, info, warn};

use eggplot_protocol::{VERSION_MAJOR, VERSION_MINOR};

use crate::error::{Error, Result};
use crate::port::{NativePort, Port};
use crate::session::{Session, BAUD_RATE};

/// Boards the listener ships on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArduinoModel {
    Uno,
    Nano,
    Mega2560,
}

impl ArduinoModel {
    /// Settle time between a reflash and the listener answering again.
    pub fn boot_grace(self) -> Duration {
        match self {
            ArduinoModel::Uno | ArduinoModel::Nano => Duration::from_millis(2000),
            ArduinoModel::Mega2560 => Duration::from_millis(4000),
        }
    }

    /// Key into the embedded listener image archive.
    pub fn image_name(self) -> &'static str {
        match self {
            ArduinoModel::Uno => "uno",
            ArduinoModel::Nano => "nano",
            ArduinoModel::Mega2560 => "mega2560",
        }
    }
}

/// Flashing collaborator; uploads an Intel-hex image to a board.
pub trait Bootstrapper {
    fn upload_hex(
        &mut self,
        model: ArduinoModel,
        port_name: &str,
        hex_lines: &[String],
    ) -> Result<()>;
}

/// Embedded listener images, indexed by model; opaque to this crate.
pub trait HexSource {
    fn hex_lines(&self, model: ArduinoModel) -> Option<Vec<String>>;
}

/// Staleness comparison collapses the version pair into one code.
pub const fn version_code(major: u8, minor: u8) -> u16 {
    major as u16 * 10 + minor as u16
}

/// Version code the host speaks.
pub const HOST_VERSION_CODE: u16 = version_code(VERSION_MAJOR, VERSION_MINOR);

/// How a session should be established.
pub struct ConnectOptions<'a> {
    pub model: ArduinoModel,
    /// Explicit port; omitted means enumerate and require exactly one.
    pub port_name: Option<&'a str>,
    /// Reflash a stale listener instead of failing.
    pub auto_bootstrap: bool,
}

/// List candidate serial ports on this machine.
pub fn list_ports() -> Result<Vec<String>> {
    Ok(serialport::available_ports()?
        .into_iter()
        .map(|p| p.port_name)
        .collect())
}

fn resolve_port_name(explicit: Option<&str>) -> Result<String> {
    match explicit {
        Some(name) => Ok(name.to_string()),
        None => {
            let mut ports = list_ports()?;
            match ports.len() {
                1 => Ok(ports.remove(0)),
                0 => Err(Error::Io(std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    "no serial ports found",
                ))),
                n => Err(Error::Io(std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    format!("{n} serial ports found, name one explicitly"),
                ))),
            }
        }
    }
}

/// Open a session and negotiate the listener version.
///
/// Generic over the port opener so the retry flow runs under tests; use
/// [`connect`] for the native backend. `grace` is how long to wait between
/// uploading and asking again.
pub fn initialize<P, F>(
    mut open_port: F,
    port_name: &str,
    model: ArduinoModel,
    auto_bootstrap: bool,
    grace: Duration,
    bootstrapper: &mut dyn Bootstrapper,
    images: &dyn HexSource,
) -> Result<Session<P>>
where
    P: Port,
    F: FnMut(&str) -> Result<P>,
{
    let mut session = Session::with_port(open_port(port_name)?);
    session.synchronize()?;
    let (major, minor) = session.handshake()?;
    if version_code(major, minor) >= HOST_VERSION_CODE {
        debug!("listener {major}.{minor} is current");
        return Ok(session);
    }

    warn!(
        "listener {major}.{minor} predates host {VERSION_MAJOR}.{VERSION_MINOR}"
    );
    if !auto_bootstrap {
        return Err(Error::Protocol(format!(
            "listener {major}.{minor} predates host {VERSION_MAJOR}.{VERSION_MINOR} \
             and auto-bootstrap is disabled"
        )));
    }

    let hex_lines = images.hex_lines(model).ok_or_else(|| {
        Error::Protocol(format!("no listener image for {}", model.image_name()))
    })?;
    drop(session);

    info!("redeploying listener to {port_name}");
    bootstrapper.upload_hex(model, port_name, &hex_lines)?;
    thread::sleep(grace);

    let mut session = Session::with_port(open_port(port_name)?);
    session.synchronize()?;
    let (major, minor) = session.handshake()?;
    if version_code(major, minor) < HOST_VERSION_CODE {
        return Err(Error::Protocol(format!(
            "listener still reports {major}.{minor} after redeploy"
        )));
    }
    Ok(session)
}

/// Resolve, open, and negotiate over the native serial backend.
pub fn connect(
    options: &ConnectOptions<'_>,
    bootstrapper: &mut dyn Bootstrapper,
    images: &dyn HexSource,
) -> Result<Session<NativePort>> {
    let port_name = resolve_port_name(options.port_name)?;
    info!("connecting to listener on {port_name}");
    initialize(
        |name| NativePort::open(name, BAUD_RATE),
        &port_name,
        options.model,
        options.auto_bootstrap,
        options.model.boot_grace(),
        bootstrapper,
        images,
    )
}
