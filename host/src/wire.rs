//! One request/response exchange over a [`Port`].
//!
//! Writing a request is interactive: the firmware acknowledges the sync
//! preamble and echoes the header in reverse before it will accept the
//! body, so the codec interleaves reads with its writes. Responses carry
//! no checksum; the only failure surfaces are a wrong marker, a wrong ack
//! code, or the firmware's three-byte error run.

use log::trace;

use eggplot_protocol as protocol;
use eggplot_protocol::{Request, Response};

use crate::error::{Error, Result};
use crate::port::Port;

/// Write one request frame, consuming the firmware's acknowledgements.
pub fn write_request<P: Port>(port: &mut P, request: &Request) -> Result<()> {
    port.clear_input()?;
    port.write_all(&protocol::SYNC)?;

    let mut sync_ack = [0u8; 4];
    port.read_exact(&mut sync_ack)?;
    if sync_ack != protocol::SYNC_ACK {
        return Err(Error::Protocol(format!(
            "bad sync ack: {sync_ack:02x?}"
        )));
    }

    let header = request.header();
    trace!("request header: {header:02x?}");
    port.write_all(&header)?;

    let mut echo = [0u8; 3];
    port.read_exact(&mut echo)?;
    if echo != request.header_echo() {
        return Err(Error::Protocol(format!("bad header echo: {echo:02x?}")));
    }

    port.write_all(&request.body())?;
    port.write_all(&[protocol::ALL_WRITTEN])?;
    Ok(())
}

/// Read one response frame and decode it against the expected ack code.
pub fn read_response<P: Port>(port: &mut P, expected_ack: u8) -> Result<Response> {
    let mut marker = [0u8; 1];
    port.read_exact(&mut marker)?;

    if marker[0] == protocol::ERR {
        let mut rest = [0u8; protocol::ERR_RUN_LEN - 1];
        port.read_exact(&mut rest)?;
        if rest.iter().all(|&b| b == protocol::ERR) {
            return Err(Error::Endpoint);
        }
        return Err(Error::Protocol(format!(
            "partial error surface: {rest:02x?}"
        )));
    }
    if marker[0] != protocol::SOR_RSP {
        return Err(Error::Protocol(format!(
            "bad response marker: {:#04x}",
            marker[0]
        )));
    }

    let mut len = [0u8; 1];
    port.read_exact(&mut len)?;
    let len = len[0] as usize;
    if len == 0 {
        return Err(Error::Protocol("empty response".to_string()));
    }

    let mut data = vec![0u8; len];
    port.read_exact(&mut data)?;
    trace!("response: ack={:#04x} payload={:02x?}", data[0], &data[1..]);

    let ack = data[0];
    if ack != expected_ack {
        return Err(Error::Protocol(format!(
            "ack {ack:#04x} does not match request (expected {expected_ack:#04x})"
        )));
    }
    Response::decode(ack, &data[1..])
        .map_err(|e| Error::Protocol(format!("malformed ack payload: {e:?}")))
}
