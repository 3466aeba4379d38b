//! Host-side plotter session.

use log::debug;

use eggplot_protocol as protocol;
use eggplot_protocol::{PenState, Point, Request, Response, MAX_POINTS};

use crate::error::{Error, Result};
use crate::port::{NativePort, Port};
use crate::wire;

/// Wire speed of the listener UART.
pub const BAUD_RATE: u32 = 115_200;

/// One session per port; at most one request in flight.
///
/// Every method takes `&mut self`, which is what enforces the strict
/// request/response serialization the wire depends on. Callers that need
/// to share a session across threads wrap it in their own mutex around the
/// whole send/receive pair.
#[derive(Debug)]
pub struct Session<P: Port> {
    port: P,
}

impl Session<NativePort> {
    /// Open `port_name` at 115200 8-N-1 and synchronize with the listener.
    pub fn open(port_name: &str) -> Result<Self> {
        let port = NativePort::open(port_name, BAUD_RATE)?;
        let mut session = Session::with_port(port);
        session.synchronize()?;
        Ok(session)
    }
}

impl<P: Port> Session<P> {
    /// Wrap an already-open port without synchronizing.
    pub fn with_port(port: P) -> Self {
        Self { port }
    }

    pub fn port_name(&self) -> &str {
        self.port.name()
    }

    /// Raw access to the underlying port, for diagnostics and raw-frame
    /// tooling. Anything written here must leave the line re-synchronized.
    pub fn port_mut(&mut self) -> &mut P {
        &mut self.port
    }

    /// Bare sync exchange; proves a listener is on the line.
    ///
    /// The listener will then wait for a header and abandon the frame when
    /// none arrives; the next exchange discards that error surface along
    /// with any other stale input.
    pub fn synchronize(&mut self) -> Result<()> {
        self.port.clear_input()?;
        self.port.write_all(&protocol::SYNC)?;

        let mut ack = [0u8; 4];
        self.port.read_exact(&mut ack)?;
        if ack != protocol::SYNC_ACK {
            return Err(Error::Protocol(format!("bad sync ack: {ack:02x?}")));
        }
        debug!("listener synchronized on {}", self.port.name());
        Ok(())
    }

    /// Send one request and wait for its matched response.
    pub fn send(&mut self, request: &Request) -> Result<Response> {
        wire::write_request(&mut self.port, request)?;
        wire::read_response(&mut self.port, request.expected_ack())
    }

    /// Query the listener's protocol version.
    pub fn handshake(&mut self) -> Result<(u8, u8)> {
        match self.send(&Request::Handshake)? {
            Response::Handshake { major, minor } => Ok((major, minor)),
            other => Err(Error::Protocol(format!("unexpected response: {other:?}"))),
        }
    }

    /// Enable the steppers; the listener holds torque from here on.
    pub fn begin(&mut self) -> Result<()> {
        self.send(&Request::Begin).map(|_| ())
    }

    /// Raise the pen, park at the origin, and release the steppers.
    pub fn end(&mut self) -> Result<()> {
        self.send(&Request::End).map(|_| ())
    }

    /// Raise or lower the pen; returns the state the listener settled on.
    pub fn pen(&mut self, state: PenState) -> Result<PenState> {
        match self.send(&Request::Pen(state))? {
            Response::Pen(applied) => Ok(applied),
            other => Err(Error::Protocol(format!("unexpected response: {other:?}"))),
        }
    }

    /// Walk the points in order; returns the count the listener executed.
    pub fn move_points(&mut self, points: &[Point]) -> Result<u8> {
        let mut wire_points: heapless::Vec<Point, MAX_POINTS> = heapless::Vec::new();
        for point in points {
            wire_points
                .push(*point)
                .map_err(|_| Error::Protocol(format!("more than {MAX_POINTS} points")))?;
        }
        match self.send(&Request::Move(wire_points))? {
            Response::Move { count } => Ok(count),
            other => Err(Error::Protocol(format!("unexpected response: {other:?}"))),
        }
    }

    /// Lift, travel to `at`, and touch down.
    pub fn dot(&mut self, at: Point) -> Result<()> {
        self.send(&Request::Dot(at)).map(|_| ())
    }

    /// Travel to `from` with the pen up, then draw to `to`.
    pub fn line(&mut self, from: Point, to: Point) -> Result<()> {
        self.send(&Request::Line { from, to }).map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::port::mock::MockPort;

    fn scripted(responses: &[Vec<u8>]) -> Session<MockPort> {
        let _ = env_logger::builder().is_test(true).try_init();
        let mut port = MockPort::new();
        for bytes in responses {
            port.script(bytes);
        }
        Session::with_port(port)
    }

    /// Firmware-side accept sequence followed by a response frame.
    fn exchange(request: &Request, response: &[u8]) -> Vec<u8> {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&protocol::SYNC_ACK);
        bytes.extend_from_slice(&request.header_echo());
        bytes.extend_from_slice(response);
        bytes
    }

    #[test]
    fn synchronize_accepts_the_sync_ack() {
        let mut session = scripted(&[protocol::SYNC_ACK.to_vec()]);
        session.synchronize().unwrap();
        assert_eq!(session.port_mut().written(), &protocol::SYNC);
    }

    #[test]
    fn synchronize_rejects_other_bytes() {
        let mut session = scripted(&[vec![0xDE, 0xAD, 0xBE, 0xEF]]);
        assert!(matches!(
            session.synchronize().unwrap_err(),
            Error::Protocol(_)
        ));
    }

    #[test]
    fn handshake_returns_the_listener_version() {
        let mut session = scripted(&[exchange(
            &Request::Handshake,
            &[0xF9, 0x03, 0x02, 0x01, 0x00],
        )]);
        assert_eq!(session.handshake().unwrap(), (1, 0));
    }

    #[test]
    fn pen_returns_the_applied_state() {
        let mut session = scripted(&[exchange(
            &Request::Pen(PenState::Down),
            &[0xF9, 0x02, 0x08, 0x01],
        )]);
        assert_eq!(session.pen(PenState::Down).unwrap(), PenState::Down);
    }

    #[test]
    fn move_points_returns_the_executed_count() {
        let points = [Point::new(-1, 0), Point::new(0, 0)];
        let mut wire_points: heapless::Vec<Point, MAX_POINTS> = heapless::Vec::new();
        wire_points.extend_from_slice(&points).unwrap();
        let mut session = scripted(&[exchange(
            &Request::Move(wire_points),
            &[0xF9, 0x02, 0x0a, 0x02],
        )]);

        assert_eq!(session.move_points(&points).unwrap(), 2);
    }

    #[test]
    fn begin_and_end_consume_plain_acks() {
        let mut session = scripted(&[
            exchange(&Request::Begin, &[0xF9, 0x01, 0x04]),
            exchange(&Request::End, &[0xF9, 0x01, 0x06]),
        ]);
        session.begin().unwrap();
        session.end().unwrap();
    }

    #[test]
    fn listener_error_surface_becomes_endpoint_error() {
        let mut session = scripted(&[exchange(
            &Request::Pen(PenState::Down),
            &[protocol::ERR; 3],
        )]);
        assert!(matches!(
            session.pen(PenState::Down).unwrap_err(),
            Error::Endpoint
        ));
    }

    #[test]
    fn mismatched_ack_becomes_protocol_error() {
        let mut session = scripted(&[exchange(
            &Request::Pen(PenState::Down),
            &[0xF9, 0x01, 0x04],
        )]);
        assert!(matches!(
            session.pen(PenState::Down).unwrap_err(),
            Error::Protocol(_)
        ));
    }

    #[test]
    fn each_send_discards_stale_input_first() {
        let mut session = scripted(&[exchange(
            &Request::Handshake,
            &[0xF9, 0x03, 0x02, 0x01, 0x00],
        )]);
        session.handshake().unwrap();
        assert_eq!(session.port_mut().clears(), 1);
    }

    #[test]
    fn too_many_points_is_rejected_locally() {
        let mut session = scripted(&[]);
        let points = vec![Point::new(0, 0); MAX_POINTS + 1];
        assert!(matches!(
            session.move_points(&points).unwrap_err(),
            Error::Protocol(_)
        ));
        assert!(session.port_mut().written().is_empty());
    }
}
