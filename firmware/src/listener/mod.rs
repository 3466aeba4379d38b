//! Firmware listener loop.
//!
//! Single-threaded state machine; one iteration is one command exchange:
//!
//! ```text
//! SYNC -> SYNC_ACK -> HEADER -> HEADER_ECHO -> PAYLOAD -> TRAILER -> VERIFY -> DISPATCH
//! ```
//!
//! A failed sync read restarts silently: a stray byte on the line is not an
//! error. Every later failure abandons the frame, emits the three-byte
//! error surface, and returns to sync acquisition. No command is accepted
//! while the previous one is still moving the motors; the loop is the only
//! owner of the serial port, the steppers, and the pen.

use log::{debug, trace, warn};

use eggplot_protocol as protocol;
use eggplot_protocol::{
    check_bytes, CommandId, Request, Response, MAX_BODY, VERSION_MAJOR, VERSION_MINOR,
};

use crate::config::timeouts;
use crate::motion::traits::MotionHardware;
use crate::motion::MotionKernel;
use crate::serial::traits::SerialPort;

/// Outcome of one listener iteration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Iteration {
    /// A command was executed and acknowledged.
    Dispatched(CommandId),
    /// The sync preamble was not acquired; nothing was emitted.
    NoSync,
    /// The frame was abandoned and the error surface emitted.
    Faulted(Fault),
}

/// Where a frame was abandoned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fault {
    /// Header timed out or did not start with the request marker.
    Header,
    /// Body bytes did not arrive in time.
    Payload,
    /// Trailer timed out or was not the all-written marker.
    Trailer,
    /// Command/length echo or checksum verification failed.
    Verify,
    /// Command byte unknown, or payload malformed for the command.
    Command,
}

/// The listener superloop over a serial port and the motion kernel.
pub struct Listener<S: SerialPort, H: MotionHardware> {
    serial: S,
    motion: MotionKernel<H>,
}

impl<S: SerialPort, H: MotionHardware> Listener<S, H> {
    pub fn new(serial: S, motion: MotionKernel<H>) -> Self {
        Self { serial, motion }
    }

    pub fn serial(&self) -> &S {
        &self.serial
    }

    pub fn motion(&self) -> &MotionKernel<H> {
        &self.motion
    }

    /// Run forever; the loop body is [`Self::poll`].
    pub async fn run(&mut self) {
        loop {
            self.poll().await;
        }
    }

    /// One listener iteration.
    pub async fn poll(&mut self) -> Iteration {
        match self.exchange().await {
            Ok(iteration) => iteration,
            Err(fault) => {
                warn!("frame abandoned: {fault:?}");
                let _ = self
                    .serial
                    .write_all(&[protocol::ERR; protocol::ERR_RUN_LEN])
                    .await;
                Iteration::Faulted(fault)
            }
        }
    }

    async fn exchange(&mut self) -> Result<Iteration, Fault> {
        let mut sync = [0u8; 4];
        let acquired = self.serial.read_exact(&mut sync, None).await;
        if acquired.is_err() || sync != protocol::SYNC {
            return Ok(Iteration::NoSync);
        }
        let _ = self.serial.write_all(&protocol::SYNC_ACK).await;

        let mut header = [0u8; 3];
        self.serial
            .read_exact(&mut header, Some(timeouts::HEADER_MS))
            .await
            .map_err(|_| Fault::Header)?;
        if header[0] != protocol::SOR_REQ {
            return Err(Fault::Header);
        }
        let cmd = header[1];
        let len = header[2] as usize;
        trace!("header: cmd={cmd:#04x} len={len}");
        let _ = self
            .serial
            .write_all(&[len as u8, cmd, protocol::SOR_REQ])
            .await;

        // The body repeats C and L ahead of the payload and check bytes.
        let mut body: heapless::Vec<u8, MAX_BODY> = heapless::Vec::new();
        body.resize(len + 4, 0).map_err(|_| Fault::Payload)?;
        self.serial
            .read_exact(&mut body, Some(timeouts::PAYLOAD_MS))
            .await
            .map_err(|_| Fault::Payload)?;

        let mut trailer = [0u8; 1];
        self.serial
            .read_exact(&mut trailer, Some(timeouts::PAYLOAD_MS))
            .await
            .map_err(|_| Fault::Trailer)?;
        if trailer[0] != protocol::ALL_WRITTEN {
            return Err(Fault::Trailer);
        }

        if body[0] != cmd || body[1] as usize != len {
            return Err(Fault::Verify);
        }
        if body[len + 2..] != check_bytes(&body[..len + 2]) {
            return Err(Fault::Verify);
        }

        let request = Request::decode(cmd, &body[2..len + 2]).map_err(|_| Fault::Command)?;
        debug!("dispatching {:?}", request.id());

        let response = self.execute(&request).await;
        let _ = self.serial.write_all(&response.frame()).await;
        Ok(Iteration::Dispatched(request.id()))
    }

    async fn execute(&mut self, request: &Request) -> Response {
        match request {
            Request::Handshake => Response::Handshake {
                major: VERSION_MAJOR,
                minor: VERSION_MINOR,
            },
            Request::Begin => {
                self.motion.set_steppers_enabled(true);
                Response::Begin
            }
            Request::End => {
                self.motion.set_pen(false).await;
                self.motion.move_to(protocol::Point::new(0, 0)).await;
                self.motion.set_steppers_enabled(false);
                Response::End
            }
            Request::Pen(state) => {
                self.motion.set_pen(state.is_down()).await;
                Response::Pen(self.motion.pen_down().into())
            }
            Request::Move(points) => {
                for point in points {
                    self.motion.move_to(*point).await;
                }
                Response::Move {
                    count: points.len() as u8,
                }
            }
            Request::Dot(point) => {
                self.motion.set_pen(false).await;
                self.motion.move_to(*point).await;
                self.motion.set_pen(true).await;
                Response::Dot
            }
            Request::Line { from, to } => {
                self.motion.set_pen(false).await;
                self.motion.move_to(*from).await;
                self.motion.set_pen(true).await;
                self.motion.move_to(*to).await;
                Response::Line
            }
        }
    }
}
