//! Wire protocol shared by the eggplot host and firmware.
//!
//! # Frame format
//!
//! Requests travel host → firmware:
//!
//! ```text
//! [FE ED BA BE][FB][C][L][C][L][payload: L bytes][c0][c1][FA]
//!  sync         sor cmd len \------ checksummed ------/     all-written
//! ```
//!
//! The command and length bytes are repeated at the start of the checksummed
//! region; the firmware echoes `[L][C][FB]` after reading the header and the
//! host must consume that echo before writing the body. Responses travel
//! firmware → host without a checksum:
//!
//! ```text
//! [F9][L][ack][payload: L-1 bytes]
//! ```
//!
//! A run of three `EF` bytes from the firmware means it gave up on the
//! current frame.
//!
//! # Commands
//!
//! | Command   | Req  | Ack  | Request payload      | Ack payload  |
//! |-----------|------|------|----------------------|--------------|
//! | Handshake | 0x01 | 0x02 | none                 | major, minor |
//! | Begin     | 0x03 | 0x04 | none                 | none         |
//! | End       | 0x05 | 0x06 | none                 | none         |
//! | Pen       | 0x07 | 0x08 | state (1)            | state (1)    |
//! | Move      | 0x09 | 0x0a | N points (4N)        | count (1)    |
//! | Dot       | 0x0b | 0x0c | point (4)            | none         |
//! | Line      | 0x0d | 0x0e | from (4), to (4)     | none         |
//!
//! Points are signed 16-bit big-endian pairs. The ack code is always the
//! request code plus one.
//!
//! # Checksum
//!
//! Fletcher-16 reduced modulo 255 (not 256) over `[C, L, payload...]`. The
//! two transmitted trailer bytes are the complement bytes derived from the
//! checksum with 0xFF arithmetic; see [`check_bytes`]. Both endpoints derive
//! the pair independently and compare for equality.

#![cfg_attr(not(test), no_std)]

use heapless::Vec;

/// Sync preamble opening every request frame.
pub const SYNC: [u8; 4] = [0xFE, 0xED, 0xBA, 0xBE];
/// Firmware's reply to the sync preamble.
pub const SYNC_ACK: [u8; 4] = [0xCA, 0xFE, 0xF0, 0x0D];
/// Start-of-request marker.
pub const SOR_REQ: u8 = 0xFB;
/// Start-of-response marker.
pub const SOR_RSP: u8 = 0xF9;
/// All-bytes-written trailer marker.
pub const ALL_WRITTEN: u8 = 0xFA;
/// Error byte; the firmware emits three in a row when it abandons a frame.
pub const ERR: u8 = 0xEF;
/// Length of the firmware's error surface.
pub const ERR_RUN_LEN: usize = 3;

/// Protocol version reported by an up-to-date listener.
pub const VERSION_MAJOR: u8 = 1;
pub const VERSION_MINOR: u8 = 0;

/// The payload length rides in a single byte.
pub const MAX_PAYLOAD: usize = 255;
/// Bytes per point on the wire.
pub const POINT_WIRE_LEN: usize = 4;
/// Most points a single `Move` payload can carry.
pub const MAX_POINTS: usize = MAX_PAYLOAD / POINT_WIRE_LEN;
/// Request body: repeated `C` and `L`, payload, two check bytes.
pub const MAX_BODY: usize = MAX_PAYLOAD + 4;
/// Response frame: marker, length, ack, longest ack payload.
pub const MAX_RESPONSE_FRAME: usize = 8;

/// Request payload buffer.
pub type Payload = Vec<u8, MAX_PAYLOAD>;

/// Streaming Fletcher-16 accumulator, reduced modulo 255.
///
/// Feeding a region in pieces yields the same checksum as feeding it whole,
/// which is what makes the host's incremental frame assembly and the
/// firmware's verify pass agree.
#[derive(Debug, Clone, Copy)]
pub struct Fletcher16 {
    sum1: u16,
    sum2: u16,
}

impl Fletcher16 {
    pub fn new() -> Self {
        Self { sum1: 0, sum2: 0 }
    }

    pub fn update(&mut self, data: &[u8]) {
        for &byte in data {
            self.sum1 = (self.sum1 + u16::from(byte)) % 255;
            self.sum2 = (self.sum2 + self.sum1) % 255;
        }
    }

    /// Checksum over everything fed so far: `(sum2 << 8) | sum1`.
    pub fn value(&self) -> u16 {
        (self.sum2 << 8) | self.sum1
    }
}

impl Default for Fletcher16 {
    fn default() -> Self {
        Self::new()
    }
}

/// Fletcher-16 (mod 255) over `data`.
pub fn fletcher16(data: &[u8]) -> u16 {
    let mut fletcher = Fletcher16::new();
    fletcher.update(data);
    fletcher.value()
}

/// Complement bytes transmitted in the request trailer.
///
/// The complement step deliberately uses 0xFF, not 255-as-modulus-of-the-sum
/// semantics from the checksum itself; the pair `(c0, c1)` is what crosses
/// the wire and what the firmware re-derives for its equality test.
pub fn check_bytes(region: &[u8]) -> [u8; 2] {
    let checksum = fletcher16(region);
    let f0 = (checksum & 0xFF) as u8;
    let f1 = (checksum >> 8) as u8;
    let c0 = 0xFF - ((u16::from(f0) + u16::from(f1)) % 0xFF) as u8;
    let c1 = 0xFF - ((u16::from(f0) + u16::from(c0)) % 0xFF) as u8;
    [c0, c1]
}

/// A logical plotter coordinate, signed 16-bit per axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Point {
    pub x: i16,
    pub y: i16,
}

impl Point {
    pub const fn new(x: i16, y: i16) -> Self {
        Self { x, y }
    }

    /// Big-endian wire form, x first.
    pub fn to_wire(self) -> [u8; POINT_WIRE_LEN] {
        let x = self.x.to_be_bytes();
        let y = self.y.to_be_bytes();
        [x[0], x[1], y[0], y[1]]
    }

    pub fn from_wire(bytes: &[u8; POINT_WIRE_LEN]) -> Self {
        Self {
            x: i16::from_be_bytes([bytes[0], bytes[1]]),
            y: i16::from_be_bytes([bytes[2], bytes[3]]),
        }
    }
}

/// Pen position as carried on the wire.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PenState {
    Up = 0,
    Down = 1,
}

impl PenState {
    /// Any nonzero byte means down.
    pub fn from_wire(byte: u8) -> Self {
        if byte != 0 {
            PenState::Down
        } else {
            PenState::Up
        }
    }

    pub fn is_down(self) -> bool {
        matches!(self, PenState::Down)
    }
}

impl From<bool> for PenState {
    fn from(down: bool) -> Self {
        if down {
            PenState::Down
        } else {
            PenState::Up
        }
    }
}

/// Request command codes.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CommandId {
    Handshake = 0x01,
    Begin = 0x03,
    End = 0x05,
    Pen = 0x07,
    Move = 0x09,
    Dot = 0x0b,
    Line = 0x0d,
}

impl CommandId {
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            0x01 => Some(Self::Handshake),
            0x03 => Some(Self::Begin),
            0x05 => Some(Self::End),
            0x07 => Some(Self::Pen),
            0x09 => Some(Self::Move),
            0x0b => Some(Self::Dot),
            0x0d => Some(Self::Line),
            _ => None,
        }
    }

    /// Matching ack code, always the command code plus one.
    pub fn ack(self) -> u8 {
        self as u8 + 1
    }
}

/// Wire-level decode failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum WireError {
    /// Command byte outside the table.
    UnknownCommand(u8),
    /// Ack byte outside the table.
    UnknownAck(u8),
    /// Payload length does not fit the command.
    LengthMismatch,
    /// Payload would not fit in a single frame.
    PayloadOverflow,
}

/// A typed request, host → firmware.
#[derive(Debug, Clone, PartialEq)]
pub enum Request {
    Handshake,
    Begin,
    End,
    Pen(PenState),
    Move(Vec<Point, MAX_POINTS>),
    Dot(Point),
    Line { from: Point, to: Point },
}

impl Request {
    pub fn id(&self) -> CommandId {
        match self {
            Request::Handshake => CommandId::Handshake,
            Request::Begin => CommandId::Begin,
            Request::End => CommandId::End,
            Request::Pen(_) => CommandId::Pen,
            Request::Move(_) => CommandId::Move,
            Request::Dot(_) => CommandId::Dot,
            Request::Line { .. } => CommandId::Line,
        }
    }

    /// Ack code this request expects back.
    pub fn expected_ack(&self) -> u8 {
        self.id().ack()
    }

    /// Payload bytes, excluding every marker and the checksum.
    pub fn payload(&self) -> Payload {
        let mut payload = Payload::new();
        match self {
            Request::Handshake | Request::Begin | Request::End => {}
            Request::Pen(state) => {
                let _ = payload.push(*state as u8);
            }
            Request::Move(points) => {
                for point in points {
                    let _ = payload.extend_from_slice(&point.to_wire());
                }
            }
            Request::Dot(point) => {
                let _ = payload.extend_from_slice(&point.to_wire());
            }
            Request::Line { from, to } => {
                let _ = payload.extend_from_slice(&from.to_wire());
                let _ = payload.extend_from_slice(&to.to_wire());
            }
        }
        payload
    }

    /// Header written after the sync preamble: `[FB, C, L]`.
    pub fn header(&self) -> [u8; 3] {
        [SOR_REQ, self.id() as u8, self.payload().len() as u8]
    }

    /// Echo the firmware sends back for a header: `[L, C, FB]`.
    pub fn header_echo(&self) -> [u8; 3] {
        let [sor, cmd, len] = self.header();
        [len, cmd, sor]
    }

    /// Body written after the echo: `[C, L, payload..., c0, c1]`.
    pub fn body(&self) -> Vec<u8, MAX_BODY> {
        let payload = self.payload();
        let mut body: Vec<u8, MAX_BODY> = Vec::new();
        let _ = body.push(self.id() as u8);
        let _ = body.push(payload.len() as u8);
        let _ = body.extend_from_slice(&payload);
        let check = check_bytes(&body);
        let _ = body.extend_from_slice(&check);
        body
    }

    /// Decode a request from its raw command byte and payload bytes.
    pub fn decode(cmd: u8, payload: &[u8]) -> Result<Self, WireError> {
        let cmd = CommandId::from_byte(cmd).ok_or(WireError::UnknownCommand(cmd))?;
        match cmd {
            CommandId::Handshake | CommandId::Begin | CommandId::End => {
                if !payload.is_empty() {
                    return Err(WireError::LengthMismatch);
                }
                Ok(match cmd {
                    CommandId::Handshake => Request::Handshake,
                    CommandId::Begin => Request::Begin,
                    _ => Request::End,
                })
            }
            CommandId::Pen => {
                if payload.len() != 1 {
                    return Err(WireError::LengthMismatch);
                }
                Ok(Request::Pen(PenState::from_wire(payload[0])))
            }
            CommandId::Move => {
                if payload.len() % POINT_WIRE_LEN != 0 {
                    return Err(WireError::LengthMismatch);
                }
                let mut points: Vec<Point, MAX_POINTS> = Vec::new();
                for chunk in payload.chunks_exact(POINT_WIRE_LEN) {
                    let bytes: [u8; POINT_WIRE_LEN] =
                        chunk.try_into().map_err(|_| WireError::LengthMismatch)?;
                    points
                        .push(Point::from_wire(&bytes))
                        .map_err(|_| WireError::PayloadOverflow)?;
                }
                Ok(Request::Move(points))
            }
            CommandId::Dot => {
                let bytes: [u8; POINT_WIRE_LEN] =
                    payload.try_into().map_err(|_| WireError::LengthMismatch)?;
                Ok(Request::Dot(Point::from_wire(&bytes)))
            }
            CommandId::Line => {
                if payload.len() != 2 * POINT_WIRE_LEN {
                    return Err(WireError::LengthMismatch);
                }
                let from = [payload[0], payload[1], payload[2], payload[3]];
                let to = [payload[4], payload[5], payload[6], payload[7]];
                Ok(Request::Line {
                    from: Point::from_wire(&from),
                    to: Point::from_wire(&to),
                })
            }
        }
    }
}

/// A typed response, firmware → host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    Handshake { major: u8, minor: u8 },
    Begin,
    End,
    Pen(PenState),
    Move { count: u8 },
    Dot,
    Line,
}

impl Response {
    pub fn ack(&self) -> u8 {
        match self {
            Response::Handshake { .. } => CommandId::Handshake.ack(),
            Response::Begin => CommandId::Begin.ack(),
            Response::End => CommandId::End.ack(),
            Response::Pen(_) => CommandId::Pen.ack(),
            Response::Move { .. } => CommandId::Move.ack(),
            Response::Dot => CommandId::Dot.ack(),
            Response::Line => CommandId::Line.ack(),
        }
    }

    fn payload(&self) -> Vec<u8, 2> {
        let mut payload: Vec<u8, 2> = Vec::new();
        match self {
            Response::Handshake { major, minor } => {
                let _ = payload.push(*major);
                let _ = payload.push(*minor);
            }
            Response::Pen(state) => {
                let _ = payload.push(*state as u8);
            }
            Response::Move { count } => {
                let _ = payload.push(*count);
            }
            Response::Begin | Response::End | Response::Dot | Response::Line => {}
        }
        payload
    }

    /// Full response frame: `[F9, len, ack, payload...]`.
    pub fn frame(&self) -> Vec<u8, MAX_RESPONSE_FRAME> {
        let payload = self.payload();
        let mut frame: Vec<u8, MAX_RESPONSE_FRAME> = Vec::new();
        let _ = frame.push(SOR_RSP);
        let _ = frame.push(payload.len() as u8 + 1);
        let _ = frame.push(self.ack());
        let _ = frame.extend_from_slice(&payload);
        frame
    }

    /// Decode a response from its ack code and payload bytes.
    pub fn decode(ack: u8, payload: &[u8]) -> Result<Self, WireError> {
        let expect_len = |len: usize| {
            if payload.len() == len {
                Ok(())
            } else {
                Err(WireError::LengthMismatch)
            }
        };
        match ack {
            0x02 => {
                expect_len(2)?;
                Ok(Response::Handshake {
                    major: payload[0],
                    minor: payload[1],
                })
            }
            0x04 => {
                expect_len(0)?;
                Ok(Response::Begin)
            }
            0x06 => {
                expect_len(0)?;
                Ok(Response::End)
            }
            0x08 => {
                expect_len(1)?;
                Ok(Response::Pen(PenState::from_wire(payload[0])))
            }
            0x0a => {
                expect_len(1)?;
                Ok(Response::Move { count: payload[0] })
            }
            0x0c => {
                expect_len(0)?;
                Ok(Response::Dot)
            }
            0x0e => {
                expect_len(0)?;
                Ok(Response::Line)
            }
            other => Err(WireError::UnknownAck(other)),
        }
    }
}
