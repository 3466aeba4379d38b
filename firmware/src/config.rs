//! Configuration constants for the listener build.

/// Canvas geometry, fixed at compile time.
pub mod canvas {
    /// Circumference of the egg in steps; X wraps modulo this.
    pub const WIDTH: i32 = 1600;

    /// Printable band height in steps; Y is clamped into `[0, HEIGHT - 1]`.
    pub const HEIGHT: i32 = 420;

    /// Offset added to every incoming Y coordinate.
    pub const ORIGIN_Y: i32 = HEIGHT / 2;
}

/// Pen servo calibration.
pub mod pen {
    /// Servo angle with the pen on the egg.
    pub const DOWN_ANGLE: u8 = 140;

    /// Servo angle with the pen lifted.
    pub const UP_ANGLE: u8 = 170;

    /// Settle time after any servo move.
    pub const SETTLE_MS: u32 = 200;
}

/// Step pulse timing.
pub mod motion {
    /// Half-period of one step pulse (high time and low time).
    pub const STEP_PULSE_MS: u32 = 2;
}

/// Per-phase read windows of the listener loop. The sync read itself
/// blocks without a window.
pub mod timeouts {
    /// Window for the 3-byte header after sync is acquired.
    pub const HEADER_MS: u32 = 500;

    /// Window for the request body and for the trailer byte.
    pub const PAYLOAD_MS: u32 = 2000;
}
