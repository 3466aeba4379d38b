//! Motion kernel: logical targets to stepper pulses.
//!
//! Incoming coordinates are shifted onto the physical canvas (`y + H/2`,
//! clamped to the printable band) before any stepping. X is cylindrical
//! with circumference [`canvas::WIDTH`]; only non-drawing moves exploit the
//! wrap. Whether a move draws is decided here and nowhere else: a move with
//! the pen down rasterises ([`MotionKernel::line_to`]), a move with the pen
//! up takes the short way around ([`MotionKernel::fly_to`]).

use log::trace;

use eggplot_protocol::Point;

use crate::config::{canvas, motion, pen};
use crate::motion::traits::{Axis, MotionHardware};

/// Owns the pen state and position alongside the hardware they describe.
pub struct MotionKernel<H: MotionHardware> {
    hw: H,
    pen_down: bool,
    pen_x: i32,
    pen_y: i32,
}

impl<H: MotionHardware> MotionKernel<H> {
    /// Kernel parked at the canvas origin with the pen up.
    pub fn new(hw: H) -> Self {
        Self {
            hw,
            pen_down: false,
            pen_x: 0,
            pen_y: canvas::ORIGIN_Y,
        }
    }

    pub fn pen_down(&self) -> bool {
        self.pen_down
    }

    /// Current position in translated canvas coordinates.
    pub fn position(&self) -> (i32, i32) {
        (self.pen_x, self.pen_y)
    }

    pub fn hardware(&self) -> &H {
        &self.hw
    }

    pub fn set_steppers_enabled(&mut self, enabled: bool) {
        self.hw.set_enabled(enabled);
    }

    /// Move the servo and wait for it to settle.
    pub async fn set_pen(&mut self, down: bool) {
        self.pen_down = down;
        let angle = if down { pen::DOWN_ANGLE } else { pen::UP_ANGLE };
        self.hw.set_servo_angle(angle);
        self.hw.delay_ms(pen::SETTLE_MS).await;
    }

    /// Walk to `target`, drawing if the pen is down.
    pub async fn move_to(&mut self, target: Point) {
        let (x, y) = translate(target);
        trace!("move_to ({x}, {y}), pen_down={}", self.pen_down);
        if self.pen_down {
            self.line_to(x, y).await;
        } else {
            self.fly_to(x, y).await;
        }
    }

    /// Bresenham walk in translated coordinates.
    async fn line_to(&mut self, x: i32, y: i32) {
        let dx = x - self.pen_x;
        let dy = y - self.pen_y;
        self.hw.set_direction(Axis::X, dx >= 0);
        self.hw.set_direction(Axis::Y, dy >= 0);

        let adx = dx.abs();
        let ady = dy.abs();
        let (longer, shorter, long_axis, short_axis) = if adx > ady {
            (adx, ady, Axis::X, Axis::Y)
        } else {
            (ady, adx, Axis::Y, Axis::X)
        };

        let mut diff = 2 * shorter - longer;
        for _ in 0..longer {
            self.hw.step_high(long_axis);
            let both = diff > 0;
            if both {
                self.hw.step_high(short_axis);
            }
            self.hw.delay_ms(motion::STEP_PULSE_MS).await;

            self.hw.step_low(long_axis);
            if both {
                self.hw.step_low(short_axis);
                diff -= 2 * longer;
            }
            self.hw.delay_ms(motion::STEP_PULSE_MS).await;
            diff += 2 * shorter;
        }

        self.pen_x = x;
        self.pen_y = y;
    }

    /// Travel walk: shortest path around the cylinder in X.
    async fn fly_to(&mut self, x: i32, y: i32) {
        let mut dx = (x - self.pen_x).rem_euclid(canvas::WIDTH);
        if dx > canvas::WIDTH / 2 {
            dx -= canvas::WIDTH;
        }
        let dy = y - self.pen_y;
        self.hw.set_direction(Axis::X, dx >= 0);
        self.hw.set_direction(Axis::Y, dy >= 0);

        let adx = dx.abs();
        let ady = dy.abs();
        for step in 0..adx.max(ady) {
            let pulse_x = step < adx;
            let pulse_y = step < ady;
            if pulse_x {
                self.hw.step_high(Axis::X);
            }
            if pulse_y {
                self.hw.step_high(Axis::Y);
            }
            self.hw.delay_ms(motion::STEP_PULSE_MS).await;

            if pulse_x {
                self.hw.step_low(Axis::X);
            }
            if pulse_y {
                self.hw.step_low(Axis::Y);
            }
            self.hw.delay_ms(motion::STEP_PULSE_MS).await;
        }

        // The stored target stays unwrapped; the next fly reduces it again.
        self.pen_x = x;
        self.pen_y = y;
    }
}

/// Shift a logical coordinate onto the canvas: X free, Y offset and clamped.
fn translate(p: Point) -> (i32, i32) {
    let x = i32::from(p.x);
    let y = (i32::from(p.y) + canvas::ORIGIN_Y).clamp(0, canvas::HEIGHT - 1);
    (x, y)
}
