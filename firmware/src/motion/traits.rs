//! Motion hardware trait for abstraction and testability
//!
//! The kernel drives two stepper drivers (direction/step/enable lines) and
//! the pen servo through this interface. Pin writes take effect
//! immediately; only the delay suspends, which is where all motion timing
//! lives.

use core::future::Future;

/// Stepper axes of the plotter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    /// Egg rotation, cylindrical.
    X,
    /// Pen arm, bounded.
    Y,
}

impl Axis {
    pub fn index(self) -> usize {
        match self {
            Axis::X => 0,
            Axis::Y => 1,
        }
    }
}

/// Abstract stepper-and-servo interface driven by the motion kernel.
pub trait MotionHardware {
    /// Set an axis direction pin; `forward` is the electrically HIGH level.
    fn set_direction(&mut self, axis: Axis, forward: bool);

    /// Drive an axis step pin HIGH.
    fn step_high(&mut self, axis: Axis);

    /// Drive an axis step pin LOW.
    fn step_low(&mut self, axis: Axis);

    /// Enable or disable both stepper drivers.
    fn set_enabled(&mut self, enabled: bool);

    /// Command the pen servo to an absolute angle in degrees.
    fn set_servo_angle(&mut self, degrees: u8);

    /// Hold the loop for `ms` milliseconds.
    fn delay_ms(&mut self, ms: u32) -> impl Future<Output = ()>;
}

#[cfg(test)]
pub mod mock {
    //! Mock motion hardware for testing

    use super::*;
    use heapless::Vec;

    /// Records every kernel action instead of toggling pins.
    pub struct MockMotionHardware {
        rising_edges: [u32; 2],
        falling_edges: [u32; 2],
        direction: [Option<bool>; 2],
        servo_angles: Vec<u8, 16>,
        enable_history: Vec<bool, 8>,
        delay_total_ms: u64,
    }

    impl MockMotionHardware {
        pub fn new() -> Self {
            Self {
                rising_edges: [0; 2],
                falling_edges: [0; 2],
                direction: [None; 2],
                servo_angles: Vec::new(),
                enable_history: Vec::new(),
                delay_total_ms: 0,
            }
        }

        /// Completed step pulses on an axis.
        pub fn steps(&self, axis: Axis) -> u32 {
            self.rising_edges[axis.index()]
        }

        /// True when every rising edge was matched by a falling edge.
        pub fn pins_released(&self) -> bool {
            self.rising_edges == self.falling_edges
        }

        /// Last direction set on an axis, if any.
        pub fn direction(&self, axis: Axis) -> Option<bool> {
            self.direction[axis.index()]
        }

        /// Every servo angle commanded, in order.
        pub fn servo_angles(&self) -> &[u8] {
            &self.servo_angles
        }

        /// Every enable-line change, in order.
        pub fn enable_history(&self) -> &[bool] {
            &self.enable_history
        }

        pub fn total_delay_ms(&self) -> u64 {
            self.delay_total_ms
        }
    }

    impl Default for MockMotionHardware {
        fn default() -> Self {
            Self::new()
        }
    }

    impl MotionHardware for MockMotionHardware {
        fn set_direction(&mut self, axis: Axis, forward: bool) {
            self.direction[axis.index()] = Some(forward);
        }

        fn step_high(&mut self, axis: Axis) {
            self.rising_edges[axis.index()] += 1;
        }

        fn step_low(&mut self, axis: Axis) {
            self.falling_edges[axis.index()] += 1;
        }

        fn set_enabled(&mut self, enabled: bool) {
            let _ = self.enable_history.push(enabled);
        }

        fn set_servo_angle(&mut self, degrees: u8) {
            let _ = self.servo_angles.push(degrees);
        }

        async fn delay_ms(&mut self, ms: u32) {
            self.delay_total_ms += u64::from(ms);
        }
    }
}
