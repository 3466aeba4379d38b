pub mod kernel;
pub mod traits;

pub use kernel::MotionKernel;
pub use traits::{Axis, MotionHardware};
