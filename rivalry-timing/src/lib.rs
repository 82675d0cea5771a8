pub mod frame;
pub mod timer;

pub use frame::FrameClock;
pub use timer::{HighPrecisionTimer, ManualTimer, Timer};
