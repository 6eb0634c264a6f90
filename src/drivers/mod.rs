//! Output drivers, the countdown tick timer, and timing helpers.

pub mod delay;
pub mod gpio;
pub mod hw_timer;
