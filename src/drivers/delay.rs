//! Blocking delay for the bit-banged bus on a Linux host.

use std::time::Duration;

use embedded_hal::delay::DelayNs;

/// Sleeps the calling thread. Resolution is whatever the scheduler gives;
/// the MCP3008 only needs a lower bound on each edge.
#[derive(Debug, Clone, Copy, Default)]
pub struct StdDelay;

impl DelayNs for StdDelay {
    fn delay_ns(&mut self, ns: u32) {
        std::thread::sleep(Duration::from_nanos(u64::from(ns)));
    }
}
