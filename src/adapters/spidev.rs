//! spidev bus probe for the MCP3008.
//!
//! Opens a `/dev/spidevB.C` node and applies mode 0, 8-bit words and the
//! configured clock. Any failure just means the node is unusable and the
//! next candidate is tried.

use linux_embedded_hal::SpidevDevice;
use linux_embedded_hal::spidev::{SpiModeFlags, SpidevOptions};
use log::debug;

use crate::sensors::mcp3008::BusProbe;

pub struct SpidevProbe {
    speed_hz: u32,
}

impl SpidevProbe {
    pub fn new(speed_hz: u32) -> Self {
        Self { speed_hz }
    }
}

impl BusProbe for SpidevProbe {
    type Device = SpidevDevice;

    fn open(&mut self, path: &str) -> Option<SpidevDevice> {
        let mut device = match SpidevDevice::open(path) {
            Ok(d) => d,
            Err(e) => {
                debug!("spidev: open {}: {:?}", path, e);
                return None;
            }
        };
        let options = SpidevOptions::new()
            .bits_per_word(8)
            .max_speed_hz(self.speed_hz)
            .mode(SpiModeFlags::SPI_MODE_0)
            .build();
        if let Err(e) = device.0.configure(&options) {
            debug!("spidev: configure {}: {}", path, e);
            return None;
        }
        Some(device)
    }
}
