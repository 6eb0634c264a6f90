//! Software-clocked MCP3008 conversion over four GPIO lines.
//!
//! Used when no SPI device node is available. One conversion:
//!
//! ```text
//!  CS   ‾‾\_________________________________________/‾‾
//!  SCK  ____/‾\_/‾\_/‾\_/‾\_/‾\___/‾\_/‾\ … /‾\_____
//!  MOSI  <S><D><C2><C1><C0>                          start, single-ended, channel
//!  MISO                         null B9 … B0 x       sampled after each falling edge
//! ```
//!
//! Five command bits go out MSB first, then twelve clocks come back; the
//! accumulator is shifted right once to drop the trailing bit. A delay
//! follows every edge.

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{InputPin, OutputPin, PinState};

use crate::error::AdcError;

const COMMAND_BITS: u32 = 5;
const RESPONSE_CLOCKS: u32 = 12;

/// The four lines of the software bus.
pub struct BitBangLines<O, I> {
    pub sck: O,
    pub mosi: O,
    pub miso: I,
    pub cs: O,
}

pub struct BitBangSpi<O, I, D> {
    lines: BitBangLines<O, I>,
    delay: D,
    edge_delay_us: u32,
}

/// Command byte for `channel`: start bit, single-ended, three channel bits,
/// left-aligned so bit 7 goes out first.
pub const fn command_byte(channel: u8) -> u8 {
    (channel | 0x18) << 3
}

fn fault<E>(_: E) -> AdcError {
    AdcError::TransferFailed
}

impl<O: OutputPin, I: InputPin, D: DelayNs> BitBangSpi<O, I, D> {
    /// Take the lines and park the bus: chip-select high, clock low.
    pub fn new(
        mut lines: BitBangLines<O, I>,
        delay: D,
        edge_delay_us: u32,
    ) -> Result<Self, AdcError> {
        lines.cs.set_high().map_err(fault)?;
        lines.sck.set_low().map_err(fault)?;
        Ok(Self {
            lines,
            delay,
            edge_delay_us,
        })
    }

    fn edge(&mut self) {
        self.delay.delay_us(self.edge_delay_us);
    }

    /// Run one conversion. `channel` must already be in `0..=7`.
    pub fn convert(&mut self, channel: u8) -> Result<u16, AdcError> {
        let result = self.clock_conversion(channel);
        // Always release the chip, even after a failed toggle.
        let released = self.lines.cs.set_high().map_err(fault);
        let value = result?;
        released?;
        Ok(value)
    }

    fn clock_conversion(&mut self, channel: u8) -> Result<u16, AdcError> {
        self.lines.cs.set_high().map_err(fault)?;
        self.lines.sck.set_low().map_err(fault)?;
        self.edge();
        self.lines.cs.set_low().map_err(fault)?;
        self.edge();

        let mut command = command_byte(channel);
        for _ in 0..COMMAND_BITS {
            self.lines
                .mosi
                .set_state(PinState::from(command & 0x80 != 0))
                .map_err(fault)?;
            command <<= 1;
            self.edge();
            self.lines.sck.set_high().map_err(fault)?;
            self.edge();
            self.lines.sck.set_low().map_err(fault)?;
            self.edge();
        }

        let mut acc: u16 = 0;
        for _ in 0..RESPONSE_CLOCKS {
            self.lines.sck.set_high().map_err(fault)?;
            self.edge();
            self.lines.sck.set_low().map_err(fault)?;
            self.edge();
            acc <<= 1;
            if self.lines.miso.is_high().map_err(fault)? {
                acc |= 1;
            }
        }
        Ok(acc >> 1)
    }

    /// Give the lines back.
    pub fn release(self) -> BitBangLines<O, I> {
        self.lines
    }
}
