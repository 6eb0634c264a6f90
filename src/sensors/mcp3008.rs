//! MCP3008 8-channel, 10-bit ADC acquisition.
//!
//! Two transports reach the converter. At init the candidate SPI device
//! nodes are probed in order; the first that opens and accepts the bus
//! configuration wins. If none does, four GPIO lines are acquired and the
//! conversion is clocked in software ([`super::bitbang`]). The mode is fixed
//! for the life of the instance.
//!
//! Probe failures are expected on boards without an SPI controller and are
//! not errors; only a failure of both transports is.

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{InputPin, OutputPin, PinState};
use embedded_hal::spi::SpiDevice;
use log::{debug, info, warn};

use crate::config::AdcConfig;
use crate::error::{AdcError, GpioError};

use super::bitbang::{BitBangLines, BitBangSpi};

pub const CHANNELS: u8 = 8;
pub const FULL_SCALE: u16 = 1023;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferMode {
    BusMediated,
    BitBanged,
}

// ───────────────────────────────────────────────────────────────
// Transport providers
// ───────────────────────────────────────────────────────────────

/// Opens a configured SPI device by path. `None` means "try the next one".
pub trait BusProbe {
    type Device: SpiDevice<u8>;

    fn open(&mut self, path: &str) -> Option<Self::Device>;
}

/// Acquires single GPIO lines for the software bus.
pub trait LineProvider {
    type Output: OutputPin;
    type Input: InputPin;

    fn output(&mut self, pin: u32, initial: PinState) -> Result<Self::Output, GpioError>;
    fn input(&mut self, pin: u32) -> Result<Self::Input, GpioError>;
}

/// Anything that yields a raw 10-bit sample per channel.
pub trait AnalogSource {
    fn read(&mut self, channel: u8) -> Result<u16, AdcError>;
}

// ───────────────────────────────────────────────────────────────
// Bus frame
// ───────────────────────────────────────────────────────────────

/// Three-byte frame: start, single-ended + channel, padding.
pub const fn bus_frame(channel: u8) -> [u8; 3] {
    [0x01, (8 + channel) << 4, 0x00]
}

/// Ten-bit sample from the low two bits of byte 1 and all of byte 2.
pub fn bus_sample(rx: &[u8; 3]) -> u16 {
    (u16::from(rx[1] & 0x03) << 8) | u16::from(rx[2])
}

// ───────────────────────────────────────────────────────────────
// AdcAcquisition
// ───────────────────────────────────────────────────────────────

enum Transport<S, O, I, D> {
    Bus(S),
    BitBang(BitBangSpi<O, I, D>),
}

pub struct AdcAcquisition<S, O, I, D> {
    transport: Transport<S, O, I, D>,
}

impl<S, O, I, D> AdcAcquisition<S, O, I, D>
where
    S: SpiDevice<u8>,
    O: OutputPin,
    I: InputPin,
    D: DelayNs,
{
    /// Probe every candidate, then fall back to the software bus.
    pub fn init<P, L>(
        config: &AdcConfig,
        probe: &mut P,
        lines: &mut L,
        delay: D,
    ) -> Result<Self, AdcError>
    where
        P: BusProbe<Device = S>,
        L: LineProvider<Output = O, Input = I>,
    {
        for path in &config.spi_candidates {
            if let Some(device) = probe.open(path) {
                info!("mcp3008: using SPI device {}", path);
                return Ok(Self {
                    transport: Transport::Bus(device),
                });
            }
            debug!("mcp3008: {} unavailable", path);
        }

        info!("mcp3008: no SPI device, falling back to bit-banged bus");
        let pins = config.bitbang;
        let acquire = |e: GpioError| {
            warn!("mcp3008: {}", e);
            AdcError::NoTransport
        };
        let sck = lines.output(pins.sck, PinState::Low).map_err(acquire)?;
        let mosi = lines.output(pins.mosi, PinState::Low).map_err(acquire)?;
        let cs = lines.output(pins.cs, PinState::High).map_err(acquire)?;
        let miso = lines.input(pins.miso).map_err(acquire)?;
        let spi = BitBangSpi::new(
            BitBangLines { sck, mosi, miso, cs },
            delay,
            config.edge_delay_us,
        )
        .map_err(|_| AdcError::NoTransport)?;
        info!(
            "mcp3008: bit-bang on sck={} mosi={} miso={} cs={}",
            pins.sck, pins.mosi, pins.miso, pins.cs
        );
        Ok(Self {
            transport: Transport::BitBang(spi),
        })
    }

    pub fn mode(&self) -> TransferMode {
        match self.transport {
            Transport::Bus(_) => TransferMode::BusMediated,
            Transport::BitBang(_) => TransferMode::BitBanged,
        }
    }

    /// One conversion on `channel`. An out-of-range channel is rejected
    /// before any bus or line activity.
    pub fn read(&mut self, channel: u8) -> Result<u16, AdcError> {
        if channel >= CHANNELS {
            return Err(AdcError::InvalidChannel(channel));
        }
        match &mut self.transport {
            Transport::Bus(device) => {
                let tx = bus_frame(channel);
                let mut rx = [0u8; 3];
                device
                    .transfer(&mut rx, &tx)
                    .map_err(|_| AdcError::TransferFailed)?;
                Ok(bus_sample(&rx))
            }
            Transport::BitBang(spi) => spi.convert(channel),
        }
    }
}

impl<S, O, I, D> AnalogSource for AdcAcquisition<S, O, I, D>
where
    S: SpiDevice<u8>,
    O: OutputPin,
    I: InputPin,
    D: DelayNs,
{
    fn read(&mut self, channel: u8) -> Result<u16, AdcError> {
        AdcAcquisition::read(self, channel)
    }
}
