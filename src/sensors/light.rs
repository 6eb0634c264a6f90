//! Ambient light sensing and the night-light policy.
//!
//! A photoresistor divider on one ADC channel: higher readings mean darker.
//! [`LightSensor`] turns the acquisition into an optional reading (absent
//! when no transport exists or the conversion failed). [`LightPolicy`]
//! classifies readings and decides when the yellow night light changes.

use log::{debug, info};

use crate::app::commands::GpioCommand;
use crate::app::events::MonitorEvent;
use crate::app::ports::EventSink;
use crate::config::LightConfig;

use super::mcp3008::AnalogSource;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Ambient {
    Day,
    Dusk,
    Night,
}

impl Ambient {
    pub fn classify(reading: u16, config: &LightConfig) -> Self {
        if reading < config.dusk_threshold {
            Self::Day
        } else if reading < config.night_threshold {
            Self::Dusk
        } else {
            Self::Night
        }
    }

    /// Whether the night light belongs on.
    pub fn wants_light(self) -> bool {
        self != Self::Day
    }
}

// ───────────────────────────────────────────────────────────────
// LightSensor
// ───────────────────────────────────────────────────────────────

/// Light channel reader. With no acquisition every read is a no-op.
pub struct LightSensor<A> {
    adc: Option<A>,
    channel: u8,
}

impl<A: AnalogSource> LightSensor<A> {
    pub fn new(adc: Option<A>, channel: u8) -> Self {
        Self { adc, channel }
    }

    pub fn is_available(&self) -> bool {
        self.adc.is_some()
    }

    pub fn read(&mut self) -> Option<u16> {
        let adc = self.adc.as_mut()?;
        match adc.read(self.channel) {
            Ok(v) => Some(v),
            Err(e) => {
                debug!("light: {}", e);
                None
            }
        }
    }
}

// ───────────────────────────────────────────────────────────────
// LightPolicy
// ───────────────────────────────────────────────────────────────

pub struct LightPolicy {
    config: LightConfig,
    night_light_pin: u32,
    last_reading: Option<u16>,
    auto: bool,
}

impl LightPolicy {
    /// Starts in automatic mode with no reading.
    pub fn new(config: LightConfig, night_light_pin: u32) -> Self {
        Self {
            config,
            night_light_pin,
            last_reading: None,
            auto: true,
        }
    }

    pub fn is_auto(&self) -> bool {
        self.auto
    }

    pub fn last_reading(&self) -> Option<u16> {
        self.last_reading
    }

    fn command_for(&self, reading: u16) -> GpioCommand {
        let ambient = Ambient::classify(reading, &self.config);
        GpioCommand::new(self.night_light_pin, ambient.wants_light())
    }

    /// Take a new reading. Repeats of the last reading are ignored. Returns
    /// the night-light command to dispatch in automatic mode.
    pub fn update(&mut self, reading: u16, sink: &mut impl EventSink) -> Option<GpioCommand> {
        if self.last_reading == Some(reading) {
            return None;
        }
        self.last_reading = Some(reading);
        let ambient = Ambient::classify(reading, &self.config);
        sink.emit(&MonitorEvent::AmbientChanged { reading, ambient });
        self.auto.then(|| self.command_for(reading))
    }

    /// Switch between automatic and manual control. Returning to automatic
    /// re-applies the last reading at once.
    pub fn set_auto(&mut self, enabled: bool, sink: &mut impl EventSink) -> Option<GpioCommand> {
        if self.auto == enabled {
            return None;
        }
        self.auto = enabled;
        info!("light: automatic night light {}", if enabled { "on" } else { "off" });
        sink.emit(&MonitorEvent::AutoModeChanged(enabled));
        if enabled {
            self.last_reading.map(|r| self.command_for(r))
        } else {
            None
        }
    }

    /// Manual override. Ignored in automatic mode.
    pub fn set_manual(&self, on: bool) -> Option<GpioCommand> {
        (!self.auto).then(|| GpioCommand::new(self.night_light_pin, on))
    }
}
