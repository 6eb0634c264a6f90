//! System configuration parameters
//!
//! All tunable parameters of the hardware core: the output pin table, the
//! emergency countdown timing, the ADC transport candidates and the
//! light-level thresholds. Defaults come from [`crate::pins`]; a JSON file
//! may override any subset of fields.

use serde::{Deserialize, Serialize};

use crate::pins;

/// Core configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BlackboxConfig {
    pub outputs: OutputPins,
    pub emergency: EmergencyConfig,
    pub adc: AdcConfig,
    pub light: LightConfig,
    /// Root of the sysfs GPIO class directory.
    pub gpio_sysfs_root: String,
}

/// Output pin table. This mapping is wiring, not logic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputPins {
    pub led_green: u32,
    pub led_blue: u32,
    pub led_red: u32,
    pub led_yellow: u32,
    pub buzzer: u32,
    pub explosion_trigger: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmergencyConfig {
    /// Countdown tick period (milliseconds).
    pub tick_interval_ms: u32,
    /// Minutes used when an arm request carries no explicit duration.
    pub default_countdown_minutes: u32,
    /// Upper bound accepted by an arm request.
    pub max_countdown_minutes: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdcConfig {
    /// spidev nodes probed in priority order.
    pub spi_candidates: Vec<String>,
    pub spi_speed_hz: u32,
    pub bitbang: BitBangPins,
    /// Delay after every clock/chip-select edge (microseconds).
    pub edge_delay_us: u32,
    /// Settle time after exporting a line, before its attribute files exist.
    pub export_settle_ms: u32,
    pub light_channel: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BitBangPins {
    pub sck: u32,
    pub mosi: u32,
    pub miso: u32,
    pub cs: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LightConfig {
    /// Readings at or above this are dusk.
    pub dusk_threshold: u16,
    /// Readings at or above this are night.
    pub night_threshold: u16,
}

impl Default for BlackboxConfig {
    fn default() -> Self {
        Self {
            outputs: OutputPins::default(),
            emergency: EmergencyConfig::default(),
            adc: AdcConfig::default(),
            light: LightConfig::default(),
            gpio_sysfs_root: "/sys/class/gpio".into(),
        }
    }
}

impl Default for OutputPins {
    fn default() -> Self {
        Self {
            led_green: pins::LED_GREEN_GPIO,
            led_blue: pins::LED_BLUE_GPIO,
            led_red: pins::LED_RED_GPIO,
            led_yellow: pins::LED_YELLOW_GPIO,
            buzzer: pins::BUZZER_GPIO,
            explosion_trigger: pins::EXPLOSION_TRIGGER_GPIO,
        }
    }
}

impl OutputPins {
    /// Every configured output, in reservation order.
    pub fn all(&self) -> [u32; 6] {
        [
            self.led_green,
            self.led_blue,
            self.led_red,
            self.led_yellow,
            self.buzzer,
            self.explosion_trigger,
        ]
    }

    pub fn contains(&self, pin: u32) -> bool {
        self.all().contains(&pin)
    }
}

impl Default for EmergencyConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: 1000,
            default_countdown_minutes: 5,
            max_countdown_minutes: 24 * 60,
        }
    }
}

impl Default for AdcConfig {
    fn default() -> Self {
        Self {
            spi_candidates: vec![
                "/dev/spidev0.0".into(),
                "/dev/spidev1.0".into(),
                "/dev/spidev0.1".into(),
                "/dev/spidev1.1".into(),
            ],
            spi_speed_hz: 1_000_000,
            bitbang: BitBangPins::default(),
            edge_delay_us: 2,
            export_settle_ms: 50,
            light_channel: pins::LIGHT_SENSOR_ADC_CHANNEL,
        }
    }
}

impl Default for BitBangPins {
    fn default() -> Self {
        Self {
            sck: pins::ADC_SCK_GPIO,
            mosi: pins::ADC_MOSI_GPIO,
            miso: pins::ADC_MISO_GPIO,
            cs: pins::ADC_CS_GPIO,
        }
    }
}

impl Default for LightConfig {
    fn default() -> Self {
        Self {
            dusk_threshold: 500,
            night_threshold: 800,
        }
    }
}

// ───────────────────────────────────────────────────────────────
// Loading and validation
// ───────────────────────────────────────────────────────────────

/// Errors from loading a configuration.
#[derive(Debug)]
pub enum ConfigError {
    /// The document is not valid JSON for this schema.
    Parse(serde_json::Error),
    /// A field failed range validation.
    /// The `&'static str` describes which field and why.
    ValidationFailed(&'static str),
}

impl core::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Parse(e) => write!(f, "config parse error: {}", e),
            Self::ValidationFailed(msg) => write!(f, "validation failed: {}", msg),
        }
    }
}

impl std::error::Error for ConfigError {}

impl BlackboxConfig {
    /// Parse a JSON document and validate it. Missing fields take defaults.
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(text).map_err(ConfigError::Parse)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject configurations that would make the core misbehave.
    /// Invalid values are rejected, never clamped.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let outputs = self.outputs.all();
        for (i, pin) in outputs.iter().enumerate() {
            if outputs[i + 1..].contains(pin) {
                return Err(ConfigError::ValidationFailed("outputs: duplicate pin"));
            }
        }
        if self.emergency.tick_interval_ms == 0 {
            return Err(ConfigError::ValidationFailed("emergency.tick_interval_ms must be > 0"));
        }
        if self.emergency.default_countdown_minutes > self.emergency.max_countdown_minutes {
            return Err(ConfigError::ValidationFailed(
                "emergency.default_countdown_minutes exceeds max_countdown_minutes",
            ));
        }
        if self.adc.spi_candidates.is_empty() {
            return Err(ConfigError::ValidationFailed("adc.spi_candidates is empty"));
        }
        if self.adc.light_channel > 7 {
            return Err(ConfigError::ValidationFailed("adc.light_channel must be 0..=7"));
        }
        let bb = self.adc.bitbang;
        let lines = [bb.sck, bb.mosi, bb.miso, bb.cs];
        for (i, pin) in lines.iter().enumerate() {
            if lines[i + 1..].contains(pin) || self.outputs.contains(*pin) {
                return Err(ConfigError::ValidationFailed("adc.bitbang: pin reused"));
            }
        }
        if self.light.dusk_threshold >= self.light.night_threshold {
            return Err(ConfigError::ValidationFailed(
                "light.dusk_threshold must be below night_threshold",
            ));
        }
        Ok(())
    }
}
