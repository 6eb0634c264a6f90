//! GPIO pin assignments for the GuardianEye carrier board (Jetson TX2 header).
//!
//! Single source of truth for the default wiring — [`crate::config`] seeds
//! every pin table from these constants, and a JSON config may override them.
//! Numbers are kernel GPIO numbers as seen under `/sys/class/gpio`.

// ---------------------------------------------------------------------------
// Status LEDs
// ---------------------------------------------------------------------------

pub const LED_GREEN_GPIO: u32 = 398;
pub const LED_BLUE_GPIO: u32 = 389;
/// Red indicator; blinks while the emergency countdown runs.
pub const LED_RED_GPIO: u32 = 388;
/// Yellow night light, driven by the light-level policy.
pub const LED_YELLOW_GPIO: u32 = 481;

// ---------------------------------------------------------------------------
// Emergency outputs
// ---------------------------------------------------------------------------

/// Alarm buzzer.
pub const BUZZER_GPIO: u32 = 297;
/// Terminal output asserted when the countdown reaches zero.
pub const EXPLOSION_TRIGGER_GPIO: u32 = 298;

// ---------------------------------------------------------------------------
// MCP3008 bit-bang fallback lines (header pins 23/21/19/24)
// ---------------------------------------------------------------------------

pub const ADC_SCK_GPIO: u32 = 427;
pub const ADC_MISO_GPIO: u32 = 428;
pub const ADC_MOSI_GPIO: u32 = 429;
pub const ADC_CS_GPIO: u32 = 430;

// ---------------------------------------------------------------------------
// Analog inputs
// ---------------------------------------------------------------------------

/// Photoresistor divider on MCP3008 CH0.
pub const LIGHT_SENSOR_ADC_CHANNEL: u8 = 0;
