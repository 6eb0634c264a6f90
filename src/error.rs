//! Unified error types for the black-box hardware core.
//!
//! A single `Error` enum that every subsystem converts into, so the command
//! boundary reports failures uniformly. All variants are `Copy` so they can
//! be returned from lock-held paths without allocation.

use core::fmt;

// ---------------------------------------------------------------------------
// Top-level error
// ---------------------------------------------------------------------------

/// Every fallible operation at the command boundary funnels into this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// A payload could not be copied across the caller boundary
    /// (short buffer, malformed layout, unterminated text).
    TransferFault,
    /// Unknown command code or out-of-range argument. No state was mutated.
    InvalidRequest,
    /// No usable device path exists (ADC transport or device node).
    DeviceUnavailable,
    /// A GPIO line operation failed.
    Gpio(GpioError),
    /// An ADC acquisition failed.
    Adc(AdcError),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TransferFault => write!(f, "transfer fault"),
            Self::InvalidRequest => write!(f, "invalid request"),
            Self::DeviceUnavailable => write!(f, "device unavailable"),
            Self::Gpio(e) => write!(f, "gpio: {e}"),
            Self::Adc(e) => write!(f, "adc: {e}"),
        }
    }
}

impl core::error::Error for Error {}

// ---------------------------------------------------------------------------
// GPIO errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GpioError {
    /// The export step failed for a reason other than "already exported".
    ExportFailed(u32),
    /// Direction could not be configured.
    DirectionFailed(u32),
    /// Value write failed.
    WriteFailed(u32),
    /// Value read failed or returned an unparseable level.
    ReadFailed(u32),
}

impl fmt::Display for GpioError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ExportFailed(pin) => write!(f, "export of gpio{pin} failed"),
            Self::DirectionFailed(pin) => write!(f, "direction of gpio{pin} not configurable"),
            Self::WriteFailed(pin) => write!(f, "write to gpio{pin} failed"),
            Self::ReadFailed(pin) => write!(f, "read from gpio{pin} failed"),
        }
    }
}

impl core::error::Error for GpioError {}

impl embedded_hal::digital::Error for GpioError {
    fn kind(&self) -> embedded_hal::digital::ErrorKind {
        embedded_hal::digital::ErrorKind::Other
    }
}

impl From<GpioError> for Error {
    fn from(e: GpioError) -> Self {
        Self::Gpio(e)
    }
}

// ---------------------------------------------------------------------------
// ADC errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdcError {
    /// Channel outside `0..=7`. No bus or line activity was issued.
    InvalidChannel(u8),
    /// The SPI transfer or a line toggle failed mid-conversion.
    TransferFailed,
    /// Neither an SPI device nor the bit-bang lines could be acquired.
    NoTransport,
}

impl fmt::Display for AdcError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidChannel(ch) => write!(f, "channel {ch} out of range"),
            Self::TransferFailed => write!(f, "conversion transfer failed"),
            Self::NoTransport => write!(f, "no usable transport"),
        }
    }
}

impl core::error::Error for AdcError {}

impl From<AdcError> for Error {
    fn from(e: AdcError) -> Self {
        match e {
            AdcError::InvalidChannel(_) => Self::InvalidRequest,
            AdcError::NoTransport => Self::DeviceUnavailable,
            AdcError::TransferFailed => Self::Adc(e),
        }
    }
}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

/// Crate-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;
