//! The device's command vocabulary.
//!
//! Six operations, each carrying a typed payload. This is the only way an
//! external collaborator (UI shell, supervisory logic, the stdin console)
//! reaches the log channel, the countdown or the output lines. The raw,
//! integer-coded form is decoded in [`crate::protocol`].

use embedded_hal::digital::PinState;

use crate::log_channel::{Message, Priority, bounded_message};

/// Integer command codes (the `nr` field of the ioctl number).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum CommandCode {
    LogEvent = 1,
    ClearLog = 2,
    SetGpio = 3,
    StartEmergency = 4,
    StopEmergency = 5,
    GetEmergencyStatus = 6,
}

impl CommandCode {
    pub fn from_nr(nr: u32) -> Option<Self> {
        match nr {
            1 => Some(Self::LogEvent),
            2 => Some(Self::ClearLog),
            3 => Some(Self::SetGpio),
            4 => Some(Self::StartEmergency),
            5 => Some(Self::StopEmergency),
            6 => Some(Self::GetEmergencyStatus),
            _ => None,
        }
    }

    pub const fn nr(self) -> u32 {
        self as u32
    }
}

/// Payload of a log request. The dispatcher stamps the time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventData {
    pub priority: Priority,
    pub message: Message,
}

impl EventData {
    /// Build from text, truncating to the record limit on a char boundary.
    pub fn new(priority: Priority, text: &str) -> Self {
        Self {
            priority,
            message: bounded_message(text),
        }
    }
}

/// Drive one output line. Transient, never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GpioCommand {
    pub pin: u32,
    pub level: PinState,
}

impl GpioCommand {
    pub fn new(pin: u32, on: bool) -> Self {
        Self {
            pin,
            level: PinState::from(on),
        }
    }
}

/// A decoded, validated request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    LogEvent(EventData),
    ClearLog,
    SetGpio(GpioCommand),
    StartEmergency { minutes: u32 },
    StopEmergency,
    GetEmergencyStatus,
}

impl Command {
    pub fn code(&self) -> CommandCode {
        match self {
            Self::LogEvent(_) => CommandCode::LogEvent,
            Self::ClearLog => CommandCode::ClearLog,
            Self::SetGpio(_) => CommandCode::SetGpio,
            Self::StartEmergency { .. } => CommandCode::StartEmergency,
            Self::StopEmergency => CommandCode::StopEmergency,
            Self::GetEmergencyStatus => CommandCode::GetEmergencyStatus,
        }
    }
}

/// Result of a successful dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reply {
    Done,
    /// Seconds left on the countdown (0 when idle or exploded).
    EmergencyStatus(u32),
}
