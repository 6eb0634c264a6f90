//! Outbound supervisor events.
//!
//! The [`EmergencyMonitor`](super::monitor::EmergencyMonitor) and the
//! [`LightPolicy`](crate::sensors::light::LightPolicy) emit these through
//! the [`EventSink`](super::ports::EventSink) port. Adapters on the other
//! side decide what to do with them: log them, drive a display, notify a
//! remote operator.

use crate::sensors::light::Ambient;

/// Countdown text, "MM:SS". Minutes may exceed two digits.
pub type CountdownText = heapless::String<12>;

/// Structured events emitted by the supervisors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MonitorEvent {
    /// The remaining countdown changed since the last poll.
    CountdownUpdated {
        seconds: u32,
        formatted: CountdownText,
    },

    /// A running countdown reached zero without being disarmed.
    Exploded,

    /// A running countdown was stopped on request.
    Disarmed,

    /// A new light-sensor reading, classified.
    AmbientChanged { reading: u16, ambient: Ambient },

    /// The night light switched between automatic and manual control.
    AutoModeChanged(bool),
}
