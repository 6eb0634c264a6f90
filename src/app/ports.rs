//! Port traits — the boundary between the device core and the outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ CommandDispatcher (core)
//! ```
//!
//! Driven adapters (GPIO backend, wall clock, tick timer, event sinks)
//! implement these traits. The [`CommandDispatcher`](super::service::CommandDispatcher)
//! consumes them via generics, so the core never touches hardware directly
//! and every collaborator can be swapped for a recording mock in tests.

use embedded_hal::digital::PinState;

use crate::error::GpioError;
use crate::log_channel::Timestamp;

// ───────────────────────────────────────────────────────────────
// GPIO port (driven adapter: core → output lines)
// ───────────────────────────────────────────────────────────────

/// Output-line backend. Methods take `&self`: writes are issued from
/// whichever thread ran the command or the tick, after every lock is
/// released.
pub trait GpioPort: Send + Sync {
    /// Whether `pin` names a line this backend can drive.
    fn is_valid(&self, pin: u32) -> bool;

    /// Drive `pin` to `level`.
    fn write(&self, pin: u32, level: PinState) -> Result<(), GpioError>;
}

// ───────────────────────────────────────────────────────────────
// Clock port
// ───────────────────────────────────────────────────────────────

/// Wall-clock source used to stamp log records.
pub trait WallClock: Send + Sync {
    fn now(&self) -> Timestamp;
}

// ───────────────────────────────────────────────────────────────
// Tick scheduler port
// ───────────────────────────────────────────────────────────────

/// One-shot timer driving the emergency countdown.
///
/// Scheduling replaces any pending deadline (mod_timer semantics). When
/// the deadline passes, the implementation calls
/// [`CommandDispatcher::on_tick`](super::service::CommandDispatcher::on_tick)
/// with the generation it was given.
pub trait TickScheduler: Send + Sync {
    fn schedule(&self, generation: u32, after_ms: u32);

    /// Drop the pending deadline, if any.
    fn cancel(&self);
}

// ───────────────────────────────────────────────────────────────
// Event sink port (driven adapter: supervisors → logging / UI)
// ───────────────────────────────────────────────────────────────

/// Supervisors emit structured [`MonitorEvent`](super::events::MonitorEvent)s
/// through this port. Adapters decide where they go (log output, a UI
/// bridge, a notification queue).
pub trait EventSink {
    fn emit(&mut self, event: &super::events::MonitorEvent);
}
