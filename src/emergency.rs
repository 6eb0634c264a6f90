//! Emergency countdown state machine.
//!
//! ```text
//!            arm(m>0)             tick → 0
//!   Idle ────────────────▶ Armed ───────────▶ Exploded
//!     ▲  ◀──────────────────┘                    │
//!     │        disarm()                          │
//!     │                                          │
//!     └────────────── reset() ◀──────────────────┘
//!   Idle ── arm(0) ─────────────────────────────▶ Exploded
//! ```
//!
//! `EmergencyState` lives behind its own short, non-blocking lock. Nothing
//! inside that section touches hardware: every operation returns a
//! [`Transition`] describing the output writes, the timer directive and the
//! event to record, and the caller performs them once the lock is released.
//! Heartbeat and explosion effects carry the [`Stamp`] they were computed
//! for; the caller drops them if [`EmergencyTimer::is_current`] says the
//! state has moved on in the meantime.
//!
//! Each arm bumps a generation counter. A scheduled tick carries the
//! generation it was scheduled for, so a tick that was already in flight
//! when the countdown was cancelled (or cancelled and re-armed) is ignored.

use core::cell::RefCell;

use embassy_sync::blocking_mutex::Mutex;
use embedded_hal::digital::PinState;

use crate::error::{Error, Result};
use crate::sync::SpinRawMutex;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    Idle,
    Armed,
    Exploded,
}

/// Snapshot of the countdown.
///
/// Invariant: `remaining_seconds > 0` only while `Armed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EmergencyState {
    pub phase: Phase,
    pub remaining_seconds: u32,
    pub generation: u32,
}

impl EmergencyState {
    pub const fn inert() -> Self {
        Self {
            phase: Phase::Idle,
            remaining_seconds: 0,
            generation: 0,
        }
    }

    pub fn is_active(&self) -> bool {
        self.phase == Phase::Armed
    }
}

/// Logical outputs the countdown drives. The pin mapping is configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EmergencyOutput {
    ExplosionTrigger,
    Alarm,
    RedIndicator,
}

/// One deferred output write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutputWrite {
    pub output: EmergencyOutput,
    pub level: PinState,
}

pub type Effects = heapless::Vec<OutputWrite, 3>;

/// What the caller must do with the tick timer after a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickDirective {
    Keep,
    /// Schedule the next tick, tagged with this generation.
    Schedule(u32),
    Cancel,
}

/// Notable transitions, recorded by the caller outside the lock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmergencyEvent {
    Started { seconds: u32 },
    Exploded,
    Disarmed,
    Reset,
}

/// Phase and generation a transition's effects were computed for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Stamp {
    pub phase: Phase,
    pub generation: u32,
}

/// Deferred work produced by a state change.
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use]
pub struct Transition {
    pub effects: Effects,
    pub tick: TickDirective,
    pub event: Option<EmergencyEvent>,
    /// `Some` when `effects` and `tick` only hold while the timer is still
    /// at this stamp. Stand-down transitions carry `None`: driving the
    /// outputs low is always applied.
    pub valid_while: Option<Stamp>,
}

impl Transition {
    fn none() -> Self {
        Self {
            effects: Effects::new(),
            tick: TickDirective::Keep,
            event: None,
            valid_while: None,
        }
    }

    fn all_outputs(level: PinState) -> Effects {
        let mut effects = Effects::new();
        for output in [
            EmergencyOutput::ExplosionTrigger,
            EmergencyOutput::Alarm,
            EmergencyOutput::RedIndicator,
        ] {
            // Capacity is exactly three.
            let _ = effects.push(OutputWrite { output, level });
        }
        effects
    }

    fn explode(generation: u32) -> Self {
        Self {
            effects: Self::all_outputs(PinState::High),
            tick: TickDirective::Keep,
            event: Some(EmergencyEvent::Exploded),
            valid_while: Some(Stamp {
                phase: Phase::Exploded,
                generation,
            }),
        }
    }

    fn stand_down(event: EmergencyEvent) -> Self {
        Self {
            effects: Self::all_outputs(PinState::Low),
            tick: TickDirective::Cancel,
            event: Some(event),
            valid_while: None,
        }
    }

    fn heartbeat(generation: u32, remaining: u32) -> Self {
        let mut effects = Effects::new();
        let _ = effects.push(OutputWrite {
            output: EmergencyOutput::RedIndicator,
            level: PinState::from(remaining % 2 == 1),
        });
        Self {
            effects,
            tick: TickDirective::Schedule(generation),
            event: None,
            valid_while: Some(Stamp {
                phase: Phase::Armed,
                generation,
            }),
        }
    }

    pub fn is_noop(&self) -> bool {
        self.effects.is_empty() && self.tick == TickDirective::Keep && self.event.is_none()
    }
}

/// The process-wide countdown. One instance per device context.
pub struct EmergencyTimer {
    state: Mutex<SpinRawMutex, RefCell<EmergencyState>>,
}

impl EmergencyTimer {
    pub const fn new() -> Self {
        Self {
            state: Mutex::new(RefCell::new(EmergencyState::inert())),
        }
    }

    /// Start a countdown of `minutes`. A no-op unless `Idle`; `arm(0)`
    /// explodes immediately without scheduling a tick.
    pub fn arm(&self, minutes: u32) -> Result<Transition> {
        let seconds = minutes.checked_mul(60).ok_or(Error::InvalidRequest)?;
        Ok(self.state.lock(|cell| {
            let mut s = cell.borrow_mut();
            if s.phase != Phase::Idle {
                return Transition::none();
            }
            s.generation = s.generation.wrapping_add(1);
            if seconds == 0 {
                s.phase = Phase::Exploded;
                s.remaining_seconds = 0;
                return Transition::explode(s.generation);
            }
            s.phase = Phase::Armed;
            s.remaining_seconds = seconds;
            Transition {
                effects: Effects::new(),
                tick: TickDirective::Schedule(s.generation),
                event: Some(EmergencyEvent::Started { seconds }),
                valid_while: Some(Stamp {
                    phase: Phase::Armed,
                    generation: s.generation,
                }),
            }
        }))
    }

    /// One countdown second. Only the tick schedule calls this, passing the
    /// generation the tick was scheduled for.
    pub fn tick(&self, generation: u32) -> Transition {
        self.state.lock(|cell| {
            let mut s = cell.borrow_mut();
            if s.phase != Phase::Armed || s.generation != generation {
                return Transition::none();
            }
            s.remaining_seconds = s.remaining_seconds.saturating_sub(1);
            if s.remaining_seconds == 0 {
                s.phase = Phase::Exploded;
                Transition::explode(s.generation)
            } else {
                Transition::heartbeat(s.generation, s.remaining_seconds)
            }
        })
    }

    /// Cancel a running countdown. A no-op unless `Armed`; safe to repeat.
    pub fn disarm(&self) -> Transition {
        self.state.lock(|cell| {
            let mut s = cell.borrow_mut();
            if s.phase != Phase::Armed {
                return Transition::none();
            }
            s.phase = Phase::Idle;
            s.remaining_seconds = 0;
            Transition::stand_down(EmergencyEvent::Disarmed)
        })
    }

    /// Re-initialise to `Idle` from any phase. This is the only exit from
    /// `Exploded`.
    pub fn reset(&self) -> Transition {
        self.state.lock(|cell| {
            let mut s = cell.borrow_mut();
            s.phase = Phase::Idle;
            s.remaining_seconds = 0;
            Transition::stand_down(EmergencyEvent::Reset)
        })
    }

    /// Seconds left; 0 when `Idle` or `Exploded`.
    pub fn status(&self) -> u32 {
        self.state.lock(|cell| cell.borrow().remaining_seconds)
    }

    pub fn phase(&self) -> Phase {
        self.state.lock(|cell| cell.borrow().phase)
    }

    pub fn snapshot(&self) -> EmergencyState {
        self.state.lock(|cell| *cell.borrow())
    }

    /// Whether the timer is still at `stamp`.
    pub fn is_current(&self, stamp: Stamp) -> bool {
        self.state.lock(|cell| {
            let s = cell.borrow();
            s.phase == stamp.phase && s.generation == stamp.generation
        })
    }
}

impl Default for EmergencyTimer {
    fn default() -> Self {
        Self::new()
    }
}
