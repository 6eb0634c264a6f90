//! Emergency countdown supervisor.
//!
//! Polls the countdown through the command boundary and turns changes into
//! [`MonitorEvent`]s. Tracks whether it believes a countdown is running so
//! that a drop to zero can be told apart: disarmed on request, or exploded.

use core::fmt::Write as _;

use log::{info, warn};

use crate::emergency::Phase;
use crate::error::Result;

use super::commands::{Command, Reply};
use super::events::{CountdownText, MonitorEvent};
use super::ports::{EventSink, GpioPort, TickScheduler, WallClock};
use super::service::CommandDispatcher;

/// Render seconds as "MM:SS".
pub fn format_countdown(seconds: u32) -> CountdownText {
    let mut text = CountdownText::new();
    // u32::MAX / 60 has eight digits; the buffer holds them.
    let _ = write!(text, "{:02}:{:02}", seconds / 60, seconds % 60);
    text
}

#[derive(Debug, Default)]
pub struct EmergencyMonitor {
    active: bool,
    last_seconds: u32,
}

impl EmergencyMonitor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Arm the countdown for `minutes` and start tracking it.
    pub fn trigger<G, C, S>(
        &mut self,
        device: &CommandDispatcher<G, C, S>,
        minutes: u32,
    ) -> Result<()>
    where
        G: GpioPort,
        C: WallClock,
        S: TickScheduler,
    {
        if self.active {
            warn!("monitor: countdown already running");
            return Ok(());
        }
        let before = device.phase();
        device.dispatch(Command::StartEmergency { minutes })?;
        if before != Phase::Idle {
            // Latched after an explosion; the arm was ignored.
            warn!("monitor: countdown not idle ({:?}), trigger ignored", before);
            return Ok(());
        }
        self.active = true;
        self.last_seconds = 0;
        info!("monitor: countdown triggered for {} min", minutes);
        Ok(())
    }

    /// Stop a tracked countdown. Does nothing unless one is running.
    ///
    /// Reports `Disarmed` only if the countdown was actually stopped; one
    /// that ran out first is reported as `Exploded`.
    pub fn disarm<G, C, S>(
        &mut self,
        device: &CommandDispatcher<G, C, S>,
        sink: &mut impl EventSink,
    ) -> Result<()>
    where
        G: GpioPort,
        C: WallClock,
        S: TickScheduler,
    {
        if !self.active {
            return Ok(());
        }
        let before = device.phase();
        device.dispatch(Command::StopEmergency)?;
        self.active = false;
        self.last_seconds = 0;
        match device.phase() {
            Phase::Exploded => {
                warn!("monitor: countdown already ran out, disarm too late");
                sink.emit(&MonitorEvent::Exploded);
            }
            Phase::Idle if before == Phase::Armed => sink.emit(&MonitorEvent::Disarmed),
            _ => {}
        }
        Ok(())
    }

    /// Query the remaining time and emit what changed since the last poll.
    pub fn poll<G, C, S>(
        &mut self,
        device: &CommandDispatcher<G, C, S>,
        sink: &mut impl EventSink,
    ) -> Result<()>
    where
        G: GpioPort,
        C: WallClock,
        S: TickScheduler,
    {
        let seconds = match device.dispatch(Command::GetEmergencyStatus)? {
            Reply::EmergencyStatus(s) => s,
            Reply::Done => 0,
        };
        self.observe(seconds, sink);
        Ok(())
    }

    /// Feed one status reading.
    pub fn observe(&mut self, seconds: u32, sink: &mut impl EventSink) {
        if seconds > 0 {
            // A countdown started elsewhere is tracked all the same.
            self.active = true;
            if seconds != self.last_seconds {
                self.last_seconds = seconds;
                sink.emit(&MonitorEvent::CountdownUpdated {
                    seconds,
                    formatted: format_countdown(seconds),
                });
            }
        } else if self.active {
            self.active = false;
            self.last_seconds = 0;
            sink.emit(&MonitorEvent::Exploded);
        }
    }
}
