//! Command dispatcher, the device core.
//!
//! [`CommandDispatcher`] owns handles to the log channel and the emergency
//! countdown, and the collaborators that reach the outside world. Every
//! external request funnels through [`dispatch`](CommandDispatcher::dispatch);
//! the tick timer re-enters through [`on_tick`](CommandDispatcher::on_tick).
//!
//! ```text
//!  request ──▶ ┌──────────────────────────┐ ──▶ GpioPort
//!              │    CommandDispatcher     │
//!  tick    ──▶ │  LogChannel · Emergency  │ ──▶ TickScheduler
//!              └──────────────────────────┘
//! ```
//!
//! State changes happen inside the entity's own short critical section and
//! come back as a [`Transition`]. Output writes, log records and timer
//! directives are carried out here, after that section has ended.
//!
//! Applying transitions is serialized by a per-dispatcher output lock,
//! taken only after the state lock is released. Under it, a transition
//! whose stamp is no longer current (a heartbeat or explosion overtaken by
//! a disarm or reset) has its writes and timer directive dropped, so the
//! lines always end up matching the latest state.

use std::sync::{Arc, Mutex, PoisonError};

use core::fmt::Write as _;

use embedded_hal::digital::PinState;
use log::{debug, error, info, warn};

use crate::config::{BlackboxConfig, EmergencyConfig, OutputPins};
use crate::drivers::gpio::GpioActuator;
use crate::drivers::hw_timer::OneShotTimer;
use crate::emergency::{
    EmergencyEvent, EmergencyOutput, EmergencyTimer, Phase, TickDirective, Transition,
};
use crate::error::{Error, Result};
use crate::log_channel::{LogChannel, LogRecord, Message, Priority};
use crate::protocol;

use super::commands::{Command, Reply};
use super::ports::{GpioPort, TickScheduler, WallClock};

// ───────────────────────────────────────────────────────────────
// CommandDispatcher
// ───────────────────────────────────────────────────────────────

pub struct CommandDispatcher<G, C, S> {
    log: Arc<LogChannel>,
    emergency: Arc<EmergencyTimer>,
    gpio: GpioActuator<G>,
    clock: C,
    scheduler: S,
    outputs: OutputPins,
    limits: EmergencyConfig,
    apply_order: Mutex<()>,
}

impl<G: GpioPort, C: WallClock, S: TickScheduler> CommandDispatcher<G, C, S> {
    /// Assemble the core around existing entity handles. Nothing is driven
    /// until the first command.
    pub fn new(
        config: &BlackboxConfig,
        log: Arc<LogChannel>,
        emergency: Arc<EmergencyTimer>,
        gpio: G,
        clock: C,
        scheduler: S,
    ) -> Self {
        Self {
            log,
            emergency,
            gpio: GpioActuator::new(gpio),
            clock,
            scheduler,
            outputs: config.outputs,
            limits: config.emergency,
            apply_order: Mutex::new(()),
        }
    }

    // ── Command boundary ──────────────────────────────────────

    /// Execute one validated command.
    pub fn dispatch(&self, command: Command) -> Result<Reply> {
        match command {
            Command::LogEvent(event) => {
                let record = LogRecord {
                    timestamp: self.clock.now(),
                    priority: event.priority,
                    message: event.message,
                };
                self.log.append(&record);
                info!("blackbox: logged event: {}", record.message);
            }
            Command::ClearLog => {
                self.log.clear();
                info!("blackbox: log cleared");
            }
            Command::SetGpio(cmd) => {
                if self.gpio.set(cmd.pin, cmd.level) {
                    let level = u8::from(cmd.level == PinState::High);
                    info!("blackbox: gpio {} set to {}", cmd.pin, level);
                }
            }
            Command::StartEmergency { minutes } => {
                if minutes > self.limits.max_countdown_minutes {
                    warn!(
                        "blackbox: countdown of {} min exceeds limit of {} min",
                        minutes, self.limits.max_countdown_minutes
                    );
                    return Err(Error::InvalidRequest);
                }
                let transition = self.emergency.arm(minutes)?;
                if transition.is_noop() {
                    info!("blackbox: countdown already running or latched, arm ignored");
                }
                self.apply(transition);
            }
            Command::StopEmergency => self.apply(self.emergency.disarm()),
            Command::GetEmergencyStatus => {
                return Ok(Reply::EmergencyStatus(self.emergency.status()));
            }
        }
        Ok(Reply::Done)
    }

    /// Decode a raw control call, dispatch it and write any reply back into
    /// `arg`.
    pub fn dispatch_raw(&self, request: u32, arg: &mut [u8]) -> Result<()> {
        let command = protocol::decode(request, arg)?;
        let reply = self.dispatch(command)?;
        protocol::encode_reply(reply, arg)
    }

    /// Countdown tick, entered from the timer.
    pub fn on_tick(&self, generation: u32) {
        self.apply(self.emergency.tick(generation));
    }

    /// Return the countdown to `Idle` from any phase, including `Exploded`.
    pub fn reset_emergency(&self) {
        self.apply(self.emergency.reset());
    }

    // ── Log reader ────────────────────────────────────────────

    /// Drain up to `out.len()` bytes of formatted records. Returns 0 when
    /// nothing is pending.
    pub fn read_log(&self, out: &mut [u8]) -> usize {
        self.log.drain(out)
    }

    /// Drain up to `max` bytes as text. Bytes split by an overwrite are
    /// replaced rather than rejected.
    pub fn read_log_string(&self, max: usize) -> String {
        let mut buf = vec![0u8; max];
        let n = self.log.drain(&mut buf);
        buf.truncate(n);
        String::from_utf8_lossy(&buf).into_owned()
    }

    // ── Queries ───────────────────────────────────────────────

    pub fn phase(&self) -> Phase {
        self.emergency.phase()
    }

    pub fn log_channel(&self) -> &Arc<LogChannel> {
        &self.log
    }

    pub fn emergency(&self) -> &Arc<EmergencyTimer> {
        &self.emergency
    }

    pub fn gpio_port(&self) -> &G {
        self.gpio.port()
    }

    pub fn scheduler(&self) -> &S {
        &self.scheduler
    }

    // ── Transition effects ────────────────────────────────────

    fn pin_for(&self, output: EmergencyOutput) -> u32 {
        match output {
            EmergencyOutput::ExplosionTrigger => self.outputs.explosion_trigger,
            EmergencyOutput::Alarm => self.outputs.buzzer,
            EmergencyOutput::RedIndicator => self.outputs.led_red,
        }
    }

    fn record(&self, priority: Priority, args: core::fmt::Arguments<'_>) {
        let mut text = Message::new();
        // Overlong text is cut, never rejected.
        let _ = text.write_fmt(args);
        self.log.append(&LogRecord {
            timestamp: self.clock.now(),
            priority,
            message: text,
        });
    }

    fn apply(&self, transition: Transition) {
        let _order = self.apply_order.lock().unwrap_or_else(PoisonError::into_inner);

        let current = transition
            .valid_while
            .is_none_or(|stamp| self.emergency.is_current(stamp));
        if current {
            match transition.tick {
                TickDirective::Keep => {}
                TickDirective::Schedule(generation) => {
                    self.scheduler.schedule(generation, self.limits.tick_interval_ms);
                }
                TickDirective::Cancel => self.scheduler.cancel(),
            }
            for write in &transition.effects {
                self.gpio.set(self.pin_for(write.output), write.level);
            }
        } else {
            debug!("blackbox: countdown moved on, stale output writes dropped");
        }

        match transition.event {
            None => {}
            Some(EmergencyEvent::Started { seconds }) => {
                info!("blackbox: emergency countdown started: {} seconds", seconds);
                self.record(
                    Priority::Critical,
                    format_args!("emergency countdown started: {} seconds", seconds),
                );
            }
            Some(EmergencyEvent::Exploded) => {
                error!("blackbox: emergency countdown reached zero, trigger asserted");
                self.record(
                    Priority::Critical,
                    format_args!("emergency countdown reached zero, trigger asserted"),
                );
            }
            Some(EmergencyEvent::Disarmed) => {
                info!("blackbox: emergency countdown disarmed");
                self.record(Priority::Warning, format_args!("emergency countdown disarmed"));
            }
            Some(EmergencyEvent::Reset) => {
                info!("blackbox: emergency state reset");
                self.record(Priority::Info, format_args!("emergency state reset"));
            }
        }
    }
}

// ───────────────────────────────────────────────────────────────
// Threaded tick timer wiring
// ───────────────────────────────────────────────────────────────

impl<G, C> CommandDispatcher<G, C, OneShotTimer>
where
    G: GpioPort + 'static,
    C: WallClock + 'static,
{
    /// Build the core with a [`OneShotTimer`] whose expiries call back into
    /// [`on_tick`](Self::on_tick). The timer holds only a weak handle, so
    /// dropping the returned `Arc` shuts the timer down.
    pub fn spawn(config: &BlackboxConfig, gpio: G, clock: C) -> std::io::Result<Arc<Self>> {
        let device = Arc::new(Self::new(
            config,
            Arc::new(LogChannel::new()),
            Arc::new(EmergencyTimer::new()),
            gpio,
            clock,
            OneShotTimer::new(),
        ));
        let weak = Arc::downgrade(&device);
        device.scheduler.start("emergency-tick", move |generation| {
            if let Some(device) = weak.upgrade() {
                device.on_tick(generation);
            }
        })?;
        Ok(device)
    }
}
