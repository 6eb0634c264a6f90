//! Black-box daemon.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                    Adapters (outer ring)                     │
//! │  SysfsOutputs   SpidevProbe / SysfsGpio   SystemClock        │
//! │  (GpioPort)     (BusProbe / LineProvider) (WallClock)        │
//! │  OneShotTimer   LogEventSink                                 │
//! │  (TickScheduler)(EventSink)                                  │
//! │                                                              │
//! │  ──────────────── Port Trait Boundary ─────────────────      │
//! │                                                              │
//! │  ┌────────────────────────────────────────────────────────┐  │
//! │  │        CommandDispatcher (LogChannel · Emergency)      │  │
//! │  └────────────────────────────────────────────────────────┘  │
//! │  EmergencyMonitor · LightPolicy (supervisors)                │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! Commands arrive as text lines on stdin; a polling loop samples the
//! light sensor and watches the countdown.
#![deny(unused_must_use)]

use std::io::BufRead;
use std::sync::mpsc::{self, TryRecvError};
use std::time::Duration;

use anyhow::{Context, Result};
use log::{info, warn};

use blackbox::adapters::log_sink::LogEventSink;
use blackbox::adapters::spidev::SpidevProbe;
use blackbox::adapters::sysfs_gpio::{SysfsGpio, SysfsOutputs};
use blackbox::adapters::time::SystemClock;
use blackbox::app::commands::{Command, Reply};
use blackbox::app::monitor::EmergencyMonitor;
use blackbox::app::service::CommandDispatcher;
use blackbox::config::BlackboxConfig;
use blackbox::drivers::delay::StdDelay;
use blackbox::drivers::hw_timer::OneShotTimer;
use blackbox::log_channel::LOG_CAPACITY;
use blackbox::protocol::{self, ConsoleRequest, NightLightMode};
use blackbox::sensors::light::{LightPolicy, LightSensor};
use blackbox::sensors::mcp3008::AdcAcquisition;

const POLL_INTERVAL: Duration = Duration::from_millis(500);

type Device = CommandDispatcher<SysfsOutputs, SystemClock, OneShotTimer>;

fn load_config() -> Result<BlackboxConfig> {
    let Some(path) = std::env::args().nth(1) else {
        info!("No config file given, using defaults");
        return Ok(BlackboxConfig::default());
    };
    let text = std::fs::read_to_string(&path).with_context(|| format!("reading {path}"))?;
    let config = BlackboxConfig::from_json(&text).with_context(|| format!("loading {path}"))?;
    info!("Config loaded from {}", path);
    Ok(config)
}

/// Forward stdin lines to the main loop.
fn spawn_console() -> Result<mpsc::Receiver<String>> {
    let (tx, rx) = mpsc::channel();
    std::thread::Builder::new()
        .name("console".into())
        .spawn(move || {
            for line in std::io::stdin().lock().lines() {
                let Ok(line) = line else { break };
                if tx.send(line).is_err() {
                    break;
                }
            }
        })
        .context("spawning console thread")?;
    Ok(rx)
}

fn handle_line(
    device: &Device,
    config: &BlackboxConfig,
    monitor: &mut EmergencyMonitor,
    light: &mut LightPolicy,
    sink: &mut LogEventSink,
    line: &str,
) -> blackbox::error::Result<()> {
    if line.trim().is_empty() {
        return Ok(());
    }
    match protocol::parse_line(line, config.emergency.default_countdown_minutes)? {
        ConsoleRequest::Command(Command::StartEmergency { minutes }) => {
            monitor.trigger(device, minutes)?;
        }
        ConsoleRequest::Command(Command::StopEmergency) => monitor.disarm(device, sink)?,
        ConsoleRequest::Command(command) => {
            if let Reply::EmergencyStatus(seconds) = device.dispatch(command)? {
                println!("{seconds}");
            }
        }
        ConsoleRequest::ReadLog => print!("{}", device.read_log_string(LOG_CAPACITY)),
        ConsoleRequest::ResetEmergency => device.reset_emergency(),
        ConsoleRequest::NightLight(mode) => {
            let command = match mode {
                NightLightMode::Auto => light.set_auto(true, sink),
                NightLightMode::On | NightLightMode::Off => {
                    let _ = light.set_auto(false, sink);
                    light.set_manual(mode == NightLightMode::On)
                }
            };
            if let Some(command) = command {
                device.dispatch(Command::SetGpio(command))?;
            }
        }
    }
    Ok(())
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    info!("blackbox v{}", env!("CARGO_PKG_VERSION"));

    let config = load_config()?;

    // ── 1. Output lines and the device core ──────────────────────
    let sysfs = SysfsGpio::new(
        &config.gpio_sysfs_root,
        Duration::from_millis(u64::from(config.adc.export_settle_ms)),
    );
    let outputs = SysfsOutputs::reserve(&sysfs, &config.outputs);
    let device: std::sync::Arc<Device> =
        CommandDispatcher::spawn(&config, outputs, SystemClock).context("starting tick timer")?;

    // ── 2. ADC (optional: the core runs without it) ──────────────
    let mut probe = SpidevProbe::new(config.adc.spi_speed_hz);
    let mut lines = sysfs.clone();
    let adc = match AdcAcquisition::init(&config.adc, &mut probe, &mut lines, StdDelay) {
        Ok(adc) => {
            info!("ADC ready ({:?})", adc.mode());
            Some(adc)
        }
        Err(e) => {
            warn!("ADC unavailable: {}", e);
            None
        }
    };
    let mut sensor = LightSensor::new(adc, config.adc.light_channel);
    let mut light = LightPolicy::new(config.light, config.outputs.led_yellow);
    let mut monitor = EmergencyMonitor::new();
    let mut sink = LogEventSink::new();

    // ── 3. Console and polling loop ──────────────────────────────
    let console = spawn_console()?;
    let mut console_open = true;
    info!("System ready. Entering poll loop.");

    loop {
        while console_open {
            match console.try_recv() {
                Ok(line) => {
                    if let Err(e) =
                        handle_line(&device, &config, &mut monitor, &mut light, &mut sink, &line)
                    {
                        warn!("console: '{}': {}", line.trim(), e);
                    }
                }
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    info!("console closed");
                    console_open = false;
                }
            }
        }

        if let Some(reading) = sensor.read() {
            if let Some(command) = light.update(reading, &mut sink) {
                if let Err(e) = device.dispatch(Command::SetGpio(command)) {
                    warn!("night light: {}", e);
                }
            }
        }

        if let Err(e) = monitor.poll(device.as_ref(), &mut sink) {
            warn!("monitor: {}", e);
        }

        std::thread::sleep(POLL_INTERVAL);
    }
}
