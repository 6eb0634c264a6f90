//! CommandDispatcher: log channel, countdown and output lines end to end.

use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use blackbox::app::commands::{Command, CommandCode, EventData, GpioCommand, Reply};
use blackbox::app::service::CommandDispatcher;
use blackbox::config::{BlackboxConfig, OutputPins};
use blackbox::emergency::{EmergencyTimer, Phase};
use blackbox::error::Error;
use blackbox::log_channel::{LOG_CAPACITY, LogChannel, Priority};
use blackbox::protocol::{self, EVENT_DATA_LEN};
use embedded_hal::digital::PinState;

use crate::mock_hw::{
    FixedClock, GatedGpio, ManualScheduler, RecordingGpio, TimerCall, fire_tick, mock_device,
};

fn log(device: &crate::mock_hw::MockDevice, priority: Priority, text: &str) {
    device
        .dispatch(Command::LogEvent(EventData::new(priority, text)))
        .unwrap();
}

fn status(device: &crate::mock_hw::MockDevice) -> u32 {
    match device.dispatch(Command::GetEmergencyStatus).unwrap() {
        Reply::EmergencyStatus(s) => s,
        Reply::Done => panic!("status must reply with seconds"),
    }
}

// ── Log channel ───────────────────────────────────────────────

#[test]
fn logged_event_reads_back_once() {
    let d = mock_device();
    log(&d, Priority::Critical, "door forced");
    assert_eq!(
        d.read_log_string(LOG_CAPACITY),
        "[2024-03-01 12:00:00] PRIO:2 MSG:door forced\n"
    );
    assert_eq!(d.read_log_string(LOG_CAPACITY), "");
}

#[test]
fn partial_reads_continue_where_they_stopped() {
    let d = mock_device();
    log(&d, Priority::Info, "a");
    let mut head = [0u8; 10];
    assert_eq!(d.read_log(&mut head), 10);
    assert_eq!(&head, b"[2024-03-0");
    assert!(d.read_log_string(LOG_CAPACITY).ends_with("PRIO:0 MSG:a\n"));
}

#[test]
fn overflow_keeps_newest_bytes() {
    let d = mock_device();
    for i in 0..200 {
        log(&d, Priority::Info, &format!("event number {i}"));
    }
    let text = d.read_log_string(2 * LOG_CAPACITY);
    assert_eq!(text.len(), LOG_CAPACITY);
    assert!(text.ends_with("PRIO:0 MSG:event number 199\n"));
    assert!(!text.contains("MSG:event number 0\n"));
}

#[test]
fn clear_discards_pending_records() {
    let d = mock_device();
    log(&d, Priority::Warning, "x");
    assert_eq!(d.dispatch(Command::ClearLog), Ok(Reply::Done));
    assert!(d.log_channel().is_empty());
    assert_eq!(d.read_log_string(LOG_CAPACITY), "");
}

// ── Output lines ──────────────────────────────────────────────

#[test]
fn valid_pin_is_driven_invalid_pin_ignored() {
    let d = mock_device();
    let yellow = OutputPins::default().led_yellow;
    d.dispatch(Command::SetGpio(GpioCommand::new(yellow, true))).unwrap();
    assert_eq!(
        d.dispatch(Command::SetGpio(GpioCommand::new(17, true))),
        Ok(Reply::Done)
    );
    assert_eq!(d.gpio_port().history(), vec![(yellow, PinState::High)]);
}

// ── Countdown ─────────────────────────────────────────────────

#[test]
fn countdown_runs_to_explosion() {
    let d = mock_device();
    let pins = OutputPins::default();
    d.dispatch(Command::StartEmergency { minutes: 1 }).unwrap();
    assert_eq!(status(&d), 60);
    assert_eq!(
        d.scheduler().history(),
        vec![TimerCall::Schedule { generation: 1, after_ms: 1000 }]
    );

    fire_tick(&d);
    assert_eq!(status(&d), 59);
    assert_eq!(d.gpio_port().level(pins.led_red), Some(PinState::High));
    fire_tick(&d);
    assert_eq!(d.gpio_port().level(pins.led_red), Some(PinState::Low));

    for _ in 0..58 {
        assert!(fire_tick(&d));
    }
    assert_eq!(status(&d), 0);
    assert_eq!(d.phase(), Phase::Exploded);
    for pin in [pins.explosion_trigger, pins.buzzer, pins.led_red] {
        assert_eq!(d.gpio_port().level(pin), Some(PinState::High));
    }
    // The explosion does not reschedule.
    let scheduled = d
        .scheduler()
        .history()
        .iter()
        .filter(|c| matches!(c, TimerCall::Schedule { .. }))
        .count();
    assert_eq!(scheduled, 60);

    let log = d.read_log_string(LOG_CAPACITY);
    assert!(log.contains("PRIO:2 MSG:emergency countdown started: 60 seconds"));
    assert!(log.contains("PRIO:2 MSG:emergency countdown reached zero"));
}

#[test]
fn arm_zero_explodes_at_once() {
    let d = mock_device();
    d.dispatch(Command::StartEmergency { minutes: 0 }).unwrap();
    assert_eq!(d.phase(), Phase::Exploded);
    assert!(d.scheduler().history().is_empty());
    assert_eq!(
        d.gpio_port().level(OutputPins::default().explosion_trigger),
        Some(PinState::High)
    );
}

#[test]
fn second_arm_leaves_running_countdown_alone() {
    let d = mock_device();
    d.dispatch(Command::StartEmergency { minutes: 2 }).unwrap();
    fire_tick(&d);
    d.dispatch(Command::StartEmergency { minutes: 9 }).unwrap();
    assert_eq!(status(&d), 119);
    assert_eq!(d.scheduler().history().len(), 2);
}

#[test]
fn disarm_is_idempotent() {
    let d = mock_device();
    let pins = OutputPins::default();
    d.dispatch(Command::StartEmergency { minutes: 5 }).unwrap();
    d.dispatch(Command::StopEmergency).unwrap();
    let after_first = d.gpio_port().history();
    assert_eq!(status(&d), 0);
    assert_eq!(d.scheduler().history().last(), Some(&TimerCall::Cancel));
    for pin in [pins.explosion_trigger, pins.buzzer, pins.led_red] {
        assert_eq!(d.gpio_port().level(pin), Some(PinState::Low));
    }

    d.dispatch(Command::StopEmergency).unwrap();
    assert_eq!(d.gpio_port().history(), after_first);
    assert!(d.read_log_string(LOG_CAPACITY).contains("PRIO:1 MSG:emergency countdown disarmed"));
}

#[test]
fn tick_in_flight_across_rearm_is_ignored() {
    let d = mock_device();
    d.dispatch(Command::StartEmergency { minutes: 1 }).unwrap();
    let stale = d.scheduler().pending().unwrap();
    d.dispatch(Command::StopEmergency).unwrap();
    d.dispatch(Command::StartEmergency { minutes: 1 }).unwrap();
    d.on_tick(stale);
    assert_eq!(status(&d), 60);
    fire_tick(&d);
    assert_eq!(status(&d), 59);
}

#[test]
fn disarm_during_heartbeat_write_leaves_outputs_low() {
    let config = BlackboxConfig::default();
    let red = config.outputs.led_red;
    let (gpio, entered, release) = GatedGpio::new(red, PinState::High);
    let d = Arc::new(CommandDispatcher::new(
        &config,
        Arc::new(LogChannel::new()),
        Arc::new(EmergencyTimer::new()),
        gpio,
        FixedClock,
        ManualScheduler::default(),
    ));
    d.dispatch(Command::StartEmergency { minutes: 1 }).unwrap();

    // 60 -> 59 is odd, so the heartbeat drives red high and parks there.
    let generation = d.scheduler().take_pending().unwrap();
    let ticker = {
        let d = Arc::clone(&d);
        thread::spawn(move || d.on_tick(generation))
    };
    entered.recv().unwrap();

    let stopper = {
        let d = Arc::clone(&d);
        thread::spawn(move || d.dispatch(Command::StopEmergency).unwrap())
    };
    let deadline = Instant::now() + Duration::from_secs(2);
    while d.phase() != Phase::Idle {
        assert!(Instant::now() < deadline, "disarm never reached the state");
        thread::yield_now();
    }
    release.send(()).unwrap();
    ticker.join().unwrap();
    stopper.join().unwrap();

    let gpio = &d.gpio_port().inner;
    assert_eq!(d.emergency().status(), 0);
    assert_eq!(gpio.level(red), Some(PinState::Low));
    assert_eq!(gpio.level(config.outputs.buzzer), Some(PinState::Low));
    assert_eq!(gpio.level(config.outputs.explosion_trigger), Some(PinState::Low));
}

#[test]
fn explosion_latches_until_reset() {
    let d = mock_device();
    d.dispatch(Command::StartEmergency { minutes: 0 }).unwrap();
    d.dispatch(Command::StartEmergency { minutes: 3 }).unwrap();
    d.dispatch(Command::StopEmergency).unwrap();
    assert_eq!(d.phase(), Phase::Exploded);
    d.reset_emergency();
    assert_eq!(d.phase(), Phase::Idle);
    assert_eq!(
        d.gpio_port().level(OutputPins::default().explosion_trigger),
        Some(PinState::Low)
    );
    d.dispatch(Command::StartEmergency { minutes: 3 }).unwrap();
    assert_eq!(status(&d), 180);
}

#[test]
fn over_limit_arm_is_invalid_request() {
    let d = mock_device();
    let limit = BlackboxConfig::default().emergency.max_countdown_minutes;
    assert_eq!(
        d.dispatch(Command::StartEmergency { minutes: limit + 1 }),
        Err(Error::InvalidRequest)
    );
    assert_eq!(d.phase(), Phase::Idle);
}

// ── Raw control calls ─────────────────────────────────────────

#[test]
fn raw_log_event_with_full_request_number() {
    let d = mock_device();
    let mut arg = protocol::encode_event(Priority::Warning, "tamper");
    let request = protocol::request_number(CommandCode::LogEvent);
    d.dispatch_raw(request, &mut arg).unwrap();
    assert!(d.read_log_string(LOG_CAPACITY).ends_with("PRIO:1 MSG:tamper\n"));
}

#[test]
fn raw_failures_leave_state_untouched() {
    let d = mock_device();
    let mut short = [0u8; EVENT_DATA_LEN - 1];
    assert_eq!(d.dispatch_raw(1, &mut short), Err(Error::TransferFault));
    assert_eq!(d.dispatch_raw(42, &mut []), Err(Error::InvalidRequest));
    let mut negative = (-3i32).to_le_bytes();
    assert_eq!(d.dispatch_raw(4, &mut negative), Err(Error::TransferFault));
    assert!(d.log_channel().is_empty());
    assert_eq!(d.phase(), Phase::Idle);
}

#[test]
fn raw_gpio_and_status() {
    let d = mock_device();
    let buzzer = OutputPins::default().buzzer;
    let mut arg = protocol::encode_gpio(buzzer as i32, 7);
    d.dispatch_raw(3, &mut arg).unwrap();
    assert_eq!(d.gpio_port().level(buzzer), Some(PinState::High));

    let mut minutes = 2i32.to_le_bytes();
    d.dispatch_raw(4, &mut minutes).unwrap();
    let mut out = [0u8; 4];
    d.dispatch_raw(protocol::request_number(CommandCode::GetEmergencyStatus), &mut out)
        .unwrap();
    assert_eq!(i32::from_le_bytes(out), 120);
}

// ── Concurrency ───────────────────────────────────────────────

#[test]
fn concurrent_writers_ticks_and_commands() {
    let d = mock_device();
    d.dispatch(Command::StartEmergency { minutes: 30 }).unwrap();
    let mut workers = Vec::new();
    for w in 0..4 {
        let d = Arc::clone(&d);
        workers.push(thread::spawn(move || {
            for i in 0..100 {
                log(&d, Priority::Info, &format!("w{w} #{i}"));
                if w == 0 {
                    fire_tick(&d);
                }
                if w == 1 && i % 25 == 0 {
                    d.dispatch(Command::StopEmergency).unwrap();
                    d.dispatch(Command::StartEmergency { minutes: 30 }).unwrap();
                }
                let _ = d.read_log_string(64);
            }
        }));
    }
    for worker in workers {
        worker.join().unwrap();
    }
    let s = d.emergency().snapshot();
    assert_eq!(s.remaining_seconds > 0, s.phase == Phase::Armed);
    assert!(d.log_channel().len() <= LOG_CAPACITY);
}

#[test]
fn threaded_timer_drives_countdown_to_zero() {
    let mut config = BlackboxConfig::default();
    config.emergency.tick_interval_ms = 2;
    let device =
        CommandDispatcher::spawn(&config, RecordingGpio::default(), crate::mock_hw::FixedClock)
            .unwrap();
    device.dispatch(Command::StartEmergency { minutes: 1 }).unwrap();
    let deadline = Instant::now() + Duration::from_secs(10);
    while device.phase() != Phase::Exploded && Instant::now() < deadline {
        thread::sleep(Duration::from_millis(10));
    }
    assert_eq!(device.phase(), Phase::Exploded);
    assert_eq!(
        device.gpio_port().level(config.outputs.explosion_trigger),
        Some(PinState::High)
    );
}
