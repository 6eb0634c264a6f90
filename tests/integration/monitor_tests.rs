//! Supervisors driving the dispatcher: countdown monitor and night light.

use blackbox::app::commands::Command;
use blackbox::app::events::MonitorEvent;
use blackbox::app::monitor::EmergencyMonitor;
use blackbox::config::{LightConfig, OutputPins};
use blackbox::emergency::Phase;
use blackbox::sensors::light::{Ambient, LightPolicy};
use embedded_hal::digital::PinState;

use crate::mock_hw::{CollectingSink, fire_tick, mock_device};

fn countdowns(sink: &CollectingSink) -> Vec<&str> {
    sink.events
        .iter()
        .filter_map(|e| match e {
            MonitorEvent::CountdownUpdated { formatted, .. } => Some(formatted.as_str()),
            _ => None,
        })
        .collect()
}

#[test]
fn countdown_updates_each_second() {
    let d = mock_device();
    let mut monitor = EmergencyMonitor::new();
    let mut sink = CollectingSink::default();
    monitor.trigger(&d, 5).unwrap();
    monitor.poll(&d, &mut sink).unwrap();
    fire_tick(&d);
    monitor.poll(&d, &mut sink).unwrap();
    monitor.poll(&d, &mut sink).unwrap();
    assert_eq!(countdowns(&sink), vec!["05:00", "04:59"]);
}

#[test]
fn disarm_reports_disarmed_not_explosion() {
    let d = mock_device();
    let mut monitor = EmergencyMonitor::new();
    let mut sink = CollectingSink::default();
    monitor.trigger(&d, 1).unwrap();
    monitor.poll(&d, &mut sink).unwrap();
    monitor.disarm(&d, &mut sink).unwrap();
    monitor.poll(&d, &mut sink).unwrap();
    assert_eq!(sink.events.last(), Some(&MonitorEvent::Disarmed));
    assert!(!sink.events.contains(&MonitorEvent::Exploded));
    assert_eq!(d.emergency().status(), 0);
}

#[test]
fn disarm_after_run_out_reports_explosion() {
    let d = mock_device();
    let mut monitor = EmergencyMonitor::new();
    let mut sink = CollectingSink::default();
    monitor.trigger(&d, 1).unwrap();
    monitor.poll(&d, &mut sink).unwrap();
    while fire_tick(&d) {}
    monitor.disarm(&d, &mut sink).unwrap();
    monitor.poll(&d, &mut sink).unwrap();
    assert_eq!(d.phase(), Phase::Exploded);
    assert_eq!(sink.events.last(), Some(&MonitorEvent::Exploded));
    assert!(!sink.events.contains(&MonitorEvent::Disarmed));
}

#[test]
fn disarm_after_immediate_explosion_reports_explosion() {
    let d = mock_device();
    let mut monitor = EmergencyMonitor::new();
    let mut sink = CollectingSink::default();
    monitor.trigger(&d, 0).unwrap();
    monitor.disarm(&d, &mut sink).unwrap();
    monitor.poll(&d, &mut sink).unwrap();
    assert_eq!(sink.events, vec![MonitorEvent::Exploded]);
}

#[test]
fn run_out_reports_explosion_once() {
    let d = mock_device();
    let mut monitor = EmergencyMonitor::new();
    let mut sink = CollectingSink::default();
    monitor.trigger(&d, 1).unwrap();
    while fire_tick(&d) {}
    monitor.poll(&d, &mut sink).unwrap();
    monitor.poll(&d, &mut sink).unwrap();
    let explosions = sink
        .events
        .iter()
        .filter(|e| **e == MonitorEvent::Exploded)
        .count();
    assert_eq!(explosions, 1);
}

#[test]
fn immediate_explosion_is_reported() {
    let d = mock_device();
    let mut monitor = EmergencyMonitor::new();
    let mut sink = CollectingSink::default();
    monitor.trigger(&d, 0).unwrap();
    monitor.poll(&d, &mut sink).unwrap();
    assert_eq!(sink.events, vec![MonitorEvent::Exploded]);
}

#[test]
fn trigger_while_latched_is_ignored() {
    let d = mock_device();
    let mut monitor = EmergencyMonitor::new();
    let mut sink = CollectingSink::default();
    d.dispatch(Command::StartEmergency { minutes: 0 }).unwrap();
    monitor.trigger(&d, 3).unwrap();
    assert!(!monitor.is_active());
    monitor.poll(&d, &mut sink).unwrap();
    assert!(sink.events.is_empty());
}

#[test]
fn disarm_without_countdown_does_nothing() {
    let d = mock_device();
    let mut monitor = EmergencyMonitor::new();
    let mut sink = CollectingSink::default();
    monitor.disarm(&d, &mut sink).unwrap();
    assert!(sink.events.is_empty());
    assert!(d.gpio_port().history().is_empty());
}

#[test]
fn night_light_follows_ambient_through_dispatcher() {
    let d = mock_device();
    let yellow = OutputPins::default().led_yellow;
    let mut policy = LightPolicy::new(LightConfig::default(), yellow);
    let mut sink = CollectingSink::default();

    let steps = [(850, PinState::High), (300, PinState::Low), (650, PinState::High)];
    for (reading, expected) in steps {
        let command = policy.update(reading, &mut sink).unwrap();
        d.dispatch(Command::SetGpio(command)).unwrap();
        assert_eq!(d.gpio_port().level(yellow), Some(expected));
    }
    assert!(sink.events.contains(&MonitorEvent::AmbientChanged {
        reading: 650,
        ambient: Ambient::Dusk
    }));
}
