//! MCP3008 acquisition: transport probing, bus frames, the software bus.

use std::cell::Cell;
use std::rc::Rc;

use blackbox::config::AdcConfig;
use blackbox::error::AdcError;
use blackbox::sensors::bitbang::command_byte;
use blackbox::sensors::mcp3008::{AdcAcquisition, TransferMode};

use crate::mock_hw::{
    Line, LineEvent, MockLine, ScriptedLines, ScriptedProbe, ScriptedSpi, TracedDelay,
};

type MockAdc = AdcAcquisition<ScriptedSpi, MockLine, MockLine, TracedDelay>;

fn init(probe: &mut ScriptedProbe, lines: &mut ScriptedLines) -> Result<MockAdc, AdcError> {
    let delay = TracedDelay {
        trace: Rc::clone(&lines.trace),
        calls: Rc::new(Cell::new(0)),
    };
    AdcAcquisition::init(&AdcConfig::default(), probe, lines, delay)
}

// ── Transport selection ───────────────────────────────────────

#[test]
fn first_openable_candidate_wins() {
    let mut probe = ScriptedProbe::new(Some("/dev/spidev1.0"));
    let mut lines = ScriptedLines::new();
    let adc = init(&mut probe, &mut lines).unwrap();
    assert_eq!(adc.mode(), TransferMode::BusMediated);
    assert_eq!(probe.attempts, vec!["/dev/spidev0.0", "/dev/spidev1.0"]);
    assert!(lines.trace.borrow().events.is_empty());
}

#[test]
fn falls_back_after_probing_every_candidate() {
    let mut probe = ScriptedProbe::new(None);
    let mut lines = ScriptedLines::new();
    let adc = init(&mut probe, &mut lines).unwrap();
    assert_eq!(adc.mode(), TransferMode::BitBanged);
    assert_eq!(probe.attempts.len(), AdcConfig::default().spi_candidates.len());
    let trace = lines.trace.borrow();
    assert_eq!(trace.last_set(Line::Cs), Some(true));
    assert_eq!(trace.last_set(Line::Sck), Some(false));
}

#[test]
fn no_transport_when_lines_unavailable() {
    let mut probe = ScriptedProbe::new(None);
    let mut lines = ScriptedLines::new();
    lines.refuse = Some(AdcConfig::default().bitbang.miso);
    assert_eq!(init(&mut probe, &mut lines).err(), Some(AdcError::NoTransport));
}

// ── Bus-mediated reads ────────────────────────────────────────

#[test]
fn bus_read_sends_frame_and_assembles_ten_bits() {
    let mut probe = ScriptedProbe::new(Some("/dev/spidev0.0"));
    probe.response = [0xFF, 0xFE, 0x9A];
    let mut lines = ScriptedLines::new();
    let mut adc = init(&mut probe, &mut lines).unwrap();
    assert_eq!(adc.read(3), Ok(0x29A));
    assert_eq!(*probe.sent.borrow(), vec![vec![0x01, 0xB0, 0x00]]);
}

#[test]
fn invalid_channel_issues_no_transfer() {
    let mut probe = ScriptedProbe::new(Some("/dev/spidev0.0"));
    let mut lines = ScriptedLines::new();
    let mut adc = init(&mut probe, &mut lines).unwrap();
    assert_eq!(adc.read(8), Err(AdcError::InvalidChannel(8)));
    assert!(probe.sent.borrow().is_empty());
}

#[test]
fn bus_failure_is_transfer_failed() {
    let mut probe = ScriptedProbe::new(Some("/dev/spidev0.0"));
    probe.fail_transfers = true;
    let mut lines = ScriptedLines::new();
    let mut adc = init(&mut probe, &mut lines).unwrap();
    assert_eq!(adc.read(0), Err(AdcError::TransferFailed));
}

// ── Bit-banged reads ──────────────────────────────────────────

fn bitbang_adc() -> (MockAdc, ScriptedLines) {
    let mut probe = ScriptedProbe::new(None);
    let mut lines = ScriptedLines::new();
    let adc = init(&mut probe, &mut lines).unwrap();
    lines.trace.borrow_mut().events.clear();
    (adc, lines)
}

#[test]
fn bitbang_clocks_command_then_twelve_bits() {
    // null bit, then 1011001110, then a trailing bit.
    let bits = [0, 1, 0, 1, 1, 0, 0, 1, 1, 1, 0, 1];
    for channel in 0..8u8 {
        let (mut adc, lines) = bitbang_adc();
        lines
            .trace
            .borrow_mut()
            .miso
            .extend(bits.iter().map(|&b| b == 1));

        assert_eq!(adc.read(channel), Ok(0b0101_1001_1101 >> 1), "channel {channel}");

        let trace = lines.trace.borrow();
        let mosi = trace.mosi_at_rising_edges();
        assert_eq!(mosi.len(), 5 + 12, "channel {channel}");
        let command = 0b11000 | channel;
        let expected: Vec<bool> = (0..5).map(|i| command & (0b10000 >> i) != 0).collect();
        assert_eq!(&mosi[..5], expected.as_slice(), "channel {channel}");
        assert_eq!(command_byte(channel) >> 3, command);
        assert_eq!(trace.count(LineEvent::Sample(Line::Miso)), 12);
        assert_eq!(trace.last_set(Line::Cs), Some(true));
    }
}

#[test]
fn bitbang_samples_after_falling_edge() {
    let (mut adc, lines) = bitbang_adc();
    adc.read(0).unwrap();
    let trace = lines.trace.borrow();
    for (i, ev) in trace.events.iter().enumerate() {
        if *ev == LineEvent::Sample(Line::Miso) {
            let previous_edge = trace.events[..i]
                .iter()
                .rev()
                .find_map(|e| match *e {
                    LineEvent::Set(Line::Sck, level) => Some(level),
                    _ => None,
                });
            assert_eq!(previous_edge, Some(false));
        }
    }
}

#[test]
fn every_edge_is_followed_by_a_delay() {
    let (mut adc, lines) = bitbang_adc();
    adc.read(1).unwrap();
    let trace = lines.trace.borrow();
    let edges: Vec<usize> = trace
        .events
        .iter()
        .enumerate()
        .filter(|(_, e)| matches!(e, LineEvent::Set(Line::Sck, _)))
        .map(|(i, _)| i)
        .collect();
    assert_eq!(edges.len(), 1 + 2 * 17);
    for i in edges {
        assert_eq!(trace.events.get(i + 1), Some(&LineEvent::Delay(2_000)));
    }
}

#[test]
fn bitbang_rejects_invalid_channel_without_line_activity() {
    let (mut adc, lines) = bitbang_adc();
    assert_eq!(adc.read(9), Err(AdcError::InvalidChannel(9)));
    assert!(lines.trace.borrow().events.is_empty());
}
