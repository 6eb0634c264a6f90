//! sysfs GPIO adapter.
//!
//! Lines are reserved through the classic `/sys/class/gpio` protocol:
//! write the number to `export`, wait for the attribute files, set
//! `direction`, then use `value`. A line that is already exported is reused
//! as is. Lines exported here are unexported again when dropped.
//!
//! Each line keeps its `value` file open and reads or writes it with
//! positioned I/O, so a bit-banged conversion costs one syscall per edge.

use std::fs::{self, File, OpenOptions};
use std::os::unix::fs::FileExt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use embedded_hal::digital::{ErrorType, InputPin, OutputPin, PinState};
use log::{debug, error, warn};

use crate::app::ports::GpioPort;
use crate::config::OutputPins;
use crate::error::GpioError;
use crate::sensors::mcp3008::LineProvider;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    In,
    Out,
}

impl Direction {
    fn as_attr(self) -> &'static str {
        match self {
            Self::In => "in",
            Self::Out => "out",
        }
    }
}

/// Handle on a sysfs GPIO class directory.
#[derive(Debug, Clone)]
pub struct SysfsGpio {
    root: PathBuf,
    settle: Duration,
}

impl SysfsGpio {
    /// `settle` is how long to wait after an export before the new line's
    /// attribute files are usable.
    pub fn new(root: impl Into<PathBuf>, settle: Duration) -> Self {
        Self {
            root: root.into(),
            settle,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn line_dir(&self, pin: u32) -> PathBuf {
        self.root.join(format!("gpio{pin}"))
    }

    fn attr(&self, pin: u32, name: &str) -> PathBuf {
        self.line_dir(pin).join(name)
    }

    /// Export `pin`. Returns `true` if this call exported it, `false` if it
    /// was already exported.
    pub fn export(&self, pin: u32) -> Result<bool, GpioError> {
        if self.line_dir(pin).exists() {
            debug!("sysfs: gpio{} already exported", pin);
            return Ok(false);
        }
        match fs::write(self.root.join("export"), pin.to_string()) {
            Ok(()) => {
                if !self.settle.is_zero() {
                    std::thread::sleep(self.settle);
                }
                Ok(true)
            }
            // Lost a race with another exporter (EBUSY): the line is there.
            Err(_) if self.line_dir(pin).exists() => Ok(false),
            Err(e) => {
                warn!("sysfs: export gpio{}: {}", pin, e);
                Err(GpioError::ExportFailed(pin))
            }
        }
    }

    pub fn unexport(&self, pin: u32) -> Result<(), GpioError> {
        fs::write(self.root.join("unexport"), pin.to_string()).map_err(|e| {
            warn!("sysfs: unexport gpio{}: {}", pin, e);
            GpioError::ExportFailed(pin)
        })
    }

    pub fn set_direction(&self, pin: u32, direction: Direction) -> Result<(), GpioError> {
        fs::write(self.attr(pin, "direction"), direction.as_attr()).map_err(|e| {
            warn!("sysfs: direction gpio{}: {}", pin, e);
            GpioError::DirectionFailed(pin)
        })
    }

    /// Export, configure and open one line.
    pub fn open_line(&self, pin: u32, direction: Direction) -> Result<SysfsLine, GpioError> {
        let exported_here = self.export(pin)?;
        let line = |value: File| SysfsLine {
            pin,
            value,
            gpio: self.clone(),
            exported_here,
        };
        let opened = self
            .set_direction(pin, direction)
            .and_then(|()| {
                OpenOptions::new()
                    .read(true)
                    .write(direction == Direction::Out)
                    .open(self.attr(pin, "value"))
                    .map_err(|_| match direction {
                        Direction::Out => GpioError::WriteFailed(pin),
                        Direction::In => GpioError::ReadFailed(pin),
                    })
            });
        match opened {
            Ok(file) => Ok(line(file)),
            Err(e) => {
                if exported_here {
                    let _ = self.unexport(pin);
                }
                Err(e)
            }
        }
    }
}

// ───────────────────────────────────────────────────────────────
// SysfsLine
// ───────────────────────────────────────────────────────────────

/// One exported line with its `value` file held open.
#[derive(Debug)]
pub struct SysfsLine {
    pin: u32,
    value: File,
    gpio: SysfsGpio,
    exported_here: bool,
}

impl SysfsLine {
    pub fn pin(&self) -> u32 {
        self.pin
    }

    /// Drive the line. Takes `&self`: positioned writes need no cursor.
    pub fn write_level(&self, level: PinState) -> Result<(), GpioError> {
        let byte: &[u8] = if level == PinState::High { b"1" } else { b"0" };
        self.value
            .write_at(byte, 0)
            .map(|_| ())
            .map_err(|_| GpioError::WriteFailed(self.pin))
    }

    pub fn read_level(&self) -> Result<PinState, GpioError> {
        let mut byte = [0u8; 1];
        match self.value.read_at(&mut byte, 0) {
            Ok(1) if byte[0] == b'1' => Ok(PinState::High),
            Ok(1) if byte[0] == b'0' => Ok(PinState::Low),
            _ => Err(GpioError::ReadFailed(self.pin)),
        }
    }
}

impl ErrorType for SysfsLine {
    type Error = GpioError;
}

impl OutputPin for SysfsLine {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.write_level(PinState::Low)
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.write_level(PinState::High)
    }
}

impl InputPin for SysfsLine {
    fn is_high(&mut self) -> Result<bool, Self::Error> {
        Ok(self.read_level()? == PinState::High)
    }

    fn is_low(&mut self) -> Result<bool, Self::Error> {
        Ok(self.read_level()? == PinState::Low)
    }
}

impl Drop for SysfsLine {
    fn drop(&mut self) {
        if self.exported_here {
            let _ = self.gpio.unexport(self.pin);
        }
    }
}

impl LineProvider for SysfsGpio {
    type Output = SysfsLine;
    type Input = SysfsLine;

    fn output(&mut self, pin: u32, initial: PinState) -> Result<SysfsLine, GpioError> {
        let line = self.open_line(pin, Direction::Out)?;
        line.write_level(initial)?;
        Ok(line)
    }

    fn input(&mut self, pin: u32) -> Result<SysfsLine, GpioError> {
        self.open_line(pin, Direction::In)
    }
}

// ───────────────────────────────────────────────────────────────
// SysfsOutputs (GpioPort)
// ───────────────────────────────────────────────────────────────

/// The reserved output table. Lines that fail to reserve are reported and
/// left out; writes to them are then treated as invalid pins.
#[derive(Debug)]
pub struct SysfsOutputs {
    lines: Vec<SysfsLine>,
}

impl SysfsOutputs {
    /// Reserve every configured output, driven low.
    pub fn reserve(gpio: &SysfsGpio, outputs: &OutputPins) -> Self {
        let mut lines = Vec::with_capacity(6);
        for pin in outputs.all() {
            let reserved = gpio
                .open_line(pin, Direction::Out)
                .and_then(|line| line.write_level(PinState::Low).map(|()| line));
            match reserved {
                Ok(line) => lines.push(line),
                Err(e) => error!("sysfs: reserving gpio{} failed: {}", pin, e),
            }
        }
        Self { lines }
    }

    pub fn reserved(&self) -> impl Iterator<Item = u32> + '_ {
        self.lines.iter().map(SysfsLine::pin)
    }

    fn line(&self, pin: u32) -> Option<&SysfsLine> {
        self.lines.iter().find(|l| l.pin == pin)
    }
}

impl GpioPort for SysfsOutputs {
    fn is_valid(&self, pin: u32) -> bool {
        self.line(pin).is_some()
    }

    fn write(&self, pin: u32, level: PinState) -> Result<(), GpioError> {
        self.line(pin)
            .ok_or(GpioError::WriteFailed(pin))?
            .write_level(level)
    }
}
