//! Wire forms of the command boundary.
//!
//! Two encodings reach the [`CommandDispatcher`](crate::app::service::CommandDispatcher):
//!
//! * the raw control-call form: a 32-bit request number in the Linux
//!   `_IOC` layout (magic `'B'`, numbers 1..=6) plus an argument buffer
//!   with a fixed little-endian layout, and
//! * a line-oriented text form used by the interactive console.
//!
//! ```text
//!  request  = dir:2 | size:14 | type:8 | nr:8      (msb → lsb)
//!  event    = message[256] (NUL-terminated) | priority:i32
//!  gpio     = pin:i32 | value:i32
//!  minutes  = i32            status = i32 (out)
//! ```
//!
//! Bare numbers 1..=6 are accepted as request numbers too. Any payload
//! that is short, unterminated, negative where a count is expected, or
//! not UTF-8 is a [`Error::TransferFault`]; nothing is mutated.

use crate::app::commands::{Command, CommandCode, EventData, GpioCommand, Reply};
use crate::error::{Error, Result};
use crate::log_channel::Priority;

// ───────────────────────────────────────────────────────────────
// Request numbers
// ───────────────────────────────────────────────────────────────

pub const IOCTL_MAGIC: u8 = b'B';

const NR_SHIFT: u32 = 0;
const TYPE_SHIFT: u32 = 8;
const SIZE_SHIFT: u32 = 16;
const DIR_SHIFT: u32 = 30;
const SIZE_MASK: u32 = (1 << 14) - 1;

const DIR_NONE: u32 = 0;
const DIR_WRITE: u32 = 1;
const DIR_READ: u32 = 2;

/// Message field width, terminator included.
pub const MESSAGE_FIELD_LEN: usize = 256;
pub const EVENT_DATA_LEN: usize = MESSAGE_FIELD_LEN + 4;
pub const GPIO_COMMAND_LEN: usize = 8;
pub const INT_LEN: usize = 4;

const fn ioc(dir: u32, nr: u32, size: usize) -> u32 {
    (dir << DIR_SHIFT)
        | ((size as u32 & SIZE_MASK) << SIZE_SHIFT)
        | ((IOCTL_MAGIC as u32) << TYPE_SHIFT)
        | (nr << NR_SHIFT)
}

/// Direction and payload size each request carries.
const fn layout(code: CommandCode) -> (u32, usize) {
    match code {
        CommandCode::LogEvent => (DIR_WRITE, EVENT_DATA_LEN),
        CommandCode::ClearLog => (DIR_NONE, 0),
        CommandCode::SetGpio => (DIR_WRITE, GPIO_COMMAND_LEN),
        CommandCode::StartEmergency => (DIR_WRITE, INT_LEN),
        CommandCode::StopEmergency => (DIR_NONE, 0),
        CommandCode::GetEmergencyStatus => (DIR_READ, INT_LEN),
    }
}

/// Full request number for `code`.
pub const fn request_number(code: CommandCode) -> u32 {
    let (dir, size) = layout(code);
    ioc(dir, code.nr(), size)
}

/// Map a request number to its command code.
pub fn decode_request(request: u32) -> Result<CommandCode> {
    if request <= 0xff {
        return CommandCode::from_nr(request).ok_or(Error::InvalidRequest);
    }
    if (request >> TYPE_SHIFT) & 0xff != u32::from(IOCTL_MAGIC) {
        return Err(Error::InvalidRequest);
    }
    let code = CommandCode::from_nr(request & 0xff).ok_or(Error::InvalidRequest)?;
    if request != request_number(code) {
        return Err(Error::InvalidRequest);
    }
    Ok(code)
}

// ───────────────────────────────────────────────────────────────
// Payloads
// ───────────────────────────────────────────────────────────────

fn read_i32(arg: &[u8], offset: usize) -> Result<i32> {
    let bytes = arg
        .get(offset..offset + INT_LEN)
        .ok_or(Error::TransferFault)?;
    let mut raw = [0u8; INT_LEN];
    raw.copy_from_slice(bytes);
    Ok(i32::from_le_bytes(raw))
}

/// Decode a raw request and its argument buffer into a [`Command`].
pub fn decode(request: u32, arg: &[u8]) -> Result<Command> {
    let code = decode_request(request)?;
    match code {
        CommandCode::LogEvent => decode_event(arg).map(Command::LogEvent),
        CommandCode::ClearLog => Ok(Command::ClearLog),
        CommandCode::SetGpio => {
            let pin = read_i32(arg, 0)?;
            let value = read_i32(arg, INT_LEN)?;
            // A negative pin is an invalid pin, which the actuator ignores.
            let pin = u32::try_from(pin).unwrap_or(u32::MAX);
            Ok(Command::SetGpio(GpioCommand::new(pin, value != 0)))
        }
        CommandCode::StartEmergency => {
            let minutes = u32::try_from(read_i32(arg, 0)?).map_err(|_| Error::TransferFault)?;
            Ok(Command::StartEmergency { minutes })
        }
        CommandCode::StopEmergency => Ok(Command::StopEmergency),
        CommandCode::GetEmergencyStatus => {
            if arg.len() < INT_LEN {
                return Err(Error::TransferFault);
            }
            Ok(Command::GetEmergencyStatus)
        }
    }
}

fn decode_event(arg: &[u8]) -> Result<EventData> {
    if arg.len() < EVENT_DATA_LEN {
        return Err(Error::TransferFault);
    }
    let field = &arg[..MESSAGE_FIELD_LEN];
    let nul = field
        .iter()
        .position(|&b| b == 0)
        .ok_or(Error::TransferFault)?;
    let text = core::str::from_utf8(&field[..nul]).map_err(|_| Error::TransferFault)?;
    let priority =
        Priority::from_raw(read_i32(arg, MESSAGE_FIELD_LEN)?).ok_or(Error::TransferFault)?;
    Ok(EventData::new(priority, text))
}

/// Write a reply into the caller's argument buffer.
pub fn encode_reply(reply: Reply, arg: &mut [u8]) -> Result<()> {
    match reply {
        Reply::Done => Ok(()),
        Reply::EmergencyStatus(seconds) => {
            let out = arg.get_mut(..INT_LEN).ok_or(Error::TransferFault)?;
            let value = i32::try_from(seconds).unwrap_or(i32::MAX);
            out.copy_from_slice(&value.to_le_bytes());
            Ok(())
        }
    }
}

/// Client side: lay out a log request. The message is cut to fit the
/// terminated field.
pub fn encode_event(priority: Priority, text: &str) -> [u8; EVENT_DATA_LEN] {
    let mut out = [0u8; EVENT_DATA_LEN];
    let mut end = text.len().min(MESSAGE_FIELD_LEN - 1);
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    out[..end].copy_from_slice(&text.as_bytes()[..end]);
    out[MESSAGE_FIELD_LEN..].copy_from_slice(&i32::from(priority.as_u8()).to_le_bytes());
    out
}

/// Client side: lay out a GPIO request.
pub fn encode_gpio(pin: i32, value: i32) -> [u8; GPIO_COMMAND_LEN] {
    let mut out = [0u8; GPIO_COMMAND_LEN];
    out[..INT_LEN].copy_from_slice(&pin.to_le_bytes());
    out[INT_LEN..].copy_from_slice(&value.to_le_bytes());
    out
}

// ───────────────────────────────────────────────────────────────
// Console line protocol
// ───────────────────────────────────────────────────────────────

/// One parsed console line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleRequest {
    Command(Command),
    /// Drain the log channel to the console.
    ReadLog,
    /// Re-initialise the countdown to idle, clearing a latched explosion.
    ResetEmergency,
    NightLight(NightLightMode),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NightLightMode {
    Auto,
    On,
    Off,
}

/// Parse `log <prio> <msg…>`, `clear`, `gpio <pin> <0|1>`,
/// `arm [minutes]`, `disarm`, `status`, `read`, `reset` or
/// `light <auto|on|off>`.
///
/// An unknown verb is [`Error::InvalidRequest`]; a known verb with bad
/// arguments is [`Error::TransferFault`].
pub fn parse_line(line: &str, default_minutes: u32) -> Result<ConsoleRequest> {
    let line = line.trim();
    let (verb, rest) = line.split_once(char::is_whitespace).unwrap_or((line, ""));
    let rest = rest.trim_start();
    let command = match verb {
        "log" => {
            let (prio, text) = rest.split_once(char::is_whitespace).unwrap_or((rest, ""));
            let priority = prio
                .parse::<i32>()
                .ok()
                .and_then(Priority::from_raw)
                .ok_or(Error::TransferFault)?;
            Command::LogEvent(EventData::new(priority, text.trim_start()))
        }
        "clear" => Command::ClearLog,
        "gpio" => {
            let mut args = rest.split_whitespace();
            let pin = args
                .next()
                .and_then(|s| s.parse::<u32>().ok())
                .ok_or(Error::TransferFault)?;
            let on = match args.next() {
                Some("0") => false,
                Some("1") => true,
                _ => return Err(Error::TransferFault),
            };
            Command::SetGpio(GpioCommand::new(pin, on))
        }
        "arm" => {
            let minutes = if rest.is_empty() {
                default_minutes
            } else {
                rest.parse::<u32>().map_err(|_| Error::TransferFault)?
            };
            Command::StartEmergency { minutes }
        }
        "disarm" => Command::StopEmergency,
        "status" => Command::GetEmergencyStatus,
        "read" => return Ok(ConsoleRequest::ReadLog),
        "reset" => return Ok(ConsoleRequest::ResetEmergency),
        "light" => {
            let mode = match rest {
                "auto" => NightLightMode::Auto,
                "on" => NightLightMode::On,
                "off" => NightLightMode::Off,
                _ => return Err(Error::TransferFault),
            };
            return Ok(ConsoleRequest::NightLight(mode));
        }
        _ => return Err(Error::InvalidRequest),
    };
    Ok(ConsoleRequest::Command(command))
}
