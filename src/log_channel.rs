//! Black-box log channel.
//!
//! A fixed-capacity byte ring holding formatted, timestamped records:
//!
//! ```text
//! [2025-03-14 09:26:53] PRIO:2 MSG:emergency countdown started
//! ```
//!
//! Writers never block and never get rejected: when the ring is full the
//! oldest unread bytes are overwritten. Record boundaries are therefore not
//! preserved under capacity pressure; a reader reconstructs records from
//! the text itself. The single reader drains by polling and gets zero bytes
//! when nothing is pending.
//!
//! Formatting happens on the caller's stack before the lock is taken; the
//! critical section only copies bytes and moves cursors.

use core::cell::RefCell;
use core::fmt::{self, Write as _};

use embassy_sync::blocking_mutex::Mutex;

use crate::sync::SpinRawMutex;

/// Ring capacity of the device log (bytes).
pub const LOG_CAPACITY: usize = 4096;

/// Longest message body a record carries (bytes).
pub const MAX_MESSAGE_LEN: usize = 255;

/// Worst case: `[` + 19 + `] PRIO:` + 1 + ` MSG:` + 255 + `\n`.
const RECORD_TEXT_CAP: usize = 320;

pub type Message = heapless::String<MAX_MESSAGE_LEN>;
pub type RecordText = heapless::String<RECORD_TEXT_CAP>;

// ---------------------------------------------------------------------------
// Record
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum Priority {
    Info = 0,
    Warning = 1,
    Critical = 2,
}

impl Priority {
    pub fn from_raw(raw: i32) -> Option<Self> {
        match raw {
            0 => Some(Self::Info),
            1 => Some(Self::Warning),
            2 => Some(Self::Critical),
            _ => None,
        }
    }

    pub const fn as_u8(self) -> u8 {
        self as u8
    }
}

/// Wall-clock instant, whole seconds since the Unix epoch (UTC).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Timestamp(i64);

impl Timestamp {
    pub const fn from_unix_secs(secs: i64) -> Self {
        Self(secs)
    }

    pub const fn unix_secs(self) -> i64 {
        self.0
    }

    /// Split into `(year, month, day, hour, minute, second)`.
    pub fn civil(self) -> (i64, u32, u32, u32, u32, u32) {
        let days = self.0.div_euclid(86_400);
        let secs_of_day = self.0.rem_euclid(86_400) as u32;

        // Days-to-civil over 400-year eras, March-based years.
        let z = days + 719_468;
        let era = z.div_euclid(146_097);
        let doe = z.rem_euclid(146_097);
        let yoe = (doe - doe / 1460 + doe / 36_524 - doe / 146_096) / 365;
        let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
        let mp = (5 * doy + 2) / 153;
        let day = (doy - (153 * mp + 2) / 5 + 1) as u32;
        let month = (if mp < 10 { mp + 3 } else { mp - 9 }) as u32;
        let year = yoe + era * 400 + i64::from(month <= 2);

        (
            year,
            month,
            day,
            secs_of_day / 3600,
            secs_of_day / 60 % 60,
            secs_of_day % 60,
        )
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (y, mo, d, h, mi, s) = self.civil();
        write!(f, "{y:04}-{mo:02}-{d:02} {h:02}:{mi:02}:{s:02}")
    }
}

/// Copy `text` into a [`Message`], cutting at the last character boundary
/// that fits.
pub fn bounded_message(text: &str) -> Message {
    let mut end = text.len().min(MAX_MESSAGE_LEN);
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    let mut message = Message::new();
    // Cannot fail: `end` <= capacity.
    let _ = message.push_str(&text[..end]);
    message
}

/// One leveled, timestamped log entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogRecord {
    pub timestamp: Timestamp,
    pub priority: Priority,
    pub message: Message,
}

impl LogRecord {
    /// Build a record, truncating `text` to [`MAX_MESSAGE_LEN`] bytes on a
    /// character boundary.
    pub fn new(timestamp: Timestamp, priority: Priority, text: &str) -> Self {
        Self {
            timestamp,
            priority,
            message: bounded_message(text),
        }
    }

    /// Render the on-ring text form, newline terminated.
    pub fn format(&self) -> RecordText {
        let mut out = RecordText::new();
        // Cannot overflow: RECORD_TEXT_CAP covers the longest record.
        let _ = writeln!(
            out,
            "[{}] PRIO:{} MSG:{}",
            self.timestamp,
            self.priority.as_u8(),
            self.message
        );
        out
    }
}

// ---------------------------------------------------------------------------
// Ring buffer
// ---------------------------------------------------------------------------

/// Overwrite-oldest byte ring.
///
/// Invariant: `full` implies `write == read`; otherwise the occupied byte
/// count is `(write - read) mod N`.
pub struct RingBuffer<const N: usize> {
    storage: [u8; N],
    write: usize,
    read: usize,
    full: bool,
}

impl<const N: usize> RingBuffer<N> {
    pub const fn new() -> Self {
        Self {
            storage: [0; N],
            write: 0,
            read: 0,
            full: false,
        }
    }

    pub const fn capacity(&self) -> usize {
        N
    }

    pub fn len(&self) -> usize {
        if self.full {
            N
        } else {
            (self.write + N - self.read) % N
        }
    }

    pub fn is_empty(&self) -> bool {
        !self.full && self.write == self.read
    }

    pub fn is_full(&self) -> bool {
        self.full
    }

    /// Append bytes, discarding the oldest unread bytes on overflow.
    /// Returns how many unread bytes were overwritten.
    pub fn push_slice(&mut self, bytes: &[u8]) -> usize {
        let mut overwritten = 0;
        for &b in bytes {
            self.storage[self.write] = b;
            self.write = (self.write + 1) % N;
            if self.full {
                self.read = self.write;
                overwritten += 1;
            } else if self.write == self.read {
                self.full = true;
            }
        }
        overwritten
    }

    /// Move up to `out.len()` of the oldest unread bytes into `out`.
    pub fn pop_into(&mut self, out: &mut [u8]) -> usize {
        let n = out.len().min(self.len());
        for slot in out.iter_mut().take(n) {
            *slot = self.storage[self.read];
            self.read = (self.read + 1) % N;
        }
        if n > 0 {
            self.full = false;
        }
        n
    }

    /// Reset both cursors and zero the storage.
    pub fn reset(&mut self) {
        self.storage.fill(0);
        self.write = 0;
        self.read = 0;
        self.full = false;
    }
}

impl<const N: usize> Default for RingBuffer<N> {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Channel
// ---------------------------------------------------------------------------

/// Multi-writer, single-drainer log channel.
pub struct LogChannel<const N: usize = LOG_CAPACITY> {
    ring: Mutex<SpinRawMutex, RefCell<RingBuffer<N>>>,
}

impl<const N: usize> LogChannel<N> {
    pub const fn new() -> Self {
        Self {
            ring: Mutex::new(RefCell::new(RingBuffer::new())),
        }
    }

    /// Format and append one record. Never blocks on the reader and never
    /// fails; overflow discards the oldest bytes.
    pub fn append(&self, record: &LogRecord) {
        let text = record.format();
        self.append_raw(text.as_bytes());
    }

    /// Append pre-formatted bytes. Returns the number of overwritten bytes.
    pub fn append_raw(&self, bytes: &[u8]) -> usize {
        self.ring.lock(|ring| ring.borrow_mut().push_slice(bytes))
    }

    /// Drain up to `out.len()` of the oldest unread bytes. Returns 0 when
    /// empty; never waits for new data.
    pub fn drain(&self, out: &mut [u8]) -> usize {
        self.ring.lock(|ring| ring.borrow_mut().pop_into(out))
    }

    /// Discard everything and zero the storage.
    pub fn clear(&self) {
        self.ring.lock(|ring| ring.borrow_mut().reset());
    }

    /// Unread byte count.
    pub fn len(&self) -> usize {
        self.ring.lock(|ring| ring.borrow().len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub const fn capacity(&self) -> usize {
        N
    }
}

impl<const N: usize> Default for LogChannel<N> {
    fn default() -> Self {
        Self::new()
    }
}
