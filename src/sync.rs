//! Per-instance spinning raw mutex for `embassy_sync::blocking_mutex::Mutex`.
//!
//! `CriticalSectionRawMutex` on a hosted target is one process-wide lock,
//! so two unrelated entities guarded by it would serialize against each
//! other. [`SpinRawMutex`] keeps one flag per instance instead: the log ring
//! and the countdown state each get their own lock and never contend.
//!
//! Sections guarded by it must be short, must not block and must not
//! re-enter the same lock.

use core::hint;
use core::sync::atomic::{AtomicBool, Ordering};

use embassy_sync::blocking_mutex::raw::RawMutex;

#[derive(Debug)]
pub struct SpinRawMutex {
    locked: AtomicBool,
}

impl SpinRawMutex {
    pub const fn new() -> Self {
        Self {
            locked: AtomicBool::new(false),
        }
    }
}

impl Default for SpinRawMutex {
    fn default() -> Self {
        Self::new()
    }
}

/// Clears the flag when the section ends, including on unwind.
struct Release<'a>(&'a AtomicBool);

impl Drop for Release<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

// SAFETY: `lock` runs `f` only while this instance's flag is held, and the
// flag is acquired with `Acquire` and released with `Release`, so at most one
// closure runs at a time per instance.
unsafe impl RawMutex for SpinRawMutex {
    #[allow(clippy::declare_interior_mutable_const)]
    const INIT: Self = Self::new();

    fn lock<R>(&self, f: impl FnOnce() -> R) -> R {
        while self
            .locked
            .compare_exchange_weak(false, true, Ordering::Acquire, Ordering::Relaxed)
            .is_err()
        {
            while self.locked.load(Ordering::Relaxed) {
                hint::spin_loop();
            }
        }
        let _release = Release(&self.locked);
        f()
    }
}
