//! One-shot countdown timer.
//!
//! A dedicated thread waits on a condition variable for the next deadline
//! and, when it passes, invokes the tick callback with the generation the
//! deadline was scheduled for. `schedule` replaces any pending deadline,
//! `cancel` drops it. The callback runs on the timer thread with no timer
//! lock held, so it may re-arm the timer itself.
//!
//! Dropping the timer stops the thread but does not join it: the last
//! reference can be released from inside the callback.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use log::{debug, info};

use crate::app::ports::TickScheduler;

#[derive(Default)]
struct Slot {
    deadline: Option<(Instant, u32)>,
    shutdown: bool,
}

#[derive(Default)]
struct Shared {
    slot: Mutex<Slot>,
    wake: Condvar,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, Slot> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[derive(Default)]
pub struct OneShotTimer {
    shared: Arc<Shared>,
    started: AtomicBool,
}

impl OneShotTimer {
    /// Create a stopped timer. Deadlines may be scheduled before
    /// [`start`](Self::start); they fire once the thread runs.
    pub fn new() -> Self {
        Self::default()
    }

    /// Spawn the timer thread. Fails if already started or if the thread
    /// cannot be created.
    pub fn start(
        &self,
        name: &str,
        on_expiry: impl Fn(u32) + Send + 'static,
    ) -> std::io::Result<()> {
        if self.started.swap(true, Ordering::AcqRel) {
            return Err(std::io::Error::new(
                std::io::ErrorKind::AlreadyExists,
                "tick timer already started",
            ));
        }
        let shared = Arc::clone(&self.shared);
        let spawned = std::thread::Builder::new()
            .name(name.into())
            .spawn(move || run(&shared, on_expiry));
        if let Err(e) = spawned {
            self.started.store(false, Ordering::Release);
            return Err(e);
        }
        info!("hw_timer: '{}' started", name);
        Ok(())
    }

    pub fn is_pending(&self) -> bool {
        self.shared.lock().deadline.is_some()
    }
}

fn run(shared: &Shared, on_expiry: impl Fn(u32)) {
    let mut slot = shared.lock();
    loop {
        if slot.shutdown {
            debug!("hw_timer: shutdown");
            return;
        }
        let deadline = slot.deadline;
        match deadline {
            None => {
                slot = shared.wake.wait(slot).unwrap_or_else(PoisonError::into_inner);
            }
            Some((at, generation)) => {
                let now = Instant::now();
                if now >= at {
                    slot.deadline = None;
                    drop(slot);
                    on_expiry(generation);
                    slot = shared.lock();
                } else {
                    slot = shared
                        .wake
                        .wait_timeout(slot, at - now)
                        .unwrap_or_else(PoisonError::into_inner)
                        .0;
                }
            }
        }
    }
}

impl TickScheduler for OneShotTimer {
    fn schedule(&self, generation: u32, after_ms: u32) {
        let at = Instant::now() + Duration::from_millis(u64::from(after_ms));
        self.shared.lock().deadline = Some((at, generation));
        self.shared.wake.notify_all();
    }

    fn cancel(&self) {
        self.shared.lock().deadline = None;
        self.shared.wake.notify_all();
    }
}

impl Drop for OneShotTimer {
    fn drop(&mut self) {
        self.shared.lock().shutdown = true;
        self.shared.wake.notify_all();
    }
}
