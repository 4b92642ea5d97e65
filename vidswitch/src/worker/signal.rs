use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

/// Why a worker woke up.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Wake {
    Cancelled,
    Reopen,
}

#[derive(Default)]
struct Flags {
    cancelled: bool,
    reopen: Option<u64>,
}

/**
    Cancellation and reopen requests for one run of a worker thread.

    Every blocking wait of the acquisition loop goes through here, so
    cancelling wakes the worker immediately unless it is stuck inside a
    transport call.
*/
#[derive(Default)]
pub(crate) struct Signal {
    flags: Mutex<Flags>,
    cond: Condvar,
}

impl Signal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flags.lock().cancelled = true;
        self.cond.notify_all();
    }

    pub fn is_cancelled(&self) -> bool {
        self.flags.lock().cancelled
    }

    pub fn request_reopen(&self, generation: u64) {
        self.flags.lock().reopen = Some(generation);
        self.cond.notify_all();
    }

    /**
        Sleep for `duration` unless cancelled first.

        Returns false if cancelled.
    */
    pub fn sleep(&self, duration: Duration) -> bool {
        let deadline = Instant::now() + duration;
        let mut flags = self.flags.lock();
        loop {
            if flags.cancelled {
                return false;
            }
            if self.cond.wait_until(&mut flags, deadline).timed_out() {
                return !flags.cancelled;
            }
        }
    }

    /**
        Block until cancelled or until a reopen of `generation` is requested.

        Requests for other generations are stale and dropped.
    */
    pub fn wait_for_reopen(&self, generation: u64) -> Wake {
        let mut flags = self.flags.lock();
        loop {
            if flags.cancelled {
                return Wake::Cancelled;
            }
            match flags.reopen.take() {
                Some(requested) if requested == generation => return Wake::Reopen,
                _ => {}
            }
            self.cond.wait(&mut flags);
        }
    }
}
