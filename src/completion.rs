use std::time::Duration;

use parking_lot::{Condvar, Mutex};

/// Single-fire "done" event shared by a session, its refresh tasks and the
/// caller blocked in `play`.
///
/// The flag moves from unsignaled to signaled at most once. Every waiter,
/// present or future, observes the transition.
#[derive(Debug, Default)]
pub struct Completion {
    fired: Mutex<bool>,
    cond: Condvar,
}

impl Completion {
    pub fn new() -> Self {
        Self::default()
    }

    /// Signal completion. Returns `true` only for the call that performed the
    /// transition; later calls are no-ops.
    pub fn fire(&self) -> bool {
        let mut fired = self.fired.lock();
        if *fired {
            return false;
        }
        *fired = true;
        self.cond.notify_all();
        true
    }

    #[cfg(test)]
    pub fn is_fired(&self) -> bool {
        *self.fired.lock()
    }

    pub fn wait(&self) {
        let mut fired = self.fired.lock();
        while !*fired {
            self.cond.wait(&mut fired);
        }
    }

    /// Wait for either the timeout or the signal, whichever comes first.
    /// Returns `true` if the signal has fired.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        let mut fired = self.fired.lock();
        if !*fired {
            self.cond.wait_for(&mut fired, timeout);
        }
        *fired
    }
}
