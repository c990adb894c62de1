//! The activity gate.
//!
//! Ordinary cache operations may run concurrently with each other, each
//! taking the cache lock only for its own critical section. The periodic
//! refresh-and-sweep pass, however, must run entirely alone. The gate
//! coordinates the two: callers bracket their work with [`enter`] and
//! [`leave`], and the last one out runs the exclusive pass if one is due.
//!
//! The gate's lock only protects the counters below. It is never held
//! while waiting for the cache lock and never across a sweep.
//!
//! A caller that is already inside the gate and re-enters it must say so
//! via the `recursive` flag; recursive entries never wait, so a caller
//! can never deadlock against itself.
//!
//! [`enter`]: ActivityGate::enter
//! [`leave`]: ActivityGate::leave

use parking_lot::{Condvar, Mutex};

//------------ GateState -----------------------------------------------------

/// The counters the gate protects.
#[derive(Default)]
struct GateState {
    /// Number of callers currently inside a cache operation.
    active: usize,

    /// An exclusive pass is running; new non-recursive entrants wait.
    exclusive: bool,

    /// A refresh from configuration has been requested.
    refresh: bool,
}

//------------ ActivityGate --------------------------------------------------

/// Coordinates cache operations against the exclusive sweep pass.
pub(super) struct ActivityGate {
    /// The protected counters.
    state: Mutex<GateState>,

    /// Signalled when the exclusive flag clears.
    released: Condvar,
}

impl ActivityGate {
    /// Creates a new, open gate.
    pub fn new() -> Self {
        ActivityGate {
            state: Mutex::new(GateState::default()),
            released: Condvar::new(),
        }
    }

    /// Enters the gate, waiting out a running exclusive pass.
    ///
    /// Recursive entries never wait. Returns the new number of active
    /// callers.
    pub fn enter(&self, recursive: bool) -> usize {
        let mut state = self.state.lock();
        if !recursive {
            while state.exclusive {
                self.released.wait(&mut state);
            }
        }
        state.active += 1;
        state.active
    }

    /// Leaves the gate.
    ///
    /// If this caller was the last one out and no exclusive pass is
    /// running yet, the gate is closed for new entrants and
    /// `Some(refresh_requested)` is returned: the caller now owns the
    /// exclusive pass and must call [`release`] once it is done.
    /// Recursive leavers never pick up the pass.
    ///
    /// [`release`]: Self::release
    pub fn leave(&self, recursive: bool) -> Option<bool> {
        let mut state = self.state.lock();
        debug_assert!(state.active > 0, "activity gate underflow");
        state.active = state.active.saturating_sub(1);
        if recursive || state.exclusive || state.active > 0 {
            return None;
        }
        state.exclusive = true;
        Some(state.refresh)
    }

    /// Ends an exclusive pass, reopening the gate.
    pub fn release(&self) {
        let mut state = self.state.lock();
        state.exclusive = false;
        state.refresh = false;
        self.released.notify_all();
    }

    /// Requests a refresh from configuration.
    ///
    /// The refresh runs before the sweep of the next exclusive pass.
    pub fn request_refresh(&self) {
        self.state.lock().refresh = true;
    }
}

//============ Tests =========================================================

#[cfg(test)]
mod test {
    use super::*;
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn last_one_out_runs_the_pass() {
        let gate = ActivityGate::new();
        assert_eq!(gate.enter(false), 1);
        assert_eq!(gate.enter(false), 2);
        gate.request_refresh();

        // Not the last caller: returns immediately, no pass.
        assert_eq!(gate.leave(false), None);
        // The last caller picks up the pass and the refresh request.
        assert_eq!(gate.leave(false), Some(true));
        gate.release();

        // The refresh request was consumed.
        assert_eq!(gate.enter(false), 1);
        assert_eq!(gate.leave(false), Some(false));
        gate.release();
    }

    #[test]
    fn recursive_callers_never_wait_or_sweep() {
        let gate = ActivityGate::new();
        gate.enter(false);
        assert_eq!(gate.leave(true), None);

        // Even with the gate closed, a recursive entry proceeds.
        gate.enter(false);
        assert_eq!(gate.leave(false), Some(false));
        assert_eq!(gate.enter(true), 1);
        assert_eq!(gate.leave(true), None);
        gate.release();
    }

    #[test]
    fn entrants_wait_for_release() {
        let gate = Arc::new(ActivityGate::new());
        gate.enter(false);
        assert_eq!(gate.leave(false), Some(false));

        let blocked = Arc::clone(&gate);
        let waiter = thread::spawn(move || {
            blocked.enter(false);
            blocked.leave(false)
        });

        // Give the waiter a moment to block on the closed gate.
        thread::sleep(Duration::from_millis(50));
        assert!(!waiter.is_finished());

        gate.release();
        // Once through, the waiter is itself the last one out.
        assert_eq!(waiter.join().unwrap(), Some(false));
    }
}
