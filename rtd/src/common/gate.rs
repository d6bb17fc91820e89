use parking_lot::{Mutex, MutexGuard};
use std::time::Duration;

/// Observable state of a [Gate].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateState {
    Idle,
    Mutating,
}

/// The per-collection mutual-exclusion token serializing mutations.
///
/// At most one mutating operation holds the gate at a time. Waiters queue on the
/// underlying `parking_lot` mutex and the gate is released fairly, so the
/// longest waiting caller enters next and mutations are ordered by gate entry.
///
/// The gate is only released through [GateGuard]'s `Drop`, which runs on every
/// exit path including early returns and unwinding.
///
/// # Examples
///
/// ```
/// use rtd::common::{Gate, GateState};
///
/// let gate = Gate::new();
/// {
///     let _guard = gate.enter(None).unwrap();
///     assert_eq!(gate.state(), GateState::Mutating);
/// }
/// assert_eq!(gate.state(), GateState::Idle);
/// ```
pub struct Gate {
    lock: Mutex<()>,
}

impl Gate {
    pub fn new() -> Self {
        Gate {
            lock: Mutex::new(()),
        }
    }

    /// Enters the gate, waiting at most `timeout` if one is given.
    ///
    /// Returns `None` if the deadline passed before the gate became idle. A
    /// timed-out caller leaves no trace in the gate.
    pub fn enter(&self, timeout: Option<Duration>) -> Option<GateGuard<'_>> {
        match timeout {
            Some(timeout) => self
                .lock
                .try_lock_for(timeout)
                .map(|guard| GateGuard { guard: Some(guard) }),
            None => Some(self.lock()),
        }
    }

    /// Enters the gate, waiting as long as it takes.
    pub fn lock(&self) -> GateGuard<'_> {
        GateGuard {
            guard: Some(self.lock.lock()),
        }
    }

    /// Enters the gate only if it is idle right now.
    pub fn try_enter(&self) -> Option<GateGuard<'_>> {
        self.lock
            .try_lock()
            .map(|guard| GateGuard { guard: Some(guard) })
    }

    pub fn state(&self) -> GateState {
        if self.lock.is_locked() {
            GateState::Mutating
        } else {
            GateState::Idle
        }
    }
}

impl Default for Gate {
    fn default() -> Self {
        Self::new()
    }
}

/// Scoped ownership of a [Gate]. Dropping it returns the gate to `Idle`.
pub struct GateGuard<'a> {
    guard: Option<MutexGuard<'a, ()>>,
}

impl Drop for GateGuard<'_> {
    fn drop(&mut self) {
        if let Some(guard) = self.guard.take() {
            // hand the gate straight to the next queued writer
            MutexGuard::unlock_fair(guard);
        }
    }
}
