//
// timer.rs
//

use std::time::Duration;

/// Host timer primitives (§6). `schedule` arms a one-shot timer that
/// expires `after` from now; it does not take a callback — unlike the
/// distilled spec's `schedule(dt, fn)`, firing is delivered by the host
/// calling `ConversationEngine::fire_timeout`/`fire_wait` once it
/// independently observes the deadline has passed. This keeps the core
/// engine free of a self-referential callback (the engine would
/// otherwise need to hand the clock a closure that mutates the engine
/// itself, which the borrow checker cannot express without `Rc<RefCell<_>>`).
///
/// A cancelled handle must never fire.
pub trait Clock {
    type Handle: Clone;

    fn schedule(&mut self, after: Duration) -> Self::Handle;
    fn cancel(&mut self, handle: &Self::Handle);
}

/// Owns at most one receive-timeout handle and at most one wait-timer
/// handle, per §3's "Instance" data model. Both kinds are tracked
/// independently even though at most one is ever armed at a time (a
/// consequence of busy exclusivity), so the engine can cancel whichever
/// is relevant without inspecting the current phase.
pub struct TimerManager<C: Clock> {
    timeout_handle: Option<C::Handle>,
    wait_handle: Option<C::Handle>,
}

impl<C: Clock> TimerManager<C> {
    pub fn new() -> Self {
        TimerManager {
            timeout_handle: None,
            wait_handle: None,
        }
    }

    pub fn arm_timeout(&mut self, clock: &mut C, after: Duration) {
        self.cancel_timeout(clock);
        self.timeout_handle = Some(clock.schedule(after));
    }

    pub fn cancel_timeout(&mut self, clock: &mut C) {
        if let Some(handle) = self.timeout_handle.take() {
            clock.cancel(&handle);
        }
    }

    pub fn has_timeout(&self) -> bool {
        self.timeout_handle.is_some()
    }

    pub fn arm_wait(&mut self, clock: &mut C, after: Duration) {
        self.cancel_wait(clock);
        self.wait_handle = Some(clock.schedule(after));
    }

    pub fn cancel_wait(&mut self, clock: &mut C) {
        if let Some(handle) = self.wait_handle.take() {
            clock.cancel(&handle);
        }
    }

    pub fn has_wait(&self) -> bool {
        self.wait_handle.is_some()
    }

    /// Cancels both handles. Called on every Idle transition (§3
    /// Lifecycle) so timers never outlive the operation they belong to.
    pub fn cancel_all(&mut self, clock: &mut C) {
        self.cancel_timeout(clock);
        self.cancel_wait(clock);
    }
}

impl<C: Clock> Default for TimerManager<C> {
    fn default() -> Self {
        Self::new()
    }
}
