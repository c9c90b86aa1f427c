//
// clock.rs
//

//! A [`Clock`] over `tokio::time`, so the core engine crate itself never
//! depends on an async runtime (§10.5).

use std::time::Duration;

use parlance_core::Clock;
use tokio::time::Instant;

/// A one-shot timer handle: the deadline it was armed for. Equality is
/// by deadline, which is enough for the owning `TimerManager` to tell
/// "this is the handle I currently hold" apart from a stale one.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct TokioHandle {
    deadline: Instant,
}

impl TokioHandle {
    pub fn deadline(&self) -> Instant {
        self.deadline
    }
}

/// `schedule` just records a deadline; it does not spawn a task or hand
/// back a future. The host event loop (see `crate::select_loop` or a
/// hand-written `tokio::select!`) is expected to `tokio::time::sleep_until`
/// the deadline of whichever handle is currently outstanding and call
/// `ConversationEngine::fire_timeout`/`fire_wait` when it elapses.
#[derive(Default)]
pub struct TokioClock;

impl TokioClock {
    pub fn new() -> Self {
        TokioClock
    }
}

impl Clock for TokioClock {
    type Handle = TokioHandle;

    fn schedule(&mut self, after: Duration) -> TokioHandle {
        TokioHandle { deadline: Instant::now() + after }
    }

    fn cancel(&mut self, _handle: &TokioHandle) {
        // Nothing to release: the handle is just a deadline value: the
        // host loop stops waiting on it as soon as it reads a new one.
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schedule_returns_a_future_deadline() {
        let mut clock = TokioClock::new();
        let before = Instant::now();
        let handle = clock.schedule(Duration::from_millis(50));
        assert!(handle.deadline() >= before + Duration::from_millis(50));
    }
}
