//
// fixtures.rs
//

//! Test doubles for the external collaborators (§6), analogous to
//! `amalthea`'s `fixtures::dummy_frontend` / `DummyConnection` pair:
//! stand-ins cheap enough to drive from a unit or integration test
//! without a real transport or a real clock.

use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use crate::error::Result;
use crate::timer::Clock;
use crate::transport::Transport;

/// Records every token written to it, in order, for assertions.
#[derive(Clone, Default)]
pub struct FakeTransport {
    written: Rc<RefCell<Vec<String>>>,
}

impl FakeTransport {
    pub fn new() -> Self {
        FakeTransport::default()
    }

    pub fn written(&self) -> Vec<String> {
        self.written.borrow().clone()
    }

    pub fn last(&self) -> Option<String> {
        self.written.borrow().last().cloned()
    }
}

impl Transport for FakeTransport {
    fn write(&mut self, token: &str) -> Result<()> {
        self.written.borrow_mut().push(token.to_string());
        Ok(())
    }
}

#[derive(Clone, PartialEq, Eq, Debug)]
pub struct FakeHandle(u64);

/// A clock with no notion of wall time: `schedule` hands out a fresh
/// handle and records the requested delay; a test fires it explicitly
/// by calling `fire` with that handle, rather than waiting for real
/// time to pass.
#[derive(Default)]
pub struct FakeClock {
    next_id: u64,
    armed: Rc<RefCell<Vec<(u64, Duration)>>>,
}

impl FakeClock {
    pub fn new() -> Self {
        FakeClock::default()
    }

    /// The delays currently armed, oldest first.
    pub fn armed(&self) -> Vec<Duration> {
        self.armed.borrow().iter().map(|(_, d)| *d).collect()
    }

    pub fn is_armed(&self, handle: &FakeHandle) -> bool {
        self.armed.borrow().iter().any(|(id, _)| *id == handle.0)
    }
}

impl Clock for FakeClock {
    type Handle = FakeHandle;

    fn schedule(&mut self, after: Duration) -> FakeHandle {
        self.next_id += 1;
        let id = self.next_id;
        self.armed.borrow_mut().push((id, after));
        FakeHandle(id)
    }

    fn cancel(&mut self, handle: &FakeHandle) {
        self.armed.borrow_mut().retain(|(id, _)| *id != handle.0);
    }
}
