//
// engine.rs
//

//! The busy/idle state machine, inbound dispatch, send gating, and
//! stop/cancel logic (§4.4) — the largest single component.

use std::time::Duration;

use crate::error::{Error, Outcome, Result};
use crate::phase::{DataHandler, DataOutcome, OnDone, Phase};
use crate::registry::{dispatch_registry, Registry, RegistryHandler};
use crate::timer::{Clock, TimerManager};
use crate::transport::Transport;
use crate::value::Value;
use crate::matchspec::MatchSpec;

/// §6: "Default timeout."
pub const DFLT_TIMEOUT: Duration = Duration::from_secs(60);

pub type UnhandledSink<T, C> = Box<dyn FnMut(&mut ConversationEngine<T, C>, Option<Error>, Option<Value>)>;

/// The default `onData` for a bare `receive()`: accept one token
/// verbatim as the terminal value.
pub fn default_data_handler<T: Transport + 'static, C: Clock + 'static>() -> DataHandler<T, C> {
    Box::new(|_engine, token| Ok(DataOutcome::Done(Value::str(token))))
}

/// One instance per partner (§3). Owns the transport writer, the
/// registry, at most one timer per kind, the accumulator slot, and the
/// current phase.
pub struct ConversationEngine<T: Transport, C: Clock> {
    transport: T,
    clock: C,
    default_timeout: Duration,
    current_timeout: Duration,
    phase: Phase<T, C>,
    pub(crate) registry: Registry<T, C>,
    timers: TimerManager<C>,
    accumulator: Value,
    unhandled: Option<UnhandledSink<T, C>>,
    debug: bool,
}

impl<T: Transport, C: Clock> ConversationEngine<T, C> {
    pub fn new(transport: T, clock: C, default_timeout: Option<Duration>) -> Self {
        let timeout = default_timeout.unwrap_or(DFLT_TIMEOUT);
        ConversationEngine {
            transport,
            clock,
            default_timeout: timeout,
            current_timeout: timeout,
            phase: Phase::Idle,
            registry: Registry::new(),
            timers: TimerManager::new(),
            accumulator: Value::Nil,
            unhandled: None,
            debug: false,
        }
    }

    pub fn busy(&self) -> bool {
        self.phase.is_busy()
    }

    pub fn set_debug(&mut self, debug: bool) {
        self.debug = debug;
    }

    pub fn debug(&self) -> bool {
        self.debug
    }

    pub fn acc(&self) -> Value {
        self.accumulator.clone()
    }

    pub fn set_acc(&mut self, value: Value) {
        self.accumulator = value;
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    pub fn clock_mut(&mut self) -> &mut C {
        &mut self.clock
    }

    pub fn on_unhandled(&mut self, sink: UnhandledSink<T, C>) {
        self.unhandled = Some(sink);
    }

    pub fn register(&mut self, spec: MatchSpec, dedupe: bool, handler: RegistryHandler<T, C>) {
        self.registry.register(spec, dedupe, handler);
    }

    pub fn deregister(&mut self, spec: &MatchSpec, all: bool) {
        self.registry.deregister(spec, all);
    }

    pub fn deregister_all(&mut self) {
        self.registry.deregister_all();
    }

    /// `send(token, force=false)`: not busy, unless `force`. Silently a
    /// no-op if busy and not forced; transport failures propagate to
    /// the caller.
    pub fn send(&mut self, token: &str, force: bool) -> Result<()> {
        if self.busy() && !force {
            log::trace!("send suppressed while busy: {:?}", token);
            return Ok(());
        }
        self.transport.write(token)
    }

    /// `receive(t?, onData?, onDone?)`. When busy, the failure is
    /// delivered through `on_done` (or the unhandled sink if none was
    /// given) rather than returned, matching the component design's
    /// callback-first propagation policy (§7).
    pub fn receive(
        &mut self,
        timeout: Option<Duration>,
        on_data: DataHandler<T, C>,
        on_done: Option<OnDone<T, C>>,
    ) {
        if self.busy() {
            log::trace!("receive rejected: busy");
            self.reject_busy(on_done);
            return;
        }
        let timeout = timeout.unwrap_or(self.default_timeout);
        self.current_timeout = timeout;
        self.timers.arm_timeout(&mut self.clock, timeout);
        self.phase = Phase::Receiving { handler: on_data, on_done };
    }

    /// `cmd(token, …)` ≡ `send(token); receive(…)`.
    pub fn cmd(
        &mut self,
        token: &str,
        timeout: Option<Duration>,
        on_data: Option<DataHandler<T, C>>,
        on_done: Option<OnDone<T, C>>,
    ) -> Result<()>
    where
        T: 'static,
        C: 'static,
    {
        self.send(token, false)?;
        self.receive(timeout, on_data.unwrap_or_else(default_data_handler), on_done);
        Ok(())
    }

    /// `wait(t, onDone?)` arms a timer that fires a synthetic terminal
    /// event carrying `Value::WaitStop` so `seq` can compose uniformly
    /// with timed pauses (§4.6).
    pub fn wait(&mut self, after: Duration, on_done: Option<OnDone<T, C>>) {
        if self.busy() {
            log::trace!("wait rejected: busy");
            self.reject_busy(on_done);
            return;
        }
        self.timers.arm_wait(&mut self.clock, after);
        self.phase = Phase::Waiting { on_done };
    }

    /// `stop(err?, data?)`: terminates the active op. Routes
    /// `NotBusyConflict` to the unhandled sink if there is no active
    /// op (§7: "A `stop` call while Idle is itself an error surfaced
    /// through the unhandled sink").
    pub fn stop(&mut self, err: Option<Error>, data: Option<Value>) {
        if !self.busy() {
            log::trace!("stop rejected: not busy");
            self.route_unhandled(Some(Error::NotBusyConflict), None);
            return;
        }
        self.terminate(err, data);
    }

    /// `resetTimeout(t?)`: cancels and re-arms the receive timeout,
    /// reusing the prior value when `t` is omitted. A no-op outside
    /// `Receiving` (there's no timeout to reset).
    pub fn reset_timeout(&mut self, timeout: Option<Duration>) {
        if !self.phase.is_receiving() {
            log::trace!("resetTimeout ignored: not receiving");
            return;
        }
        let timeout = timeout.unwrap_or(self.current_timeout);
        self.current_timeout = timeout;
        self.timers.arm_timeout(&mut self.clock, timeout);
    }

    /// Dispatches a single inbound token per §4.4's ordering: registry
    /// first, then the active receive handler (if any), else the
    /// unhandled sink.
    pub fn feed(&mut self, token: &str) {
        if self.debug {
            log::debug!("feed: token={:?} busy={}", token, self.busy());
        }

        match dispatch_registry(self, token) {
            Ok(true) => return,
            Ok(false) => {},
            Err(err) => {
                self.deliver_error(err);
                return;
            },
        }

        match &self.phase {
            Phase::Waiting { .. } => {
                log::trace!("token dropped while waiting: {:?}", token);
            },
            Phase::Receiving { .. } => self.feed_receiving(token),
            Phase::Idle => {
                log::trace!("token routed to unhandled: {:?}", token);
                self.route_unhandled(None, Some(Value::str(token)));
            },
        }
    }

    /// The host calls this once it independently observes the active
    /// receive's timeout has elapsed.
    pub fn fire_timeout(&mut self) {
        if !self.phase.is_receiving() {
            log::trace!("fire_timeout ignored: not receiving");
            return;
        }
        log::trace!("receive timed out");
        self.terminate(Some(Error::Timeout), None);
    }

    /// The host calls this once it independently observes the active
    /// wait's timer has elapsed.
    pub fn fire_wait(&mut self) {
        if !self.phase.is_waiting() {
            log::trace!("fire_wait ignored: not waiting");
            return;
        }
        self.terminate(None, Some(Value::WaitStop));
    }

    fn feed_receiving(&mut self, token: &str) {
        let (mut handler, on_done) = match std::mem::replace(&mut self.phase, Phase::Idle) {
            Phase::Receiving { handler, on_done } => (handler, on_done),
            other => {
                // Unreachable in practice: the caller only takes this
                // branch after matching `Phase::Receiving`.
                self.phase = other;
                return;
            },
        };

        let outcome = handler(self, token);
        match outcome {
            Ok(DataOutcome::Repeat) => {
                self.phase = Phase::Receiving { handler, on_done };
            },
            Ok(DataOutcome::NewHandler(new_handler)) => {
                self.phase = Phase::Receiving { handler: new_handler, on_done };
            },
            Ok(DataOutcome::Done(value)) => {
                self.finish(on_done, None, Some(value));
            },
            Err(err) => {
                self.finish(on_done, Some(err), None);
            },
        }
    }

    fn reject_busy(&mut self, on_done: Option<OnDone<T, C>>) {
        self.finish(on_done, Some(Error::BusyConflict), None);
    }

    /// The terminal transition (§4.4): clear the accumulator, cancel
    /// both timers, detach the phase's `onDone`, then invoke it. The
    /// instance is observably `Idle` from the moment `onDone` runs
    /// ("detach-before-invoke", §4.4/§5), so it may freely start a new
    /// operation on `self`.
    fn terminate(&mut self, err: Option<Error>, data: Option<Value>) {
        let on_done = match std::mem::replace(&mut self.phase, Phase::Idle) {
            Phase::Receiving { on_done, .. } => on_done,
            Phase::Waiting { on_done } => on_done,
            Phase::Idle => None,
        };
        self.finish(on_done, err, data);
    }

    /// Shared tail of `terminate`/`feed_receiving`'s completion paths:
    /// `self.phase` must already be `Idle` by the time this runs. An
    /// error with no `on_done` to deliver it to is routed to the
    /// unhandled sink rather than dropped (§4.4/§7: every recoverable
    /// error reaches a callback or the unhandled sink). Successful data
    /// with no `on_done` is simply dropped — the propagation policy only
    /// promises delivery for errors, and a wait-timer's natural
    /// `WAIT_STOP` expiry with no attached callback must stay silent.
    fn finish(&mut self, on_done: Option<OnDone<T, C>>, err: Option<Error>, data: Option<Value>) {
        self.accumulator = Value::Nil;
        self.timers.cancel_all(&mut self.clock);
        match on_done {
            Some(on_done) => {
                let outcome: Outcome = (err, data);
                if let Err(failure) = on_done(self, outcome) {
                    log::error!("onDone callback failed: {}", failure);
                    self.route_unhandled(Some(Error::UserHandlerFailure(failure.to_string())), None);
                }
            },
            None if err.is_some() => {
                self.route_unhandled(err, data);
            },
            None => {},
        }
    }

    /// Takes the `onDone` out of whichever phase is currently active,
    /// for the sequencer to wrap and reinstall (§4.5, `SelfRef` steps).
    pub(crate) fn take_on_done(&mut self) -> Option<OnDone<T, C>> {
        match &mut self.phase {
            Phase::Receiving { on_done, .. } => on_done.take(),
            Phase::Waiting { on_done } => on_done.take(),
            Phase::Idle => None,
        }
    }

    /// Installs a new `onDone` on whichever phase is currently active.
    /// A no-op (logged) if the instance is `Idle` — the sequencer only
    /// calls this right after a `SelfRef` step, which guarantees a
    /// phase is active.
    pub(crate) fn set_on_done(&mut self, new_on_done: OnDone<T, C>) {
        match &mut self.phase {
            Phase::Receiving { on_done, .. } => *on_done = Some(new_on_done),
            Phase::Waiting { on_done } => *on_done = Some(new_on_done),
            Phase::Idle => {
                log::trace!("set_on_done ignored: idle");
            },
        }
    }

    fn deliver_error(&mut self, err: Error) {
        if self.busy() {
            self.terminate(Some(err), None);
        } else {
            self.route_unhandled(Some(err), None);
        }
    }

    /// Routes `(err, data)` to the unhandled sink, if one is attached.
    /// Detached before invocation for the same reentrancy reason as
    /// registry handlers and `onDone` callbacks.
    fn route_unhandled(&mut self, err: Option<Error>, data: Option<Value>) {
        match self.unhandled.take() {
            Some(mut sink) => {
                log::warn!("unhandled: err={:?} data={:?}", err, data);
                sink(self, err, data);
                if self.unhandled.is_none() {
                    self.unhandled = Some(sink);
                }
            },
            None => {
                log::trace!("dropped with no unhandled sink: err={:?} data={:?}", err, data);
            },
        }
    }
}
