//
// sequencer.rs
//

//! Drives a user-supplied script of steps to completion, composing with
//! the engine whenever a step begins a receive or wait (§4.5).

use crate::error::{Error, Outcome, Result};
use crate::phase::OnDone;
use crate::timer::Clock;
use crate::transport::Transport;
use crate::value::Value;
use crate::engine::ConversationEngine;

/// A single continuation handed to an `Async` step: call it once, with
/// `Some(err)` to fail the sequence or `None` to advance carrying
/// `data` as the step's result.
pub type StepContinuation<T, C> = Box<dyn FnOnce(&mut ConversationEngine<T, C>, Option<Error>, Option<Value>)>;

/// One step of a script (§3/§4.5).
pub enum Step<T: Transport, C: Clock> {
    /// A callable taking a completion callback. The sequencer calls it
    /// with a fresh continuation; on `err` the sequence terminates with
    /// error, on success it advances.
    Async(Box<dyn FnOnce(&mut ConversationEngine<T, C>, StepContinuation<T, C>)>),
    /// The step has already initiated a `Receiving`/`Waiting` phase on
    /// the instance (by calling `receive`/`wait`/`cmd` synchronously
    /// before yielding this step). The sequencer installs its own
    /// continuation as that phase's `onDone`.
    SelfRef,
    /// Treated as the synchronous result of the step; the sequencer
    /// advances immediately.
    Value(Value),
}

/// Normalises a script into a pull-based sequence of steps. Three
/// shapes satisfy this: a hand-written generator-like type (implement
/// this trait directly), a nullary closure (blanket impl below,
/// repeatedly called until it yields `None`), or a finite container
/// (wrap it in `VecScript`).
pub trait Script<T: Transport, C: Clock> {
    fn next_step(&mut self) -> Option<Step<T, C>>;
}

impl<T, C, F> Script<T, C> for F
where
    T: Transport,
    C: Clock,
    F: FnMut() -> Option<Step<T, C>>,
{
    fn next_step(&mut self) -> Option<Step<T, C>> {
        self()
    }
}

/// Wraps a finite, already-built list of steps so it can be driven the
/// same way as a generator-like or closure-based script.
pub struct VecScript<T: Transport, C: Clock> {
    steps: std::vec::IntoIter<Step<T, C>>,
}

impl<T: Transport, C: Clock> VecScript<T, C> {
    pub fn new(steps: Vec<Step<T, C>>) -> Self {
        VecScript { steps: steps.into_iter() }
    }
}

impl<T: Transport, C: Clock> Script<T, C> for VecScript<T, C> {
    fn next_step(&mut self) -> Option<Step<T, C>> {
        self.steps.next()
    }
}

pub type SeqOnDone<T, C> = Box<dyn FnOnce(&mut ConversationEngine<T, C>, Outcome)>;

/// `seq(script, onDone)`. Requires the instance to be `Idle` at call
/// time (§4.5): each step that uses the instance consumes the expected
/// Idle-to-busy-to-Idle cycle on its own.
pub fn seq<T, C>(
    engine: &mut ConversationEngine<T, C>,
    script: impl Script<T, C> + 'static,
    on_done: SeqOnDone<T, C>,
) where
    T: Transport + 'static,
    C: Clock + 'static,
{
    drive(engine, Box::new(script), None, on_done);
}

fn drive<T, C>(
    engine: &mut ConversationEngine<T, C>,
    mut script: Box<dyn Script<T, C>>,
    last_data: Option<Value>,
    on_done: SeqOnDone<T, C>,
) where
    T: Transport + 'static,
    C: Clock + 'static,
{
    match script.next_step() {
        None => {
            on_done(engine, (None, last_data));
        },
        Some(Step::Value(value)) => {
            drive(engine, script, Some(value), on_done);
        },
        Some(Step::Async(step_fn)) => {
            let continuation: StepContinuation<T, C> = Box::new(move |engine, err, data| match err {
                Some(err) => on_done(engine, (Some(err), None)),
                None => drive(engine, script, data, on_done),
            });
            step_fn(engine, continuation);
        },
        Some(Step::SelfRef) => {
            let previous = engine.take_on_done();
            let wrapped: OnDone<T, C> = Box::new(move |engine, (err, data)| {
                match previous {
                    Some(previous_on_done) => match previous_on_done(engine, (err, data.clone())) {
                        Ok(()) => {
                            drive(engine, script, data, on_done);
                            Ok(())
                        },
                        Err(failure) => {
                            on_done(engine, (Some(failure), None));
                            Ok(())
                        },
                    },
                    None => {
                        match err {
                            Some(err) => on_done(engine, (Some(err), None)),
                            None => drive(engine, script, data, on_done),
                        }
                        Ok(())
                    },
                }
            });
            engine.set_on_done(wrapped);
        },
    }
}
