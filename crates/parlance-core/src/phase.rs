//
// phase.rs
//

use crate::engine::ConversationEngine;
use crate::error::{Outcome, Result};
use crate::timer::Clock;
use crate::transport::Transport;
use crate::value::Value;

/// What an active receive handler reports back for a single token.
/// Replaces the source's `CB_REPEAT`-sentinel-or-callable-or-value
/// trichotomy (§9 "Sentinels vs values") with a closed enum, the same
/// translation the expectation compiler's `MatchSpec` already makes for
/// dynamic type-sniffing.
pub enum DataOutcome<T: Transport, C: Clock> {
    /// Stay attached; nothing about this token changed the handler.
    Repeat,
    /// Detach the current handler and attach this one in its place.
    NewHandler(DataHandler<T, C>),
    /// The operation is complete; deliver this value to `onDone`.
    Done(Value),
}

/// A stateful, single-use token handler installed for the duration of
/// one `Receiving` phase. Takes `&mut ConversationEngine` so it can
/// read/write the accumulator slot and, after returning `Done`, start a
/// new operation synchronously (the detach-before-invoke rationale in
/// §4.4: the engine is already Idle by the time this runs).
pub type DataHandler<T, C> =
    Box<dyn FnMut(&mut ConversationEngine<T, C>, &str) -> Result<DataOutcome<T, C>>>;

/// The completion callback attached to a `Receiving` or `Waiting`
/// phase, invoked exactly once when that phase terminates. Returns
/// `Result` rather than panicking on failure — the Rust rendering of
/// "if the callback itself throws" (§4.4): a `Err` here is re-captured
/// as `Error::UserHandlerFailure` and routed to the unhandled sink.
pub type OnDone<T, C> = Box<dyn FnOnce(&mut ConversationEngine<T, C>, Outcome) -> Result<()>>;

/// The engine's current state (§3). At most one variant is active at
/// any moment; `busy()` is exactly `phase != Idle`.
pub enum Phase<T: Transport, C: Clock> {
    Idle,
    Receiving {
        handler: DataHandler<T, C>,
        on_done: Option<OnDone<T, C>>,
    },
    Waiting {
        on_done: Option<OnDone<T, C>>,
    },
}

impl<T: Transport, C: Clock> Phase<T, C> {
    pub fn is_idle(&self) -> bool {
        matches!(self, Phase::Idle)
    }

    pub fn is_busy(&self) -> bool {
        !self.is_idle()
    }

    pub fn is_waiting(&self) -> bool {
        matches!(self, Phase::Waiting { .. })
    }

    pub fn is_receiving(&self) -> bool {
        matches!(self, Phase::Receiving { .. })
    }
}
