//
// lib.rs
//

//! A substrate-agnostic conversation engine for carrying on a
//! token-at-a-time dialogue with a remote partner over a byte stream —
//! prototypically an AT-command modem on a serial line, but the design
//! itself does not know about serial ports, AT commands, or any other
//! concrete substrate. An instance is fed pre-tokenized input and writes
//! outbound tokens back through an injected [`Transport`]; it
//! coordinates single-inflight request/response operations, sequential
//! multi-step scripts, unsolicited-message routing, timeouts, and early
//! cancellation.
//!
//! The engine itself is single-threaded and cooperative: handlers,
//! timer fires, and transport writes all run on one logical thread of
//! control. Concrete timers and tokenizers live in the `parlance-tokio`
//! crate so this crate stays runtime-agnostic.

pub mod engine;
pub mod error;
pub mod expectation;
pub mod flags;
pub mod matchspec;
pub mod phase;
pub mod registry;
pub mod sequencer;
pub mod timer;
pub mod transport;
pub mod value;

#[cfg(any(test, feature = "testing"))]
pub mod fixtures;

pub use crate::engine::{default_data_handler, ConversationEngine, UnhandledSink, DFLT_TIMEOUT};
pub use crate::error::{Error, Outcome, Result, ERR_BUSY, ERR_NOT_BUSY, ERR_TIMEOUT};
pub use crate::flags::{
    ExpectationFlags, ALLOW_REPEATS, COLLECT_ALL, IGNORE_NON_MATCHING, NO_FLAGS, UNORDERED, USE_MATCH_RESULT,
};
pub use crate::matchspec::{expect_match, match_token, MatchSpec, TokenMatcher};
pub use crate::phase::{DataHandler, DataOutcome, OnDone, Phase};
pub use crate::registry::{Registry, RegistryHandler};
pub use crate::sequencer::{seq, Script, SeqOnDone, Step, StepContinuation, VecScript};
pub use crate::timer::{Clock, TimerManager};
pub use crate::transport::Transport;
pub use crate::value::{is_matched, Value};
