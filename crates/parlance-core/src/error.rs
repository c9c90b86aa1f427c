//
// error.rs
//

use std::fmt;

use crate::matchspec::MatchSpec;
use crate::value::Value;

/// The error sentinel strings from the external interface. These are not
/// the `Display` text of the corresponding `Error` variants (which are
/// longer and carry context); they are the stable wire-level identifiers
/// a caller can match against.
pub const ERR_TIMEOUT: &str = "timed out";
pub const ERR_BUSY: &str = "AT busy";
pub const ERR_NOT_BUSY: &str = "AT not busy";

#[derive(Debug)]
pub enum Error {
    /// An operation that requires the instance to be idle was attempted
    /// while a receive or wait was already in progress.
    BusyConflict,

    /// `stop` (or an internal caller of it) was invoked while the
    /// instance had no active operation.
    NotBusyConflict,

    /// The active receive's timer expired before the expectation
    /// completed.
    Timeout,

    /// The compiled expectation handler rejected a token (ordered mode:
    /// the token didn't match the spec currently at the cursor).
    PatternMismatch { expected: String, actual: String },

    /// The compiled expectation handler rejected a token (unordered
    /// mode: no remaining spec in the pattern matched it).
    NoMatch { token: String },

    /// A `MatchSpec` could not be evaluated against a token.
    CannotMatch { spec: String, token: String },

    /// User-supplied code (a handler, a callback, a sequencer step)
    /// panicked or otherwise failed during dispatch.
    UserHandlerFailure(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::BusyConflict => write!(f, "{}", ERR_BUSY),
            Error::NotBusyConflict => write!(f, "{}", ERR_NOT_BUSY),
            Error::Timeout => write!(f, "{}", ERR_TIMEOUT),
            Error::PatternMismatch { expected, actual } => {
                write!(f, "expected \"{}\" but got \"{}\"", expected, actual)
            },
            Error::NoMatch { token } => {
                write!(f, "no match for data \"{}\"", token)
            },
            Error::CannotMatch { spec, token } => {
                write!(f, "cannot match spec {} against token \"{}\"", spec, token)
            },
            Error::UserHandlerFailure(message) => {
                write!(f, "user handler failed: {}", message)
            },
        }
    }
}

impl std::error::Error for Error {}

impl Error {
    pub fn pattern_mismatch(expected: &MatchSpec, actual: &str) -> Self {
        Error::PatternMismatch {
            expected: format!("{:?}", expected),
            actual: actual.to_string(),
        }
    }

    pub fn cannot_match(spec: &MatchSpec, token: &str) -> Self {
        Error::CannotMatch {
            spec: format!("{:?}", spec),
            token: token.to_string(),
        }
    }
}

/// What a terminated operation delivers to its completion callback:
/// either nothing went wrong and the opaque result is attached, or
/// something did and the error takes its place. Mirrors the
/// `(err, data)` pair threaded throughout the component design.
pub type Outcome = (Option<Error>, Option<Value>);

pub type Result<T> = std::result::Result<T, Error>;
