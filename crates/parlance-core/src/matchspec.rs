//
// matchspec.rs
//

use std::fmt;
use std::rc::Rc;

use regex::Regex;

use crate::error::{Error, Result};
use crate::value::{is_matched, Value};

/// An open extension point for spec shapes the built-in variants don't
/// cover. A `Custom` matcher that declines to understand a token
/// returns `None`, which the engine surfaces as `Error::CannotMatch`.
pub trait TokenMatcher {
    fn try_match(&self, token: &str) -> Option<Value>;
}

impl<F> TokenMatcher for F
where
    F: Fn(&str) -> Option<Value>,
{
    fn try_match(&self, token: &str) -> Option<Value> {
        self(token)
    }
}

/// Declarative description of what an acceptable token looks like.
///
/// `Predicate` and `Custom` hold an `Rc` rather than a plain closure so a
/// `MatchSpec` can be cloned cheaply (expectation state and registry
/// entries both need to hold on to one independently of the caller).
#[derive(Clone)]
pub enum MatchSpec {
    AlwaysTrue,
    AlwaysFalse,
    Literal(String),
    Predicate(Rc<dyn Fn(&str) -> Value>),
    Regex(Regex),
    Custom(Rc<dyn TokenMatcher>),
    AnyOf(Vec<MatchSpec>),
}

impl MatchSpec {
    pub fn literal(s: impl Into<String>) -> Self {
        MatchSpec::Literal(s.into())
    }

    pub fn regex(pattern: &str) -> std::result::Result<Self, regex::Error> {
        Ok(MatchSpec::Regex(Regex::new(pattern)?))
    }

    pub fn predicate(f: impl Fn(&str) -> Value + 'static) -> Self {
        MatchSpec::Predicate(Rc::new(f))
    }

    pub fn custom(matcher: impl TokenMatcher + 'static) -> Self {
        MatchSpec::Custom(Rc::new(matcher))
    }

    pub fn any_of(specs: Vec<MatchSpec>) -> Self {
        MatchSpec::AnyOf(specs)
    }
}

impl fmt::Debug for MatchSpec {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            MatchSpec::AlwaysTrue => write!(f, "AlwaysTrue"),
            MatchSpec::AlwaysFalse => write!(f, "AlwaysFalse"),
            MatchSpec::Literal(s) => write!(f, "Literal({:?})", s),
            MatchSpec::Predicate(_) => write!(f, "Predicate(..)"),
            MatchSpec::Regex(re) => write!(f, "Regex({})", re.as_str()),
            MatchSpec::Custom(_) => write!(f, "Custom(..)"),
            MatchSpec::AnyOf(specs) => write!(f, "AnyOf({:?})", specs),
        }
    }
}

/// Reference/structural identity at the host level (§4.3): value
/// equality for the shapes that carry one, pattern-string equality for
/// `Regex`, and pointer identity for anything wrapping a trait object,
/// since two distinct closures can never be compared for value equality.
impl PartialEq for MatchSpec {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (MatchSpec::AlwaysTrue, MatchSpec::AlwaysTrue) => true,
            (MatchSpec::AlwaysFalse, MatchSpec::AlwaysFalse) => true,
            (MatchSpec::Literal(a), MatchSpec::Literal(b)) => a == b,
            (MatchSpec::Regex(a), MatchSpec::Regex(b)) => a.as_str() == b.as_str(),
            (MatchSpec::Predicate(a), MatchSpec::Predicate(b)) => Rc::ptr_eq(a, b),
            (MatchSpec::Custom(a), MatchSpec::Custom(b)) => Rc::ptr_eq(a, b),
            (MatchSpec::AnyOf(a), MatchSpec::AnyOf(b)) => a == b,
            _ => false,
        }
    }
}

/// `match(spec, token)`, dispatching on the spec variant. `AnyOf`
/// returns the first truthy element result (short-circuit), else false.
pub fn match_token(spec: &MatchSpec, token: &str) -> Result<Value> {
    match spec {
        MatchSpec::AlwaysTrue => Ok(Value::Bool(true)),
        MatchSpec::AlwaysFalse => Ok(Value::Bool(false)),
        MatchSpec::Literal(expected) => Ok(Value::Bool(expected == token)),
        MatchSpec::Predicate(f) => Ok(f(token)),
        MatchSpec::Regex(re) => Ok(Value::Bool(re.is_match(token))),
        MatchSpec::Custom(matcher) => matcher
            .try_match(token)
            .ok_or_else(|| Error::cannot_match(spec, token)),
        MatchSpec::AnyOf(specs) => {
            for inner in specs {
                let result = match_token(inner, token)?;
                if is_matched(&result) {
                    return Ok(result);
                }
            }
            Ok(Value::Bool(false))
        },
    }
}

/// Evaluates `spec` against `token`, failing with a formatted
/// "expected X but got Y" message when it does not match. Used by user
/// callbacks that want to assert a token's shape with consistent error
/// text.
pub fn expect_match(spec: &MatchSpec, token: &str) -> Result<Value> {
    let result = match_token(spec, token)?;
    if is_matched(&result) {
        Ok(result)
    } else {
        Err(Error::pattern_mismatch(spec, token))
    }
}
