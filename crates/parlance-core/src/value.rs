//
// value.rs
//

use std::fmt;
use std::rc::Rc;

/// The dynamic, opaque type that flows through match results, the
/// accumulator slot, and handler completion data. The engine never
/// interprets a `Value` beyond the rules in this module; everything
/// else is a user convention.
#[derive(Debug, Clone)]
pub enum Value {
    Nil,
    Bool(bool),
    Int(i64),
    Str(String),
    List(Vec<Value>),
    /// An arbitrary user payload that does not fit the built-in shapes.
    /// Wrapped in `Rc` so `Value` stays cheap to clone.
    Opaque(Rc<dyn std::any::Any>),

    /// Delivered as the terminal data of a wait that expired on its own,
    /// with no user `onDone` attached to observe it any other way. A
    /// dedicated variant rather than a string or number, so it can never
    /// collide with a value a handler might legitimately produce.
    WaitStop,
}

impl Value {
    pub fn str(s: impl Into<String>) -> Self {
        Value::Str(s.into())
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items.as_slice()),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Value::Nil => write!(f, "nil"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(i) => write!(f, "{}", i),
            Value::Str(s) => write!(f, "{}", s),
            Value::List(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, "]")
            },
            Value::Opaque(_) => write!(f, "<opaque>"),
            Value::WaitStop => write!(f, "<wait-stop>"),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(items: Vec<T>) -> Self {
        Value::List(items.into_iter().map(Into::into).collect())
    }
}

/// `isMatched(r) ≡ r ≠ nil ∧ r ≠ false` (so `0` and `""` *are* matches).
pub fn is_matched(value: &Value) -> bool {
    !matches!(value, Value::Nil | Value::Bool(false))
}
