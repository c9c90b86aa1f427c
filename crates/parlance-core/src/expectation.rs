//
// expectation.rs
//

//! Builds a stateful, single-use token handler from a declarative
//! pattern, a flag set, and a select-index (§4.2). The compiled handler
//! is installed as a `receive`'s `onData` and speaks the same
//! `DataOutcome` vocabulary as any other handler: `Repeat` for
//! "continue", `Done(value)` for completion, `Err` for failure.

use stdext::soft_assert;

use crate::error::{Error, Result};
use crate::flags::{ExpectationFlags, ALLOW_REPEATS, COLLECT_ALL, IGNORE_NON_MATCHING, UNORDERED, USE_MATCH_RESULT};
use crate::matchspec::{match_token, MatchSpec};
use crate::phase::{DataHandler, DataOutcome};
use crate::timer::Clock;
use crate::transport::Transport;
use crate::value::{is_matched, Value};

enum Collected {
    Single(Value),
    List(Vec<Value>),
}

impl Collected {
    fn new(collect_all: bool) -> Self {
        if collect_all {
            Collected::List(Vec::new())
        } else {
            Collected::Single(Value::Nil)
        }
    }

    fn push(&mut self, value: Value) {
        match self {
            Collected::List(items) => items.push(value),
            Collected::Single(slot) => *slot = value,
        }
    }

    fn into_value(self) -> Value {
        match self {
            Collected::List(items) => Value::List(items),
            Collected::Single(value) => value,
        }
    }
}

/// Normalises `n` to `[0, |pattern|)`, defaulting (and clamping) to the
/// last index, per §4.2's corner cases.
fn normalize_select_index(select_index: Option<usize>, len: usize) -> usize {
    match select_index {
        Some(n) if n < len => n,
        _ => len - 1,
    }
}

struct Ordered {
    pattern: Vec<MatchSpec>,
    flags: ExpectationFlags,
    select_index: usize,
    cursor: usize,
    collected: Collected,
}

impl Ordered {
    fn step(&mut self, token: &str) -> Result<Option<Value>> {
        let advance_result = match_token(&self.pattern[self.cursor], token)?;
        let advance = is_matched(&advance_result);

        let (matched, save_result) = if advance {
            (true, advance_result)
        } else if self.flags.contains(ALLOW_REPEATS) && self.cursor > 0 {
            let repeat_result = match_token(&self.pattern[self.cursor - 1], token)?;
            if is_matched(&repeat_result) {
                (true, repeat_result)
            } else {
                (false, Value::Nil)
            }
        } else {
            (false, Value::Nil)
        };

        if !matched {
            if self.flags.contains(IGNORE_NON_MATCHING) {
                return Ok(None);
            }
            return Err(Error::pattern_mismatch(&self.pattern[self.cursor], token));
        }

        let save = if self.flags.contains(USE_MATCH_RESULT) {
            save_result
        } else {
            Value::str(token)
        };

        if self.flags.contains(COLLECT_ALL) {
            self.collected.push(save);
        } else if advance && self.cursor == self.select_index {
            self.collected.push(save);
        }

        if advance {
            self.cursor += 1;
        }

        if self.cursor == self.pattern.len() {
            let collected = std::mem::replace(&mut self.collected, Collected::Single(Value::Nil));
            Ok(Some(collected.into_value()))
        } else {
            Ok(None)
        }
    }
}

struct Unordered {
    pattern: Vec<MatchSpec>,
    flags: ExpectationFlags,
    select_index: usize,
    found: Vec<u32>,
    remaining: usize,
    collected: Collected,
}

impl Unordered {
    fn step(&mut self, token: &str) -> Result<Option<Value>> {
        let allow_repeats = self.flags.contains(ALLOW_REPEATS);
        let mut hit = None;
        for (j, spec) in self.pattern.iter().enumerate() {
            if !allow_repeats && self.found[j] != 0 {
                continue;
            }
            let result = match_token(spec, token)?;
            if is_matched(&result) {
                hit = Some((j, result));
                break;
            }
        }

        let (j, result) = match hit {
            Some(pair) => pair,
            None => {
                if self.flags.contains(IGNORE_NON_MATCHING) {
                    return Ok(None);
                }
                return Err(Error::NoMatch { token: token.to_string() });
            },
        };

        let save = if self.flags.contains(USE_MATCH_RESULT) {
            result
        } else {
            Value::str(token)
        };

        if self.flags.contains(COLLECT_ALL) {
            self.collected.push(save);
        } else if j == self.select_index {
            self.collected.push(save);
        }

        if self.found[j] == 0 {
            self.remaining -= 1;
        }
        self.found[j] += 1;

        if self.remaining == 0 {
            let collected = std::mem::replace(&mut self.collected, Collected::Single(Value::Nil));
            Ok(Some(collected.into_value()))
        } else {
            Ok(None)
        }
    }
}

enum Compiled {
    Ordered(Ordered),
    Unordered(Unordered),
}

impl Compiled {
    fn step(&mut self, token: &str) -> Result<Option<Value>> {
        match self {
            Compiled::Ordered(state) => state.step(token),
            Compiled::Unordered(state) => state.step(token),
        }
    }
}

/// Compiles `(pattern, flags, select_index)` into a `DataHandler`
/// suitable for installing as a `receive`'s `onData`. A scalar pattern
/// should be lifted to a length-1 `vec!` by the caller before calling
/// this (§3: "scalar specs are lifted to a length-1 sequence").
pub fn compile<T: Transport + 'static, C: Clock + 'static>(
    pattern: Vec<MatchSpec>,
    flags: ExpectationFlags,
    select_index: Option<usize>,
) -> DataHandler<T, C> {
    soft_assert!(!pattern.is_empty(), "expectation pattern must not be empty");

    let len = pattern.len();
    let n = normalize_select_index(select_index, len);
    let collect_all = flags.contains(COLLECT_ALL);

    let mut compiled = if flags.contains(UNORDERED) {
        Compiled::Unordered(Unordered {
            found: vec![0; len],
            remaining: len,
            collected: Collected::new(collect_all),
            pattern,
            flags,
            select_index: n,
        })
    } else {
        Compiled::Ordered(Ordered {
            cursor: 0,
            collected: Collected::new(collect_all),
            pattern,
            flags,
            select_index: n,
        })
    };

    Box::new(move |_engine, token| match compiled.step(token)? {
        Some(value) => Ok(DataOutcome::Done(value)),
        None => Ok(DataOutcome::Repeat),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flags::NO_FLAGS;
    use crate::fixtures::{FakeClock, FakeTransport};
    use assert_matches::assert_matches;

    fn literals(tokens: &[&str]) -> Vec<MatchSpec> {
        tokens.iter().map(|t| MatchSpec::literal(*t)).collect()
    }

    fn run(mut handler: DataHandler<FakeTransport, FakeClock>, tokens: &[&str]) -> Result<Value> {
        let mut engine = crate::engine::ConversationEngine::new(FakeTransport::new(), FakeClock::new(), None);
        let mut last = None;
        for token in tokens {
            match handler(&mut engine, token)? {
                DataOutcome::Done(value) => {
                    last = Some(value);
                    break;
                },
                DataOutcome::Repeat => continue,
                DataOutcome::NewHandler(_) => unreachable!("expectation compiler never re-attaches"),
            }
        }
        Ok(last.expect("pattern did not complete"))
    }

    #[test]
    fn ordered_completion_yields_selected_token() {
        let handler: DataHandler<FakeTransport, FakeClock> =
            compile(literals(&["1", "2", "3", "4"]), NO_FLAGS, None);
        let result = run(handler, &["1", "2", "3", "4"]).unwrap();
        assert_eq!(result.as_str(), Some("4"));
    }

    #[test]
    fn unordered_ignore_non_matching_completes_on_default_last() {
        let pattern = vec![MatchSpec::literal("a"), MatchSpec::regex("b.").unwrap()];
        let handler: DataHandler<FakeTransport, FakeClock> =
            compile(pattern, UNORDERED | IGNORE_NON_MATCHING, None);
        let result = run(handler, &["ba", "bb", "a"]).unwrap();
        assert_eq!(result.as_str(), Some("ba"));
    }

    #[test]
    fn allow_repeats_collect_all_gathers_every_token() {
        let handler: DataHandler<FakeTransport, FakeClock> =
            compile(literals(&["a", "b"]), ALLOW_REPEATS | COLLECT_ALL, None);
        let result = run(handler, &["a", "a", "b"]).unwrap();
        let list: Vec<&str> = result.as_list().unwrap().iter().map(|v| v.as_str().unwrap()).collect();
        assert_eq!(list, vec!["a", "a", "b"]);
    }

    #[test]
    fn ordered_mismatch_without_ignore_fails() {
        let handler: DataHandler<FakeTransport, FakeClock> = compile(literals(&["1", "2"]), NO_FLAGS, None);
        let err = run(handler, &["9"]).unwrap_err();
        assert_matches!(err, Error::PatternMismatch { .. });
    }

    #[test]
    fn collect_all_length_matches_pattern_length_without_repeats() {
        let handler: DataHandler<FakeTransport, FakeClock> =
            compile(literals(&["a", "b", "c"]), COLLECT_ALL, None);
        let result = run(handler, &["a", "b", "c"]).unwrap();
        assert_eq!(result.as_list().unwrap().len(), 3);
    }
}
