//
// registry.rs
//

use crate::engine::ConversationEngine;
use crate::error::Result;
use crate::matchspec::{match_token, MatchSpec};
use crate::timer::Clock;
use crate::transport::Transport;
use crate::value::{is_matched, Value};

/// A registered unsolicited-input handler. Takes the token and the raw
/// match result (so a `Predicate`/`Regex` payload is available without
/// re-evaluating the spec) and reports back whether it actually wants
/// this token: the literal `Value::Bool(false)` means "not relevant,
/// keep scanning", matching §4.3's override-escape semantics; any other
/// value (including `Value::Nil`) means the token is consumed — §4.3's
/// escape rule is a dedicated sentinel check, not the nil/false
/// `is_matched` rule §4.1 defines for match results.
pub type RegistryHandler<T, C> =
    Box<dyn FnMut(&mut ConversationEngine<T, C>, &str, Value) -> Result<Value>>;

struct Entry<T: Transport, C: Clock> {
    id: u64,
    spec: MatchSpec,
    handler: RegistryHandler<T, C>,
}

/// Ordered list of `(MatchSpec, handler)` pairs for unsolicited input
/// (§4.3). Entries are stored oldest-first; dispatch scans newest-first,
/// modelling an override stack. Each entry carries a monotonic `id` so a
/// handler invoked mid-dispatch can be found again after the call even
/// if other entries were registered or deregistered in the meantime.
pub struct Registry<T: Transport, C: Clock> {
    entries: Vec<Entry<T, C>>,
    next_id: u64,
}

impl<T: Transport, C: Clock> Registry<T, C> {
    pub fn new() -> Self {
        Registry { entries: Vec::new(), next_id: 0 }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Appends `(spec, handler)`. When `dedupe` is set, any prior
    /// entries with an equal spec (§4.3: reference/structural identity)
    /// are removed first.
    pub fn register(&mut self, spec: MatchSpec, dedupe: bool, handler: RegistryHandler<T, C>) {
        if dedupe {
            self.entries.retain(|entry| entry.spec != spec);
        }
        let id = self.next_id;
        self.next_id += 1;
        log::trace!("registering handler for spec {:?} (dedupe={})", spec, dedupe);
        self.entries.push(Entry { id, spec, handler });
    }

    /// Removes the most recent (or, with `all`, every) entry whose spec
    /// equals `spec`.
    pub fn deregister(&mut self, spec: &MatchSpec, all: bool) {
        if all {
            self.entries.retain(|entry| &entry.spec != spec);
            return;
        }
        if let Some(index) = self.entries.iter().rposition(|entry| &entry.spec == spec) {
            log::trace!("deregistering handler for spec {:?}", spec);
            self.entries.remove(index);
        }
    }

    pub fn deregister_all(&mut self) {
        log::trace!("deregistering all {} registry entries", self.entries.len());
        self.entries.clear();
    }
}

impl<T: Transport, C: Clock> Default for Registry<T, C> {
    fn default() -> Self {
        Self::new()
    }
}

/// Scans the registry tail-to-head (newest first). For each entry whose
/// spec matches `token`, the handler is invoked; the literal `false`
/// means "ignore this match, continue scanning", anything else means
/// the token was consumed and dispatch stops. Returns whether some
/// handler consumed the token.
///
/// The handler is detached from its slot before being invoked (and
/// restored afterwards, if its slot is still present) so it may freely
/// start a new operation on `engine`, including registering or
/// deregistering further entries, without aliasing `&mut self`. The
/// dispatch order is fixed by a snapshot of `(id, spec)` pairs taken
/// before any handler runs, and each entry is relocated by its stable
/// `id` rather than its position: a handler that deregisters some other
/// entry mid-pass shifts the underlying `Vec`, so a positional index
/// captured before the call would silently land on the wrong entry.
pub fn dispatch_registry<T: Transport, C: Clock>(
    engine: &mut ConversationEngine<T, C>,
    token: &str,
) -> Result<bool> {
    let order: Vec<(u64, MatchSpec)> =
        engine.registry.entries.iter().rev().map(|entry| (entry.id, entry.spec.clone())).collect();

    for (id, spec) in order {
        let index = match engine.registry.entries.iter().position(|entry| entry.id == id) {
            Some(index) => index,
            None => continue, // deregistered by an earlier handler in this pass
        };

        let result = match_token(&spec, token)?;
        if !is_matched(&result) {
            continue;
        }

        let placeholder: RegistryHandler<T, C> = Box::new(|_, _, _| Ok(Value::Bool(false)));
        let mut handler = std::mem::replace(&mut engine.registry.entries[index].handler, placeholder);
        let outcome = handler(engine, token, result);
        if let Some(entry) = engine.registry.entries.iter_mut().find(|entry| entry.id == id) {
            entry.handler = handler;
        }

        let consumed = match outcome {
            Ok(value) => !matches!(value, Value::Bool(false)),
            Err(err) => {
                log::error!("registry handler failed for token {:?}: {}", token, err);
                return Err(err);
            },
        };
        if consumed {
            return Ok(true);
        }
    }
    Ok(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{FakeClock, FakeTransport};
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn register_and_deregister_maintain_order() {
        let mut registry: Registry<FakeTransport, FakeClock> = Registry::new();
        registry.register(MatchSpec::literal("a"), false, Box::new(|_, _, _| Ok(Value::Bool(true))));
        registry.register(MatchSpec::literal("b"), false, Box::new(|_, _, _| Ok(Value::Bool(true))));
        assert_eq!(registry.len(), 2);

        registry.deregister(&MatchSpec::literal("a"), false);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn dedupe_removes_prior_equal_specs() {
        let mut registry: Registry<FakeTransport, FakeClock> = Registry::new();
        registry.register(MatchSpec::literal("a"), false, Box::new(|_, _, _| Ok(Value::Bool(true))));
        registry.register(MatchSpec::literal("a"), true, Box::new(|_, _, _| Ok(Value::Bool(true))));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn nil_result_from_handler_is_treated_as_consumed() {
        let mut engine = ConversationEngine::new(FakeTransport::new(), FakeClock::new(), None);
        let older_called = Rc::new(RefCell::new(false));
        let older_flag = older_called.clone();
        engine.register(
            MatchSpec::literal("a"),
            false,
            Box::new(move |_, _, _| {
                *older_flag.borrow_mut() = true;
                Ok(Value::Bool(true))
            }),
        );
        // Registered later, so scanned first (newest-first); returning Nil
        // must still stop the scan, not fall through as "not relevant".
        engine.register(MatchSpec::literal("a"), false, Box::new(|_, _, _| Ok(Value::Nil)));

        let consumed = dispatch_registry(&mut engine, "a").unwrap();

        assert!(consumed);
        assert!(!*older_called.borrow(), "the older handler must not run once the newer one consumes with Nil");
    }

    #[test]
    fn handler_identity_survives_reentrant_deregistration_of_another_entry() {
        let mut engine = ConversationEngine::new(FakeTransport::new(), FakeClock::new(), None);
        let high_calls = Rc::new(RefCell::new(0));
        let calls = high_calls.clone();

        engine.register(MatchSpec::literal("low"), false, Box::new(|_, _, _| Ok(Value::Bool(true))));
        engine.register(MatchSpec::literal("mid"), false, Box::new(|_, _, _| Ok(Value::Bool(true))));
        engine.register(
            MatchSpec::literal("high"),
            false,
            Box::new(move |engine, _, _| {
                *calls.borrow_mut() += 1;
                engine.deregister(&MatchSpec::literal("mid"), false);
                Ok(Value::Bool(false))
            }),
        );

        dispatch_registry(&mut engine, "high").unwrap();
        dispatch_registry(&mut engine, "high").unwrap();

        assert_eq!(
            *high_calls.borrow(),
            2,
            "high's real handler must still run on the second dispatch, not a stranded decline placeholder"
        );
        assert_eq!(engine.registry.len(), 2);
    }
}
