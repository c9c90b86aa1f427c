//
// seed_scenarios.rs
//

//! Black-box tests against the public API only, covering the concrete
//! end-to-end scenarios enumerated as seed tests.

use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use assert_matches::assert_matches;
use parlance_core::fixtures::{FakeClock, FakeTransport};
use parlance_core::{
    default_data_handler, ConversationEngine, DataOutcome, Error, MatchSpec, Value, ALLOW_REPEATS, COLLECT_ALL,
    IGNORE_NON_MATCHING, UNORDERED,
};

fn new_engine() -> ConversationEngine<FakeTransport, FakeClock> {
    env_logger::try_init().ok();
    ConversationEngine::new(FakeTransport::new(), FakeClock::new(), None)
}

#[test]
fn simple_request_response() {
    let mut a = new_engine();
    let mut b = new_engine();

    // b accepts one token and immediately answers "response".
    b.receive(
        None,
        Box::new(|engine, _token| {
            engine.send("response", false)?;
            Ok(DataOutcome::Done(Value::Nil))
        }),
        None,
    );

    let resolved: Rc<RefCell<Option<String>>> = Rc::new(RefCell::new(None));
    let captured = resolved.clone();
    a.receive(
        None,
        default_data_handler(),
        Some(Box::new(move |_engine, (err, data)| {
            assert!(err.is_none());
            *captured.borrow_mut() = data.and_then(|v| v.as_str().map(str::to_string));
            Ok(())
        })),
    );

    a.send("request", true).unwrap();
    b.feed("request");
    assert_eq!(b.transport().last(), Some("response".to_string()));
    a.feed(&b.transport().last().unwrap());

    assert_eq!(resolved.borrow().as_deref(), Some("response"));
}

#[test]
fn ordered_expectation_completes_on_final_token() {
    let mut engine = new_engine();
    let pattern: Vec<MatchSpec> = ["1", "2", "3", "4"].iter().map(|t| MatchSpec::literal(*t)).collect();
    let handler = parlance_core::expectation::compile(pattern, parlance_core::NO_FLAGS, None);

    let result: Rc<RefCell<Option<Value>>> = Rc::new(RefCell::new(None));
    let captured = result.clone();
    engine.receive(
        None,
        handler,
        Some(Box::new(move |_engine, (err, data)| {
            assert!(err.is_none());
            *captured.borrow_mut() = data;
            Ok(())
        })),
    );

    for token in ["1", "2", "3"] {
        engine.feed(token);
        assert!(engine.busy(), "should still be receiving after {token}");
    }
    engine.feed("4");
    assert!(!engine.busy());
    assert_eq!(result.borrow().as_ref().unwrap().as_str(), Some("4"));
}

#[test]
fn unordered_ignore_non_matching_selects_default_last() {
    let mut engine = new_engine();
    let pattern = vec![MatchSpec::literal("a"), MatchSpec::regex("b.").unwrap()];
    let handler = parlance_core::expectation::compile(pattern, UNORDERED | IGNORE_NON_MATCHING, None);

    let result: Rc<RefCell<Option<Value>>> = Rc::new(RefCell::new(None));
    let captured = result.clone();
    engine.receive(None, handler, Some(Box::new(move |_e, (_err, data)| {
        *captured.borrow_mut() = data;
        Ok(())
    })));

    engine.feed("ba");
    engine.feed("bb");
    engine.feed("a");

    assert_eq!(result.borrow().as_ref().unwrap().as_str(), Some("ba"));
}

#[test]
fn repeats_and_collect_all_gathers_every_token() {
    let mut engine = new_engine();
    let pattern = vec![MatchSpec::literal("a"), MatchSpec::literal("b")];
    let handler = parlance_core::expectation::compile(pattern, ALLOW_REPEATS | COLLECT_ALL, None);

    let result: Rc<RefCell<Option<Value>>> = Rc::new(RefCell::new(None));
    let captured = result.clone();
    engine.receive(None, handler, Some(Box::new(move |_e, (_err, data)| {
        *captured.borrow_mut() = data;
        Ok(())
    })));

    engine.feed("a");
    engine.feed("a");
    engine.feed("b");

    let collected = result.borrow().clone().unwrap();
    let items: Vec<&str> = collected.as_list().unwrap().iter().map(|v| v.as_str().unwrap()).collect();
    assert_eq!(items, vec!["a", "a", "b"]);
}

#[test]
fn timed_collection_via_stop() {
    let mut engine = new_engine();

    engine.receive(
        Some(Duration::from_secs(3)),
        Box::new(|engine, token| {
            let mut items = match engine.acc() {
                Value::List(items) => items,
                _ => Vec::new(),
            };
            items.push(Value::str(token));
            engine.set_acc(Value::List(items));
            Ok(DataOutcome::Repeat)
        }),
        Some(Box::new(|_engine, (err, data)| {
            assert!(err.is_none());
            let data = data.unwrap();
            let items: Vec<&str> = data.as_list().unwrap().iter().map(|v| v.as_str().unwrap()).collect();
            assert_eq!(items, vec!["a", "b", "c"]);
            Ok(())
        })),
    );

    engine.feed("a");
    engine.feed("b");
    engine.feed("c");

    let collected = engine.acc();
    engine.stop(None, Some(collected));
    assert!(!engine.busy());

    let seen_after_stop: Rc<RefCell<Vec<String>>> = Rc::new(RefCell::new(Vec::new()));
    let captured = seen_after_stop.clone();
    engine.on_unhandled(Box::new(move |_e, _err, data| {
        if let Some(value) = data {
            captured.borrow_mut().push(value.to_string());
        }
    }));
    engine.feed("x");
    assert_eq!(*seen_after_stop.borrow(), vec!["x".to_string()]);
}

#[test]
fn registry_with_busy_gating() {
    let mut engine = new_engine();
    let seen_by_handler: Rc<RefCell<Vec<String>>> = Rc::new(RefCell::new(Vec::new()));
    let seen_by_unhandled: Rc<RefCell<Vec<String>>> = Rc::new(RefCell::new(Vec::new()));

    let handler_sink = seen_by_handler.clone();
    engine.register(
        MatchSpec::regex("^a.*").unwrap(),
        false,
        Box::new(move |_e, token, _match_result| {
            handler_sink.borrow_mut().push(token.to_string());
            Ok(Value::Bool(true))
        }),
    );

    let unhandled_sink = seen_by_unhandled.clone();
    engine.on_unhandled(Box::new(move |_e, _err, data| {
        if let Some(value) = data {
            unhandled_sink.borrow_mut().push(value.to_string());
        }
    }));

    for token in ["a", "b", "aa", "ba"] {
        engine.feed(token);
    }
    assert_eq!(*seen_by_handler.borrow(), vec!["a".to_string(), "aa".to_string()]);
    assert_eq!(*seen_by_unhandled.borrow(), vec!["b".to_string(), "ba".to_string()]);

    seen_by_handler.borrow_mut().clear();
    seen_by_unhandled.borrow_mut().clear();

    engine.receive(
        None,
        Box::new(|_engine, _token| Ok(DataOutcome::Repeat)),
        None,
    );
    for token in ["a", "b", "aa", "ba"] {
        engine.feed(token);
    }
    assert_eq!(*seen_by_handler.borrow(), vec!["a".to_string(), "aa".to_string()]);
    assert!(seen_by_unhandled.borrow().is_empty());
}

#[test]
fn stop_while_idle_is_routed_as_an_error() {
    let mut engine = new_engine();
    let seen: Rc<RefCell<Option<Error>>> = Rc::new(RefCell::new(None));
    let captured = seen.clone();
    engine.on_unhandled(Box::new(move |_e, err, _data| *captured.borrow_mut() = err));
    engine.stop(None, None);
    assert_matches!(*seen.borrow(), Some(Error::NotBusyConflict));
}
