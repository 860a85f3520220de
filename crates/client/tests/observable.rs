//! Integration tests for ObservableQuery: polling, variables and delivery.

mod common;

use common::*;
use serde_json::json;
use std::cell::RefCell;
use std::rc::Rc;
use weft_client::{ObservableQuery, OptionsPatch, TransportResponse, WatchOptions};
use weft_core::{Argument, Error, FetchPolicy, Field, QueryDocument, ResultEnvelope, VariableDefinition, Variables};

fn watch(harness: &Harness, options: WatchOptions) -> ObservableQuery {
    harness.manager.watch_query(options).unwrap()
}

// ==================== Polling ====================

#[test]
fn test_polling_start() {
    let mut harness = Harness::new(MockTransport::new(clock_handler()));
    let query = watch(&harness, WatchOptions::new(clock_query()));
    let recorder = Recorder::new();
    let _s = query.subscribe(recorder.observer());
    harness.settle();
    assert_eq!(recorder.all(), vec![ResultEnvelope::ready(clock_data(1))]);
    assert!(!query.is_polling());

    query.set_options(OptionsPatch::new().poll_interval(10)).unwrap();
    assert!(query.is_polling());

    harness.advance(9);
    assert_eq!(harness.transport.calls(), 1);
    harness.advance(1);
    assert_eq!(harness.transport.calls(), 2);

    assert_eq!(
        recorder.all(),
        vec![ResultEnvelope::ready(clock_data(1)), ResultEnvelope::ready(clock_data(2))]
    );
    // Re-armed after the tick's fetch settled
    assert!(query.is_polling());
}

#[test]
fn test_polling_stop() {
    let mut harness = Harness::new(MockTransport::new(clock_handler()));
    let query = watch(&harness, WatchOptions::new(clock_query()).poll_interval(10));
    let recorder = Recorder::new();
    let _s = query.subscribe(recorder.observer());
    harness.settle();
    assert_eq!(recorder.len(), 1);
    assert!(query.is_polling());

    query.set_options(OptionsPatch::new().poll_interval(0)).unwrap();
    // Idempotent
    query.stop_polling();

    harness.advance(100);
    assert_eq!(recorder.len(), 1);
    assert_eq!(harness.transport.calls(), 1);
    assert_eq!(harness.scheduler.pending(), 0);
}

#[test]
fn test_polling_recurs() {
    let mut harness = Harness::new(MockTransport::new(clock_handler()));
    let query = watch(&harness, WatchOptions::new(clock_query()).poll_interval(10));
    let recorder = Recorder::new();
    let _s = query.subscribe(recorder.observer());
    harness.settle();

    harness.advance(35);
    assert_eq!(harness.transport.calls(), 4);
    assert_eq!(recorder.last(), Some(ResultEnvelope::ready(clock_data(4))));
}

#[test]
fn test_poll_interval_change_waits_for_outstanding_fetch() {
    let mut harness = Harness::new(MockTransport::deferred(clock_handler()));
    let query = watch(&harness, WatchOptions::new(clock_query()).poll_interval(10));
    let _s = query.subscribe(Recorder::new().observer());
    harness.transport.resolve_next();
    harness.settle();

    // The first tick starts a fetch that stays outstanding
    harness.advance(10);
    assert_eq!(harness.transport.calls(), 2);
    assert!(query.is_fetching());

    query.start_polling(50);
    assert_eq!(query.poll_interval(), 50);
    assert!(!query.is_polling());

    // Nothing overlaps the outstanding fetch
    harness.advance(60);
    assert_eq!(harness.transport.calls(), 2);

    harness.transport.resolve_next();
    harness.settle();
    assert!(query.is_polling());

    harness.advance(49);
    assert_eq!(harness.transport.calls(), 2);
    harness.advance(1);
    assert_eq!(harness.transport.calls(), 3);
}

#[test]
fn test_poll_interval_change_while_idle_rearms() {
    let mut harness = Harness::new(MockTransport::new(clock_handler()));
    let query = watch(&harness, WatchOptions::new(clock_query()).poll_interval(100));
    let _s = query.subscribe(Recorder::new().observer());
    harness.settle();

    harness.advance(50);
    query.start_polling(20);
    harness.advance(19);
    assert_eq!(harness.transport.calls(), 1);
    harness.advance(1);
    assert_eq!(harness.transport.calls(), 2);
}

#[test]
fn test_polling_continues_after_error() {
    let failing = Rc::new(RefCell::new(true));
    let flag = failing.clone();
    let mut ticks = clock_handler();
    let mut harness = Harness::new(MockTransport::new(move |doc, vars| {
        if *flag.borrow() {
            Err(Error::transport("timeout"))
        } else {
            ticks(doc, vars)
        }
    }));
    let query = watch(&harness, WatchOptions::new(clock_query()).poll_interval(10));
    let recorder = Recorder::new();
    let _s = query.subscribe(recorder.observer());
    harness.settle();
    assert!(recorder.last().unwrap().has_errors());
    assert!(query.is_polling());

    *failing.borrow_mut() = false;
    harness.advance(10);
    assert_eq!(recorder.last(), Some(ResultEnvelope::ready(clock_data(1))));
}

#[test]
fn test_last_unsubscribe_disarms_polling() {
    let mut harness = Harness::new(MockTransport::new(clock_handler()));
    let query = watch(&harness, WatchOptions::new(clock_query()).poll_interval(10));
    let first = query.subscribe(Recorder::new().observer());
    let second = query.subscribe(Recorder::new().observer());
    harness.settle();
    assert_eq!(query.subscription_count(), 2);

    assert!(first.unsubscribe());
    assert!(query.is_polling());

    assert!(second.unsubscribe());
    assert!(!query.is_polling());
    assert_eq!(harness.scheduler.pending(), 0);

    harness.advance(50);
    assert_eq!(harness.transport.calls(), 1);
}

// ==================== Forced refetch ====================

#[test]
fn test_forced_refetch_shows_cached_data_while_loading() {
    let mut harness = Harness::new(MockTransport::deferred(user_handler(|_| "B".to_string())));
    harness
        .manager
        .write_query(&user_query(), &user_vars("1"), &user_data("1", "A"))
        .unwrap();

    let query = watch(
        &harness,
        WatchOptions::new(user_query())
            .variables(user_vars("1"))
            .fetch_policy(FetchPolicy::ForceNetwork),
    );
    let recorder = Recorder::new();
    let _s = query.subscribe(recorder.observer());

    assert_eq!(query.current_result(), ResultEnvelope::loading(user_data("1", "A")));
    assert_eq!(harness.transport.calls(), 1);

    harness.transport.resolve_next();
    harness.settle();

    assert_eq!(recorder.all(), vec![ResultEnvelope::ready(user_data("1", "B"))]);
    assert_eq!(query.current_result(), ResultEnvelope::ready(user_data("1", "B")));
}

#[test]
fn test_set_options_force_network_fetches() {
    let mut harness = Harness::new(MockTransport::new(user_handler(name_for)));
    let query = watch(&harness, WatchOptions::new(user_query()).variables(user_vars("1")));
    let recorder = Recorder::new();
    let _s = query.subscribe(recorder.observer());
    harness.settle();
    assert_eq!(harness.transport.calls(), 1);

    harness.transport.set_handler(user_handler(|_| "renamed".to_string()));
    let pending = query
        .set_options(OptionsPatch::new().fetch_policy(FetchPolicy::ForceNetwork))
        .unwrap()
        .expect("force network starts a fetch");
    assert!(query.current_result().loading);

    let settled = harness.pool.run_until(pending);
    assert_eq!(settled, ResultEnvelope::ready(user_data("1", "renamed")));
    assert_eq!(harness.transport.calls(), 2);
    assert_eq!(recorder.len(), 2);
}

// ==================== Variables ====================

#[test]
fn test_variables_change_with_roundtrip() {
    let mut harness = Harness::new(MockTransport::new(user_handler(name_for)));
    let query = watch(&harness, WatchOptions::new(user_query()).variables(user_vars("1")));
    let recorder = Recorder::new();
    let _s = query.subscribe(recorder.observer());
    harness.settle();

    let pending = query.set_variables(user_vars("2")).unwrap().unwrap();
    assert_eq!(query.current_result(), ResultEnvelope::loading(user_data("1", "user-1")));
    let settled = harness.pool.run_until(pending);

    assert_eq!(
        recorder.all(),
        vec![
            ResultEnvelope::ready(user_data("1", "user-1")),
            ResultEnvelope::loading(user_data("1", "user-1")),
            ResultEnvelope::ready(user_data("2", "user-2")),
        ]
    );
    assert_eq!(settled, ResultEnvelope::ready(user_data("2", "user-2")));
    assert_eq!(harness.transport.call_variables(), vec![user_vars("1"), user_vars("2")]);
}

/// `query Greeting($lang: String!) { greeting(lang: $lang) { text } }`
fn greeting_query() -> QueryDocument {
    QueryDocument::query("Greeting")
        .variable(VariableDefinition::new("lang", "String!"))
        .field(
            Field::new("greeting")
                .arg("lang", Argument::variable("lang"))
                .select([Field::new("text")]),
        )
}

fn lang(code: &str) -> Variables {
    Variables::new().with("lang", code)
}

#[test]
fn test_variables_change_to_equal_cached_data() {
    let mut harness = Harness::new(MockTransport::new(|_, _| {
        Ok(TransportResponse::data(json!({"greeting": {"text": "hello"}})))
    }));
    harness
        .manager
        .write_query(&greeting_query(), &lang("en-GB"), &json!({"greeting": {"text": "hello"}}))
        .unwrap();

    let query = watch(&harness, WatchOptions::new(greeting_query()).variables(lang("en-US")));
    let recorder = Recorder::new();
    let _s = query.subscribe(recorder.observer());
    harness.settle();
    assert_eq!(recorder.len(), 1);

    let settled = harness.pool.run_until(query.set_variables(lang("en-GB")).unwrap().unwrap());
    harness.settle();

    assert_eq!(settled, ResultEnvelope::ready(json!({"greeting": {"text": "hello"}})));
    assert_eq!(recorder.len(), 1);
    assert_eq!(harness.transport.calls(), 1);
}

#[test]
fn test_identical_variables_are_noop() {
    let mut harness = Harness::new(MockTransport::new(user_handler(name_for)));
    let query = watch(&harness, WatchOptions::new(user_query()).variables(user_vars("1")));
    let recorder = Recorder::new();
    let _s = query.subscribe(recorder.observer());
    harness.settle();

    assert!(query.set_variables(user_vars("1")).unwrap().is_none());
    harness.settle();

    assert_eq!(recorder.len(), 1);
    assert_eq!(harness.transport.calls(), 1);
}

#[test]
fn test_missing_variables_leave_query_unchanged() {
    let harness = Harness::new(MockTransport::new(user_handler(name_for)));
    let query = watch(&harness, WatchOptions::new(user_query()).variables(user_vars("1")));

    let err = query.set_variables(Variables::new()).err().unwrap();
    assert!(err.is_configuration());
    assert_eq!(query.variables(), user_vars("1"));

    let err = query
        .set_options(
            OptionsPatch::new()
                .variables(Variables::new().with("id", serde_json::Value::Null))
                .poll_interval(10),
        )
        .err()
        .unwrap();
    assert!(err.is_configuration());
    assert_eq!(query.poll_interval(), 0);
}

#[test]
fn test_stale_settlement_is_dropped() {
    let mut harness = Harness::new(MockTransport::deferred(user_handler(name_for)));
    let query = watch(&harness, WatchOptions::new(user_query()).variables(user_vars("1")));
    let recorder = Recorder::new();
    let _s = query.subscribe(recorder.observer());
    let _pending = query.set_variables(user_vars("2")).unwrap();
    assert_eq!(harness.transport.pending(), 2);

    // Newer request settles first
    harness.transport.resolve_at(1);
    harness.settle();
    assert_eq!(query.current_result(), ResultEnvelope::ready(user_data("2", "user-2")));

    harness.transport.resolve_next();
    harness.settle();

    assert_eq!(query.current_result(), ResultEnvelope::ready(user_data("2", "user-2")));
    assert_eq!(
        recorder.all(),
        vec![
            ResultEnvelope::loading(json!({})),
            ResultEnvelope::ready(user_data("2", "user-2")),
        ]
    );
}

#[test]
fn test_refetch_with_new_variables() {
    let mut harness = Harness::new(MockTransport::new(user_handler(name_for)));
    let query = watch(&harness, WatchOptions::new(user_query()).variables(user_vars("1")));
    let recorder = Recorder::new();
    let _s = query.subscribe(recorder.observer());
    harness.settle();

    let settled = harness.pool.run_until(query.refetch(Some(user_vars("3"))).unwrap());
    assert_eq!(settled, ResultEnvelope::ready(user_data("3", "user-3")));
    assert_eq!(query.variables(), user_vars("3"));
    assert_eq!(recorder.last(), Some(settled));
}

// ==================== Delivery ====================

#[test]
fn test_later_subscriber_receives_current_result() {
    let mut harness = Harness::new(MockTransport::new(user_handler(name_for)));
    let query = watch(&harness, WatchOptions::new(user_query()).variables(user_vars("1")));
    let first = Recorder::new();
    let _a = query.subscribe(first.observer());
    harness.settle();

    let second = Recorder::new();
    let _b = query.subscribe(second.observer());
    assert_eq!(second.all(), vec![ResultEnvelope::ready(user_data("1", "user-1"))]);
    assert_eq!(harness.transport.calls(), 1);
}

#[test]
fn test_partial_data_interim() {
    let mut harness = Harness::new(MockTransport::deferred(|_, _| {
        Ok(TransportResponse::data(json!({"viewer": {"name": "Ann", "email": "ann@example.com"}})))
    }));
    let name_only = QueryDocument::query("ViewerName").field(Field::new("viewer").select([Field::new("name")]));
    harness
        .manager
        .write_query(&name_only, &Variables::new(), &json!({"viewer": {"name": "Ann"}}))
        .unwrap();

    let full = QueryDocument::query("Viewer")
        .field(Field::new("viewer").select([Field::new("name"), Field::new("email")]));
    let query = watch(&harness, WatchOptions::new(full).return_partial_data(true));
    let recorder = Recorder::new();
    let _s = query.subscribe(recorder.observer());

    assert_eq!(recorder.all(), vec![ResultEnvelope::loading(json!({"viewer": {"name": "Ann"}}))]);

    harness.transport.resolve_next();
    harness.settle();
    assert_eq!(
        recorder.last(),
        Some(ResultEnvelope::ready(json!({"viewer": {"name": "Ann", "email": "ann@example.com"}})))
    );
}

#[test]
fn test_observer_may_unsubscribe_during_delivery() {
    let mut harness = Harness::new(MockTransport::new(clock_handler()));
    let query = watch(&harness, WatchOptions::new(clock_query()).poll_interval(10));

    let slot: Rc<RefCell<Option<weft_client::Subscription>>> = Rc::new(RefCell::new(None));
    let count = Rc::new(RefCell::new(0));
    let (inner_slot, inner_count) = (slot.clone(), count.clone());
    let subscription = query.subscribe(move |_: &ResultEnvelope| {
        *inner_count.borrow_mut() += 1;
        if let Some(subscription) = inner_slot.borrow_mut().take() {
            subscription.unsubscribe();
        }
    });
    *slot.borrow_mut() = Some(subscription);

    harness.settle();
    harness.advance(50);

    assert_eq!(*count.borrow(), 1);
    assert_eq!(query.subscription_count(), 0);
    assert!(!query.is_polling());
}

#[test]
fn test_toggle_partial_data_redelivers() {
    let mut harness = Harness::new(MockTransport::deferred(|_, _| Err(Error::transport("offline"))));
    let name_only = QueryDocument::query("ViewerName").field(Field::new("viewer").select([Field::new("name")]));
    harness
        .manager
        .write_query(&name_only, &Variables::new(), &json!({"viewer": {"name": "Ann"}}))
        .unwrap();

    let full = QueryDocument::query("Viewer")
        .field(Field::new("viewer").select([Field::new("name"), Field::new("email")]));
    let query = watch(&harness, WatchOptions::new(full));
    let recorder = Recorder::new();
    let _s = query.subscribe(recorder.observer());
    harness.transport.resolve_next();
    harness.settle();
    assert_eq!(recorder.last().unwrap().data, json!({}));

    query.set_options(OptionsPatch::new().return_partial_data(true)).unwrap();
    let last = recorder.last().unwrap();
    assert_eq!(last.data, json!({"viewer": {"name": "Ann"}}));
    assert!(last.has_errors());
}

#[test]
fn test_reentrant_variables_change_keeps_delivery_order() {
    let mut harness = Harness::new(MockTransport::new(user_handler(name_for)));
    harness
        .manager
        .write_query(&user_query(), &user_vars("1"), &user_data("1", "Ann"))
        .unwrap();
    harness
        .manager
        .write_query(&user_query(), &user_vars("2"), &user_data("2", "Bo"))
        .unwrap();
    let query = watch(&harness, WatchOptions::new(user_query()).variables(user_vars("1")));

    // The first subscriber switches the query to user 2 once it sees the rename
    let first = Recorder::new();
    let record = first.observer();
    let switcher = query.clone();
    let _a = query.subscribe(move |envelope: &ResultEnvelope| {
        record(envelope);
        if envelope.data["user"]["name"] == "Ann2" {
            drop(switcher.set_variables(user_vars("2")));
        }
    });
    let second = Recorder::new();
    let _b = query.subscribe(second.observer());

    harness
        .manager
        .write_query(&user_query(), &user_vars("1"), &user_data("1", "Ann2"))
        .unwrap();
    harness.settle();

    let expected = vec![
        ResultEnvelope::ready(user_data("1", "Ann")),
        ResultEnvelope::ready(user_data("1", "Ann2")),
        ResultEnvelope::ready(user_data("2", "Bo")),
    ];
    assert_eq!(first.all(), expected);
    assert_eq!(second.all(), expected);
    assert_eq!(query.current_result(), ResultEnvelope::ready(user_data("2", "Bo")));
    assert_eq!(harness.transport.calls(), 0);

    // Both subscribers keep following user 2
    harness
        .manager
        .write_query(&user_query(), &user_vars("2"), &user_data("2", "Bo2"))
        .unwrap();
    assert_eq!(first.last(), Some(ResultEnvelope::ready(user_data("2", "Bo2"))));
    assert_eq!(second.last(), Some(ResultEnvelope::ready(user_data("2", "Bo2"))));
}
