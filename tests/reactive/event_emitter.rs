//! Tests for `EventEmitter<T>`.

use live_replica::reactive::EventEmitter;
use std::sync::{Arc, Mutex};

fn make_log() -> Arc<Mutex<Vec<String>>> {
    Arc::new(Mutex::new(Vec::new()))
}

#[test]
fn emit_reaches_listeners_in_registration_order() {
    let emitter: EventEmitter<i32> = EventEmitter::new();
    let log = make_log();
    for name in ["a", "b", "c"] {
        let log = Arc::clone(&log);
        emitter.on(move |e| log.lock().unwrap().push(format!("{name}:{e}")));
    }

    assert_eq!(emitter.emit(&7), 3);
    assert_eq!(*log.lock().unwrap(), vec!["a:7", "b:7", "c:7"]);
}

#[test]
fn off_removes_only_that_listener_and_is_repeatable() {
    let emitter: EventEmitter<i32> = EventEmitter::new();
    let log = make_log();
    let l1 = Arc::clone(&log);
    let l2 = Arc::clone(&log);
    let first = emitter.on(move |e| l1.lock().unwrap().push(format!("first:{e}")));
    emitter.on(move |e| l2.lock().unwrap().push(format!("second:{e}")));

    emitter.off(first);
    emitter.off(first);
    emitter.emit(&1);

    assert_eq!(*log.lock().unwrap(), vec!["second:1"]);
    assert_eq!(emitter.len(), 1);
}

#[test]
fn listener_added_during_emit_waits_for_next_round() {
    let emitter = Arc::new(EventEmitter::<i32>::new());
    let log = make_log();

    let em = Arc::clone(&emitter);
    let outer_log = Arc::clone(&log);
    emitter.on(move |e| {
        outer_log.lock().unwrap().push(format!("outer:{e}"));
        if *e == 1 {
            let inner_log = Arc::clone(&outer_log);
            em.on(move |e| inner_log.lock().unwrap().push(format!("inner:{e}")));
        }
    });

    emitter.emit(&1);
    emitter.emit(&2);

    assert_eq!(*log.lock().unwrap(), vec!["outer:1", "outer:2", "inner:2"]);
}

#[test]
fn panicking_listener_does_not_block_others() {
    let emitter: EventEmitter<i32> = EventEmitter::new();
    let log = make_log();
    emitter.on(|_| panic!("listener failure"));
    let l = Arc::clone(&log);
    emitter.on(move |e| l.lock().unwrap().push(format!("ok:{e}")));

    emitter.emit(&3);

    assert_eq!(*log.lock().unwrap(), vec!["ok:3"]);
}

#[test]
fn clear_removes_everything() {
    let emitter: EventEmitter<()> = EventEmitter::new();
    emitter.on(|_| {});
    emitter.on(|_| {});
    emitter.clear();
    assert!(emitter.is_empty());
    assert_eq!(emitter.emit(&()), 0);
}
