//! Tests for the in-memory `FeedController`.

use std::sync::{Arc, Mutex};

use live_replica::feed::{ChangeFeed, FeedController};
use live_replica::{FeedError, FeedErrorKind};

fn subscribe_logging(
    feed: &FeedController<u32>,
    log: &Arc<Mutex<Vec<String>>>,
    name: &'static str,
) -> live_replica::feed::Unsubscribe {
    let next_log = Arc::clone(log);
    let err_log = Arc::clone(log);
    feed.subscribe(
        Arc::new(move |n: u32| next_log.lock().unwrap().push(format!("{name}:{n}"))),
        Arc::new(move |e: FeedError| {
            err_log.lock().unwrap().push(format!("{name}:err:{}", e.message))
        }),
    )
}

#[test]
fn push_reaches_current_subscribers() {
    let feed = FeedController::new();
    let log = Arc::new(Mutex::new(Vec::new()));
    let _a = subscribe_logging(&feed, &log, "a");
    let _b = subscribe_logging(&feed, &log, "b");

    assert_eq!(feed.push(5), 2);
    assert_eq!(*log.lock().unwrap(), vec!["a:5", "b:5"]);
}

#[test]
fn unsubscribe_detaches_only_that_subscriber() {
    let feed = FeedController::new();
    let log = Arc::new(Mutex::new(Vec::new()));
    let a = subscribe_logging(&feed, &log, "a");
    let _b = subscribe_logging(&feed, &log, "b");

    a();
    feed.push(1);
    assert_eq!(*log.lock().unwrap(), vec!["b:1"]);
    assert_eq!(feed.subscriber_count(), 1);
    assert_eq!(feed.total_subscriptions(), 2);
}

#[test]
fn initial_item_is_delivered_inside_subscribe() {
    let feed = FeedController::new().with_initial(9);
    let log = Arc::new(Mutex::new(Vec::new()));
    let _a = subscribe_logging(&feed, &log, "a");
    assert_eq!(*log.lock().unwrap(), vec!["a:9"]);
}

#[test]
fn fail_reports_to_error_listeners() {
    let feed = FeedController::new();
    let log = Arc::new(Mutex::new(Vec::new()));
    let _a = subscribe_logging(&feed, &log, "a");

    let delivered = feed.fail(FeedError::with_kind("down", FeedErrorKind::Unavailable));
    assert_eq!(delivered, 1);
    assert_eq!(*log.lock().unwrap(), vec!["a:err:down"]);
}

#[test]
fn captured_listener_outlives_its_subscription() {
    let feed = FeedController::new();
    let log = Arc::new(Mutex::new(Vec::new()));
    let a = subscribe_logging(&feed, &log, "a");

    let captured = feed.listeners();
    a();
    assert_eq!(feed.push(2), 0);
    captured[0](3);
    assert_eq!(*log.lock().unwrap(), vec!["a:3"]);
}
