//! Declarative bindings mounted at host creation.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use live_replica::binding::{BinderOptions, Declarations, SubscriptionManager};
use live_replica::feed::FeedController;
use live_replica::reactive::MemoryHost;
use live_replica::types::{ChangeBatch, ChangeEvent, RawDocument};
use live_replica::BindError;
use serde_json::json;

fn setup() -> (Arc<MemoryHost>, SubscriptionManager) {
    let host = Arc::new(MemoryHost::new());
    let mgr = SubscriptionManager::new(host.clone(), BinderOptions::default());
    (host, mgr)
}

#[tokio::test]
async fn mount_binds_every_declared_key() {
    let (host, mgr) = setup();
    let todos: FeedController<ChangeBatch> = FeedController::new();
    let settings: FeedController<RawDocument> = FeedController::new();

    let results = mgr.mount(Declarations::map([
        ("todos", todos.as_collection()),
        ("settings", settings.as_document()),
    ]));
    assert_eq!(results.len(), 2);
    assert_eq!(mgr.keys(), vec!["settings".to_string(), "todos".to_string()]);
    assert!(host.contains("todos") && host.contains("settings"));

    let first = RawDocument::new("t1", json!({ "done": false }));
    todos.push(vec![ChangeEvent::added(first, 0)].into());
    settings.push(RawDocument::new("s", json!({ "theme": "dark" })));

    for (key, result) in results {
        let value = result.expect("bound").await.expect("resolved");
        match key.as_str() {
            "todos" => assert_eq!(value.as_collection().unwrap().ids(), vec!["t1"]),
            "settings" => assert_eq!(
                value.as_document().unwrap().get("theme"),
                Some(&json!("dark"))
            ),
            other => panic!("unexpected key {other}"),
        }
    }
}

#[test]
fn factory_runs_once_at_mount() {
    let (_host, mgr) = setup();
    let calls = Arc::new(AtomicUsize::new(0));
    let calls_clone = Arc::clone(&calls);
    let feed: FeedController<ChangeBatch> = FeedController::new();
    let feed_clone = feed.clone();

    let declarations = Declarations::factory(move || {
        calls_clone.fetch_add(1, Ordering::SeqCst);
        vec![("items".to_string(), feed_clone.as_collection())]
    });
    assert_eq!(calls.load(Ordering::SeqCst), 0, "not evaluated before mount");

    let results = mgr.mount(declarations);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert!(results[0].1.is_ok());
    assert_eq!(feed.subscriber_count(), 1);
}

#[test]
fn duplicate_declaration_does_not_stop_others() {
    let (_host, mgr) = setup();
    let a: FeedController<ChangeBatch> = FeedController::new();
    let b: FeedController<ChangeBatch> = FeedController::new();
    let c: FeedController<ChangeBatch> = FeedController::new();

    let results = mgr.mount(Declarations::map([
        ("list", a.as_collection()),
        ("list", b.as_collection()),
        ("other", c.as_collection()),
    ]));

    assert!(results[0].1.is_ok());
    assert!(matches!(results[1].1, Err(BindError::DuplicateBinding(_))));
    assert!(results[2].1.is_ok());
    assert_eq!(b.total_subscriptions(), 0);
    assert_eq!(mgr.len(), 2);
}

#[test]
fn teardown_after_mount_releases_everything() {
    let (host, mgr) = setup();
    let feed: FeedController<ChangeBatch> = FeedController::new();
    let _results = mgr.mount(Declarations::map([
        ("a", feed.as_collection()),
        ("b", feed.as_collection()),
    ]));
    assert_eq!(feed.subscriber_count(), 2);

    mgr.teardown_all();
    assert_eq!(feed.subscriber_count(), 0);
    assert_eq!(host.released().len(), 2);
}
