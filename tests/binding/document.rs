//! Single-document bindings: whole-value replacement on every snapshot.

use std::sync::{Arc, Mutex};

use live_replica::binding::{BinderOptions, BindingPhase, BoundValue, SubscriptionManager};
use live_replica::feed::FeedController;
use live_replica::reactive::{BindingEvent, MemoryHost};
use live_replica::types::RawDocument;
use live_replica::{BindError, FeedError, FeedErrorKind};
use serde_json::json;

fn setup() -> (Arc<MemoryHost>, SubscriptionManager) {
    let host = Arc::new(MemoryHost::new());
    let options = BinderOptions::default().with_id_field(".key");
    let mgr = SubscriptionManager::new(host.clone(), options);
    (host, mgr)
}

#[tokio::test]
async fn document_resolves_with_normalized_snapshot() {
    let (host, mgr) = setup();
    let feed: FeedController<RawDocument> = FeedController::new();
    let pending = mgr.bind("profile", feed.as_document()).unwrap();
    assert!(matches!(host.get("profile"), Some(BoundValue::Pending)));

    feed.push(RawDocument::new("u1", json!({ "name": "Alice" })));
    let value = pending.await.unwrap();
    let record = value.as_document().expect("document");
    assert_eq!(record.id, "u1");
    assert_eq!(record.to_value(), json!({ "name": "Alice", ".key": "u1" }));
    assert_eq!(mgr.phase("profile"), Some(BindingPhase::Active));
}

#[tokio::test]
async fn each_snapshot_replaces_the_bound_value() {
    let (host, mgr) = setup();
    let feed: FeedController<RawDocument> = FeedController::new();
    let pending = mgr.bind("profile", feed.as_document()).unwrap();
    feed.push(RawDocument::new("u1", json!({ "name": "Alice", "age": 30 })));
    let first = pending.await.unwrap();

    feed.push(RawDocument::new("u1", json!({ "name": "Alicia" })));

    let current = host.get("profile").unwrap();
    let record = current.as_document().unwrap();
    assert_eq!(record.get("name"), Some(&json!("Alicia")));
    assert!(record.get("age").is_none(), "no merge with the previous snapshot");
    assert_eq!(first.as_document().unwrap().get("name"), Some(&json!("Alice")));
}

#[tokio::test]
async fn missing_document_rejects_and_clears_key() {
    let (host, mgr) = setup();
    let feed: FeedController<RawDocument> = FeedController::new();
    let pending = mgr.bind("profile", feed.as_document()).unwrap();

    feed.push(RawDocument::missing("u404"));

    let err = pending.await.unwrap_err();
    assert!(matches!(err, BindError::DocumentNotFound(ref key) if key == "profile"));
    assert!(!mgr.is_bound("profile"));
    assert_eq!(feed.subscriber_count(), 0);
    assert_eq!(host.released(), vec!["profile".to_string()]);
}

#[tokio::test]
async fn permission_denied_rejects_bind() {
    let (_host, mgr) = setup();
    let feed: FeedController<RawDocument> = FeedController::new();
    let pending = mgr.bind("secret", feed.as_document()).unwrap();

    feed.fail(FeedError::with_kind(
        "missing or insufficient permissions",
        FeedErrorKind::PermissionDenied,
    ));

    match pending.await {
        Err(BindError::PermissionDenied { key, message }) => {
            assert_eq!(key, "secret");
            assert!(message.contains("permissions"));
        }
        other => panic!("unexpected: {other:?}"),
    }
    assert!(!mgr.is_bound("secret"));
}

#[tokio::test]
async fn later_deletion_is_reported_and_last_value_kept() {
    let (host, mgr) = setup();
    let errors = Arc::new(Mutex::new(Vec::new()));
    let errors_clone = Arc::clone(&errors);
    let _unsub = mgr.on_event(move |e| {
        if let BindingEvent::Error { error, initial, .. } = e {
            errors_clone.lock().unwrap().push((error.clone(), *initial));
        }
    });

    let feed: FeedController<RawDocument> = FeedController::new();
    let pending = mgr.bind("profile", feed.as_document()).unwrap();
    feed.push(RawDocument::new("u1", json!({ "name": "Alice" })));
    pending.await.unwrap();

    feed.push(RawDocument::missing("u1"));

    assert!(mgr.is_bound("profile"));
    let kept = host.get("profile").unwrap();
    assert_eq!(kept.as_document().unwrap().get("name"), Some(&json!("Alice")));

    let errors = errors.lock().unwrap();
    assert_eq!(errors.len(), 1);
    assert!(matches!(errors[0], (BindError::DocumentNotFound(_), false)));
}

#[tokio::test]
async fn malformed_first_snapshot_rejects_with_replica_error() {
    let (_host, mgr) = setup();
    let feed: FeedController<RawDocument> = FeedController::new();
    let pending = mgr.bind("profile", feed.as_document()).unwrap();

    feed.push(RawDocument::new("u1", json!("not an object")));

    let err = pending.await.unwrap_err();
    assert!(matches!(err, BindError::Replica { .. }));
    assert!(!mgr.is_bound("profile"));
}
