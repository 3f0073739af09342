use live_replica::replica::OrderedReplica;
use live_replica::types::CanonicalRecord;
use live_replica::ReplicaError;
use serde_json::{json, Map};

fn rec(id: &str) -> CanonicalRecord {
    let mut fields = Map::new();
    fields.insert("id".to_string(), json!(id));
    CanonicalRecord {
        id: id.to_string(),
        fields,
    }
}

fn replica_of(ids: &[&str]) -> OrderedReplica {
    let mut r = OrderedReplica::new();
    for (i, id) in ids.iter().enumerate() {
        r.insert_at(i, rec(id)).expect("insert");
    }
    r
}

#[test]
fn insert_at_end_and_front() {
    let mut r = replica_of(&["a"]);
    r.insert_at(1, rec("b")).unwrap();
    r.insert_at(0, rec("z")).unwrap();
    assert_eq!(r.ids(), vec!["z", "a", "b"]);
}

#[test]
fn insert_past_end_is_out_of_range() {
    let mut r = replica_of(&["a"]);
    let err = r.insert_at(2, rec("b")).unwrap_err();
    assert!(matches!(err, ReplicaError::IndexOutOfRange { index: 2, len: 1 }));
    assert_eq!(r.len(), 1, "failed insert must not resize");
}

#[test]
fn remove_returns_record() {
    let mut r = replica_of(&["a", "b", "c"]);
    let removed = r.remove_at(1).unwrap();
    assert_eq!(removed.id, "b");
    assert_eq!(r.ids(), vec!["a", "c"]);
}

#[test]
fn remove_at_len_is_out_of_range() {
    let mut r = replica_of(&["a", "b"]);
    assert!(matches!(
        r.remove_at(2),
        Err(ReplicaError::IndexOutOfRange { index: 2, len: 2 })
    ));
    let mut empty = OrderedReplica::new();
    assert!(empty.remove_at(0).is_err());
}

#[test]
fn replace_keeps_length_and_position() {
    let mut r = replica_of(&["a", "b"]);
    let old = r.replace_at(0, rec("a2")).unwrap();
    assert_eq!(old.id, "a");
    assert_eq!(r.ids(), vec!["a2", "b"]);
    assert!(r.replace_at(2, rec("x")).is_err());
}

#[test]
fn snapshot_is_detached_copy() {
    let mut r = replica_of(&["a"]);
    let snap = r.snapshot();
    r.insert_at(1, rec("b")).unwrap();
    assert_eq!(snap.len(), 1);
    assert_eq!(r.len(), 2);
    assert_eq!(r.get(1).map(|x| x.id.as_str()), Some("b"));
}
