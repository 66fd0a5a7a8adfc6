//! Multi-step scenarios mixing versions, snapshots and transactions.

use serde_json::json;
use versionbase_core::{ContextKind, CoreError};
use versionbase_testkit::prelude::*;

fn base_graph() -> TestGraph {
    TestGraph::new()
        .with_version("A", &[])
        .with_version("B", &["A"])
}

#[test]
fn delete_against_concurrent_update_conflicts() {
    let mut graph = base_graph();
    let id = graph.create("B", "current", fields(&[("n", json!(0))]));

    let deleter = graph.begin("current");
    let updater = graph.begin("current");
    graph.delete(id.as_str(), "B", deleter.as_str());
    graph.update(id.as_str(), "B", updater.as_str(), fields(&[("n", json!(1))]));

    graph.commit(deleter.as_str()).unwrap();
    let err = graph.commit(updater.as_str()).unwrap_err();
    assert!(matches!(err, CoreError::UpdateDeleteConflict { .. }));
    assert!(graph.get_item(id.as_str(), "B", "current").unwrap().is_none());

    graph.rollback(updater.as_str());
    assert!(!graph.has_context(updater.as_str()));
}

#[test]
fn delete_survives_an_unrelated_commit() {
    let mut graph = base_graph();
    let doomed = graph.create("B", "current", fields(&[("n", json!(0))]));
    let other = graph.create("B", "current", fields(&[("n", json!(0))]));

    let deleter = graph.begin("current");
    let updater = graph.begin("current");
    graph.delete(doomed.as_str(), "B", deleter.as_str());
    graph.update(other.as_str(), "B", updater.as_str(), fields(&[("n", json!(5))]));

    graph.commit(updater.as_str()).unwrap();
    graph.commit(deleter.as_str()).unwrap();

    assert_eq!(graph.item_ids("B", "current"), vec![other.to_string()]);
    assert_eq!(graph.field(other.as_str(), "B", "current", "n"), Some(json!(5)));
}

#[test]
fn creating_the_same_id_twice_conflicts() {
    let mut graph = base_graph();
    let first = graph.begin("current");
    let second = graph.begin("current");
    graph.update("shared", "B", first.as_str(), fields(&[("by", json!("first"))]));
    graph.update("shared", "B", second.as_str(), fields(&[("by", json!("second"))]));

    graph.commit(first.as_str()).unwrap();
    let err = graph.commit(second.as_str()).unwrap_err();
    assert!(matches!(err, CoreError::ConcurrentCreationConflict { .. }));
    assert_eq!(graph.field("shared", "B", "current", "by"), Some(json!("first")));
}

#[test]
fn versions_created_on_both_sides_are_kept() {
    let mut graph = base_graph();
    let txn = graph.begin("current");
    graph.add_version("C", &["B"]);
    graph.add_version("D", &["B"]);
    graph
        .apply(|state| {
            let (next, _) = state.create_item("A", txn.as_str(), fields(&[("n", json!(1))]))?;
            Ok(next)
        })
        .unwrap();

    graph.commit(txn.as_str()).unwrap();
    for version in ["A", "B", "C", "D"] {
        assert!(graph.version_exists(version), "missing {version}");
    }
    assert_eq!(graph.item_ids("A", "current").len(), 1);
}

#[test]
fn snapshot_based_transaction_merges_into_current() {
    let mut graph = base_graph();
    let kept = graph.create("B", "current", fields(&[("n", json!(0))]));
    let snapshot = graph.snapshot("current");
    let late = graph.create("B", "current", fields(&[("n", json!(1))]));

    let txn = graph.begin(snapshot.as_str());
    graph.update(kept.as_str(), "B", txn.as_str(), fields(&[("n", json!(10))]));
    graph.commit(txn.as_str()).unwrap();

    assert_eq!(graph.field(kept.as_str(), "B", "current", "n"), Some(json!(10)));
    assert_eq!(graph.field(late.as_str(), "B", "current", "n"), Some(json!(1)));
    assert_eq!(graph.field(kept.as_str(), "B", snapshot.as_str(), "n"), Some(json!(0)));
}

#[test]
fn read_only_contexts_reject_writes() {
    let mut graph = base_graph();
    let snapshot = graph.snapshot("current");
    let err = graph
        .apply(|state| state.update_item("x", "B", snapshot.as_str(), fields(&[])))
        .unwrap_err();
    assert!(matches!(
        err,
        CoreError::ReadOnlyContext { kind: ContextKind::Snapshot, .. }
    ));

    let txn = graph.begin("current");
    let shadow = graph
        .context_ids(ContextKind::Shadow)
        .next()
        .map(str::to_owned)
        .unwrap();
    assert!(shadow.ends_with(txn.as_str()));
    let err = graph
        .apply(|state| state.update_item("x", "B", &shadow, fields(&[])))
        .unwrap_err();
    assert!(matches!(
        err,
        CoreError::ReadOnlyContext { kind: ContextKind::Shadow, .. }
    ));
}

#[test]
fn set_all_shares_the_source_items() {
    let mut graph = base_graph().with_version("C", &["A"]);
    graph.create("B", "current", fields(&[("n", json!(1))]));
    graph.create("B", "current", fields(&[("n", json!(2))]));

    graph
        .apply(|state| state.set_all_version_items("current", "current", "B", "C"))
        .unwrap();
    let b = graph.version("current", "B").unwrap();
    let c = graph.version("current", "C").unwrap();
    assert!(b.items().ptr_eq(c.items()));
    assert_eq!(graph.item_ids("C", "current").len(), 2);
}

#[test]
fn copy_without_replace_refuses_existing_items() {
    let mut graph = base_graph().with_version("C", &["B"]);
    let id = graph.create("B", "current", fields(&[("n", json!(1))]));
    graph
        .apply(|state| state.copy_version_items("current", "current", "B", "C", &[id.as_str()], false))
        .unwrap();

    let err = graph
        .apply(|state| state.copy_version_items("current", "current", "B", "C", &[id.as_str()], false))
        .unwrap_err();
    assert!(matches!(err, CoreError::ItemAlreadyExists { .. }));

    graph.update(id.as_str(), "B", "current", fields(&[("n", json!(2))]));
    graph
        .apply(|state| state.copy_version_items("current", "current", "B", "C", &[id.as_str()], true))
        .unwrap();
    assert_eq!(graph.field(id.as_str(), "C", "current", "n"), Some(json!(2)));
}
