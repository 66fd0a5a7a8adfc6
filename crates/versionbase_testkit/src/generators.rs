//! Property-based test generators using proptest.
//!
//! Provides strategies for version histories, item payloads and edit
//! sequences, plus the helpers that replay them against a [`TestGraph`].

use crate::fixtures::TestGraph;
use proptest::prelude::*;
use proptest::sample::Index;
use serde_json::{Map, Value};
use versionbase_core::ItemId;

/// A version to create and the parents it is declared with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionSpec {
    /// Commit id.
    pub id: String,
    /// Parent commit ids, data parent first.
    pub parents: Vec<String>,
}

/// Strategy for version histories of up to `max_versions` versions.
///
/// Versions are listed parents first. Every version after the first picks
/// one or two earlier parents, occasionally none (an extra root).
pub fn version_dag_strategy(max_versions: usize) -> impl Strategy<Value = Vec<VersionSpec>> {
    prop::collection::vec(
        (
            prop::option::weighted(0.9, any::<Index>()),
            prop::option::weighted(0.3, any::<Index>()),
        ),
        1..=max_versions.max(1),
    )
    .prop_map(|choices| {
        choices
            .into_iter()
            .enumerate()
            .map(|(position, (first, second))| {
                let mut parents: Vec<usize> = Vec::new();
                if position > 0 {
                    if let Some(first) = first {
                        parents.push(first.index(position));
                        if let Some(second) = second.map(|s| s.index(position)) {
                            if second != parents[0] {
                                parents.push(second);
                            }
                        }
                    }
                }
                VersionSpec {
                    id: format!("v{position}"),
                    parents: parents.into_iter().map(|p| format!("v{p}")).collect(),
                }
            })
            .collect()
    })
}

/// Creates every version of `history` in `graph`.
pub fn build_history(graph: &mut TestGraph, history: &[VersionSpec]) {
    for spec in history {
        let parents: Vec<&str> = spec.parents.iter().map(String::as_str).collect();
        graph.add_version(&spec.id, &parents);
    }
}

/// Strategy for a single field value.
pub fn field_value_strategy() -> impl Strategy<Value = Value> {
    prop_oneof![
        any::<i64>().prop_map(Value::from),
        any::<bool>().prop_map(Value::from),
        "[a-zA-Z0-9 ]{0,16}".prop_map(Value::from),
        Just(Value::Null),
    ]
}

/// Strategy for item payloads.
///
/// Keys never collide with the `id` and `version` stamps.
pub fn payload_strategy() -> impl Strategy<Value = Map<String, Value>> {
    prop::collection::btree_map("[a-z]{1,8}", field_value_strategy(), 0..5).prop_map(|fields| {
        fields
            .into_iter()
            .filter(|(key, _)| key != "id" && key != "version")
            .collect()
    })
}

/// One item mutation.
#[derive(Debug, Clone)]
pub enum Edit {
    /// Create a new item.
    Create(Map<String, Value>),
    /// Overwrite an existing item, chosen by position.
    Update(Index, Map<String, Value>),
    /// Delete an existing item, chosen by position.
    Delete(Index),
}

/// Strategy for a single edit.
pub fn edit_strategy() -> impl Strategy<Value = Edit> {
    prop_oneof![
        3 => payload_strategy().prop_map(Edit::Create),
        3 => (any::<Index>(), payload_strategy()).prop_map(|(slot, data)| Edit::Update(slot, data)),
        1 => any::<Index>().prop_map(Edit::Delete),
    ]
}

/// Strategy for edit sequences of up to `max_edits` edits.
pub fn edits_strategy(max_edits: usize) -> impl Strategy<Value = Vec<Edit>> {
    prop::collection::vec(edit_strategy(), 0..=max_edits)
}

/// Replays `edits` against one version of one context.
///
/// `live` holds the ids the edits may pick from; creates are appended and
/// deletes removed. Updates and deletes with no live items are skipped.
pub fn apply_edits(
    graph: &mut TestGraph,
    version_id: &str,
    context_id: &str,
    live: &mut Vec<ItemId>,
    edits: &[Edit],
) {
    for edit in edits {
        match edit {
            Edit::Create(data) => {
                let item_id = graph.create(version_id, context_id, data.clone());
                live.push(item_id);
            }
            Edit::Update(slot, data) if !live.is_empty() => {
                let item_id = &live[slot.index(live.len())];
                graph.update(item_id.as_str(), version_id, context_id, data.clone());
            }
            Edit::Delete(slot) if !live.is_empty() => {
                let item_id = live.remove(slot.index(live.len()));
                graph.delete(item_id.as_str(), version_id, context_id);
            }
            Edit::Update(..) | Edit::Delete(_) => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::strategy::ValueTree;
    use proptest::test_runner::TestRunner;

    #[test]
    fn test_version_dag_parents_precede_children() {
        let mut runner = TestRunner::default();
        for _ in 0..32 {
            let history = version_dag_strategy(12)
                .new_tree(&mut runner)
                .unwrap()
                .current();
            assert!(history[0].parents.is_empty());
            for (position, spec) in history.iter().enumerate() {
                assert!(spec.parents.len() <= 2);
                for parent in &spec.parents {
                    let parent: usize = parent[1..].parse().unwrap();
                    assert!(parent < position);
                }
            }
        }
    }

    #[test]
    fn test_payload_avoids_stamps() {
        let mut runner = TestRunner::default();
        for _ in 0..32 {
            let payload = payload_strategy().new_tree(&mut runner).unwrap().current();
            assert!(!payload.contains_key("id"));
            assert!(!payload.contains_key("version"));
        }
    }
}
