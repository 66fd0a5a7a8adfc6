//! Test fixtures and graph helpers.
//!
//! The engine hands back a fresh state from every call. [`TestGraph`] keeps
//! the latest one so tests can read like a sequence of commands.

use serde_json::{Map, Value};
use versionbase_core::{ContextId, CoreResult, GraphState, ItemId};

/// A graph state that is replaced by the result of each successful call.
///
/// Helpers panic on engine errors; use [`TestGraph::apply`] when the error is
/// the thing under test.
#[derive(Debug, Clone, Default)]
pub struct TestGraph {
    /// The latest state.
    pub state: GraphState,
}

impl TestGraph {
    /// Creates an empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder form of [`add_version`](Self::add_version).
    pub fn with_version(mut self, commit_id: &str, parents: &[&str]) -> Self {
        self.add_version(commit_id, parents);
        self
    }

    /// Creates a version in `current` whose data parent is its first parent.
    pub fn add_version(&mut self, commit_id: &str, parents: &[&str]) {
        self.state = self
            .state
            .create_version(commit_id, None, parents)
            .expect("Failed to create version");
    }

    /// Runs `op` against the latest state, keeping its result on success.
    ///
    /// On failure the state is left as it was.
    pub fn apply<F>(&mut self, op: F) -> CoreResult<()>
    where
        F: FnOnce(&GraphState) -> CoreResult<GraphState>,
    {
        self.state = op(&self.state)?;
        Ok(())
    }

    /// Creates an item and returns its id.
    pub fn create(&mut self, version_id: &str, context_id: &str, data: Map<String, Value>) -> ItemId {
        let (state, item_id) = self
            .state
            .create_item(version_id, context_id, data)
            .expect("Failed to create item");
        self.state = state;
        item_id
    }

    /// Stores `data` under `item_id`.
    pub fn update(&mut self, item_id: &str, version_id: &str, context_id: &str, data: Map<String, Value>) {
        self.state = self
            .state
            .update_item(item_id, version_id, context_id, data)
            .expect("Failed to update item");
    }

    /// Removes `item_id`.
    pub fn delete(&mut self, item_id: &str, version_id: &str, context_id: &str) {
        self.state = self
            .state
            .delete_item(item_id, version_id, context_id)
            .expect("Failed to delete item");
    }

    /// Opens a transaction on `base_context_id`.
    pub fn begin(&mut self, base_context_id: &str) -> ContextId {
        let (state, transaction_id) = self
            .state
            .begin_transaction(base_context_id)
            .expect("Failed to begin transaction");
        self.state = state;
        transaction_id
    }

    /// Commits a transaction. The state is kept on failure.
    pub fn commit(&mut self, transaction_id: &str) -> CoreResult<()> {
        self.apply(|state| state.commit_transaction(transaction_id))
    }

    /// Rolls back a transaction.
    pub fn rollback(&mut self, transaction_id: &str) {
        self.state = self
            .state
            .rollback_transaction(transaction_id)
            .expect("Failed to roll back transaction");
    }

    /// Snapshots `context_id`.
    pub fn snapshot(&mut self, context_id: &str) -> ContextId {
        let (state, snapshot_id) = self
            .state
            .create_snapshot(context_id)
            .expect("Failed to create snapshot");
        self.state = state;
        snapshot_id
    }

    /// Reads one field of an item, `None` if the item or field is absent.
    pub fn field(&self, item_id: &str, version_id: &str, context_id: &str, field: &str) -> Option<Value> {
        self.state
            .get_item(item_id, version_id, context_id)
            .expect("Failed to read item")
            .and_then(|item| item.get(field))
    }

    /// Returns the ids of every item in a version, in insertion order.
    pub fn item_ids(&self, version_id: &str, context_id: &str) -> Vec<String> {
        self.state
            .version(context_id, version_id)
            .expect("Failed to resolve version")
            .items()
            .ids()
            .map(|id| id.to_string())
            .collect()
    }
}

impl std::ops::Deref for TestGraph {
    type Target = GraphState;

    fn deref(&self) -> &Self::Target {
        &self.state
    }
}

/// Builds an item payload from field/value pairs.
pub fn fields(pairs: &[(&str, Value)]) -> Map<String, Value> {
    pairs
        .iter()
        .map(|(key, value)| ((*key).to_owned(), value.clone()))
        .collect()
}

/// Builds a graph holding a linear history `v0 <- v1 <- ... <- v{len-1}`.
pub fn linear_history(len: usize) -> TestGraph {
    let mut graph = TestGraph::new();
    for index in 0..len {
        let commit_id = format!("v{index}");
        if index == 0 {
            graph.add_version(&commit_id, &[]);
        } else {
            let parent = format!("v{}", index - 1);
            graph.add_version(&commit_id, &[parent.as_str()]);
        }
    }
    graph
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_linear_history() {
        let graph = linear_history(3);
        let v2 = graph.version("current", "v2").unwrap();
        assert_eq!(v2.ancestor_ids().len(), 2);
    }

    #[test]
    fn test_failed_apply_keeps_state() {
        let mut graph = TestGraph::new().with_version("A", &[]);
        let err = graph
            .apply(|state| state.delete_item("missing", "A", "current"))
            .unwrap_err();
        assert!(err.is_not_found());
        assert!(graph.version_exists("A"));
    }

    #[test]
    fn test_field_reads_stamps() {
        let mut graph = TestGraph::new().with_version("A", &[]);
        let id = graph.create("A", "current", fields(&[("n", json!(1))]));
        assert_eq!(graph.field(id.as_str(), "A", "current", "version"), Some(json!("A")));
        assert_eq!(graph.field(id.as_str(), "A", "current", "n"), Some(json!(1)));
        assert_eq!(graph.field(id.as_str(), "A", "current", "missing"), None);
    }
}
