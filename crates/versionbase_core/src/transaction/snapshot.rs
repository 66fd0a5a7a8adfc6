//! Read-only snapshots.

use crate::context::ContextKind;
use crate::error::{CoreError, CoreResult};
use crate::state::GraphState;
use crate::types::ContextId;
use tracing::debug;

impl GraphState {
    /// Creates a read-only alias of `context_id` under a fresh id.
    ///
    /// # Errors
    ///
    /// `InvalidTransaction` if the context does not exist.
    pub fn create_snapshot(&self, context_id: &str) -> CoreResult<(GraphState, ContextId)> {
        let snapshot = self.resolve(context_id)?.alias(ContextKind::Snapshot);
        let snapshot_id = ContextId::generate();

        let mut next = self.clone();
        next.insert_context(snapshot_id.clone(), snapshot);
        debug!(snapshot = %snapshot_id, base = context_id, "created snapshot");
        Ok((next, snapshot_id))
    }

    /// Deletes a snapshot. Deleting one that no longer exists is a no-op.
    ///
    /// # Errors
    ///
    /// `ReadOnlyContext` if the id names a context that is not a snapshot.
    pub fn delete_snapshot(&self, snapshot_id: &str) -> CoreResult<GraphState> {
        let Some(context) = self.context(snapshot_id) else {
            return Ok(self.clone());
        };
        if context.kind() != ContextKind::Snapshot {
            return Err(CoreError::ReadOnlyContext {
                context_id: snapshot_id.to_owned(),
                kind: context.kind(),
            });
        }

        let mut next = self.clone();
        next.remove_context(snapshot_id);
        debug!(snapshot = snapshot_id, "deleted snapshot");
        Ok(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Map, Value};

    fn fields(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn snapshot_is_isolated_from_later_writes() {
        let state = GraphState::new()
            .create_version("A", None, &[])
            .unwrap();
        let (state, id) = state
            .create_item("A", "current", fields(json!({"n": 1})))
            .unwrap();
        let (state, snapshot) = state.create_snapshot("current").unwrap();

        let state = state
            .update_item(id.as_str(), "A", "current", fields(json!({"n": 2})))
            .unwrap();
        let state = state.create_version("B", None, &["A"]).unwrap();

        let seen = state.get_item(id.as_str(), "A", snapshot.as_str()).unwrap().unwrap();
        assert_eq!(seen.get("n"), Some(json!(1)));
        assert!(state.get_item(id.as_str(), "B", snapshot.as_str()).is_err());
    }

    #[test]
    fn deleting_a_snapshot_leaves_current_alone() {
        let state = GraphState::new().create_version("A", None, &[]).unwrap();
        let (state, snapshot) = state.create_snapshot("current").unwrap();
        let before = state.current().clone();

        let state = state.delete_snapshot(snapshot.as_str()).unwrap();
        assert!(state.current().same_versions(&before));
        assert!(!state.has_context(snapshot.as_str()));

        // already gone
        assert!(state.delete_snapshot(snapshot.as_str()).is_ok());
    }

    #[test]
    fn snapshot_of_a_transaction() {
        let state = GraphState::new().create_version("A", None, &[]).unwrap();
        let (state, txn) = state.begin_transaction("current").unwrap();
        let (state, id) = state.create_item("A", txn.as_str(), Map::new()).unwrap();
        let (state, snapshot) = state.create_snapshot(txn.as_str()).unwrap();
        assert!(state.get_item(id.as_str(), "A", snapshot.as_str()).unwrap().is_some());

        let err = state.delete_snapshot(txn.as_str()).unwrap_err();
        assert!(matches!(
            err,
            CoreError::ReadOnlyContext {
                kind: ContextKind::Transaction,
                ..
            }
        ));
    }

    #[test]
    fn snapshot_of_missing_context_fails() {
        let err = GraphState::new().create_snapshot("nope").unwrap_err();
        assert_eq!(err, CoreError::invalid_transaction("nope"));
    }
}
