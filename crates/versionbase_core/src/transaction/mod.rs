//! Transactions: working copies reconciled into `current` at commit.
//!
//! `begin` aliases a base context twice: once as the writable working copy
//! under the new transaction id and once as the frozen shadow under
//! `original-<id>`. `commit` merges the working copy into `current` using the
//! shadow as the common ancestor.

mod snapshot;

use crate::context::{Context, ContextKind};
use crate::error::{CoreError, CoreResult};
use crate::merge::merge_contexts;
use crate::state::GraphState;
use crate::types::ContextId;
use tracing::debug;

impl GraphState {
    /// Opens a transaction on top of `base_context_id`.
    ///
    /// Returns the new state and the transaction id.
    ///
    /// # Errors
    ///
    /// `InvalidTransaction` if the base context does not exist or is a shadow.
    pub fn begin_transaction(&self, base_context_id: &str) -> CoreResult<(GraphState, ContextId)> {
        let base = self.resolve(base_context_id)?;
        if base.kind() == ContextKind::Shadow {
            return Err(CoreError::invalid_transaction(base_context_id));
        }

        let transaction_id = ContextId::generate();
        let working = base.alias(ContextKind::Transaction);
        let shadow = base.alias(ContextKind::Shadow);

        let mut next = self.clone();
        next.insert_context(ContextId::shadow_of(transaction_id.as_str()), shadow);
        next.insert_context(transaction_id.clone(), working);

        debug!(transaction = %transaction_id, base = base_context_id, "began transaction");
        Ok((next, transaction_id))
    }

    /// Discards a transaction and its shadow.
    ///
    /// Rolling back a transaction that no longer exists is a no-op.
    ///
    /// # Errors
    ///
    /// `ReadOnlyContext` if `transaction_id` names a context that is not a
    /// transaction.
    pub fn rollback_transaction(&self, transaction_id: &str) -> CoreResult<GraphState> {
        let Some(context) = self.context(transaction_id) else {
            debug!(transaction = transaction_id, "rollback of unknown transaction ignored");
            return Ok(self.clone());
        };
        ensure_transaction(transaction_id, context)?;

        let mut next = self.clone();
        next.remove_context(transaction_id);
        next.remove_context(ContextId::shadow_of(transaction_id).as_str());
        debug!(transaction = transaction_id, "rolled back transaction");
        Ok(next)
    }

    /// Commits a transaction into `current`.
    ///
    /// If nothing was committed since the transaction began, the working copy
    /// becomes `current` as is. Otherwise every version the transaction holds
    /// is three-way merged against its shadow. On failure the transaction stays
    /// open and `current` is untouched.
    ///
    /// # Errors
    ///
    /// `InvalidTransaction` for an unknown id, `ReadOnlyContext` if the id
    /// names a context that is not a transaction, or any merge conflict.
    pub fn commit_transaction(&self, transaction_id: &str) -> CoreResult<GraphState> {
        let completed = self.resolve(transaction_id)?;
        ensure_transaction(transaction_id, completed)?;

        let shadow_id = ContextId::shadow_of(transaction_id);
        let original = self.context(shadow_id.as_str()).ok_or_else(|| {
            CoreError::invariant_violation(format!(
                "transaction {transaction_id:?} has no shadow context"
            ))
        })?;

        let mut next = self.clone();
        if original.same_versions(self.current()) {
            debug!(transaction = transaction_id, "commit without interleaving, installing working copy");
            next.replace_current(completed.clone());
        } else {
            let merged = merge_contexts(original, self.current(), completed)
                .map_err(|err| err.in_transaction(transaction_id))?;
            debug!(
                transaction = transaction_id,
                versions = merged.len(),
                "commit merged into current"
            );
            next.replace_current(Context::from_versions(ContextKind::Current, merged));
        }

        next.remove_context(transaction_id);
        next.remove_context(shadow_id.as_str());
        Ok(next)
    }
}

fn ensure_transaction(context_id: &str, context: &Context) -> CoreResult<()> {
    if context.kind() == ContextKind::Transaction {
        Ok(())
    } else {
        Err(CoreError::ReadOnlyContext {
            context_id: context_id.to_owned(),
            kind: context.kind(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Map, Value};

    fn fields(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    fn state() -> GraphState {
        GraphState::new()
            .create_version("A", None, &[])
            .unwrap()
            .create_version("B", None, &["A"])
            .unwrap()
    }

    fn n(state: &GraphState, item_id: &str, context: &str) -> Option<Value> {
        state
            .get_item(item_id, "B", context)
            .unwrap()
            .and_then(|item| item.get("n"))
    }

    #[test]
    fn begin_creates_working_copy_and_shadow() {
        let (state, txn) = state().begin_transaction("current").unwrap();
        assert_eq!(state.context_count(), 3);
        assert_eq!(
            state.context(txn.as_str()).unwrap().kind(),
            ContextKind::Transaction
        );
        let shadow = state.context(ContextId::shadow_of(txn.as_str()).as_str()).unwrap();
        assert_eq!(shadow.kind(), ContextKind::Shadow);
        assert!(shadow.same_versions(state.current()));
    }

    #[test]
    fn begin_from_missing_or_shadow_context_fails() {
        let err = state().begin_transaction("nope").unwrap_err();
        assert!(matches!(err, CoreError::InvalidTransaction { .. }));

        let (state, txn) = state().begin_transaction("current").unwrap();
        let shadow = ContextId::shadow_of(txn.as_str());
        let err = state.begin_transaction(shadow.as_str()).unwrap_err();
        assert!(matches!(err, CoreError::InvalidTransaction { .. }));
    }

    #[test]
    fn transaction_writes_are_invisible_until_commit() {
        let (state, txn) = state().begin_transaction("current").unwrap();
        let (state, id) = state
            .create_item("B", txn.as_str(), fields(json!({"n": 1})))
            .unwrap();
        assert!(state.get_item(id.as_str(), "B", "current").unwrap().is_none());

        let state = state.commit_transaction(txn.as_str()).unwrap();
        assert_eq!(n(&state, id.as_str(), "current"), Some(json!(1)));
        assert_eq!(state.context_count(), 1);
    }

    #[test]
    fn commit_without_interleaving_installs_working_copy() {
        let (state, txn) = state().begin_transaction("current").unwrap();
        let (state, _) = state.create_item("B", txn.as_str(), Map::new()).unwrap();
        let working = state.context(txn.as_str()).unwrap().clone();

        let state = state.commit_transaction(txn.as_str()).unwrap();
        assert!(state.current().same_versions(&working));
        assert_eq!(state.current().kind(), ContextKind::Current);
    }

    #[test]
    fn conflicting_commits_keep_the_first() {
        let (state, id) = state()
            .create_item("B", "current", fields(json!({"n": 0})))
            .unwrap();
        let (state, t1) = state.begin_transaction("current").unwrap();
        let (state, t2) = state.begin_transaction("current").unwrap();
        let state = state
            .update_item(id.as_str(), "B", t1.as_str(), fields(json!({"n": 1})))
            .unwrap();
        let state = state
            .update_item(id.as_str(), "B", t2.as_str(), fields(json!({"n": 2})))
            .unwrap();

        let state = state.commit_transaction(t1.as_str()).unwrap();
        let err = state.commit_transaction(t2.as_str()).unwrap_err();
        assert_eq!(
            err,
            CoreError::ConcurrentModificationConflict {
                version_id: "B".into(),
                item_id: id.to_string(),
                transaction_id: Some(t2.to_string()),
            }
        );
        assert_eq!(n(&state, id.as_str(), "current"), Some(json!(1)));
        // the losing transaction stays open for a rollback
        assert!(state.has_context(t2.as_str()));

        let state = state.rollback_transaction(t2.as_str()).unwrap();
        assert_eq!(state.context_count(), 1);
    }

    #[test]
    fn disjoint_commits_combine() {
        let (state, t1) = state().begin_transaction("current").unwrap();
        let (state, t2) = state.begin_transaction("current").unwrap();
        let (state, first) = state
            .create_item("B", t1.as_str(), fields(json!({"n": 1})))
            .unwrap();
        let (state, second) = state
            .create_item("B", t2.as_str(), fields(json!({"n": 2})))
            .unwrap();

        let state = state.commit_transaction(t1.as_str()).unwrap();
        let state = state.commit_transaction(t2.as_str()).unwrap();
        assert_eq!(n(&state, first.as_str(), "current"), Some(json!(1)));
        assert_eq!(n(&state, second.as_str(), "current"), Some(json!(2)));
    }

    #[test]
    fn versions_created_on_current_survive_a_merge() {
        let (state, txn) = state().begin_transaction("current").unwrap();
        let (state, _) = state.create_item("B", txn.as_str(), Map::new()).unwrap();
        let state = state.create_version("C", None, &["B"]).unwrap();

        let state = state.commit_transaction(txn.as_str()).unwrap();
        assert!(state.version_exists("C"));
        assert_eq!(state.find_items("B", "current", None, None).unwrap().len(), 1);
    }

    #[test]
    fn versions_created_after_begin_are_hidden_from_the_transaction() {
        let (state, txn) = state().begin_transaction("current").unwrap();
        let state = state.create_version("C", None, &["B"]).unwrap();
        // create_version always targets current
        let err = state.get_item("x", "C", txn.as_str()).unwrap_err();
        assert!(matches!(err, CoreError::InvalidVersion { .. }));
        let state = state.commit_transaction(txn.as_str()).unwrap();
        assert!(state.version_exists("C"));
    }

    #[test]
    fn commit_of_unknown_transaction_fails() {
        let state = state();
        let err = state.commit_transaction("missing").unwrap_err();
        assert_eq!(err, CoreError::invalid_transaction("missing"));
        let err = state.commit_transaction("current").unwrap_err();
        assert!(matches!(err, CoreError::ReadOnlyContext { .. }));
    }

    #[test]
    fn rollback_removes_the_shadow() {
        let (state, txn) = state().begin_transaction("current").unwrap();
        let shadow = ContextId::shadow_of(txn.as_str());
        assert!(state.has_context(shadow.as_str()));

        let state = state.rollback_transaction(txn.as_str()).unwrap();
        assert!(!state.has_context(txn.as_str()));
        assert!(!state.has_context(shadow.as_str()));
    }

    #[test]
    fn rollback_is_idempotent() {
        let (state, txn) = state().begin_transaction("current").unwrap();
        let state = state.rollback_transaction(txn.as_str()).unwrap();
        let state = state.rollback_transaction(txn.as_str()).unwrap();
        assert_eq!(state.context_count(), 1);

        let err = state.rollback_transaction("current").unwrap_err();
        assert!(matches!(err, CoreError::ReadOnlyContext { .. }));
    }
}
