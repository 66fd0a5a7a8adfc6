//! Error types for the versionbase engine.

use crate::context::ContextKind;
use thiserror::Error;

/// Result type for engine operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors that can occur in engine operations.
///
/// Every failure is synchronous and leaves the caller's [`GraphState`]
/// untouched.
///
/// [`GraphState`]: crate::GraphState
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    /// The isolation context (transaction, snapshot or `current`) does not exist.
    #[error("invalid transaction: no context named {context_id:?}")]
    InvalidTransaction {
        /// The context that was looked up.
        context_id: String,
    },

    /// The version does not exist within the resolved context.
    #[error("invalid version: {version_id:?} does not exist in context {context_id:?}")]
    InvalidVersion {
        /// The context that was searched.
        context_id: String,
        /// The missing version.
        version_id: String,
    },

    /// The item is not present in the version.
    #[error("item not found: {item_id:?} in version {version_id:?}")]
    ItemNotFound {
        /// The version that was searched.
        version_id: String,
        /// The missing item.
        item_id: String,
    },

    /// The destination of a copy already holds the item and `replace` was not set.
    #[error("item already exists: {item_id:?} in version {version_id:?}")]
    ItemAlreadyExists {
        /// The destination version.
        version_id: String,
        /// The conflicting item.
        item_id: String,
    },

    /// A declared parent does not exist in `current`.
    #[error("unknown parent {parent_id:?} for version {version_id:?}")]
    UnknownParent {
        /// The version being created.
        version_id: String,
        /// The parent that could not be found.
        parent_id: String,
    },

    /// The data parent is not one of the declared parents.
    #[error("invalid data parent {data_parent_id:?} for version {version_id:?}")]
    InvalidDataParent {
        /// The version being created.
        version_id: String,
        /// The rejected data parent.
        data_parent_id: String,
    },

    /// The version id is already taken in `current`.
    #[error("duplicate version: {version_id:?} already exists")]
    DuplicateVersion {
        /// The version id that already exists.
        version_id: String,
    },

    /// Both sides of a merge modified the same item.
    #[error(
        "concurrent modification of item {item_id:?} in version {version_id:?}{}",
        committing(.transaction_id)
    )]
    ConcurrentModificationConflict {
        /// The version being merged.
        version_id: String,
        /// The item modified on both sides.
        item_id: String,
        /// The transaction whose commit failed, if the merge ran for one.
        transaction_id: Option<String>,
    },

    /// Both sides of a merge created an item under the same id.
    #[error(
        "concurrent creation of item {item_id:?} in version {version_id:?}{}",
        committing(.transaction_id)
    )]
    ConcurrentCreationConflict {
        /// The version being merged.
        version_id: String,
        /// The item created on both sides.
        item_id: String,
        /// The transaction whose commit failed, if the merge ran for one.
        transaction_id: Option<String>,
    },

    /// One side of a merge updated an item the other side deleted.
    #[error(
        "item {item_id:?} in version {version_id:?} was updated on one side and deleted on the other{}",
        committing(.transaction_id)
    )]
    UpdateDeleteConflict {
        /// The version being merged.
        version_id: String,
        /// The item in conflict.
        item_id: String,
        /// The transaction whose commit failed, if the merge ran for one.
        transaction_id: Option<String>,
    },

    /// A write was aimed at a context that does not accept writes.
    #[error("context {context_id:?} is a read-only {kind}")]
    ReadOnlyContext {
        /// The context that rejected the write.
        context_id: String,
        /// What kind of context it is.
        kind: ContextKind,
    },

    /// The graph state is internally inconsistent.
    #[error("invariant violation: {message}")]
    InvariantViolation {
        /// Description of the violated invariant.
        message: String,
    },
}

impl CoreError {
    /// Creates an invalid transaction error.
    pub fn invalid_transaction(context_id: impl Into<String>) -> Self {
        Self::InvalidTransaction {
            context_id: context_id.into(),
        }
    }

    /// Creates an invalid version error.
    pub fn invalid_version(context_id: impl Into<String>, version_id: impl Into<String>) -> Self {
        Self::InvalidVersion {
            context_id: context_id.into(),
            version_id: version_id.into(),
        }
    }

    /// Creates an item not found error.
    pub fn item_not_found(version_id: impl Into<String>, item_id: impl Into<String>) -> Self {
        Self::ItemNotFound {
            version_id: version_id.into(),
            item_id: item_id.into(),
        }
    }

    /// Creates an invariant violation error.
    pub fn invariant_violation(message: impl Into<String>) -> Self {
        Self::InvariantViolation {
            message: message.into(),
        }
    }

    /// Names the committing transaction on a merge conflict.
    ///
    /// Other errors are returned unchanged.
    #[must_use]
    pub fn in_transaction(mut self, id: &str) -> Self {
        if let CoreError::ConcurrentModificationConflict { transaction_id, .. }
        | CoreError::ConcurrentCreationConflict { transaction_id, .. }
        | CoreError::UpdateDeleteConflict { transaction_id, .. } = &mut self
        {
            *transaction_id = Some(id.to_owned());
        }
        self
    }

    /// Returns true if this error was raised by the merge engine.
    #[must_use]
    pub fn is_conflict(&self) -> bool {
        matches!(
            self,
            CoreError::ConcurrentModificationConflict { .. }
                | CoreError::ConcurrentCreationConflict { .. }
                | CoreError::UpdateDeleteConflict { .. }
        )
    }

    /// Returns true if this error reports a missing context, version, item or parent.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            CoreError::InvalidTransaction { .. }
                | CoreError::InvalidVersion { .. }
                | CoreError::ItemNotFound { .. }
                | CoreError::UnknownParent { .. }
        )
    }
}

fn committing(transaction_id: &Option<String>) -> String {
    transaction_id
        .as_deref()
        .map(|id| format!(" while committing {id:?}"))
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conflict_classification() {
        let err = CoreError::UpdateDeleteConflict {
            version_id: "B".into(),
            item_id: "x".into(),
            transaction_id: None,
        };
        assert!(err.is_conflict());
        assert!(!err.is_not_found());
        assert!(CoreError::item_not_found("B", "x").is_not_found());
    }

    #[test]
    fn conflict_names_the_committing_transaction() {
        let err = CoreError::ConcurrentCreationConflict {
            version_id: "B".into(),
            item_id: "x".into(),
            transaction_id: None,
        };
        assert!(!err.to_string().contains("committing"));

        let err = err.in_transaction("txn-7");
        assert!(matches!(
            &err,
            CoreError::ConcurrentCreationConflict { transaction_id: Some(id), .. } if id == "txn-7"
        ));
        assert!(err.to_string().ends_with("while committing \"txn-7\""));

        let missing = CoreError::item_not_found("B", "x").in_transaction("txn-7");
        assert_eq!(missing, CoreError::item_not_found("B", "x"));
    }

    #[test]
    fn error_display_carries_context() {
        let msg = CoreError::invalid_version("txn-1", "C").to_string();
        assert!(msg.contains("txn-1"));
        assert!(msg.contains("\"C\""));

        let msg = CoreError::ReadOnlyContext {
            context_id: "snap".into(),
            kind: ContextKind::Snapshot,
        }
        .to_string();
        assert_eq!(msg, "context \"snap\" is a read-only snapshot");
    }
}
