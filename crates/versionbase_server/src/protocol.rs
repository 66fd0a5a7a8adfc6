//! Wire messages.
//!
//! Every frame is one JSON object on its own line. Requests carry a
//! `message_id` chosen by the client, an optional `transaction_id`, and an
//! `operation` name whose remaining fields sit flat beside it:
//!
//! ```json
//! {"message_id": "m1", "operation": "get", "item_id": "i1", "version_id": "B"}
//! ```
//!
//! Responses echo the `message_id`:
//!
//! ```json
//! {"status": 0, "message": "", "message_id": "m1", "result": {"id": "i1", "version": "B"}}
//! ```

use crate::error::ServerError;
use crate::query::{FieldMatch, FieldSelect};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A client request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Request {
    /// Correlation id echoed in the response.
    pub message_id: String,
    /// Context to operate in; `current` when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transaction_id: Option<String>,
    /// The operation and its fields.
    #[serde(flatten)]
    pub operation: Operation,
}

impl Request {
    /// Creates a request outside any transaction.
    pub fn new(message_id: impl Into<String>, operation: Operation) -> Self {
        Self {
            message_id: message_id.into(),
            transaction_id: None,
            operation,
        }
    }

    /// Tags the request with a transaction.
    pub fn in_transaction(mut self, transaction_id: impl Into<String>) -> Self {
        self.transaction_id = Some(transaction_id.into());
        self
    }
}

/// Operations understood by the server.
#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "operation", rename_all = "snake_case")]
pub enum Operation {
    /// Read one item.
    Get { item_id: String, version_id: String },

    /// Store a new item under a generated id.
    Create {
        version_id: String,
        #[serde(default)]
        data: Map<String, Value>,
    },

    /// Store an item under a given id.
    Update {
        item_id: String,
        version_id: String,
        #[serde(default)]
        data: Map<String, Value>,
    },

    /// Remove an item.
    Delete { item_id: String, version_id: String },

    /// Filter and project the items of a version.
    Find {
        version_id: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        filter: Option<FieldMatch>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        select: Option<FieldSelect>,
    },

    /// Open a transaction on top of `snapshot_id` (default `current`).
    Begin {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        snapshot_id: Option<String>,
    },

    /// Commit the request's transaction.
    Commit,

    /// Roll back the request's transaction.
    Rollback,

    /// Snapshot `snapshot_id` (default `current`).
    CreateSnapshot {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        snapshot_id: Option<String>,
    },

    /// Drop a snapshot.
    DeleteSnapshot { snapshot_id: String },

    /// Add a version to `current`.
    CreateVersion {
        commit_id: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        data_parent_id: Option<String>,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        parents: Vec<String>,
        /// Single-parent form accepted from older clients.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        parent_commit_id: Option<String>,
    },

    /// Ask whether a version exists in `current`.
    VersionExists { commit_id: String },

    /// Replace a version's items with another's.
    SetAllVersionItems {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        source_snapshot_id: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        dest_snapshot_id: Option<String>,
        source_commit_id: String,
        dest_commit_id: String,
    },

    /// Copy selected items between versions.
    CopyVersionItems {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        source_snapshot_id: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        dest_snapshot_id: Option<String>,
        source_commit_id: String,
        dest_commit_id: String,
        item_ids: Vec<String>,
        #[serde(default)]
        replace: bool,
    },
}

impl Operation {
    /// Returns the wire name of the operation.
    pub fn name(&self) -> &'static str {
        match self {
            Operation::Get { .. } => "get",
            Operation::Create { .. } => "create",
            Operation::Update { .. } => "update",
            Operation::Delete { .. } => "delete",
            Operation::Find { .. } => "find",
            Operation::Begin { .. } => "begin",
            Operation::Commit => "commit",
            Operation::Rollback => "rollback",
            Operation::CreateSnapshot { .. } => "create_snapshot",
            Operation::DeleteSnapshot { .. } => "delete_snapshot",
            Operation::CreateVersion { .. } => "create_version",
            Operation::VersionExists { .. } => "version_exists",
            Operation::SetAllVersionItems { .. } => "set_all_version_items",
            Operation::CopyVersionItems { .. } => "copy_version_items",
        }
    }
}

/// A server response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    /// [`Response::OK`] or [`Response::ERROR`].
    pub status: u8,
    /// Error message; empty on success.
    #[serde(default)]
    pub message: String,
    /// Machine-readable error code; absent on success.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    /// The request's correlation id.
    pub message_id: String,
    /// Operation result; `null` for operations without one.
    #[serde(default)]
    pub result: Value,
}

impl Response {
    /// Status of a successful response.
    pub const OK: u8 = 0;
    /// Status of a failed response.
    pub const ERROR: u8 = 1;

    /// Creates a success response.
    pub fn ok(message_id: impl Into<String>, result: Value) -> Self {
        Self {
            status: Self::OK,
            message: String::new(),
            code: None,
            message_id: message_id.into(),
            result,
        }
    }

    /// Creates an error response.
    pub fn error(message_id: impl Into<String>, error: &ServerError) -> Self {
        Self {
            status: Self::ERROR,
            message: error.to_string(),
            code: Some(error.code().to_owned()),
            message_id: message_id.into(),
            result: Value::Null,
        }
    }

    /// Returns true for a success response.
    pub fn is_ok(&self) -> bool {
        self.status == Self::OK
    }

    /// Converts the response into the operation result.
    pub fn into_result(self) -> Result<Value, ServerError> {
        if self.is_ok() {
            Ok(self.result)
        } else {
            Err(ServerError::Remote {
                code: self.code.unwrap_or_else(|| "unknown".to_owned()),
                message: self.message,
            })
        }
    }
}
