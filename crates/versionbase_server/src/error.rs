//! Error types for the server, transport and client.

use std::time::Duration;
use thiserror::Error;
use versionbase_core::CoreError;

/// Result type for server operations.
pub type ServerResult<T> = Result<T, ServerError>;

/// Errors that can occur in the server or the client.
#[derive(Error, Debug)]
pub enum ServerError {
    /// The request is malformed or misses a required field.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// The engine rejected the operation.
    #[error(transparent)]
    Engine(#[from] CoreError),

    /// Another transaction held the server for longer than the admission timeout.
    #[error("timed out after {waited:?} waiting for transaction {active:?} to finish")]
    AdmissionTimeout {
        /// The transaction that kept the request out.
        active: String,
        /// How long the request waited.
        waited: Duration,
    },

    /// The server answered with an error (client side).
    #[error("{code}: {message}")]
    Remote {
        /// Machine-readable error code.
        code: String,
        /// Human-readable message.
        message: String,
    },

    /// No response arrived in time (client side).
    #[error("no response after {0:?}")]
    RequestTimeout(Duration),

    /// The connection went away while a request was outstanding.
    #[error("connection closed")]
    ConnectionClosed,

    /// The peer violated the framing or correlation rules.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// Internal server error.
    #[error("internal error: {0}")]
    Internal(String),

    /// JSON encoding or decoding failed.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl ServerError {
    /// Returns the machine-readable code sent on the wire.
    pub fn code(&self) -> &'static str {
        match self {
            ServerError::InvalidRequest(_) => "invalid_request",
            ServerError::Engine(err) => engine_code(err),
            ServerError::AdmissionTimeout { .. } => "admission_timeout",
            ServerError::Remote { .. } => "remote",
            ServerError::RequestTimeout(_) => "request_timeout",
            ServerError::ConnectionClosed => "connection_closed",
            ServerError::Protocol(_) => "protocol",
            ServerError::Internal(_) => "internal",
            ServerError::Json(_) => "invalid_json",
            ServerError::Io(_) => "io",
        }
    }

    /// Returns true if the request itself was at fault.
    pub fn is_client_error(&self) -> bool {
        match self {
            ServerError::InvalidRequest(_) | ServerError::Protocol(_) | ServerError::Json(_) => true,
            ServerError::Engine(err) => !matches!(err, CoreError::InvariantViolation { .. }),
            _ => false,
        }
    }

    /// Returns true if the server failed while handling a valid request.
    pub fn is_server_error(&self) -> bool {
        match self {
            ServerError::Internal(_) | ServerError::Io(_) => true,
            ServerError::Engine(err) => matches!(err, CoreError::InvariantViolation { .. }),
            _ => false,
        }
    }

    /// Returns true if the error is a merge conflict, local or remote.
    pub fn is_conflict(&self) -> bool {
        match self {
            ServerError::Engine(err) => err.is_conflict(),
            ServerError::Remote { code, .. } => code.ends_with("_conflict"),
            _ => false,
        }
    }
}

fn engine_code(err: &CoreError) -> &'static str {
    match err {
        CoreError::InvalidTransaction { .. } => "invalid_transaction",
        CoreError::InvalidVersion { .. } => "invalid_version",
        CoreError::ItemNotFound { .. } => "item_not_found",
        CoreError::ItemAlreadyExists { .. } => "item_already_exists",
        CoreError::UnknownParent { .. } => "unknown_parent",
        CoreError::InvalidDataParent { .. } => "invalid_data_parent",
        CoreError::DuplicateVersion { .. } => "duplicate_version",
        CoreError::ConcurrentModificationConflict { .. } => "concurrent_modification_conflict",
        CoreError::ConcurrentCreationConflict { .. } => "concurrent_creation_conflict",
        CoreError::UpdateDeleteConflict { .. } => "update_delete_conflict",
        CoreError::ReadOnlyContext { .. } => "read_only_context",
        CoreError::InvariantViolation { .. } => "invariant_violation",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_classification() {
        assert!(ServerError::InvalidRequest("bad".into()).is_client_error());
        assert!(ServerError::Internal("oops".into()).is_server_error());
        assert!(!ServerError::InvalidRequest("bad".into()).is_server_error());

        let conflict = ServerError::from(CoreError::UpdateDeleteConflict {
            version_id: "B".into(),
            item_id: "x".into(),
            transaction_id: None,
        });
        assert!(conflict.is_client_error());
        assert!(conflict.is_conflict());
        assert_eq!(conflict.code(), "update_delete_conflict");

        let broken = ServerError::from(CoreError::invariant_violation("no shadow"));
        assert!(broken.is_server_error());
    }

    #[test]
    fn remote_conflicts_are_recognised() {
        let err = ServerError::Remote {
            code: "concurrent_modification_conflict".into(),
            message: "boom".into(),
        };
        assert!(err.is_conflict());
        assert_eq!(err.to_string(), "concurrent_modification_conflict: boom");
    }

    #[test]
    fn admission_timeout_display() {
        let err = ServerError::AdmissionTimeout {
            active: "txn-1".into(),
            waited: Duration::from_millis(600),
        };
        let msg = err.to_string();
        assert!(msg.contains("txn-1"));
        assert!(msg.contains("600ms"));
    }
}
