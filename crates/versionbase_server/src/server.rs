//! The versionbase server: one graph state behind a transaction gate.

use crate::config::ServerConfig;
use crate::dispatch::dispatch;
use crate::error::{ServerError, ServerResult};
use crate::protocol::{Operation, Request, Response};
use parking_lot::{Condvar, Mutex};
use serde_json::Value;
use std::time::Instant;
use tracing::{debug, warn};
use versionbase_core::GraphState;

/// The graph state plus the transaction currently holding the server.
struct Shared {
    graph: GraphState,
    active_transaction: Option<String>,
}

impl Shared {
    /// A request is admitted when no transaction is open, or when it belongs
    /// to the open one.
    fn admits(&self, transaction_id: Option<&str>) -> bool {
        match &self.active_transaction {
            None => true,
            Some(active) => transaction_id == Some(active.as_str()),
        }
    }
}

/// Transactions a connection opened and has not finished yet.
///
/// The transport keeps one per connection and hands it back to
/// [`VersionServer::end_session`] when the peer goes away.
#[derive(Debug, Default)]
pub struct Session {
    open_transactions: Vec<String>,
}

impl Session {
    /// Creates an empty session.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the transactions opened through this session and still open.
    pub fn open_transactions(&self) -> &[String] {
        &self.open_transactions
    }

    fn record(&mut self, request: &Request, result: &ServerResult<Value>) {
        match (&request.operation, result) {
            (Operation::Begin { .. }, Ok(Value::String(transaction_id))) => {
                self.open_transactions.push(transaction_id.clone());
            }
            (Operation::Commit, Ok(_)) | (Operation::Rollback, _) => {
                if let Some(done) = request.transaction_id.as_deref() {
                    self.open_transactions.retain(|open| open != done);
                }
            }
            _ => {}
        }
    }
}

/// The versionbase server.
///
/// Holds the single graph state and serializes every mutation of it. While a
/// transaction is open, requests that do not belong to it wait until it is
/// committed or rolled back, up to [`ServerConfig::admission_timeout`].
///
/// # Example
///
/// ```
/// use versionbase_server::{Operation, Request, ServerConfig, VersionServer};
///
/// let server = VersionServer::new(ServerConfig::default());
/// let request = Request::new(
///     "m1",
///     Operation::CreateVersion {
///         commit_id: "A".into(),
///         data_parent_id: None,
///         parents: vec![],
///         parent_commit_id: None,
///     },
/// );
/// server.handle_request(&request).unwrap();
/// assert!(server.state().version_exists("A"));
/// ```
pub struct VersionServer {
    config: ServerConfig,
    shared: Mutex<Shared>,
    released: Condvar,
}

impl VersionServer {
    /// Creates a server with an empty graph.
    pub fn new(config: ServerConfig) -> Self {
        Self::with_state(config, GraphState::new())
    }

    /// Creates a server around an existing graph.
    pub fn with_state(config: ServerConfig, graph: GraphState) -> Self {
        Self {
            config,
            shared: Mutex::new(Shared {
                graph,
                active_transaction: None,
            }),
            released: Condvar::new(),
        }
    }

    /// Returns the server configuration.
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Returns a copy of the current graph state.
    pub fn state(&self) -> GraphState {
        self.shared.lock().graph.clone()
    }

    /// Returns the transaction currently holding the server.
    pub fn active_transaction(&self) -> Option<String> {
        self.shared.lock().active_transaction.clone()
    }

    /// Handles one request, waiting for admission first.
    ///
    /// Blocks the calling thread for up to the admission timeout.
    pub fn handle_request(&self, request: &Request) -> ServerResult<Value> {
        // a transaction cannot be opened from inside another
        if let (Operation::Begin { .. }, Some(open)) = (&request.operation, &request.transaction_id) {
            return Err(ServerError::InvalidRequest(format!(
                "begin inside transaction {open}"
            )));
        }

        let started = Instant::now();
        let deadline = started + self.config.admission_timeout;
        let mut shared = self.shared.lock();

        while !shared.admits(request.transaction_id.as_deref()) {
            if self.released.wait_until(&mut shared, deadline).timed_out()
                && !shared.admits(request.transaction_id.as_deref())
            {
                return Err(ServerError::AdmissionTimeout {
                    active: shared.active_transaction.clone().unwrap_or_default(),
                    waited: started.elapsed(),
                });
            }
        }

        let outcome = dispatch(&shared.graph, request);

        let finishes_active = matches!(
            (&request.operation, &outcome),
            (Operation::Commit, Ok(_)) | (Operation::Rollback, _)
        ) && shared.active_transaction.is_some()
            && shared.active_transaction == request.transaction_id;
        if finishes_active {
            shared.active_transaction = None;
            self.released.notify_all();
        }

        let (graph, result) = outcome?;
        shared.graph = graph;
        if let (Operation::Begin { .. }, Value::String(transaction_id)) = (&request.operation, &result) {
            shared.active_transaction = Some(transaction_id.clone());
        }

        debug!(
            operation = request.operation.name(),
            message_id = %request.message_id,
            "handled request"
        );
        Ok(result)
    }

    /// Handles one raw frame and builds the response for it.
    ///
    /// Frames that are not valid UTF-8 JSON are answered with `invalid_json`.
    pub fn handle_frame(&self, frame: &[u8], session: &mut Session) -> Response {
        let raw: Value = match serde_json::from_slice(frame) {
            Ok(raw) => raw,
            Err(err) => return Response::error("", &ServerError::Json(err)),
        };
        let message_id = raw
            .get("message_id")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_owned();

        let request: Request = match serde_json::from_value(raw) {
            Ok(request) => request,
            Err(err) => {
                return Response::error(message_id, &ServerError::InvalidRequest(err.to_string()))
            }
        };

        let result = self.handle_request(&request);
        session.record(&request, &result);
        match result {
            Ok(result) => Response::ok(message_id, result),
            Err(err) => {
                warn!(
                    operation = request.operation.name(),
                    message_id = %message_id,
                    error = %err,
                    "request failed"
                );
                Response::error(message_id, &err)
            }
        }
    }

    /// Rolls back every transaction a departed session left open.
    pub fn end_session(&self, session: Session) {
        if session.open_transactions.is_empty() {
            return;
        }
        let mut shared = self.shared.lock();
        for transaction_id in session.open_transactions {
            match shared.graph.rollback_transaction(&transaction_id) {
                Ok(graph) => shared.graph = graph,
                Err(err) => warn!(transaction = %transaction_id, error = %err, "abandoned rollback failed"),
            }
            if shared.active_transaction.as_deref() == Some(transaction_id.as_str()) {
                shared.active_transaction = None;
                self.released.notify_all();
            }
            debug!(transaction = %transaction_id, "rolled back abandoned transaction");
        }
    }
}

impl std::fmt::Debug for VersionServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VersionServer")
            .field("config", &self.config)
            .field("active_transaction", &self.active_transaction())
            .finish()
    }
}
