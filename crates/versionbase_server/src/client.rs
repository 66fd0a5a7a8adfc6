//! Async client.

use crate::config::ClientConfig;
use crate::error::{ServerError, ServerResult};
use crate::protocol::{Operation, Request, Response};
use crate::query::{FieldMatch, FieldSelect};
use parking_lot::Mutex;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, warn};
use uuid::Uuid;

/// Requests waiting for their response, keyed by message id.
#[derive(Default)]
struct Pending {
    closed: bool,
    waiting: HashMap<String, oneshot::Sender<Response>>,
}

impl Pending {
    /// Fails every outstanding request and refuses new ones.
    fn bail_out(&mut self) {
        self.closed = true;
        // dropping the senders wakes every waiter with ConnectionClosed
        self.waiting.clear();
    }
}

/// A connection to a versionbase server.
///
/// Requests may be issued concurrently; responses are matched to requests by
/// `message_id`. The connection remembers the transaction it opened and tags
/// every request with it until the transaction is committed or rolled back.
pub struct Connection {
    config: ClientConfig,
    writer: tokio::sync::Mutex<OwnedWriteHalf>,
    pending: Arc<Mutex<Pending>>,
    transaction_id: Mutex<Option<String>>,
    reader: JoinHandle<()>,
}

impl Connection {
    /// Connects to `config.addr`.
    pub async fn connect(config: ClientConfig) -> ServerResult<Self> {
        let stream = TcpStream::connect(config.addr).await?;
        let (reader, writer) = stream.into_split();
        let pending = Arc::new(Mutex::new(Pending::default()));
        let reader = tokio::spawn(read_responses(reader, Arc::clone(&pending)));
        debug!(addr = %config.addr, "connected");

        Ok(Self {
            config,
            writer: tokio::sync::Mutex::new(writer),
            pending,
            transaction_id: Mutex::new(None),
            reader,
        })
    }

    /// Returns the open transaction, if any.
    pub fn transaction_id(&self) -> Option<String> {
        self.transaction_id.lock().clone()
    }

    /// Reads an item of the configured version. `None` if absent.
    pub async fn get(&self, item_id: &str) -> ServerResult<Option<Value>> {
        let operation = Operation::Get {
            item_id: item_id.to_owned(),
            version_id: self.version_id()?,
        };
        let item = self.send(operation).await?;
        Ok((!item.is_null()).then_some(item))
    }

    /// Stores a new item and returns its id.
    pub async fn create(&self, data: Map<String, Value>) -> ServerResult<String> {
        let operation = Operation::Create {
            version_id: self.version_id()?,
            data,
        };
        expect_string(self.send(operation).await?)
    }

    /// Stores `data` under `item_id`.
    pub async fn update(&self, item_id: &str, data: Map<String, Value>) -> ServerResult<()> {
        let operation = Operation::Update {
            item_id: item_id.to_owned(),
            version_id: self.version_id()?,
            data,
        };
        self.send(operation).await.map(drop)
    }

    /// Removes an item.
    pub async fn delete(&self, item_id: &str) -> ServerResult<()> {
        let operation = Operation::Delete {
            item_id: item_id.to_owned(),
            version_id: self.version_id()?,
        };
        self.send(operation).await.map(drop)
    }

    /// Finds items of the configured version.
    pub async fn find(
        &self,
        select: Option<FieldSelect>,
        filter: Option<FieldMatch>,
    ) -> ServerResult<Vec<Value>> {
        let operation = Operation::Find {
            version_id: self.version_id()?,
            filter,
            select,
        };
        match self.send(operation).await? {
            Value::Array(found) => Ok(found),
            other => Err(ServerError::Protocol(format!("expected an array, got {other}"))),
        }
    }

    /// Opens a transaction on `snapshot_id` (default `current`).
    ///
    /// Fails without contacting the server if a transaction is already open.
    pub async fn begin(&self, snapshot_id: Option<&str>) -> ServerResult<String> {
        if let Some(open) = self.transaction_id() {
            return Err(ServerError::InvalidRequest(format!(
                "transaction {open} already started"
            )));
        }
        let operation = Operation::Begin {
            snapshot_id: snapshot_id.map(str::to_owned),
        };
        let transaction_id = expect_string(self.send(operation).await?)?;
        *self.transaction_id.lock() = Some(transaction_id.clone());
        Ok(transaction_id)
    }

    /// Commits the open transaction.
    ///
    /// On failure the transaction stays open so it can be rolled back.
    pub async fn commit(&self) -> ServerResult<()> {
        self.send(Operation::Commit).await?;
        *self.transaction_id.lock() = None;
        Ok(())
    }

    /// Rolls back the open transaction.
    pub async fn rollback(&self) -> ServerResult<()> {
        let result = self.send(Operation::Rollback).await;
        *self.transaction_id.lock() = None;
        result.map(drop)
    }

    /// Snapshots `current` and returns the snapshot id.
    pub async fn snapshot(&self) -> ServerResult<String> {
        expect_string(
            self.send(Operation::CreateSnapshot { snapshot_id: None })
                .await?,
        )
    }

    /// Drops a snapshot.
    pub async fn delete_snapshot(&self, snapshot_id: &str) -> ServerResult<()> {
        let operation = Operation::DeleteSnapshot {
            snapshot_id: snapshot_id.to_owned(),
        };
        self.send(operation).await.map(drop)
    }

    /// Adds a version with the given parents.
    pub async fn create_version(
        &self,
        commit_id: &str,
        parents: &[&str],
        data_parent_id: Option<&str>,
    ) -> ServerResult<()> {
        let operation = Operation::CreateVersion {
            commit_id: commit_id.to_owned(),
            data_parent_id: data_parent_id.map(str::to_owned),
            parents: parents.iter().map(|p| (*p).to_owned()).collect(),
            parent_commit_id: None,
        };
        self.send(operation).await.map(drop)
    }

    /// Returns true if the version exists in `current`.
    pub async fn version_exists(&self, commit_id: &str) -> ServerResult<bool> {
        let operation = Operation::VersionExists {
            commit_id: commit_id.to_owned(),
        };
        match self.send(operation).await? {
            Value::Bool(exists) => Ok(exists),
            other => Err(ServerError::Protocol(format!("expected a bool, got {other}"))),
        }
    }

    /// Replaces the items of `dest_commit_id` with those of `source_commit_id`.
    pub async fn set_all_version_items(
        &self,
        source_commit_id: &str,
        dest_commit_id: &str,
    ) -> ServerResult<()> {
        let operation = Operation::SetAllVersionItems {
            source_snapshot_id: None,
            dest_snapshot_id: None,
            source_commit_id: source_commit_id.to_owned(),
            dest_commit_id: dest_commit_id.to_owned(),
        };
        self.send(operation).await.map(drop)
    }

    /// Copies items from `source_commit_id` into `dest_commit_id`.
    pub async fn copy_version_items(
        &self,
        source_commit_id: &str,
        dest_commit_id: &str,
        item_ids: &[&str],
        replace: bool,
    ) -> ServerResult<()> {
        let operation = Operation::CopyVersionItems {
            source_snapshot_id: None,
            dest_snapshot_id: None,
            source_commit_id: source_commit_id.to_owned(),
            dest_commit_id: dest_commit_id.to_owned(),
            item_ids: item_ids.iter().map(|id| (*id).to_owned()).collect(),
            replace,
        };
        self.send(operation).await.map(drop)
    }

    /// Sends a raw operation, tagged with the open transaction.
    pub async fn send(&self, operation: Operation) -> ServerResult<Value> {
        let mut request = Request::new(Uuid::new_v4().to_string(), operation);
        request.transaction_id = self.transaction_id();

        let (tx, rx) = oneshot::channel();
        {
            let mut pending = self.pending.lock();
            if pending.closed {
                return Err(ServerError::ConnectionClosed);
            }
            pending.waiting.insert(request.message_id.clone(), tx);
        }

        let mut line = serde_json::to_vec(&request)?;
        line.push(b'\n');
        let written = {
            let mut writer = self.writer.lock().await;
            match writer.write_all(&line).await {
                Ok(()) => writer.flush().await,
                Err(err) => Err(err),
            }
        };
        if let Err(err) = written {
            self.pending.lock().waiting.remove(&request.message_id);
            return Err(err.into());
        }

        let response = match tokio::time::timeout(self.config.request_timeout, rx).await {
            Ok(Ok(response)) => response,
            Ok(Err(_)) => return Err(ServerError::ConnectionClosed),
            Err(_) => {
                self.pending.lock().waiting.remove(&request.message_id);
                return Err(ServerError::RequestTimeout(self.config.request_timeout));
            }
        };
        response.into_result()
    }

    /// Closes the connection. Outstanding requests fail with `ConnectionClosed`.
    pub async fn disconnect(self) -> ServerResult<()> {
        let shutdown = self.writer.lock().await.shutdown().await;
        self.reader.abort();
        self.pending.lock().bail_out();
        shutdown.map_err(ServerError::from)
    }

    fn version_id(&self) -> ServerResult<String> {
        self.config.version_id.clone().ok_or_else(|| {
            ServerError::InvalidRequest(format!(
                "no version configured; set {}",
                crate::config::VERSION_ENV
            ))
        })
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        self.reader.abort();
    }
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("addr", &self.config.addr)
            .field("transaction_id", &self.transaction_id())
            .finish()
    }
}

async fn read_responses(reader: OwnedReadHalf, pending: Arc<Mutex<Pending>>) {
    let mut lines = BufReader::new(reader).lines();
    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(err) => {
                warn!(error = %err, "connection read failed");
                break;
            }
        };
        if line.trim().is_empty() {
            continue;
        }

        let response: Response = match serde_json::from_str(&line) {
            Ok(response) => response,
            Err(err) => {
                warn!(error = %err, "server sent an unreadable response");
                break;
            }
        };

        let waiter = pending.lock().waiting.remove(&response.message_id);
        match waiter {
            Some(waiter) => {
                let _ = waiter.send(response);
            }
            // frame-level errors carry no message id; the close that follows fails everyone
            None if response.message_id.is_empty() => {
                warn!(message = %response.message, "server rejected a frame");
            }
            None => {
                warn!(message_id = %response.message_id, "response for an unknown request");
                break;
            }
        }
    }
    pending.lock().bail_out();
    debug!("connection closed");
}

fn expect_string(value: Value) -> ServerResult<String> {
    match value {
        Value::String(s) => Ok(s),
        other => Err(ServerError::Protocol(format!("expected a string, got {other}"))),
    }
}
