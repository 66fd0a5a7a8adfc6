//! # Versionbase Server
//!
//! Network front end for the versionbase engine.
//!
//! This crate provides:
//! - The wire protocol: one JSON request or response per line
//! - A pure dispatch layer mapping requests onto engine operations
//! - [`VersionServer`]: the single graph state behind a transaction gate
//! - A tokio TCP transport and an async [`Connection`] client
//!
//! # Transactions
//!
//! The server holds one graph state for all clients. While a transaction is
//! open, only requests tagged with its id are admitted; everything else waits
//! until it commits or rolls back, and gives up with
//! [`ServerError::AdmissionTimeout`] after
//! [`ServerConfig::admission_timeout`]. A connection that goes away with a
//! transaction still open has it rolled back.
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use versionbase_server::{transport, ServerConfig, VersionServer};
//!
//! # async fn run() -> versionbase_server::ServerResult<()> {
//! let server = Arc::new(VersionServer::new(ServerConfig::default()));
//! transport::run(server).await
//! # }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
// Production code must not use panic!/unwrap()/expect()
#![warn(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

mod client;
mod config;
mod dispatch;
mod error;
mod protocol;
mod query;
mod server;
pub mod transport;

pub use client::Connection;
pub use config::{ClientConfig, ServerConfig, DEFAULT_PORT, VERSION_ENV};
pub use dispatch::dispatch;
pub use error::{ServerError, ServerResult};
pub use protocol::{Operation, Request, Response};
pub use query::{FieldMatch, FieldSelect};
pub use server::{Session, VersionServer};
