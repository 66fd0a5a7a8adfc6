//! CLI command implementations.

pub mod add_version;
pub mod import_git;
pub mod serve;

use std::net::SocketAddr;
use std::time::Duration;
use versionbase_server::{ClientConfig, Connection};

/// Builds the runtime the client and server commands run on.
pub(crate) fn runtime() -> std::io::Result<tokio::runtime::Runtime> {
    tokio::runtime::Builder::new_multi_thread().enable_all().build()
}

/// Connects to a running server.
pub(crate) async fn connect(addr: SocketAddr) -> versionbase_server::ServerResult<Connection> {
    let config = ClientConfig::new(addr).with_request_timeout(Duration::from_secs(60));
    Connection::connect(config).await
}
