//! Serve command implementation.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use versionbase_server::{transport, ServerConfig, VersionServer};

/// Runs the server on `addr` until Ctrl-C.
pub fn run(
    addr: SocketAddr,
    admission_timeout_ms: u64,
    close_on_error: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = ServerConfig::new(addr)
        .with_admission_timeout(Duration::from_millis(admission_timeout_ms))
        .with_close_on_error(close_on_error);
    let server = Arc::new(VersionServer::new(config));

    super::runtime()?.block_on(transport::run(server))?;
    Ok(())
}
