//! Server and client configuration.

use std::net::SocketAddr;
use std::time::Duration;

/// Default port, shared by the server and the client.
pub const DEFAULT_PORT: u16 = 9876;

/// Environment variable naming the version a client reads and writes.
pub const VERSION_ENV: &str = "VERSIONBASE_COMMIT_ID";

/// Configuration for the server.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind to.
    pub bind_addr: SocketAddr,
    /// How long a request waits for another transaction to finish.
    pub admission_timeout: Duration,
    /// Whether an error response closes the connection.
    pub close_on_error: bool,
    /// Maximum length of one request line, in bytes.
    pub max_frame_len: usize,
}

impl ServerConfig {
    /// Creates a new server configuration.
    pub fn new(bind_addr: SocketAddr) -> Self {
        Self {
            bind_addr,
            admission_timeout: Duration::from_millis(600),
            close_on_error: true,
            max_frame_len: 16 * 1024 * 1024,
        }
    }

    /// Sets the admission timeout.
    pub fn with_admission_timeout(mut self, timeout: Duration) -> Self {
        self.admission_timeout = timeout;
        self
    }

    /// Sets whether error responses close the connection.
    pub fn with_close_on_error(mut self, close: bool) -> Self {
        self.close_on_error = close;
        self
    }

    /// Sets the maximum request line length.
    pub fn with_max_frame_len(mut self, len: usize) -> Self {
        self.max_frame_len = len;
        self
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self::new(SocketAddr::from(([127, 0, 0, 1], DEFAULT_PORT)))
    }
}

/// Configuration for a client connection.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Server address.
    pub addr: SocketAddr,
    /// Version used by item operations.
    pub version_id: Option<String>,
    /// How long to wait for each response.
    pub request_timeout: Duration,
}

impl ClientConfig {
    /// Creates a client configuration, reading the version from
    /// `VERSIONBASE_COMMIT_ID` if it is set.
    pub fn new(addr: SocketAddr) -> Self {
        Self {
            addr,
            version_id: std::env::var(VERSION_ENV).ok().filter(|id| !id.is_empty()),
            request_timeout: Duration::from_secs(30),
        }
    }

    /// Sets the version used by item operations.
    pub fn with_version(mut self, version_id: impl Into<String>) -> Self {
        self.version_id = Some(version_id.into());
        self
    }

    /// Sets the response timeout.
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::new(SocketAddr::from(([127, 0, 0, 1], DEFAULT_PORT)))
    }
}
