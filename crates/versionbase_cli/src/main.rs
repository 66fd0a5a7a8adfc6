//! versionbase CLI
//!
//! Runs the server and feeds it versions.
//!
//! # Commands
//!
//! - `serve` - Run the server
//! - `add-version` - Create one version
//! - `import-git` - Create a version for every commit of a git repository
//! - `version` - Show version information

mod commands;

use clap::{Parser, Subcommand};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;
use versionbase_server::DEFAULT_PORT;

/// In-memory, git-like versioned item store.
#[derive(Parser)]
#[command(name = "versionbase")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Server host
    #[arg(global = true, long, default_value_t = IpAddr::V4(Ipv4Addr::LOCALHOST))]
    host: IpAddr,

    /// Server port
    #[arg(global = true, short, long, default_value_t = DEFAULT_PORT)]
    port: u16,

    /// Enable debug output
    #[arg(global = true, short, long)]
    debug: bool,

    /// Enable trace output
    #[arg(global = true, short, long, conflicts_with = "debug")]
    verbose: bool,

    /// Only print errors
    #[arg(global = true, short, long, conflicts_with_all = ["debug", "verbose"])]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the server
    Serve {
        /// Milliseconds a request waits for another transaction to finish
        #[arg(long, default_value = "600")]
        admission_timeout_ms: u64,

        /// Keep connections open after an error response
        #[arg(long)]
        keep_open_on_error: bool,
    },

    /// Create one version on a running server
    AddVersion {
        /// Commit id of the new version
        commit: String,

        /// Parent commit id
        parent: Option<String>,
    },

    /// Create a version for every commit of a git repository
    ImportGit {
        /// Repository to read
        #[arg(long, default_value = ".")]
        repo: PathBuf,
    },

    /// Show version information
    Version,
}

impl Cli {
    fn log_filter(&self) -> EnvFilter {
        let level = if self.quiet {
            "error"
        } else if self.verbose {
            "trace"
        } else if self.debug {
            "debug"
        } else {
            "info"
        };
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level))
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(cli.log_filter())
        .init();

    let addr = SocketAddr::new(cli.host, cli.port);
    match cli.command {
        Commands::Serve {
            admission_timeout_ms,
            keep_open_on_error,
        } => {
            commands::serve::run(addr, admission_timeout_ms, !keep_open_on_error)?;
        }
        Commands::AddVersion { commit, parent } => {
            commands::add_version::run(addr, &commit, parent.as_deref())?;
        }
        Commands::ImportGit { repo } => {
            commands::import_git::run(addr, &repo)?;
        }
        Commands::Version => {
            println!("versionbase CLI v{}", env!("CARGO_PKG_VERSION"));
            println!("versionbase Core v{}", versionbase_core::VERSION);
        }
    }

    Ok(())
}
