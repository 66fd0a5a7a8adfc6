//! Add-version command implementation.

use std::net::SocketAddr;
use tracing::info;

/// Creates `commit` on the server at `addr`, child of `parent` if given.
pub fn run(
    addr: SocketAddr,
    commit: &str,
    parent: Option<&str>,
) -> Result<(), Box<dyn std::error::Error>> {
    let parents: Vec<&str> = parent.into_iter().collect();

    super::runtime()?.block_on(async {
        let conn = super::connect(addr).await?;
        conn.create_version(commit, &parents, None).await?;
        conn.disconnect().await
    })?;

    info!(commit, ?parent, "version created");
    println!("Created version {commit}");
    Ok(())
}
