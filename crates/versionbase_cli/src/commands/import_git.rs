//! Import-git command implementation.
//!
//! Walks every commit reachable from any ref, parents before children, and
//! creates a version for each one the server does not know yet.

use std::path::Path;
use std::process::Command;
use thiserror::Error;
use tracing::{debug, info};

/// Failures reading the repository history.
#[derive(Debug, Error)]
pub enum ImportError {
    /// `git` could not be started.
    #[error("failed to run git: {0}")]
    Spawn(#[from] std::io::Error),

    /// `git log` exited unsuccessfully.
    #[error("git log failed: {0}")]
    GitLog(String),
}

/// One commit and its parents, as listed by `git log`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitLine {
    /// Commit hash.
    pub commit: String,
    /// Parent hashes, first parent first.
    pub parents: Vec<String>,
}

/// Parses `%H %P` lines. Blank lines are skipped.
pub fn parse_log(output: &str) -> Vec<CommitLine> {
    output
        .lines()
        .filter_map(|line| {
            let mut fields = line.split_whitespace();
            let commit = fields.next()?.to_owned();
            Some(CommitLine {
                commit,
                parents: fields.map(str::to_owned).collect(),
            })
        })
        .collect()
}

/// Lists the commits of `repo`, oldest first.
fn read_history(repo: &Path) -> Result<Vec<CommitLine>, ImportError> {
    let output = Command::new("git")
        .arg("--no-pager")
        .args(["log", "--all", "--topo-order", "--format=%H %P"])
        .current_dir(repo)
        .output()?;
    if !output.status.success() {
        return Err(ImportError::GitLog(
            String::from_utf8_lossy(&output.stderr).trim().to_owned(),
        ));
    }

    let mut commits = parse_log(&String::from_utf8_lossy(&output.stdout));
    commits.reverse();
    Ok(commits)
}

/// Creates a version for every commit of `repo` missing on the server.
pub fn run(addr: std::net::SocketAddr, repo: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let commits = read_history(repo)?;
    info!(repo = %repo.display(), commits = commits.len(), "read git history");

    let created = super::runtime()?.block_on(async {
        let conn = super::connect(addr).await?;
        let mut created = 0usize;
        for line in &commits {
            if conn.version_exists(&line.commit).await? {
                debug!(commit = %line.commit, "version exists");
                continue;
            }
            let parents: Vec<&str> = line.parents.iter().map(String::as_str).collect();
            conn.create_version(&line.commit, &parents, None).await?;
            created += 1;
        }
        conn.disconnect().await?;
        Ok::<_, versionbase_server::ServerError>(created)
    })?;

    println!(
        "Created {created} of {} versions ({} already present)",
        commits.len(),
        commits.len() - created
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_roots_merges_and_blank_lines() {
        let log = "c3 c2 c1\n\nc2 c0\nc1 c0\nc0\n";
        let commits = parse_log(log);

        assert_eq!(commits.len(), 4);
        assert_eq!(commits[0].commit, "c3");
        assert_eq!(commits[0].parents, vec!["c2", "c1"]);
        assert_eq!(commits[3].commit, "c0");
        assert!(commits[3].parents.is_empty());
    }

    #[test]
    fn tolerates_trailing_whitespace() {
        let commits = parse_log("abc def  \r\n");
        assert_eq!(
            commits,
            vec![CommitLine {
                commit: "abc".into(),
                parents: vec!["def".into()],
            }]
        );
    }

    #[test]
    fn empty_log_has_no_commits() {
        assert!(parse_log("").is_empty());
    }
}
