//! Isolation contexts.

use crate::types::VersionId;
use crate::version::Version;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Mapping from version id to version, as seen through one context.
pub type VersionMap = HashMap<VersionId, Arc<Version>>;

/// What an isolation context is used for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContextKind {
    /// The authoritative line.
    Current,
    /// A named, read-only alias of another context.
    Snapshot,
    /// A transaction's working copy.
    Transaction,
    /// The frozen origin of a transaction, used as the merge base.
    Shadow,
}

impl ContextKind {
    /// Returns true if item and version writes may target this kind.
    #[must_use]
    pub fn is_writable(self) -> bool {
        matches!(self, ContextKind::Current | ContextKind::Transaction)
    }
}

impl fmt::Display for ContextKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ContextKind::Current => "current",
            ContextKind::Snapshot => "snapshot",
            ContextKind::Transaction => "transaction",
            ContextKind::Shadow => "shadow",
        };
        f.write_str(name)
    }
}

/// One isolation scope: a kind plus a shared version mapping.
///
/// Cloning a context, or re-tagging it with another kind, shares the version
/// mapping. The first write through either handle copies it, so contexts
/// never observe each other's writes.
#[derive(Clone)]
pub struct Context {
    kind: ContextKind,
    versions: Arc<VersionMap>,
}

impl Context {
    /// Creates an empty context.
    #[must_use]
    pub fn new(kind: ContextKind) -> Self {
        Self {
            kind,
            versions: Arc::new(VersionMap::new()),
        }
    }

    /// Returns the context kind.
    #[must_use]
    pub fn kind(&self) -> ContextKind {
        self.kind
    }

    /// Returns the version stored under `version_id`.
    #[must_use]
    pub fn version(&self, version_id: &str) -> Option<&Arc<Version>> {
        self.versions.get(version_id)
    }

    /// Returns true if the context holds `version_id`.
    #[must_use]
    pub fn has_version(&self, version_id: &str) -> bool {
        self.versions.contains_key(version_id)
    }

    /// Returns the full version mapping.
    #[must_use]
    pub fn versions(&self) -> &VersionMap {
        &self.versions
    }

    /// Returns the number of versions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.versions.len()
    }

    /// Returns true if the context holds no versions.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.versions.is_empty()
    }

    /// Returns true if both contexts share the same version mapping.
    #[must_use]
    pub fn same_versions(&self, other: &Context) -> bool {
        Arc::ptr_eq(&self.versions, &other.versions)
    }

    /// Returns a context of another kind sharing this version mapping.
    #[must_use]
    pub(crate) fn alias(&self, kind: ContextKind) -> Self {
        Self {
            kind,
            versions: Arc::clone(&self.versions),
        }
    }

    pub(crate) fn from_versions(kind: ContextKind, versions: VersionMap) -> Self {
        Self {
            kind,
            versions: Arc::new(versions),
        }
    }

    pub(crate) fn versions_mut(&mut self) -> &mut VersionMap {
        Arc::make_mut(&mut self.versions)
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut ids: Vec<&str> = self.versions.keys().map(VersionId::as_str).collect();
        ids.sort_unstable();
        f.debug_struct("Context")
            .field("kind", &self.kind)
            .field("versions", &ids)
            .finish()
    }
}
