//! # Versionbase Core
//!
//! In-memory, git-like versioned item store.
//!
//! This crate provides:
//! - A DAG of immutable versions, each holding a keyed set of items
//! - Item CRUD scoped by (version, isolation context)
//! - Snapshots: cheap named aliases of a context
//! - Transactions: working copies reconciled into `current` by a
//!   three-way merge at commit time
//!
//! The engine holds no state of its own. Every operation borrows a
//! [`GraphState`] and returns a new one, leaving the input untouched when it
//! fails:
//!
//! ```
//! use versionbase_core::{GraphState, ContextId};
//! use serde_json::json;
//!
//! let state = GraphState::new()
//!     .create_version("A", None, &[])?
//!     .create_version("B", None, &["A"])?;
//!
//! let (state, txn) = state.begin_transaction(ContextId::CURRENT)?;
//! let data = json!({"message": "hello"}).as_object().cloned().unwrap_or_default();
//! let (state, item_id) = state.create_item("B", txn.as_str(), data)?;
//! let state = state.commit_transaction(txn.as_str())?;
//!
//! let item = state.get_item(item_id.as_str(), "B", ContextId::CURRENT)?;
//! assert_eq!(item.map(|i| i.version().as_str()), Some("B"));
//! # Ok::<(), versionbase_core::CoreError>(())
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod context;
mod error;
mod graph;
mod item;
mod merge;
mod query;
mod state;
mod transaction;
mod types;
mod version;

pub use context::{Context, ContextKind, VersionMap};
pub use error::{CoreError, CoreResult};
pub use item::{Item, ItemMap};
pub use merge::{merge_contexts, merge_items};
pub use query::{ItemFilter, ItemProjection, MatchAll, WholeItem};
pub use state::GraphState;
pub use types::{ContextId, ItemId, VersionId};
pub use version::Version;

/// Crate version, reported by the CLI.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
