//! # Versionbase Testkit
//!
//! Test utilities for versionbase.
//!
//! This crate provides:
//! - [`TestGraph`], a graph state that threads itself through engine calls
//! - Version history builders
//! - Property-based test generators using proptest
//!
//! ## Usage
//!
//! ```rust
//! use versionbase_testkit::prelude::*;
//!
//! let mut graph = TestGraph::new()
//!     .with_version("A", &[])
//!     .with_version("B", &["A"]);
//! let id = graph.create("B", "current", fields(&[("n", 1.into())]));
//! assert_eq!(graph.field(id.as_str(), "B", "current", "n"), Some(1.into()));
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod fixtures;
pub mod generators;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::fixtures::*;
    pub use crate::generators::*;
}

pub use fixtures::*;
pub use generators::*;
