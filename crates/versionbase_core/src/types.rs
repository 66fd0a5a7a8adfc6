//! Core type definitions for versionbase.
//!
//! All identifiers are opaque strings: the engine compares and hashes them
//! but never interprets their contents.

use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt;
use uuid::Uuid;

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Creates an identifier from any string.
            #[must_use]
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Returns the identifier as a string slice.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Consumes the identifier, returning the owned string.
            #[must_use]
            pub fn into_string(self) -> String {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl Borrow<str> for $name {
            fn borrow(&self) -> &str {
                &self.0
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self(id.to_owned())
            }
        }

        impl From<String> for $name {
            fn from(id: String) -> Self {
                Self(id)
            }
        }

        impl From<$name> for String {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

string_id!(
    /// Identifier of a version (a commit id in git terms).
    VersionId
);

string_id!(
    /// Identifier of an item, stable for the item's lifetime.
    ItemId
);

string_id!(
    /// Identifier of an isolation context: `current`, a snapshot, a
    /// transaction working copy or a transaction shadow.
    ContextId
);

impl ItemId {
    /// Generates a fresh, globally unique item id.
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

impl ContextId {
    /// The authoritative line that transactions merge back into.
    pub const CURRENT: &'static str = "current";

    /// Prefix of the frozen shadow captured when a transaction begins.
    pub const SHADOW_PREFIX: &'static str = "original-";

    /// Returns the id of the `current` context.
    #[must_use]
    pub fn current() -> Self {
        Self::from(Self::CURRENT)
    }

    /// Generates a fresh, globally unique context id.
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Returns the shadow context id belonging to a transaction.
    #[must_use]
    pub fn shadow_of(transaction_id: &str) -> Self {
        Self(format!("{}{}", Self::SHADOW_PREFIX, transaction_id))
    }

    /// Returns true if this is the `current` context.
    #[must_use]
    pub fn is_current(&self) -> bool {
        self.0 == Self::CURRENT
    }
}
