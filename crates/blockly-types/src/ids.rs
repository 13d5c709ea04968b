//! Typed identifiers for workspaces, blocks, and event groups.
//!
//! `WorkspaceId` wraps a UUIDv7 (time-ordered, globally unique) and displays
//! as standard UUID text for logging. The `short()` form (first 8 hex chars)
//! is for human-facing output only, never a lookup key.
//!
//! `BlockId` and `GroupId` are opaque strings. Blocks loaded from XML keep
//! whatever id the document carried (`"b1"` is as valid as a generated one),
//! so these ids cannot be UUIDs. Fresh ids are generated Blockly-style:
//! 20 characters drawn from an 87-character soup that is safe inside XML
//! attributes and JSON strings.

use std::fmt;

use rand::Rng;
use serde::{Deserialize, Serialize};

/// A workspace identifier (UUIDv7).
#[derive(Clone, Copy, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WorkspaceId(uuid::Uuid);

impl WorkspaceId {
    /// Create a new time-ordered ID (UUIDv7).
    pub fn new() -> Self {
        Self(uuid::Uuid::now_v7())
    }

    /// First 8 hex characters. Display only, not lookup.
    pub fn short(&self) -> String {
        self.0.as_simple().to_string()[..8].to_string()
    }

    /// Parse from a hex string (32 chars, no hyphens) or standard UUID format.
    pub fn parse(s: &str) -> Result<Self, uuid::Error> {
        uuid::Uuid::parse_str(s).map(Self)
    }
}

impl Default for WorkspaceId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<uuid::Uuid> for WorkspaceId {
    fn from(u: uuid::Uuid) -> Self {
        Self(u)
    }
}

impl fmt::Display for WorkspaceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Full UUID with hyphens for log readability
        write!(f, "{}", self.0)
    }
}

impl fmt::Debug for WorkspaceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "WorkspaceId({})", self.short())
    }
}

// ── Generated string ids ────────────────────────────────────────────────────

/// Characters used by [`gen_uid`]. Excludes `"`, `'`, `&`, `<`, `>` and `\`
/// so generated ids never need escaping.
const UID_SOUP: &[u8] =
    b"!#$%()*+,-./:;=?@[]^_`{|}~ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";

/// Length of a generated id.
pub const UID_LEN: usize = 20;

/// Generate a random 20-character id from the uid soup.
pub fn gen_uid() -> String {
    let mut rng = rand::thread_rng();
    (0..UID_LEN)
        .map(|_| UID_SOUP[rng.gen_range(0..UID_SOUP.len())] as char)
        .collect()
}

macro_rules! impl_string_id {
    ($T:ident, $name:literal) => {
        impl $T {
            /// Wrap an existing id string.
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Generate a fresh random id.
            pub fn generate() -> Self {
                Self(gen_uid())
            }

            /// Borrow the id text.
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Check for the empty id (never produced by `generate`).
            pub fn is_empty(&self) -> bool {
                self.0.is_empty()
            }
        }

        impl From<&str> for $T {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }

        impl From<String> for $T {
            fn from(s: String) -> Self {
                Self(s)
            }
        }

        impl AsRef<str> for $T {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl PartialEq<str> for $T {
            fn eq(&self, other: &str) -> bool {
                self.0 == other
            }
        }

        impl PartialEq<&str> for $T {
            fn eq(&self, other: &&str) -> bool {
                self.0 == *other
            }
        }

        impl fmt::Display for $T {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl fmt::Debug for $T {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", $name, self.0)
            }
        }
    };
}

/// Identifier of a block within a workspace.
#[derive(Clone, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BlockId(String);

/// Correlation id tying several events to one logical user action.
#[derive(Clone, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GroupId(String);

impl_string_id!(BlockId, "BlockId");
impl_string_id!(GroupId, "GroupId");

// ============================================================================
// Tests
// ============================================================================
