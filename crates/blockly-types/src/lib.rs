//! Shared identity and snapshot types for the Blockly event model.
//!
//! This is a leaf crate with no internal dependencies: typed ids, surface
//! coordinates, and the XML element tree that block snapshots are stored in.
//!
//! # Key Types
//!
//! |---------------|---------------------------------------------------|
//! | Type          | Purpose                                           |
//! |---------------|---------------------------------------------------|
//! | [`WorkspaceId`] | Which workspace (= document)                    |
//! | [`BlockId`]   | Which block, unique within a workspace            |
//! | [`GroupId`]   | Which logical user action an event belongs to     |
//! | [`Coordinate`] | Surface position of a top-level block            |
//! | [`Element`]   | XML element tree holding block snapshots          |
//! |---------------|---------------------------------------------------|

pub mod coordinate;
pub mod ids;
pub mod xml;

pub use coordinate::Coordinate;
pub use ids::{BlockId, GroupId, UID_LEN, WorkspaceId, gen_uid};
pub use xml::{Element, Node, XmlError};
