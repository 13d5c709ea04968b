//! Error types for workspace and event operations.

use thiserror::Error;

use blockly_types::{BlockId, XmlError};

/// Errors that can occur building, decoding, or applying events.
///
/// Running an event never returns these: missing targets at run time are
/// logged and skipped. They surface from live construction, from decoding
/// event records, and from direct workspace edits.
#[derive(Error, Debug)]
pub enum EventError {
    /// Block not found in workspace.
    #[error("block not found: {0}")]
    BlockNotFound(BlockId),

    /// Block id already present in workspace.
    #[error("block already exists: {0}")]
    DuplicateBlock(BlockId),

    /// A delete was requested for a block that is still plugged into a parent.
    #[error("connected blocks cannot be deleted: {0}")]
    ConnectedBlock(BlockId),

    /// Block has no field with this name.
    #[error("block {block} has no field named {field:?}")]
    FieldNotFound { block: BlockId, field: String },

    /// Block has no mutation hooks.
    #[error("block {0} has no mutator")]
    NoMutator(BlockId),

    /// Parent has no input with this name.
    #[error("block {block} has no input named {input:?}")]
    InputNotFound { block: BlockId, input: String },

    /// Connecting would make a block its own ancestor.
    #[error("connecting {child} under {parent} would create a cycle")]
    Cycle { parent: BlockId, child: BlockId },

    /// Record `type` tag is not a known event type.
    #[error("unknown event type: {0:?}")]
    UnknownEventType(String),

    /// Record is missing a required field or has the wrong shape.
    #[error("malformed event record: {0}")]
    Malformed(String),

    /// Snapshot element is not a block.
    #[error("expected <block> or <shadow>, found <{0}>")]
    NotABlock(String),

    /// JSON decode error.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// XML parse/write error.
    #[error("xml error: {0}")]
    Xml(#[from] XmlError),
}
