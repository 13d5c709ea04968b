//! Serializable, replayable events for Blockly block documents.
//!
//! Every mutation of a workspace (a block created, deleted, moved, or one of
//! its properties changed) is captured as an [`Event`]. Events serialize to
//! a JSON record, decode again against any equivalent workspace, and run
//! forward or backward, which is all undo/redo and remote replay need.
//!
//! # Design Philosophy
//!
//! Events hold ids, not references. A decoded record and a live event are
//! interchangeable: both run against whatever workspace they are handed, and
//! a missing target is logged and skipped rather than treated as fatal.
//!
//! Grouping is explicit. Every live constructor takes an [`EventContext`];
//! there is no ambient "current group" to leak between actions.
//!
//! # Layers
//!
//! - **[`Workspace`] / [`Block`]**: the document, with link maintenance.
//! - **[`dom`]**: subtree snapshots as XML elements.
//! - **[`Event`]**: the five event kinds, JSON codec, and `run`.
//! - **[`EventBus`] / [`filter`]**: fire queue, merge filter, listeners.
//! - **[`UndoStack`]**: grouped undo/redo history.
//! - **[`Editor`]**: all of the above wired together behind user-action helpers.

mod block;
mod bus;
mod context;
pub mod dom;
mod editor;
mod error;
mod event;
mod undo;
mod workspace;

pub use block::{Block, Input, InputKind, Mutator, ParentLink};
pub use bus::{EventBus, ListenerId, filter};
pub use context::EventContext;
pub use editor::Editor;
pub use error::EventError;
pub use event::{
    ChangeElement, ChangeEvent, ChangeValue, CreateEvent, DeleteEvent, Event, EventBase, EventType, MoveEvent,
    UiEvent,
};
pub use undo::{DEFAULT_MAX_UNDO, UndoStack};
pub use workspace::Workspace;

pub use blockly_types::{BlockId, Coordinate, Element, GroupId, WorkspaceId};

/// Result type for event and workspace operations.
pub type Result<T> = std::result::Result<T, EventError>;

#[cfg(test)]
mod tests {
    use super::*;

    fn doc_with_b1() -> Workspace {
        let mut ws = Workspace::new();
        ws.add_block(
            Block::new("b1", "controls_repeat")
                .with_field("TIMES", "10")
                .with_input("DO", InputKind::Statement),
        )
        .unwrap();
        ws.add_block(Block::new("b2", "text_print")).unwrap();
        ws.connect(&"b2".into(), &"b1".into(), Some("DO")).unwrap();
        ws
    }

    #[test]
    fn test_create_event_end_to_end() {
        let ws = doc_with_b1();
        let event = Event::from(CreateEvent::new(&ws, &"b1".into(), &EventContext::new()).unwrap());

        let text = event.to_json_string().unwrap();
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["ids"], serde_json::json!(["b1", "b2"]));

        let mut target = doc_with_b1();
        let decoded = Event::from_json_str(&text, &target).unwrap();
        decoded.run(&mut target, false);
        assert!(target.is_empty());

        let mut empty = Workspace::new();
        decoded.run(&mut empty, true);
        assert_eq!(empty.block_ids(), vec![BlockId::from("b1"), BlockId::from("b2")]);
        assert_eq!(empty.parent_of(&"b2".into()).unwrap().parent, BlockId::from("b1"));
    }

    #[test]
    fn test_grouping_is_explicit() {
        let ws = doc_with_b1();
        let action = EventContext::new().grouped();
        let a = ChangeEvent::new(&ws, &"b1".into(), ChangeElement::Collapsed, None, false, true, &action).unwrap();
        let b = MoveEvent::new(&ws, &"b2".into(), &action).unwrap();
        assert!(a.base.group.is_some());
        assert_eq!(a.base.group, b.base.group);

        let loose = ChangeEvent::new(&ws, &"b1".into(), ChangeElement::Comment, None, "", "x", &EventContext::new())
            .unwrap();
        assert!(loose.base.group.is_none());
    }
}
