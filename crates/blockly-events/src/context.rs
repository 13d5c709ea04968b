//! Event context: the group and undo-recording state an event is born with.
//!
//! Every live event constructor takes an `&EventContext`. Callers open a group
//! for a compound action (a drag that both unplugs and moves, a delete that
//! takes a subtree with it) by deriving a grouped context and passing the
//! same value to each constructor:
//!
//! ```ignore
//! let drag = EventContext::new().grouped();
//! let mv = MoveEvent::new(&ws, &id, &drag)?;
//! let ui = UiEvent::new(&ws, Some(&id), "selected", None, Some(id.as_str()), &drag);
//! assert_eq!(mv.base.group, ui.base.group);
//! ```
//!
//! There is no process-wide "current group": two actions in flight each hold
//! their own context and cannot leak ids into each other.

use blockly_types::GroupId;

/// Group and recording state applied to events at construction.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EventContext {
    group: Option<GroupId>,
    record_undo: bool,
}

impl Default for EventContext {
    fn default() -> Self {
        Self::new()
    }
}

impl EventContext {
    /// Ungrouped, undo recording on.
    pub fn new() -> Self {
        Self {
            group: None,
            record_undo: true,
        }
    }

    /// Same context inside a group. Keeps the current group if there is one,
    /// so nested scopes join their outer action.
    pub fn grouped(&self) -> Self {
        Self {
            group: Some(self.group.clone().unwrap_or_else(GroupId::generate)),
            record_undo: self.record_undo,
        }
    }

    /// Same context with an explicit group id.
    pub fn with_group(&self, group: GroupId) -> Self {
        Self {
            group: Some(group),
            record_undo: self.record_undo,
        }
    }

    /// Same context with undo recording off.
    pub fn without_undo(&self) -> Self {
        Self {
            group: self.group.clone(),
            record_undo: false,
        }
    }

    pub fn group(&self) -> Option<&GroupId> {
        self.group.as_ref()
    }

    pub fn records_undo(&self) -> bool {
        self.record_undo
    }
}
