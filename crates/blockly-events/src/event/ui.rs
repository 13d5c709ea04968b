//! View interactions: selection, toolbox category, bubble open/close.
//!
//! Ui events notify listeners but never change the document, so they are
//! never recorded for undo and running one does nothing.

use serde::{Deserialize, Serialize};

use blockly_types::BlockId;

use super::EventBase;
use crate::context::EventContext;
use crate::workspace::Workspace;

/// A view-only interaction.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UiEvent {
    #[serde(flatten)]
    pub base: EventBase,

    /// What happened: `selected`, `category`, `click`, `commentOpen`,
    /// `mutatorOpen`, `warningOpen`, ...
    pub element: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub old_value: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_value: Option<String>,
}

impl UiEvent {
    pub fn new(
        workspace: &Workspace,
        block_id: Option<&BlockId>,
        element: impl Into<String>,
        old_value: Option<&str>,
        new_value: Option<&str>,
        ctx: &EventContext,
    ) -> Self {
        let mut base = EventBase::new(Some(workspace.id()), block_id.cloned(), ctx);
        base.record_undo = false;
        Self {
            base,
            element: element.into(),
            old_value: old_value.map(str::to_string),
            new_value: new_value.map(str::to_string),
        }
    }

    /// Never null: an interaction happened even when it carries no values
    /// (a bare `click`).
    pub fn is_null(&self) -> bool {
        false
    }
}
