//! Block creation.

use serde::{Deserialize, Serialize};

use blockly_types::{BlockId, Element};

use super::{EventBase, xml_text};
use crate::context::EventContext;
use crate::workspace::Workspace;
use crate::{EventError, Result, dom};

/// A block (and its whole subtree) came into existence.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateEvent {
    #[serde(flatten)]
    pub base: EventBase,

    /// Snapshot of the created subtree. Carries `x`/`y` only if the
    /// workspace was rendered at construction.
    #[serde(with = "xml_text")]
    pub xml: Element,

    /// Root plus every descendant, pre-order.
    pub ids: Vec<BlockId>,
}

impl CreateEvent {
    /// Capture a live block that was just created.
    ///
    /// Shadow blocks are not recorded for undo: they come and go as a side
    /// effect of connecting and disconnecting real blocks.
    pub fn new(workspace: &Workspace, id: &BlockId, ctx: &EventContext) -> Result<Self> {
        let (mut base, block) = EventBase::for_block(workspace, id, ctx)?;
        if block.is_shadow() {
            base.record_undo = false;
        }
        let xml = dom::snapshot(workspace, id).ok_or_else(|| EventError::BlockNotFound(id.clone()))?;
        Ok(Self {
            base,
            xml,
            ids: workspace.descendant_ids(id),
        })
    }

    pub(crate) fn run(&self, workspace: &mut Workspace, forward: bool) {
        if forward {
            if let Err(e) = dom::dom_to_workspace(workspace, &self.xml) {
                tracing::warn!(block_id = ?self.base.block_id, error = %e, "can't recreate block");
            }
            return;
        }
        for id in &self.ids {
            if workspace.contains(id) {
                // Disposes the subtree too; later ids in the list may
                // already be gone by the time we reach them.
                workspace.dispose(id);
            } else if self.base.block_id.as_ref() == Some(id) {
                tracing::warn!(block_id = %id, "can't uncreate non-existent block");
            }
        }
    }
}
