//! Block deletion. The mirror image of [`CreateEvent`](super::CreateEvent).

use serde::{Deserialize, Serialize};

use blockly_types::{BlockId, Element};

use super::{EventBase, xml_text};
use crate::context::EventContext;
use crate::workspace::Workspace;
use crate::{EventError, Result, dom};

/// A block (and its whole subtree) is about to be deleted.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteEvent {
    #[serde(flatten)]
    pub base: EventBase,

    /// Snapshot of the subtree before deletion.
    #[serde(with = "xml_text")]
    pub old_xml: Element,

    /// Root plus every descendant, pre-order.
    pub ids: Vec<BlockId>,
}

impl DeleteEvent {
    /// Capture a live block before it is disposed. The block must already be
    /// unplugged; a connected block's removal is recorded as a move first.
    pub fn new(workspace: &Workspace, id: &BlockId, ctx: &EventContext) -> Result<Self> {
        let (mut base, block) = EventBase::for_block(workspace, id, ctx)?;
        if block.parent.is_some() {
            return Err(EventError::ConnectedBlock(id.clone()));
        }
        if block.is_shadow() {
            base.record_undo = false;
        }
        let old_xml = dom::snapshot(workspace, id).ok_or_else(|| EventError::BlockNotFound(id.clone()))?;
        Ok(Self {
            base,
            old_xml,
            ids: workspace.descendant_ids(id),
        })
    }

    pub(crate) fn run(&self, workspace: &mut Workspace, forward: bool) {
        if !forward {
            if let Err(e) = dom::dom_to_workspace(workspace, &self.old_xml) {
                tracing::warn!(block_id = ?self.base.block_id, error = %e, "can't restore deleted block");
            }
            return;
        }
        for id in &self.ids {
            if workspace.contains(id) {
                workspace.dispose(id);
            } else if self.base.block_id.as_ref() == Some(id) {
                tracing::warn!(block_id = %id, "can't delete non-existent block");
            }
        }
    }
}
