//! In-memory workspace: the block index and the block tree.
//!
//! The workspace is the single owner of every block. Blocks refer to each
//! other by id, and all link maintenance (connect, unplug, dispose) goes
//! through here so parent and child pointers never disagree.
//!
//! # Tree Shape
//!
//! ```text
//! top-level block (parent = None, xy meaningful)
//! ├── input "IF0"  (value)      → child block
//! ├── input "DO0"  (statement)  → child block → next → next ...
//! └── next                      → following block in the stack
//! ```
//!
//! Workspace mutations do not fire events. Callers that want undo and
//! listener notification go through [`Editor`](crate::Editor).

use indexmap::IndexMap;

use blockly_types::{BlockId, Coordinate, WorkspaceId};

use crate::block::{Block, ParentLink};
use crate::{EventError, Result};

/// A block document.
#[derive(Clone, Debug)]
pub struct Workspace {
    id: WorkspaceId,
    /// Whether a view is attached. Snapshots include positions only when set.
    rendered: bool,
    /// Block index in insertion order.
    blocks: IndexMap<BlockId, Block>,
}

impl Default for Workspace {
    fn default() -> Self {
        Self::new()
    }
}

impl Workspace {
    /// Create an empty, headless workspace.
    pub fn new() -> Self {
        Self::with_id(WorkspaceId::new())
    }

    pub fn with_id(id: WorkspaceId) -> Self {
        Self {
            id,
            rendered: false,
            blocks: IndexMap::new(),
        }
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    pub fn id(&self) -> WorkspaceId {
        self.id
    }

    pub fn is_rendered(&self) -> bool {
        self.rendered
    }

    pub fn set_rendered(&mut self, rendered: bool) {
        self.rendered = rendered;
    }

    pub fn get_block_by_id(&self, id: &BlockId) -> Option<&Block> {
        self.blocks.get(id)
    }

    pub fn get_block_mut(&mut self, id: &BlockId) -> Option<&mut Block> {
        self.blocks.get_mut(id)
    }

    pub fn contains(&self, id: &BlockId) -> bool {
        self.blocks.contains_key(id)
    }

    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// All block ids in insertion order.
    pub fn block_ids(&self) -> Vec<BlockId> {
        self.blocks.keys().cloned().collect()
    }

    /// Ids of blocks with no parent, in insertion order.
    pub fn top_block_ids(&self) -> Vec<BlockId> {
        self.blocks
            .values()
            .filter(|b| b.parent.is_none())
            .map(|b| b.id.clone())
            .collect()
    }

    pub fn parent_of(&self, id: &BlockId) -> Option<&ParentLink> {
        self.blocks.get(id).and_then(|b| b.parent.as_ref())
    }

    /// The block and everything below it, pre-order: the block itself, then
    /// each input's subtree in input order, then the next-statement chain.
    /// Empty if the block does not exist.
    pub fn descendant_ids(&self, id: &BlockId) -> Vec<BlockId> {
        let mut out = Vec::new();
        if !self.blocks.contains_key(id) {
            return out;
        }
        let mut stack = vec![id.clone()];
        while let Some(current) = stack.pop() {
            if let Some(block) = self.blocks.get(&current) {
                // Push in reverse so the first child is visited first.
                for child in block.child_ids().into_iter().rev() {
                    stack.push(child);
                }
            }
            out.push(current);
        }
        out
    }

    /// Position of a block relative to the surface.
    pub fn block_xy(&self, id: &BlockId) -> Option<Coordinate> {
        self.blocks.get(id).map(|b| b.xy)
    }

    // =========================================================================
    // Mutations
    // =========================================================================

    /// Insert a detached block. Any parent, input, or next links on the
    /// block are cleared; use [`Workspace::connect`] to attach it.
    pub fn add_block(&mut self, mut block: Block) -> Result<()> {
        if self.blocks.contains_key(&block.id) {
            return Err(EventError::DuplicateBlock(block.id));
        }
        block.parent = None;
        block.next = None;
        for input in &mut block.inputs {
            input.target = None;
        }
        self.blocks.insert(block.id.clone(), block);
        Ok(())
    }

    /// Plug `child` into `parent`. With `input`, the child goes into that
    /// named input and any block already there is unplugged to the top level.
    /// Without, the child becomes the parent's next block and the previous
    /// next block is re-attached below the end of the child's stack.
    pub fn connect(&mut self, child: &BlockId, parent: &BlockId, input: Option<&str>) -> Result<()> {
        if !self.blocks.contains_key(child) {
            return Err(EventError::BlockNotFound(child.clone()));
        }
        let Some(parent_block) = self.blocks.get(parent) else {
            return Err(EventError::BlockNotFound(parent.clone()));
        };
        if let Some(name) = input
            && parent_block.get_input(name).is_none()
        {
            return Err(EventError::InputNotFound {
                block: parent.clone(),
                input: name.to_string(),
            });
        }
        if self.descendant_ids(child).contains(parent) {
            return Err(EventError::Cycle {
                parent: parent.clone(),
                child: child.clone(),
            });
        }

        self.unplug(child)?;

        match input {
            Some(name) => {
                let displaced = self
                    .blocks
                    .get(parent)
                    .and_then(|p| p.get_input(name))
                    .and_then(|i| i.target.clone());
                if let Some(displaced) = displaced {
                    self.unplug(&displaced)?;
                }
                if let Some(slot) = self.blocks.get_mut(parent).and_then(|p| p.get_input_mut(name)) {
                    slot.target = Some(child.clone());
                }
                if let Some(c) = self.blocks.get_mut(child) {
                    c.parent = Some(ParentLink {
                        parent: parent.clone(),
                        input: Some(name.to_string()),
                    });
                }
            }
            None => {
                let old_next = self.blocks.get_mut(parent).and_then(|p| p.next.replace(child.clone()));
                if let Some(c) = self.blocks.get_mut(child) {
                    c.parent = Some(ParentLink {
                        parent: parent.clone(),
                        input: None,
                    });
                }
                if let Some(old_next) = old_next {
                    let tail = self.last_in_stack(child);
                    if let Some(t) = self.blocks.get_mut(&tail) {
                        t.next = Some(old_next.clone());
                    }
                    if let Some(n) = self.blocks.get_mut(&old_next) {
                        n.parent = Some(ParentLink {
                            parent: tail,
                            input: None,
                        });
                    }
                }
            }
        }
        Ok(())
    }

    /// Detach a block from its parent, keeping its own children. The block
    /// keeps its last position. No-op for top-level blocks.
    pub fn unplug(&mut self, id: &BlockId) -> Result<()> {
        let Some(block) = self.blocks.get_mut(id) else {
            return Err(EventError::BlockNotFound(id.clone()));
        };
        let Some(link) = block.parent.take() else {
            return Ok(());
        };
        if let Some(parent) = self.blocks.get_mut(&link.parent) {
            match link.input.as_deref() {
                Some(name) => {
                    if let Some(slot) = parent.get_input_mut(name)
                        && slot.target.as_ref() == Some(id)
                    {
                        slot.target = None;
                    }
                }
                None => {
                    if parent.next.as_ref() == Some(id) {
                        parent.next = None;
                    }
                }
            }
        }
        Ok(())
    }

    /// Remove a block and everything below it. Returns the removed ids in
    /// pre-order; empty if the block was not present.
    pub fn dispose(&mut self, id: &BlockId) -> Vec<BlockId> {
        if !self.blocks.contains_key(id) {
            return Vec::new();
        }
        // Existence was just checked.
        let _ = self.unplug(id);
        let doomed = self.descendant_ids(id);
        for d in &doomed {
            self.blocks.shift_remove(d);
        }
        tracing::trace!(block_id = %id, removed = doomed.len(), "disposed block");
        doomed
    }

    /// Move a block to an absolute surface position.
    pub fn move_to(&mut self, id: &BlockId, xy: Coordinate) -> Result<()> {
        let block = self
            .blocks
            .get_mut(id)
            .ok_or_else(|| EventError::BlockNotFound(id.clone()))?;
        block.xy = xy;
        Ok(())
    }

    /// Move a block by a relative offset.
    pub fn move_by(&mut self, id: &BlockId, dx: f64, dy: f64) -> Result<()> {
        let block = self
            .blocks
            .get_mut(id)
            .ok_or_else(|| EventError::BlockNotFound(id.clone()))?;
        block.xy = block.xy.translate(dx, dy);
        Ok(())
    }

    /// Remove every block.
    pub fn clear(&mut self) {
        self.blocks.clear();
    }

    fn last_in_stack(&self, id: &BlockId) -> BlockId {
        let mut current = id.clone();
        while let Some(next) = self.blocks.get(&current).and_then(|b| b.next.clone()) {
            current = next;
        }
        current
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::InputKind;

    fn ws_with_stack() -> Workspace {
        let mut ws = Workspace::new();
        ws.add_block(Block::new("if", "controls_if").with_input("IF0", InputKind::Value).with_input("DO0", InputKind::Statement))
            .unwrap();
        ws.add_block(Block::new("cond", "logic_boolean").with_field("BOOL", "TRUE")).unwrap();
        ws.add_block(Block::new("p1", "text_print")).unwrap();
        ws.add_block(Block::new("p2", "text_print")).unwrap();
        ws.connect(&"cond".into(), &"if".into(), Some("IF0")).unwrap();
        ws.connect(&"p1".into(), &"if".into(), Some("DO0")).unwrap();
        ws.connect(&"p2".into(), &"p1".into(), None).unwrap();
        ws
    }

    #[test]
    fn test_descendants_pre_order() {
        let ws = ws_with_stack();
        let ids: Vec<String> = ws.descendant_ids(&"if".into()).iter().map(|i| i.to_string()).collect();
        assert_eq!(ids, vec!["if", "cond", "p1", "p2"]);
        assert!(ws.descendant_ids(&"missing".into()).is_empty());
    }

    #[test]
    fn test_duplicate_block_rejected() {
        let mut ws = Workspace::new();
        ws.add_block(Block::new("b1", "text")).unwrap();
        let err = ws.add_block(Block::new("b1", "text")).unwrap_err();
        assert!(matches!(err, EventError::DuplicateBlock(_)));
    }

    #[test]
    fn test_connect_displaces_occupied_input() {
        let mut ws = ws_with_stack();
        ws.add_block(Block::new("cond2", "logic_boolean")).unwrap();
        ws.connect(&"cond2".into(), &"if".into(), Some("IF0")).unwrap();

        assert!(ws.parent_of(&"cond".into()).is_none());
        assert_eq!(
            ws.get_block_by_id(&"if".into()).unwrap().get_input("IF0").unwrap().target,
            Some(BlockId::from("cond2"))
        );
    }

    #[test]
    fn test_connect_next_splices_stack() {
        let mut ws = ws_with_stack();
        ws.add_block(Block::new("mid", "text_print")).unwrap();
        ws.connect(&"mid".into(), &"p1".into(), None).unwrap();

        let ids: Vec<String> = ws.descendant_ids(&"p1".into()).iter().map(|i| i.to_string()).collect();
        assert_eq!(ids, vec!["p1", "mid", "p2"]);
        assert_eq!(ws.parent_of(&"p2".into()).unwrap().parent, BlockId::from("mid"));
    }

    #[test]
    fn test_connect_rejects_cycle_and_missing_input() {
        let mut ws = ws_with_stack();
        let err = ws.connect(&"if".into(), &"p2".into(), None).unwrap_err();
        assert!(matches!(err, EventError::Cycle { .. }));

        ws.add_block(Block::new("x", "text")).unwrap();
        let err = ws.connect(&"x".into(), &"if".into(), Some("NOPE")).unwrap_err();
        assert!(matches!(err, EventError::InputNotFound { .. }));
    }

    #[test]
    fn test_unplug_keeps_children() {
        let mut ws = ws_with_stack();
        ws.unplug(&"p1".into()).unwrap();
        assert!(ws.parent_of(&"p1".into()).is_none());
        assert_eq!(ws.get_block_by_id(&"p1".into()).unwrap().next, Some(BlockId::from("p2")));
        assert!(ws.get_block_by_id(&"if".into()).unwrap().get_input("DO0").unwrap().target.is_none());
        assert_eq!(ws.top_block_ids().len(), 2);
    }

    #[test]
    fn test_dispose_removes_subtree() {
        let mut ws = ws_with_stack();
        let removed = ws.dispose(&"p1".into());
        assert_eq!(removed.len(), 2);
        assert_eq!(ws.block_count(), 2);
        assert!(ws.get_block_by_id(&"if".into()).unwrap().get_input("DO0").unwrap().target.is_none());
        assert!(ws.dispose(&"p1".into()).is_empty());
    }
}
