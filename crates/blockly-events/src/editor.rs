//! Editor: a workspace wired to an event bus and an undo stack.
//!
//! User actions go through the helper methods here. Each helper mutates the
//! workspace and fires the event that describes the mutation; [`Editor::flush`]
//! then filters the queue, records undoable events, and notifies listeners.
//! [`Editor::undo`] and [`Editor::redo`] pop whole groups off the history and
//! run them backward or forward.

use blockly_types::{BlockId, Coordinate, Element};

use crate::block::Block;
use crate::bus::{EventBus, ListenerId, filter};
use crate::context::EventContext;
use crate::dom;
use crate::event::{ChangeElement, ChangeEvent, ChangeValue, CreateEvent, DeleteEvent, Event, MoveEvent, UiEvent};
use crate::undo::UndoStack;
use crate::workspace::Workspace;
use crate::{EventError, Result};

#[derive(Debug, Default)]
pub struct Editor {
    workspace: Workspace,
    bus: EventBus,
    history: UndoStack,
    selected: Option<BlockId>,
}

impl Editor {
    pub fn new(workspace: Workspace) -> Self {
        Self {
            workspace,
            bus: EventBus::new(),
            history: UndoStack::default(),
            selected: None,
        }
    }

    pub fn with_max_undo(workspace: Workspace, max_undo: usize) -> Self {
        Self {
            history: UndoStack::new(max_undo),
            ..Self::new(workspace)
        }
    }

    pub fn workspace(&self) -> &Workspace {
        &self.workspace
    }

    /// Direct workspace access. Edits made here fire no events.
    pub fn workspace_mut(&mut self) -> &mut Workspace {
        &mut self.workspace
    }

    pub fn into_workspace(self) -> Workspace {
        self.workspace
    }

    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    pub fn bus_mut(&mut self) -> &mut EventBus {
        &mut self.bus
    }

    pub fn history(&self) -> &UndoStack {
        &self.history
    }

    pub fn history_mut(&mut self) -> &mut UndoStack {
        &mut self.history
    }

    pub fn selected(&self) -> Option<&BlockId> {
        self.selected.as_ref()
    }

    pub fn add_listener(&mut self, listener: impl FnMut(&Event) + 'static) -> ListenerId {
        self.bus.add_listener(listener)
    }

    pub fn remove_listener(&mut self, id: ListenerId) -> bool {
        self.bus.remove_listener(id)
    }

    // =========================================================================
    // Dispatch
    // =========================================================================

    pub fn fire(&mut self, event: Event) -> bool {
        self.bus.fire(event)
    }

    /// Deliver the queued events: filter, record for undo, notify listeners.
    /// Returns what was delivered.
    pub fn flush(&mut self) -> Vec<Event> {
        let events = self.bus.take_filtered();
        for event in &events {
            self.history.record(event.clone());
            self.bus.notify(event);
        }
        events
    }

    /// Apply an event that happened elsewhere (a decoded record) and fire it
    /// as if it had happened here. Nothing is delivered until [`flush`].
    ///
    /// [`flush`]: Editor::flush
    pub fn replay(&mut self, event: Event) {
        let echo = event.run(&mut self.workspace, true);
        self.bus.fire(event);
        if let Some(echo) = echo {
            self.bus.fire(echo);
        }
    }

    /// Undo the newest action (one event, or one whole group). Returns the
    /// number of events run; zero if there was nothing to undo.
    pub fn undo(&mut self) -> usize {
        self.step(false)
    }

    pub fn redo(&mut self) -> usize {
        self.step(true)
    }

    fn step(&mut self, redo: bool) -> usize {
        self.flush();
        let events = filter(self.history.pop_group(redo), redo);
        tracing::debug!(redo, count = events.len(), "stepping history");
        for event in &events {
            if let Some(echo) = event.run(&mut self.workspace, redo) {
                self.bus.fire(echo);
            }
        }
        // Echoes reach listeners but never the history.
        for echo in self.bus.take_filtered() {
            self.bus.notify(&echo);
        }
        events.len()
    }

    // =========================================================================
    // Structure
    // =========================================================================

    /// Add a standalone block and fire its creation.
    pub fn add_block(&mut self, block: Block, ctx: &EventContext) -> Result<BlockId> {
        let id = block.id.clone();
        self.workspace.add_block(block)?;
        let event = CreateEvent::new(&self.workspace, &id, ctx)?;
        self.bus.fire(event.into());
        Ok(id)
    }

    /// Materialize a `<block>` snapshot or an `<xml>` document and fire one
    /// creation per top-level block. Several blocks share one group.
    pub fn create_block_from_xml(&mut self, xml: &Element, ctx: &EventContext) -> Result<Vec<BlockId>> {
        let roots = dom::dom_to_workspace(&mut self.workspace, xml)?;
        let ctx = if roots.len() > 1 { ctx.grouped() } else { ctx.clone() };
        for id in &roots {
            let event = CreateEvent::new(&self.workspace, id, &ctx)?;
            self.bus.fire(event.into());
        }
        Ok(roots)
    }

    /// Delete a block and its subtree. A connected block is unplugged first,
    /// recorded as a move in the same group as the delete.
    pub fn delete_block(&mut self, id: &BlockId, ctx: &EventContext) -> Result<Vec<BlockId>> {
        let ctx = ctx.grouped();
        if self.workspace.parent_of(id).is_some() {
            let mut unplug = MoveEvent::new(&self.workspace, id, &ctx)?;
            self.workspace.unplug(id)?;
            unplug.record_new(&self.workspace)?;
            self.bus.fire(unplug.into());
        }
        let event = DeleteEvent::new(&self.workspace, id, &ctx)?;
        self.bus.fire(event.into());
        let removed = self.workspace.dispose(id);
        if self.selected.as_ref().is_some_and(|s| removed.contains(s)) {
            self.selected = None;
        }
        Ok(removed)
    }

    /// Unplug a block if needed and put it at an absolute position.
    pub fn move_to(&mut self, id: &BlockId, xy: Coordinate, ctx: &EventContext) -> Result<bool> {
        let mut event = MoveEvent::new(&self.workspace, id, ctx)?;
        self.workspace.unplug(id)?;
        self.workspace.move_to(id, xy)?;
        event.record_new(&self.workspace)?;
        Ok(self.fire_unless_null(event.into()))
    }

    /// Plug `child` into `parent` (`input = None` for the next connection).
    /// Blocks pushed aside by the connection get their own moves in the
    /// same group.
    pub fn connect(
        &mut self,
        child: &BlockId,
        parent: &BlockId,
        input: Option<&str>,
        ctx: &EventContext,
    ) -> Result<()> {
        let ctx = ctx.grouped();
        let parent_block = self
            .workspace
            .get_block_by_id(parent)
            .ok_or_else(|| EventError::BlockNotFound(parent.clone()))?;
        let displaced = match input {
            Some(name) => parent_block.get_input(name).and_then(|i| i.target.clone()),
            None => parent_block.next.clone(),
        }
        .filter(|d| d != child);

        let mut moves = vec![MoveEvent::new(&self.workspace, child, &ctx)?];
        if let Some(displaced) = &displaced {
            moves.push(MoveEvent::new(&self.workspace, displaced, &ctx)?);
        }

        self.workspace.connect(child, parent, input)?;

        for mut event in moves {
            event.record_new(&self.workspace)?;
            self.fire_unless_null(event.into());
        }
        Ok(())
    }

    // =========================================================================
    // Properties
    // =========================================================================

    /// Set an existing field. Returns `false` if the value did not change.
    pub fn set_field(&mut self, id: &BlockId, name: &str, value: &str, ctx: &EventContext) -> Result<bool> {
        let old = self
            .block(id)?
            .get_field_value(name)
            .ok_or_else(|| EventError::FieldNotFound {
                block: id.clone(),
                field: name.to_string(),
            })?
            .to_string();
        self.commit_change(id, ChangeElement::Field, Some(name), old.into(), value.into(), ctx, |b| {
            b.set_field_value(name, value);
        })
    }

    pub fn set_collapsed(&mut self, id: &BlockId, collapsed: bool, ctx: &EventContext) -> Result<bool> {
        let old = self.block(id)?.collapsed;
        self.commit_change(id, ChangeElement::Collapsed, None, old.into(), collapsed.into(), ctx, |b| {
            b.set_collapsed(collapsed)
        })
    }

    /// Recorded under the `disabled` element, so the values are inverted.
    pub fn set_enabled(&mut self, id: &BlockId, enabled: bool, ctx: &EventContext) -> Result<bool> {
        let old = self.block(id)?.disabled;
        self.commit_change(id, ChangeElement::Disabled, None, old.into(), (!enabled).into(), ctx, |b| {
            b.set_enabled(enabled)
        })
    }

    pub fn set_inputs_inline(&mut self, id: &BlockId, inline: bool, ctx: &EventContext) -> Result<bool> {
        let old = self.block(id)?.inputs_inline.unwrap_or(false);
        self.commit_change(id, ChangeElement::Inline, None, old.into(), inline.into(), ctx, |b| {
            b.set_inputs_inline(inline)
        })
    }

    /// Set the comment text; empty removes the comment.
    pub fn set_comment(&mut self, id: &BlockId, text: &str, ctx: &EventContext) -> Result<bool> {
        let old = self.block(id)?.comment_text().unwrap_or_default().to_string();
        self.commit_change(id, ChangeElement::Comment, None, old.into(), text.into(), ctx, |b| {
            b.set_comment_text(text)
        })
    }

    /// Replace a block's structural state.
    pub fn set_mutation(&mut self, id: &BlockId, state: Element, ctx: &EventContext) -> Result<bool> {
        let old = self
            .block(id)?
            .mutation_to_dom()
            .ok_or_else(|| EventError::NoMutator(id.clone()))?
            .to_text()?;
        let new = state.to_text()?;
        self.commit_change(id, ChangeElement::Mutation, None, old.into(), new.into(), ctx, |b| {
            b.dom_to_mutation(state);
        })
    }

    // =========================================================================
    // View
    // =========================================================================

    /// Change the selection. Fires a `selected` ui event when it changed.
    pub fn select(&mut self, id: Option<&BlockId>, ctx: &EventContext) -> Result<bool> {
        if let Some(id) = id
            && !self.workspace.contains(id)
        {
            return Err(EventError::BlockNotFound(id.clone()));
        }
        if self.selected.as_ref() == id {
            return Ok(false);
        }
        let event = UiEvent::new(
            &self.workspace,
            id,
            "selected",
            self.selected.as_ref().map(BlockId::as_str),
            id.map(BlockId::as_str),
            ctx,
        );
        self.selected = id.cloned();
        Ok(self.bus.fire(event.into()))
    }

    fn block(&self, id: &BlockId) -> Result<&Block> {
        self.workspace
            .get_block_by_id(id)
            .ok_or_else(|| EventError::BlockNotFound(id.clone()))
    }

    #[allow(clippy::too_many_arguments)]
    fn commit_change(
        &mut self,
        id: &BlockId,
        element: ChangeElement,
        name: Option<&str>,
        old: ChangeValue,
        new: ChangeValue,
        ctx: &EventContext,
        apply: impl FnOnce(&mut Block),
    ) -> Result<bool> {
        let event = ChangeEvent::new(&self.workspace, id, element, name, old, new, ctx)?;
        if event.is_null() {
            return Ok(false);
        }
        if let Some(block) = self.workspace.get_block_mut(id) {
            apply(block);
        }
        self.bus.fire(event.into());
        Ok(true)
    }

    fn fire_unless_null(&mut self, event: Event) -> bool {
        if event.is_null() {
            return false;
        }
        self.bus.fire(event)
    }
}
