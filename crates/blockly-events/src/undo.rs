//! Undo/redo history.

use std::collections::VecDeque;

use crate::event::Event;

/// Oldest undo entries are evicted past this depth.
pub const DEFAULT_MAX_UNDO: usize = 1024;

/// Two stacks of recorded events. The back of each deque is the top.
#[derive(Clone, Debug)]
pub struct UndoStack {
    undo: VecDeque<Event>,
    redo: VecDeque<Event>,
    max_undo: usize,
}

impl Default for UndoStack {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_UNDO)
    }
}

impl UndoStack {
    pub fn new(max_undo: usize) -> Self {
        Self {
            undo: VecDeque::new(),
            redo: VecDeque::new(),
            max_undo,
        }
    }

    /// Keep an event for undo. Events with `record_undo = false` are
    /// ignored. A recorded event invalidates the redo stack.
    pub fn record(&mut self, event: Event) -> bool {
        if !event.record_undo() {
            return false;
        }
        self.undo.push_back(event);
        self.redo.clear();
        while self.undo.len() > self.max_undo {
            self.undo.pop_front();
        }
        true
    }

    /// Pop the newest event plus every contiguous event below it that shares
    /// its (non-empty) group, move them onto the opposite stack, and return
    /// them in pop order. `redo` selects which stack to pop from.
    pub fn pop_group(&mut self, redo: bool) -> Vec<Event> {
        let (input, output) = if redo {
            (&mut self.redo, &mut self.undo)
        } else {
            (&mut self.undo, &mut self.redo)
        };

        let Some(first) = input.pop_back() else {
            return Vec::new();
        };
        let group = first.group().cloned();
        let mut events = vec![first];
        if let Some(group) = group {
            while input.back().and_then(Event::group) == Some(&group) {
                if let Some(e) = input.pop_back() {
                    events.push(e);
                }
            }
        }

        output.extend(events.iter().cloned());
        events
    }

    pub fn clear(&mut self) {
        self.undo.clear();
        self.redo.clear();
    }

    pub fn undo_len(&self) -> usize {
        self.undo.len()
    }

    pub fn redo_len(&self) -> usize {
        self.redo.len()
    }

    pub fn can_undo(&self) -> bool {
        !self.undo.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo.is_empty()
    }

    pub fn max_undo(&self) -> usize {
        self.max_undo
    }

    /// Change the depth limit, evicting the oldest entries if it shrank.
    pub fn set_max_undo(&mut self, max_undo: usize) {
        self.max_undo = max_undo;
        while self.undo.len() > self.max_undo {
            self.undo.pop_front();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::EventContext;
    use crate::event::{ChangeElement, ChangeEvent};
    use crate::{Block, Workspace};
    use blockly_types::GroupId;

    fn workspace() -> Workspace {
        let mut ws = Workspace::new();
        ws.add_block(Block::new("b1", "text").with_field("TEXT", "")).unwrap();
        ws
    }

    fn edit(ws: &Workspace, n: usize, ctx: &EventContext) -> Event {
        let old = n.to_string();
        let new = (n + 1).to_string();
        ChangeEvent::new(ws, &"b1".into(), ChangeElement::Field, Some("TEXT"), old, new, ctx)
            .unwrap()
            .into()
    }

    #[test]
    fn test_record_skips_unrecorded() {
        let ws = workspace();
        let mut stack = UndoStack::default();
        assert!(!stack.record(edit(&ws, 0, &EventContext::new().without_undo())));
        assert!(!stack.can_undo());
        assert!(stack.record(edit(&ws, 0, &EventContext::new())));
        assert_eq!(stack.undo_len(), 1);
    }

    #[test]
    fn test_record_clears_redo() {
        let ws = workspace();
        let ctx = EventContext::new();
        let mut stack = UndoStack::default();
        stack.record(edit(&ws, 0, &ctx));
        stack.pop_group(false);
        assert!(stack.can_redo());
        stack.record(edit(&ws, 1, &ctx));
        assert!(!stack.can_redo());
    }

    #[test]
    fn test_eviction() {
        let ws = workspace();
        let ctx = EventContext::new();
        let mut stack = UndoStack::new(3);
        for n in 0..5 {
            stack.record(edit(&ws, n, &ctx));
        }
        assert_eq!(stack.undo_len(), 3);
        // Oldest surviving entry is the third recorded.
        let popped: Vec<Event> = (0..3).flat_map(|_| stack.pop_group(false)).collect();
        assert_eq!(popped.last(), Some(&edit(&ws, 2, &ctx)));

        stack.set_max_undo(1);
        assert_eq!(stack.max_undo(), 1);
    }

    #[test]
    fn test_pop_group_takes_contiguous_group() {
        let ws = workspace();
        let g = EventContext::new().with_group(GroupId::from("g"));
        let mut stack = UndoStack::default();
        stack.record(edit(&ws, 0, &g));
        stack.record(edit(&ws, 1, &EventContext::new()));
        stack.record(edit(&ws, 2, &g));
        stack.record(edit(&ws, 3, &g));

        let popped = stack.pop_group(false);
        assert_eq!(popped, vec![edit(&ws, 3, &g), edit(&ws, 2, &g)]);
        assert_eq!(stack.undo_len(), 2);
        assert_eq!(stack.redo_len(), 2);

        // Ungrouped events come off one at a time.
        assert_eq!(stack.pop_group(false).len(), 1);
        assert_eq!(stack.pop_group(false).len(), 1);
        assert!(stack.pop_group(false).is_empty());
    }

    #[test]
    fn test_redo_pops_in_original_order() {
        let ws = workspace();
        let g = EventContext::new().with_group(GroupId::from("g"));
        let mut stack = UndoStack::default();
        stack.record(edit(&ws, 0, &g));
        stack.record(edit(&ws, 1, &g));

        stack.pop_group(false);
        let redone = stack.pop_group(true);
        assert_eq!(redone, vec![edit(&ws, 0, &g), edit(&ws, 1, &g)]);
        assert_eq!(stack.undo_len(), 2);
        assert!(!stack.can_redo());
    }
}
