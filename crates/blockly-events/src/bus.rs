//! Event dispatch log: fire queue, merge filter, listeners.
//!
//! Events are fired into a queue as mutations happen and delivered in
//! batches. Before delivery the batch is run through [`filter`], which drops
//! events that record no change and folds runs of related events into one
//! (a drag that fires twenty moves delivers one).
//!
//! # Merge Rules
//!
//! Events merge only with an earlier event of the same type, block,
//! workspace, and group:
//!
//! - **Move**: adjacent moves fold into the first (old location from the
//!   first, new location from the last).
//! - **Change**: changes to the same element and name fold into the first
//!   (old value from the first, new value from the last).
//! - **Ui**: a `click` folds into a prior `commentOpen`, `mutatorOpen`, or
//!   `warningOpen`.
//!
//! Merged events that end up null are dropped. Mutation changes are then
//! moved to the front (after the first event) so structure is in place
//! before anything that depends on it is replayed.

use std::collections::HashMap;
use std::fmt;

use blockly_types::{BlockId, GroupId, WorkspaceId};

use crate::event::{ChangeElement, Event, EventType};

/// Handle returned by [`EventBus::add_listener`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

type Listener = Box<dyn FnMut(&Event)>;

/// Fire queue plus listeners.
pub struct EventBus {
    queue: Vec<Event>,
    /// Nesting depth of `disable()` calls.
    disabled: u32,
    listeners: Vec<(ListenerId, Listener)>,
    next_listener: u64,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("queued", &self.queue.len())
            .field("disabled", &self.disabled)
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

impl EventBus {
    pub fn new() -> Self {
        Self {
            queue: Vec::new(),
            disabled: 0,
            listeners: Vec::new(),
            next_listener: 0,
        }
    }

    /// Queue an event. Dropped (returns `false`) while the bus is disabled.
    pub fn fire(&mut self, event: Event) -> bool {
        if !self.is_enabled() {
            tracing::trace!(event_type = %event.event_type(), "bus disabled, dropping event");
            return false;
        }
        self.queue.push(event);
        true
    }

    /// Stop accepting events. Nests: each call needs a matching `enable`.
    pub fn disable(&mut self) {
        self.disabled += 1;
    }

    pub fn enable(&mut self) {
        self.disabled = self.disabled.saturating_sub(1);
    }

    pub fn is_enabled(&self) -> bool {
        self.disabled == 0
    }

    /// Events queued and not yet taken.
    pub fn pending(&self) -> &[Event] {
        &self.queue
    }

    /// Drain the queue in fire order, unfiltered.
    pub fn take_raw(&mut self) -> Vec<Event> {
        std::mem::take(&mut self.queue)
    }

    /// Drain the queue through [`filter`].
    pub fn take_filtered(&mut self) -> Vec<Event> {
        filter(self.take_raw(), true)
    }

    pub fn add_listener(&mut self, listener: impl FnMut(&Event) + 'static) -> ListenerId {
        let id = ListenerId(self.next_listener);
        self.next_listener += 1;
        self.listeners.push((id, Box::new(listener)));
        id
    }

    /// Returns `false` if no listener had this id.
    pub fn remove_listener(&mut self, id: ListenerId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(lid, _)| *lid != id);
        self.listeners.len() != before
    }

    /// Call every listener with one event, in registration order.
    pub fn notify(&mut self, event: &Event) {
        for (_, listener) in &mut self.listeners {
            listener(event);
        }
    }
}

/// Identity under which events may merge.
#[derive(Clone, PartialEq, Eq, Hash)]
struct MergeKey {
    event_type: EventType,
    block_id: Option<BlockId>,
    workspace_id: Option<WorkspaceId>,
    group: Option<GroupId>,
}

impl MergeKey {
    fn of(event: &Event) -> Self {
        Self {
            event_type: event.event_type(),
            block_id: event.block_id().cloned(),
            workspace_id: event.workspace_id(),
            group: event.group().cloned(),
        }
    }
}

/// Fold `next` into `prev` if the merge rules allow. `adjacent` says whether
/// `prev` was the last thing folded at the position right before `next`.
fn fold(prev: &mut Event, next: &Event, adjacent: bool) -> bool {
    match (prev, next) {
        (Event::Move(prev), Event::Move(next)) if adjacent => {
            prev.new_parent_id = next.new_parent_id.clone();
            prev.new_input_name = next.new_input_name.clone();
            prev.new_coordinate = next.new_coordinate;
            true
        }
        (Event::Change(prev), Event::Change(next)) if prev.element == next.element && prev.name == next.name => {
            prev.new_value = next.new_value.clone();
            true
        }
        (Event::Ui(prev), Event::Ui(next))
            if next.element == "click"
                && matches!(prev.element.as_str(), "commentOpen" | "mutatorOpen" | "warningOpen") =>
        {
            prev.new_value = next.new_value.clone();
            true
        }
        _ => false,
    }
}

/// Merge and prune a batch of events. `forward = false` treats the batch as
/// newest-first (an undo batch): it is reversed for merging and the result
/// is returned newest-first again.
pub fn filter(mut queue: Vec<Event>, forward: bool) -> Vec<Event> {
    if !forward {
        queue.reverse();
    }

    let mut merged: Vec<Event> = Vec::with_capacity(queue.len());
    // key -> (slot in `merged`, queue index of the last event folded there)
    let mut seen: HashMap<MergeKey, (usize, usize)> = HashMap::new();

    for (i, event) in queue.into_iter().enumerate() {
        if event.is_null() {
            continue;
        }
        let key = MergeKey::of(&event);
        let folded = match seen.get_mut(&key) {
            Some((slot, last)) => {
                let adjacent = *last + 1 == i;
                let folded = fold(&mut merged[*slot], &event, adjacent);
                if folded {
                    *last = i;
                }
                folded
            }
            None => false,
        };
        if !folded {
            seen.insert(key, (merged.len(), i));
            merged.push(event);
        }
    }

    merged.retain(|e| !e.is_null());
    if !forward {
        merged.reverse();
    }

    // Mutation changes to the front. The first event stays put.
    for i in 1..merged.len() {
        let is_mutation = matches!(&merged[i], Event::Change(c) if c.element == ChangeElement::Mutation);
        if is_mutation {
            let event = merged.remove(i);
            merged.insert(0, event);
        }
    }

    merged
}
