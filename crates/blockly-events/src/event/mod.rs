//! Workspace events.
//!
//! Every mutation of a block document is captured as an [`Event`]: an
//! immutable record that can be serialized to JSON, decoded again, and run
//! forward (apply) or backward (reverse) against a workspace.
//!
//! # Shape
//!
//! [`Event`] is a closed enum. Each variant is a struct that embeds an
//! [`EventBase`] by value and adds its own payload:
//!
//! |---------|------------------|-------------------------------------------------|
//! | Variant | Tag              | Payload                                         |
//! |---------|------------------|-------------------------------------------------|
//! | Create  | `"create"`       | subtree snapshot + pre-order ids                |
//! | Delete  | `"delete"`       | subtree snapshot + pre-order ids                |
//! | Change  | `"change"`       | element, name, old/new value                    |
//! | Move    | `"move"`         | old/new parent, input, coordinate               |
//! | Ui      | `"ui"`           | element, old/new value (never undoable)         |
//! |---------|------------------|-------------------------------------------------|
//!
//! # Wire Format
//!
//! ```json
//! {"type": "create", "blockId": "b1", "group": "g", "recordUndo": false,
//!  "xml": "<block type=\"text\" id=\"b1\"/>", "ids": ["b1"]}
//! ```
//!
//! `group` is omitted when ungrouped, `recordUndo` only when false. The
//! workspace id never goes on the wire; a decoded event is bound to the
//! workspace it is decoded against.
//!
//! Events hold ids, never block references, so a record can be replayed
//! against a different but equivalent workspace.

mod change;
mod create;
mod delete;
mod movement;
mod ui;

pub use change::{ChangeElement, ChangeEvent, ChangeValue};
pub use create::CreateEvent;
pub use delete::DeleteEvent;
pub use movement::MoveEvent;
pub use ui::UiEvent;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use blockly_types::{BlockId, GroupId, WorkspaceId};

use crate::block::Block;
use crate::context::EventContext;
use crate::workspace::Workspace;
use crate::{EventError, Result};

/// Event kind tag. The `type` field of every record.
#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    Hash,
    strum::Display,
    strum::EnumString,
    strum::EnumIter,
    strum::IntoStaticStr,
)]
#[strum(serialize_all = "lowercase")]
pub enum EventType {
    Create,
    Delete,
    Change,
    Move,
    Ui,
}

impl EventType {
    /// Every known event type, in declaration order.
    pub const ALL: [EventType; 5] = [
        EventType::Create,
        EventType::Delete,
        EventType::Change,
        EventType::Move,
        EventType::Ui,
    ];

    pub fn as_str(&self) -> &'static str {
        self.into()
    }

    /// Whether events of this type must carry a block id.
    pub fn is_block_scoped(&self) -> bool {
        !matches!(self, EventType::Ui)
    }
}

/// Fields shared by every event.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventBase {
    /// Owning workspace. Bound at construction or decode; not serialized.
    #[serde(skip)]
    pub workspace_id: Option<WorkspaceId>,

    /// Affected block. Required for every block-scoped event.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub block_id: Option<BlockId>,

    /// Logical action this event belongs to.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "empty_group_as_none"
    )]
    pub group: Option<GroupId>,

    /// Whether the undo stack should keep this event.
    #[serde(default = "default_true", skip_serializing_if = "is_true")]
    pub record_undo: bool,
}

impl Default for EventBase {
    fn default() -> Self {
        Self {
            workspace_id: None,
            block_id: None,
            group: None,
            record_undo: true,
        }
    }
}

impl EventBase {
    pub fn new(workspace_id: Option<WorkspaceId>, block_id: Option<BlockId>, ctx: &EventContext) -> Self {
        Self {
            workspace_id,
            block_id,
            group: ctx.group().cloned(),
            record_undo: ctx.records_undo(),
        }
    }

    /// Base for a block-scoped event built from a live block.
    pub(crate) fn for_block<'w>(
        workspace: &'w Workspace,
        id: &BlockId,
        ctx: &EventContext,
    ) -> Result<(Self, &'w Block)> {
        let block = workspace
            .get_block_by_id(id)
            .ok_or_else(|| EventError::BlockNotFound(id.clone()))?;
        Ok((Self::new(Some(workspace.id()), Some(id.clone()), ctx), block))
    }
}

fn default_true() -> bool {
    true
}

fn is_true(v: &bool) -> bool {
    *v
}

fn empty_group_as_none<'de, D: Deserializer<'de>>(d: D) -> std::result::Result<Option<GroupId>, D::Error> {
    let group: Option<GroupId> = Option::deserialize(d)?;
    Ok(group.filter(|g| !g.is_empty()))
}

/// Serde adapter: an [`Element`](blockly_types::Element) travels as XML text.
pub(crate) mod xml_text {
    use blockly_types::Element;
    use serde::{Deserialize, Deserializer, Serializer, de, ser};

    pub fn serialize<S: Serializer>(el: &Element, s: S) -> Result<S::Ok, S::Error> {
        let text = el.to_text().map_err(ser::Error::custom)?;
        s.serialize_str(&text)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Element, D::Error> {
        let text = String::deserialize(d)?;
        Element::parse(&text).map_err(de::Error::custom)
    }
}

/// A workspace event.
#[derive(Clone, Debug, PartialEq)]
pub enum Event {
    Create(CreateEvent),
    Delete(DeleteEvent),
    Change(ChangeEvent),
    Move(MoveEvent),
    Ui(UiEvent),
}

impl Event {
    pub fn event_type(&self) -> EventType {
        match self {
            Event::Create(_) => EventType::Create,
            Event::Delete(_) => EventType::Delete,
            Event::Change(_) => EventType::Change,
            Event::Move(_) => EventType::Move,
            Event::Ui(_) => EventType::Ui,
        }
    }

    pub fn base(&self) -> &EventBase {
        match self {
            Event::Create(e) => &e.base,
            Event::Delete(e) => &e.base,
            Event::Change(e) => &e.base,
            Event::Move(e) => &e.base,
            Event::Ui(e) => &e.base,
        }
    }

    pub fn base_mut(&mut self) -> &mut EventBase {
        match self {
            Event::Create(e) => &mut e.base,
            Event::Delete(e) => &mut e.base,
            Event::Change(e) => &mut e.base,
            Event::Move(e) => &mut e.base,
            Event::Ui(e) => &mut e.base,
        }
    }

    pub fn block_id(&self) -> Option<&BlockId> {
        self.base().block_id.as_ref()
    }

    pub fn group(&self) -> Option<&GroupId> {
        self.base().group.as_ref()
    }

    pub fn workspace_id(&self) -> Option<WorkspaceId> {
        self.base().workspace_id
    }

    pub fn record_undo(&self) -> bool {
        self.base().record_undo
    }

    /// True if the event records no actual change. A query only: callers
    /// decide whether to drop null events before firing.
    pub fn is_null(&self) -> bool {
        match self {
            Event::Create(_) | Event::Delete(_) => false,
            Event::Change(e) => e.is_null(),
            Event::Move(e) => e.is_null(),
            Event::Ui(e) => e.is_null(),
        }
    }

    /// Apply (`forward`) or reverse the event against a workspace.
    ///
    /// Never fails: missing targets are logged and skipped. Returns the one
    /// follow-up event the run produced, if any (the echo of a mutation
    /// change), which the caller is expected to fire.
    pub fn run(&self, workspace: &mut Workspace, forward: bool) -> Option<Event> {
        tracing::trace!(
            event_type = %self.event_type(),
            block_id = ?self.block_id(),
            forward,
            "running event"
        );
        match self {
            Event::Create(e) => {
                e.run(workspace, forward);
                None
            }
            Event::Delete(e) => {
                e.run(workspace, forward);
                None
            }
            Event::Change(e) => e.run(workspace, forward),
            Event::Move(e) => {
                e.run(workspace, forward);
                None
            }
            Event::Ui(_) => None,
        }
    }

    // =========================================================================
    // JSON
    // =========================================================================

    /// Encode as a JSON record with the `type` tag.
    pub fn to_json(&self) -> Result<Value> {
        let mut value = match self {
            Event::Create(e) => serde_json::to_value(e)?,
            Event::Delete(e) => serde_json::to_value(e)?,
            Event::Change(e) => serde_json::to_value(e)?,
            Event::Move(e) => serde_json::to_value(e)?,
            Event::Ui(e) => serde_json::to_value(e)?,
        };
        match value.as_object_mut() {
            Some(map) => {
                map.insert("type".into(), Value::String(self.event_type().to_string()));
                // Ui records never carry recordUndo; it is implied false.
                if self.event_type() == EventType::Ui {
                    map.remove("recordUndo");
                }
            }
            None => return Err(EventError::Malformed("event did not encode as an object".into())),
        }
        Ok(value)
    }

    pub fn to_json_string(&self) -> Result<String> {
        Ok(serde_json::to_string(&self.to_json()?)?)
    }

    /// Decode a JSON record. The `type` tag is read first and selects the
    /// variant; the decoded event is bound to `workspace`.
    pub fn from_json(value: &Value, workspace: &Workspace) -> Result<Event> {
        let tag = value
            .get("type")
            .and_then(Value::as_str)
            .ok_or_else(|| EventError::Malformed("missing \"type\"".into()))?;
        let event_type: EventType = tag
            .parse()
            .map_err(|_| EventError::UnknownEventType(tag.to_string()))?;

        let mut event = match event_type {
            EventType::Create => Event::Create(CreateEvent::deserialize(value)?),
            EventType::Delete => Event::Delete(DeleteEvent::deserialize(value)?),
            EventType::Change => Event::Change(ChangeEvent::deserialize(value)?),
            EventType::Move => Event::Move(MoveEvent::deserialize(value)?),
            EventType::Ui => Event::Ui(UiEvent::deserialize(value)?),
        };

        if event_type.is_block_scoped() && event.block_id().is_none() {
            return Err(EventError::Malformed(format!("{} event without \"blockId\"", event_type)));
        }
        if event_type == EventType::Ui {
            event.base_mut().record_undo = false;
        }
        event.base_mut().workspace_id = Some(workspace.id());
        Ok(event)
    }

    pub fn from_json_str(text: &str, workspace: &Workspace) -> Result<Event> {
        let value: Value = serde_json::from_str(text)?;
        Self::from_json(&value, workspace)
    }
}

impl From<CreateEvent> for Event {
    fn from(e: CreateEvent) -> Self {
        Event::Create(e)
    }
}

impl From<DeleteEvent> for Event {
    fn from(e: DeleteEvent) -> Self {
        Event::Delete(e)
    }
}

impl From<ChangeEvent> for Event {
    fn from(e: ChangeEvent) -> Self {
        Event::Change(e)
    }
}

impl From<MoveEvent> for Event {
    fn from(e: MoveEvent) -> Self {
        Event::Move(e)
    }
}

impl From<UiEvent> for Event {
    fn from(e: UiEvent) -> Self {
        Event::Ui(e)
    }
}
