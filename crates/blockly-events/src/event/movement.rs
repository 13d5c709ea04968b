//! Block moves: reparenting, unplugging, and repositioning.

use serde::{Deserialize, Serialize};

use blockly_types::{BlockId, Coordinate};

use super::EventBase;
use crate::context::EventContext;
use crate::workspace::Workspace;
use crate::{EventError, Result};

/// Where a block sits: plugged into a parent, or loose on the surface.
#[derive(Clone, Debug, Default, PartialEq)]
struct Location {
    parent_id: Option<BlockId>,
    input_name: Option<String>,
    coordinate: Option<Coordinate>,
}

impl Location {
    fn of(workspace: &Workspace, id: &BlockId) -> Self {
        match workspace.get_block_by_id(id) {
            Some(block) => match &block.parent {
                Some(link) => Location {
                    parent_id: Some(link.parent.clone()),
                    input_name: link.input.clone(),
                    coordinate: None,
                },
                None => Location {
                    parent_id: None,
                    input_name: None,
                    coordinate: Some(block.xy),
                },
            },
            None => Location::default(),
        }
    }
}

/// A block moved from one location to another.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoveEvent {
    #[serde(flatten)]
    pub base: EventBase,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub old_parent_id: Option<BlockId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub old_input_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "coordinate_pair")]
    pub old_coordinate: Option<Coordinate>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_parent_id: Option<BlockId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_input_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "coordinate_pair")]
    pub new_coordinate: Option<Coordinate>,
}

impl MoveEvent {
    /// Capture the block's current location as the old location. Call
    /// [`MoveEvent::record_new`] after the move to fill in the new one.
    pub fn new(workspace: &Workspace, id: &BlockId, ctx: &EventContext) -> Result<Self> {
        let (mut base, block) = EventBase::for_block(workspace, id, ctx)?;
        if block.is_shadow() {
            base.record_undo = false;
        }
        let old = Location::of(workspace, id);
        Ok(Self {
            base,
            old_parent_id: old.parent_id,
            old_input_name: old.input_name,
            old_coordinate: old.coordinate,
            ..Default::default()
        })
    }

    /// Capture the block's location after the move.
    pub fn record_new(&mut self, workspace: &Workspace) -> Result<()> {
        let id = self
            .base
            .block_id
            .clone()
            .ok_or_else(|| EventError::Malformed("move event without block id".into()))?;
        if !workspace.contains(&id) {
            return Err(EventError::BlockNotFound(id));
        }
        let new = Location::of(workspace, &id);
        self.new_parent_id = new.parent_id;
        self.new_input_name = new.input_name;
        self.new_coordinate = new.coordinate;
        Ok(())
    }

    fn old_location(&self) -> Location {
        Location {
            parent_id: self.old_parent_id.clone(),
            input_name: self.old_input_name.clone(),
            coordinate: self.old_coordinate,
        }
    }

    fn new_location(&self) -> Location {
        Location {
            parent_id: self.new_parent_id.clone(),
            input_name: self.new_input_name.clone(),
            coordinate: self.new_coordinate,
        }
    }

    pub fn is_null(&self) -> bool {
        self.old_location() == self.new_location()
    }

    pub(crate) fn run(&self, workspace: &mut Workspace, forward: bool) {
        let Some(id) = self.base.block_id.as_ref() else {
            tracing::warn!("move event without block id");
            return;
        };
        let Some(block) = workspace.get_block_by_id(id) else {
            tracing::warn!(block_id = %id, "can't move non-existent block");
            return;
        };
        let attached = block.parent.is_some();
        let target = if forward {
            self.new_location()
        } else {
            self.old_location()
        };

        if let Some(parent) = &target.parent_id
            && !workspace.contains(parent)
        {
            tracing::warn!(block_id = %id, parent_id = %parent, "can't connect to non-existent block");
            return;
        }
        if attached && let Err(e) = workspace.unplug(id) {
            tracing::warn!(block_id = %id, error = %e, "can't unplug block");
            return;
        }

        if let Some(xy) = target.coordinate {
            if let Err(e) = workspace.move_to(id, xy) {
                tracing::warn!(block_id = %id, error = %e, "can't reposition block");
            }
        } else if let Some(parent) = &target.parent_id {
            match workspace.connect(id, parent, target.input_name.as_deref()) {
                Ok(()) => {}
                Err(EventError::InputNotFound { input, .. }) => {
                    tracing::warn!(block_id = %id, input = %input, "can't connect to non-existent input");
                }
                Err(e) => {
                    tracing::warn!(block_id = %id, parent_id = %parent, error = %e, "can't connect block");
                }
            }
        }
    }
}

/// Serde adapter: `Option<Coordinate>` as an `"x,y"` string.
mod coordinate_pair {
    use blockly_types::Coordinate;
    use serde::{Deserialize, Deserializer, Serializer, de};

    pub fn serialize<S: Serializer>(c: &Option<Coordinate>, s: S) -> Result<S::Ok, S::Error> {
        match c {
            Some(c) => s.serialize_str(&c.to_pair()),
            None => s.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Coordinate>, D::Error> {
        match Option::<String>::deserialize(d)? {
            Some(text) => Coordinate::from_pair(&text)
                .map(Some)
                .ok_or_else(|| de::Error::custom(format!("bad coordinate {text:?}"))),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::Event;
    use crate::{Block, InputKind};
    use serde_json::json;

    fn workspace() -> Workspace {
        let mut ws = Workspace::new();
        ws.add_block(Block::new("loop", "controls_whileUntil").with_input("DO", InputKind::Statement))
            .unwrap();
        ws.add_block(Block::new("p1", "text_print").at(Coordinate::new(100.0, 50.0))).unwrap();
        ws
    }

    #[test]
    fn test_plug_into_input_and_undo() {
        let mut ws = workspace();
        let mut event = MoveEvent::new(&ws, &"p1".into(), &EventContext::new()).unwrap();
        ws.connect(&"p1".into(), &"loop".into(), Some("DO")).unwrap();
        event.record_new(&ws).unwrap();

        assert_eq!(event.old_coordinate, Some(Coordinate::new(100.0, 50.0)));
        assert_eq!(event.new_parent_id, Some(BlockId::from("loop")));
        assert_eq!(event.new_input_name.as_deref(), Some("DO"));
        assert!(!event.is_null());

        event.run(&mut ws, false);
        assert!(ws.parent_of(&"p1".into()).is_none());
        assert_eq!(ws.block_xy(&"p1".into()), Some(Coordinate::new(100.0, 50.0)));

        event.run(&mut ws, true);
        assert_eq!(ws.parent_of(&"p1".into()).unwrap().parent, BlockId::from("loop"));
    }

    #[test]
    fn test_reposition_is_not_null() {
        let mut ws = workspace();
        let mut event = MoveEvent::new(&ws, &"p1".into(), &EventContext::new()).unwrap();
        event.record_new(&ws).unwrap();
        assert!(event.is_null());

        ws.move_by(&"p1".into(), 5.0, 5.0).unwrap();
        event.record_new(&ws).unwrap();
        assert!(!event.is_null());
    }

    #[test]
    fn test_missing_parent_is_noop() {
        let mut ws = workspace();
        let event = MoveEvent {
            base: EventBase {
                block_id: Some(BlockId::from("p1")),
                ..Default::default()
            },
            new_parent_id: Some(BlockId::from("ghost")),
            ..Default::default()
        };
        event.run(&mut ws, true);
        assert!(ws.parent_of(&"p1".into()).is_none());
        assert_eq!(ws.block_xy(&"p1".into()), Some(Coordinate::new(100.0, 50.0)));
    }

    #[test]
    fn test_missing_input_leaves_block_loose() {
        let mut ws = workspace();
        let event = MoveEvent {
            base: EventBase {
                block_id: Some(BlockId::from("p1")),
                ..Default::default()
            },
            new_parent_id: Some(BlockId::from("loop")),
            new_input_name: Some("ELSE".into()),
            ..Default::default()
        };
        event.run(&mut ws, true);
        assert!(ws.parent_of(&"p1".into()).is_none());
    }

    #[test]
    fn test_json_roundtrip() {
        let mut ws = workspace();
        let mut event = MoveEvent::new(&ws, &"p1".into(), &EventContext::new().grouped()).unwrap();
        ws.connect(&"p1".into(), &"loop".into(), Some("DO")).unwrap();
        event.record_new(&ws).unwrap();

        let event = Event::from(event);
        let value = event.to_json().unwrap();
        assert_eq!(value["type"], json!("move"));
        assert_eq!(value["oldCoordinate"], json!("100,50"));
        assert_eq!(value["newParentId"], json!("loop"));
        assert_eq!(value["newInputName"], json!("DO"));
        assert!(value.get("newCoordinate").is_none());

        assert_eq!(Event::from_json(&value, &ws).unwrap(), event);
    }

    #[test]
    fn test_bad_coordinate_rejected() {
        let ws = workspace();
        let result = Event::from_json(&json!({"type": "move", "blockId": "p1", "newCoordinate": "left"}), &ws);
        assert!(result.is_err());
    }
}
