//! Single-property changes on one block.
//!
//! A [`ChangeEvent`] names the property (`element`), an optional sub-key
//! (`name`, the field name for `element = field`), and the values before and
//! after. Running it sets the property to one side or the other.

use std::borrow::Cow;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use blockly_types::{BlockId, Element};

use super::{Event, EventBase};
use crate::context::EventContext;
use crate::workspace::Workspace;
use crate::Result;

/// Which property of a block changed.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ChangeElement {
    /// A field value; `name` selects the field.
    Field,
    /// Comment text; empty clears the comment.
    Comment,
    Collapsed,
    Disabled,
    /// Inputs-inline layout flag.
    Inline,
    /// Structural state (`<mutation>` XML as text).
    Mutation,
    /// Any other tag. Kept so records round-trip; running one is a no-op.
    Other(String),
}

impl ChangeElement {
    pub fn as_str(&self) -> &str {
        match self {
            ChangeElement::Field => "field",
            ChangeElement::Comment => "comment",
            ChangeElement::Collapsed => "collapsed",
            ChangeElement::Disabled => "disabled",
            ChangeElement::Inline => "inline",
            ChangeElement::Mutation => "mutation",
            ChangeElement::Other(s) => s,
        }
    }
}

impl FromStr for ChangeElement {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(match s {
            "field" => ChangeElement::Field,
            "comment" => ChangeElement::Comment,
            "collapsed" => ChangeElement::Collapsed,
            "disabled" => ChangeElement::Disabled,
            "inline" => ChangeElement::Inline,
            "mutation" => ChangeElement::Mutation,
            other => ChangeElement::Other(other.to_string()),
        })
    }
}

impl From<String> for ChangeElement {
    fn from(s: String) -> Self {
        match s.parse() {
            Ok(e) => e,
            Err(never) => match never {},
        }
    }
}

impl From<ChangeElement> for String {
    fn from(e: ChangeElement) -> Self {
        e.as_str().to_string()
    }
}

impl fmt::Display for ChangeElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Old or new value of a change. The wire form is a bare JSON boolean,
/// number, or string.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum ChangeValue {
    Bool(bool),
    Number(f64),
    Text(String),
}

impl Default for ChangeValue {
    fn default() -> Self {
        ChangeValue::Text(String::new())
    }
}

impl ChangeValue {
    /// String coercion used for comparison and for text-valued properties:
    /// booleans become `"true"`/`"false"`, numbers their shortest decimal
    /// form (`3`, not `3.0`), text is unchanged.
    pub fn as_text(&self) -> Cow<'_, str> {
        match self {
            ChangeValue::Bool(b) => Cow::Borrowed(if *b { "true" } else { "false" }),
            ChangeValue::Number(n) => Cow::Owned(n.to_string()),
            ChangeValue::Text(s) => Cow::Borrowed(s),
        }
    }

    /// Boolean coercion for flag properties. Text is true unless empty or
    /// `"false"`; numbers are true unless zero or NaN.
    pub fn is_truthy(&self) -> bool {
        match self {
            ChangeValue::Bool(b) => *b,
            ChangeValue::Number(n) => *n != 0.0 && !n.is_nan(),
            ChangeValue::Text(s) => !s.is_empty() && s != "false",
        }
    }
}

/// Largest magnitude at which every integer is exact in an `f64`.
const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_991.0;

impl Serialize for ChangeValue {
    /// Whole numbers go back out as JSON integers (`3`, not `3.0`).
    fn serialize<S: Serializer>(&self, s: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            ChangeValue::Bool(b) => s.serialize_bool(*b),
            ChangeValue::Number(n) if n.fract() == 0.0 && n.abs() <= MAX_SAFE_INTEGER => s.serialize_i64(*n as i64),
            ChangeValue::Number(n) => s.serialize_f64(*n),
            ChangeValue::Text(t) => s.serialize_str(t),
        }
    }
}

impl fmt::Display for ChangeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_text())
    }
}

impl From<bool> for ChangeValue {
    fn from(b: bool) -> Self {
        ChangeValue::Bool(b)
    }
}

impl From<f64> for ChangeValue {
    fn from(n: f64) -> Self {
        ChangeValue::Number(n)
    }
}

impl From<&str> for ChangeValue {
    fn from(s: &str) -> Self {
        ChangeValue::Text(s.to_string())
    }
}

impl From<String> for ChangeValue {
    fn from(s: String) -> Self {
        ChangeValue::Text(s)
    }
}

fn null_as_empty<'de, D: Deserializer<'de>>(d: D) -> std::result::Result<ChangeValue, D::Error> {
    Ok(Option::<ChangeValue>::deserialize(d)?.unwrap_or_default())
}

/// One property of one block changed.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeEvent {
    #[serde(flatten)]
    pub base: EventBase,

    pub element: ChangeElement,

    /// Field name for `element = field`; empty otherwise.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,

    #[serde(default, deserialize_with = "null_as_empty")]
    pub old_value: ChangeValue,

    #[serde(default, deserialize_with = "null_as_empty")]
    pub new_value: ChangeValue,
}

impl Default for ChangeEvent {
    fn default() -> Self {
        Self {
            base: EventBase::default(),
            element: ChangeElement::Other(String::new()),
            name: String::new(),
            old_value: ChangeValue::default(),
            new_value: ChangeValue::default(),
        }
    }
}

impl ChangeEvent {
    /// Record a property change on a live block. A missing `name` is stored
    /// as the empty string.
    pub fn new(
        workspace: &Workspace,
        id: &BlockId,
        element: ChangeElement,
        name: Option<&str>,
        old_value: impl Into<ChangeValue>,
        new_value: impl Into<ChangeValue>,
        ctx: &EventContext,
    ) -> Result<Self> {
        let (base, _) = EventBase::for_block(workspace, id, ctx)?;
        Ok(Self {
            base,
            element,
            name: name.unwrap_or_default().to_string(),
            old_value: old_value.into(),
            new_value: new_value.into(),
        })
    }

    /// True when old and new are equal after string coercion, so
    /// `Bool(true)` equals `Text("true")` and `Number(5.0)` equals
    /// `Text("5")`, but `Bool(false)` does not equal `Text("")`.
    pub fn is_null(&self) -> bool {
        self.old_value.as_text() == self.new_value.as_text()
    }

    pub(crate) fn run(&self, workspace: &mut Workspace, forward: bool) -> Option<Event> {
        let workspace_id = workspace.id();
        let Some(id) = self.base.block_id.as_ref() else {
            tracing::warn!(element = %self.element, "change event without block id");
            return None;
        };
        let Some(block) = workspace.get_block_mut(id) else {
            tracing::warn!(block_id = %id, element = %self.element, "can't change non-existent block");
            return None;
        };
        if block.is_mutator_open() {
            // The mutator would show stale structure once this lands.
            block.set_mutator_open(false);
        }

        let value = if forward { &self.new_value } else { &self.old_value };
        match &self.element {
            ChangeElement::Field => {
                if !block.set_field_value(&self.name, value.as_text()) {
                    tracing::warn!(block_id = %id, field = %self.name, "can't set non-existent field");
                }
            }
            ChangeElement::Comment => block.set_comment_text(&value.as_text()),
            ChangeElement::Collapsed => block.set_collapsed(value.is_truthy()),
            ChangeElement::Disabled => block.set_enabled(!value.is_truthy()),
            ChangeElement::Inline => block.set_inputs_inline(value.is_truthy()),
            ChangeElement::Mutation => {
                let old_mutation = match block.mutation_to_dom().map(Element::to_text) {
                    Some(Ok(text)) => text,
                    Some(Err(e)) => {
                        tracing::warn!(block_id = %id, error = %e, "can't serialize current mutation");
                        String::new()
                    }
                    None => String::new(),
                };
                // A falsy value resets to the bare state; the echo reports
                // what was applied, not what was asked for.
                let applied = if value.is_truthy() {
                    value.as_text()
                } else {
                    Cow::Borrowed("<mutation/>")
                };
                if block.has_mutator() {
                    match Element::parse(&applied) {
                        Ok(dom) => {
                            block.dom_to_mutation(dom);
                        }
                        Err(e) => {
                            tracing::warn!(block_id = %id, error = %e, "can't parse mutation");
                            return None;
                        }
                    }
                }
                // Echo for listeners tracking structural diffs directly. Same
                // group as this event, and never recorded for undo: the
                // change is already on the stack as this event.
                let echo = ChangeEvent {
                    base: EventBase {
                        workspace_id: Some(workspace_id),
                        block_id: Some(id.clone()),
                        group: self.base.group.clone(),
                        record_undo: false,
                    },
                    element: ChangeElement::Mutation,
                    name: String::new(),
                    old_value: ChangeValue::Text(old_mutation),
                    new_value: ChangeValue::Text(applied.into_owned()),
                };
                return Some(Event::Change(echo));
            }
            ChangeElement::Other(tag) => {
                tracing::warn!(block_id = %id, element = %tag, "unknown change type");
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Block;
    use blockly_types::GroupId;
    use serde_json::json;

    fn workspace() -> Workspace {
        let mut ws = Workspace::new();
        ws.add_block(Block::new("b1", "math_number").with_field("NUM", "1")).unwrap();
        ws.add_block(Block::new("m1", "controls_if").with_mutator(Element::new("mutation"))).unwrap();
        ws
    }

    fn change(
        ws: &Workspace,
        id: &str,
        element: ChangeElement,
        name: Option<&str>,
        old: impl Into<ChangeValue>,
        new: impl Into<ChangeValue>,
    ) -> ChangeEvent {
        ChangeEvent::new(ws, &id.into(), element, name, old, new, &EventContext::new()).unwrap()
    }

    #[test]
    fn test_is_null_same_values() {
        let ws = workspace();
        assert!(change(&ws, "b1", ChangeElement::Collapsed, None, true, true).is_null());
        assert!(change(&ws, "b1", ChangeElement::Collapsed, None, false, false).is_null());
        assert!(change(&ws, "b1", ChangeElement::Field, Some("NUM"), "5", "5").is_null());
        assert!(change(&ws, "b1", ChangeElement::Comment, None, "", "").is_null());
        assert!(change(&ws, "b1", ChangeElement::Field, Some("NUM"), 5.0, "5").is_null());
        assert!(change(&ws, "b1", ChangeElement::Collapsed, None, true, "true").is_null());
    }

    #[test]
    fn test_is_null_coercion_boundary() {
        let ws = workspace();
        assert!(!change(&ws, "b1", ChangeElement::Collapsed, None, false, true).is_null());
        assert!(!change(&ws, "b1", ChangeElement::Comment, None, false, "").is_null());
        assert!(!change(&ws, "b1", ChangeElement::Field, Some("NUM"), 0.0, "").is_null());
    }

    #[test]
    fn test_truthiness() {
        assert!(ChangeValue::from("x").is_truthy());
        assert!(!ChangeValue::from("").is_truthy());
        assert!(!ChangeValue::from("false").is_truthy());
        assert!(!ChangeValue::from(0.0).is_truthy());
        assert!(!ChangeValue::from(f64::NAN).is_truthy());
        assert!(ChangeValue::from(2.0).is_truthy());
    }

    #[test]
    fn test_collapsed_forward_backward() {
        let mut ws = workspace();
        let event = change(&ws, "b1", ChangeElement::Collapsed, None, false, true);

        assert!(event.run(&mut ws, true).is_none());
        assert!(ws.get_block_by_id(&"b1".into()).unwrap().collapsed);

        event.run(&mut ws, false);
        assert!(!ws.get_block_by_id(&"b1".into()).unwrap().collapsed);
    }

    #[test]
    fn test_disabled_and_inline() {
        let mut ws = workspace();
        change(&ws, "b1", ChangeElement::Disabled, None, false, true).run(&mut ws, true);
        change(&ws, "b1", ChangeElement::Inline, None, false, true).run(&mut ws, true);
        let block = ws.get_block_by_id(&"b1".into()).unwrap();
        assert!(!block.is_enabled());
        assert_eq!(block.inputs_inline, Some(true));
    }

    #[test]
    fn test_field_and_comment() {
        let mut ws = workspace();
        change(&ws, "b1", ChangeElement::Field, Some("NUM"), "1", "42").run(&mut ws, true);
        change(&ws, "b1", ChangeElement::Comment, None, "", "hello").run(&mut ws, true);
        let block = ws.get_block_by_id(&"b1".into()).unwrap();
        assert_eq!(block.get_field_value("NUM"), Some("42"));
        assert_eq!(block.comment_text(), Some("hello"));

        change(&ws, "b1", ChangeElement::Comment, None, "", "hello").run(&mut ws, false);
        assert_eq!(ws.get_block_by_id(&"b1".into()).unwrap().comment_text(), None);
    }

    #[test]
    fn test_missing_field_is_noop() {
        let mut ws = workspace();
        let before = ws.get_block_by_id(&"b1".into()).unwrap().clone();
        change(&ws, "b1", ChangeElement::Field, Some("NOPE"), "", "x").run(&mut ws, true);
        assert_eq!(ws.get_block_by_id(&"b1".into()).unwrap(), &before);
    }

    #[test]
    fn test_missing_block_is_noop() {
        let mut ws = workspace();
        let event = change(&ws, "b1", ChangeElement::Collapsed, None, false, true);
        let mut empty = Workspace::new();
        assert!(event.run(&mut empty, true).is_none());
        assert!(empty.is_empty());
        ws.dispose(&"b1".into());
        assert!(event.run(&mut ws, true).is_none());
    }

    #[test]
    fn test_unknown_element_is_noop() {
        let mut ws = workspace();
        let before = ws.get_block_by_id(&"b1".into()).unwrap().clone();
        let event = change(&ws, "b1", ChangeElement::Other("colour".into()), None, "", "#fff");
        assert!(event.run(&mut ws, true).is_none());
        assert_eq!(ws.get_block_by_id(&"b1".into()).unwrap(), &before);
    }

    #[test]
    fn test_mutation_echo() {
        let mut ws = workspace();
        let ctx = EventContext::new().with_group(GroupId::from("g1"));
        let event = ChangeEvent::new(
            &ws,
            &"m1".into(),
            ChangeElement::Mutation,
            None,
            "<mutation/>",
            r#"<mutation elseif="2"/>"#,
            &ctx,
        )
        .unwrap();
        ws.get_block_mut(&"m1".into()).unwrap().set_mutator_open(true);

        let echo = event.run(&mut ws, true).expect("mutation run echoes");
        let block = ws.get_block_by_id(&"m1".into()).unwrap();
        assert!(!block.is_mutator_open());
        assert_eq!(block.mutation_to_dom().unwrap().attr("elseif"), Some("2"));

        let Event::Change(echo) = echo else {
            panic!("echo is not a change event");
        };
        assert_eq!(echo.element, ChangeElement::Mutation);
        assert_eq!(echo.old_value, ChangeValue::from("<mutation/>"));
        assert_eq!(echo.new_value, ChangeValue::from(r#"<mutation elseif="2"/>"#));
        assert_eq!(echo.base.group, Some(GroupId::from("g1")));
        assert!(!echo.base.record_undo);
    }

    #[test]
    fn test_mutation_empty_value_resets() {
        let mut ws = workspace();
        ws.get_block_mut(&"m1".into())
            .unwrap()
            .dom_to_mutation(Element::new("mutation").with_attr("else", "1"));
        let event = change(&ws, "m1", ChangeElement::Mutation, None, "", r#"<mutation else="1"/>"#);

        let echo = event.run(&mut ws, false).unwrap();
        assert!(ws.get_block_by_id(&"m1".into()).unwrap().mutation_to_dom().unwrap().is_bare());
        let Event::Change(echo) = echo else {
            panic!("echo is not a change event");
        };
        assert_eq!(echo.old_value, ChangeValue::from(r#"<mutation else="1"/>"#));
        assert_eq!(echo.new_value, ChangeValue::from("<mutation/>"));
    }

    #[test]
    fn test_json_shape_and_name_omission() {
        let ws = workspace();
        let event = Event::from(change(&ws, "b1", ChangeElement::Collapsed, None, false, true));
        let value = event.to_json().unwrap();
        assert_eq!(
            value,
            json!({"type": "change", "blockId": "b1", "element": "collapsed", "oldValue": false, "newValue": true})
        );

        let field = Event::from(change(&ws, "b1", ChangeElement::Field, Some("NUM"), "1", "2"));
        assert_eq!(field.to_json().unwrap()["name"], json!("NUM"));
    }

    #[test]
    fn test_decode_sets_empty_name_and_values() {
        let ws = workspace();
        let event = Event::from_json(
            &json!({"type": "change", "blockId": "b1", "element": "comment", "newValue": null}),
            &ws,
        )
        .unwrap();
        let Event::Change(event) = event else {
            panic!("decoded wrong variant");
        };
        assert_eq!(event.name, "");
        assert_eq!(event.old_value, ChangeValue::default());
        assert_eq!(event.new_value, ChangeValue::default());
        assert!(event.is_null());
    }

    #[test]
    fn test_decode_number_and_unknown_element() {
        let ws = workspace();
        let event = Event::from_json(
            &json!({"type": "change", "blockId": "b1", "element": "colour", "oldValue": 3, "newValue": "3"}),
            &ws,
        )
        .unwrap();
        let Event::Change(event) = event else {
            panic!("decoded wrong variant");
        };
        assert_eq!(event.element, ChangeElement::Other("colour".into()));
        assert_eq!(event.old_value, ChangeValue::Number(3.0));
        assert!(event.is_null());
        assert_eq!(Event::from(event).to_json().unwrap()["element"], json!("colour"));
    }

    #[test]
    fn test_numbers_keep_their_wire_form() {
        let ws = workspace();
        let record = json!({"type": "change", "blockId": "b1", "element": "field", "name": "NUM", "oldValue": 3, "newValue": 2.5});
        let event = Event::from_json(&record, &ws).unwrap();
        assert_eq!(event.to_json().unwrap(), record);

        assert_eq!(serde_json::to_string(&ChangeValue::Number(-7.0)).unwrap(), "-7");
        assert_eq!(serde_json::to_string(&ChangeValue::Number(1e300)).unwrap(), "1e300");
    }
}
