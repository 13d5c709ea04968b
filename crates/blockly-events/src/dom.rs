//! Block subtree ↔ XML snapshot.
//!
//! The snapshot dialect:
//!
//! ```xml
//! <block type="controls_if" id="b1" x="10" y="20" collapsed="true">
//!   <mutation else="1"/>
//!   <comment>why this exists</comment>
//!   <field name="OP">EQ</field>
//!   <value name="IF0"><block type="logic_boolean" id="b2">…</block></value>
//!   <statement name="DO0"><block …/></statement>
//!   <next><block …/></next>
//! </block>
//! ```
//!
//! Shadow blocks use `<shadow>` in place of `<block>`. `x`/`y` appear only on
//! top-level snapshots taken with position.

use blockly_types::{BlockId, Coordinate, Element};

use crate::block::{Block, Input, InputKind, Mutator};
use crate::workspace::Workspace;
use crate::{EventError, Result};

/// Serialize a block and all its descendants, without position.
pub fn block_to_dom(workspace: &Workspace, id: &BlockId) -> Option<Element> {
    let block = workspace.get_block_by_id(id)?;
    let mut el = Element::new(if block.shadow { "shadow" } else { "block" })
        .with_attr("type", block.block_type.as_str())
        .with_attr("id", block.id.as_str());

    if let Some(m) = &block.mutator {
        el.push_child(m.state.clone());
    }
    for (name, value) in &block.fields {
        el.push_child(Element::new("field").with_attr("name", name.as_str()).with_text(value.as_str()));
    }
    if let Some(comment) = &block.comment {
        el.push_child(Element::new("comment").with_text(comment.as_str()));
    }
    for input in &block.inputs {
        let mut container = Element::new(input.kind.to_string()).with_attr("name", input.name.as_str());
        if let Some(child) = input.target.as_ref().and_then(|t| block_to_dom(workspace, t)) {
            container.push_child(child);
        }
        el.push_child(container);
    }
    if let Some(inline) = block.inputs_inline {
        el.set_attr("inline", inline.to_string());
    }
    if block.collapsed {
        el.set_attr("collapsed", "true");
    }
    if block.disabled {
        el.set_attr("disabled", "true");
    }
    if let Some(next) = block.next.as_ref().and_then(|n| block_to_dom(workspace, n)) {
        el.push_child(Element::new("next").with_child(next));
    }
    Some(el)
}

/// Serialize a block subtree with its surface position in `x`/`y`.
pub fn block_to_dom_with_xy(workspace: &Workspace, id: &BlockId) -> Option<Element> {
    let mut el = block_to_dom(workspace, id)?;
    let xy = workspace.block_xy(id)?;
    el.set_attr("x", (xy.x.round() as i64).to_string());
    el.set_attr("y", (xy.y.round() as i64).to_string());
    Some(el)
}

/// Snapshot for an event record: with position only when the workspace is
/// rendered.
pub fn snapshot(workspace: &Workspace, id: &BlockId) -> Option<Element> {
    if workspace.is_rendered() {
        block_to_dom_with_xy(workspace, id)
    } else {
        block_to_dom(workspace, id)
    }
}

/// Serialize every top-level block into an `<xml>` document.
pub fn workspace_to_dom(workspace: &Workspace) -> Element {
    let mut xml = Element::new("xml");
    for id in workspace.top_block_ids() {
        if let Some(el) = block_to_dom_with_xy(workspace, &id) {
            xml.push_child(el);
        }
    }
    xml
}

/// Materialize a `<block>`/`<shadow>` snapshot (and its descendants) into
/// the workspace. A snapshot id that is already taken gets a fresh id.
/// Returns the id of the new root block.
///
/// On error the workspace is left as it was: blocks already materialized
/// from the snapshot are removed again.
pub fn dom_to_block(workspace: &mut Workspace, xml: &Element) -> Result<BlockId> {
    let mut created = Vec::new();
    build_block(workspace, xml, &mut created).inspect_err(|_| discard(workspace, &created))
}

/// Remove blocks built by a failed load, newest first.
fn discard(workspace: &mut Workspace, created: &[BlockId]) {
    tracing::debug!(count = created.len(), "discarding partially loaded snapshot");
    for id in created.iter().rev() {
        workspace.dispose(id);
    }
}

fn build_block(workspace: &mut Workspace, xml: &Element, created: &mut Vec<BlockId>) -> Result<BlockId> {
    if xml.name != "block" && xml.name != "shadow" {
        return Err(EventError::NotABlock(xml.name.clone()));
    }
    let block_type = xml
        .attr("type")
        .ok_or_else(|| EventError::Malformed(format!("<{}> without type", xml.name)))?;

    let id = match xml.attr("id") {
        Some(id) if !workspace.contains(&BlockId::from(id)) => BlockId::from(id),
        Some(id) => {
            let fresh = BlockId::generate();
            tracing::warn!(block_id = id, fresh_id = %fresh, "block id already in use, assigning a fresh id");
            fresh
        }
        None => BlockId::generate(),
    };

    let mut block = Block::new(id.clone(), block_type);
    block.shadow = xml.name == "shadow";
    block.inputs_inline = xml.attr("inline").map(|v| v == "true");
    block.collapsed = xml.attr("collapsed") == Some("true");
    block.disabled = xml.attr("disabled") == Some("true");

    let mut plugged: Vec<(String, &Element)> = Vec::new();
    let mut next: Option<&Element> = None;

    for child in xml.elements() {
        match child.name.as_str() {
            "mutation" => {
                block.mutator = Some(Mutator {
                    state: child.clone(),
                    open: false,
                });
            }
            "comment" => block.comment = Some(child.text()),
            "field" => {
                let name = child
                    .attr("name")
                    .ok_or_else(|| EventError::Malformed("<field> without name".into()))?;
                block.fields.insert(name.to_string(), child.text());
            }
            "value" | "statement" => {
                let name = child
                    .attr("name")
                    .ok_or_else(|| EventError::Malformed(format!("<{}> without name", child.name)))?;
                let kind = if child.name == "value" {
                    InputKind::Value
                } else {
                    InputKind::Statement
                };
                block.inputs.push(Input::new(name, kind));
                // A real block hides a shadow in the same socket.
                let target = child.child("block").or_else(|| child.child("shadow"));
                if let Some(target) = target {
                    plugged.push((name.to_string(), target));
                }
            }
            "next" => next = child.child("block").or_else(|| child.child("shadow")),
            other => {
                tracing::debug!(block_id = %id, element = other, "ignoring unknown block child");
            }
        }
    }

    workspace.add_block(block)?;
    created.push(id.clone());

    for (input, child_xml) in plugged {
        let child_id = build_block(workspace, child_xml, created)?;
        workspace.connect(&child_id, &id, Some(&input))?;
    }
    if let Some(next_xml) = next {
        let next_id = build_block(workspace, next_xml, created)?;
        workspace.connect(&next_id, &id, None)?;
    }

    Ok(id)
}

/// Materialize a snapshot into the workspace. Accepts either an `<xml>`
/// document of top-level blocks or a single `<block>`. Top-level `x`/`y`
/// attributes set the surface position. Returns the new top-level ids.
/// Loading is all or nothing.
pub fn dom_to_workspace(workspace: &mut Workspace, xml: &Element) -> Result<Vec<BlockId>> {
    let roots: Vec<&Element> = if xml.name == "xml" {
        xml.elements()
            .filter(|e| e.name == "block" || e.name == "shadow")
            .collect()
    } else {
        vec![xml]
    };

    let mut created = Vec::new();
    let mut ids = Vec::with_capacity(roots.len());
    for root in roots {
        let id = match build_block(workspace, root, &mut created) {
            Ok(id) => id,
            Err(err) => {
                discard(workspace, &created);
                return Err(err);
            }
        };
        if let Some(xy) = position_of(root) {
            // The block was just added.
            let _ = workspace.move_to(&id, xy);
        }
        ids.push(id);
    }
    Ok(ids)
}

fn position_of(xml: &Element) -> Option<Coordinate> {
    let x = xml.attr("x")?.parse().ok()?;
    let y = xml.attr("y")?.parse().ok()?;
    Some(Coordinate::new(x, y))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const IF_XML: &str = r#"<block type="controls_if" id="if" x="15" y="30">
        <mutation else="1"/>
        <comment>check first</comment>
        <value name="IF0"><block type="logic_boolean" id="cond"><field name="BOOL">TRUE</field></block></value>
        <statement name="DO0"><block type="text_print" id="p1"><next><block type="text_print" id="p2"/></next></block></statement>
        <next><shadow type="text_print" id="s1"/></next>
    </block>"#;

    fn load() -> Workspace {
        let mut ws = Workspace::new();
        dom_to_workspace(&mut ws, &Element::parse(IF_XML).unwrap()).unwrap();
        ws
    }

    #[test]
    fn test_dom_to_workspace_builds_tree() {
        let ws = load();
        assert_eq!(ws.block_count(), 5);
        let root = ws.get_block_by_id(&"if".into()).unwrap();
        assert_eq!(root.xy, Coordinate::new(15.0, 30.0));
        assert_eq!(root.comment_text(), Some("check first"));
        assert_eq!(root.mutation_to_dom().unwrap().attr("else"), Some("1"));
        assert_eq!(root.get_input("IF0").unwrap().target, Some(BlockId::from("cond")));
        assert!(ws.get_block_by_id(&"s1".into()).unwrap().is_shadow());
        assert_eq!(ws.get_block_by_id(&"cond".into()).unwrap().get_field_value("BOOL"), Some("TRUE"));

        let order: Vec<String> = ws.descendant_ids(&"if".into()).iter().map(|i| i.to_string()).collect();
        assert_eq!(order, vec!["if", "cond", "p1", "p2", "s1"]);
    }

    #[test]
    fn test_block_to_dom_roundtrip() {
        let ws = load();
        let dom = block_to_dom_with_xy(&ws, &"if".into()).unwrap();

        let mut other = Workspace::new();
        dom_to_workspace(&mut other, &dom).unwrap();
        assert_eq!(block_to_dom_with_xy(&other, &"if".into()).unwrap(), dom);
    }

    #[test]
    fn test_snapshot_position_follows_rendered() {
        let mut ws = load();
        let headless = snapshot(&ws, &"if".into()).unwrap();
        assert!(headless.attr("x").is_none());

        ws.set_rendered(true);
        let rendered = snapshot(&ws, &"if".into()).unwrap();
        assert_eq!(rendered.attr("x"), Some("15"));
        assert_eq!(rendered.attr("y"), Some("30"));
    }

    #[test]
    fn test_duplicate_id_gets_fresh_id() {
        let mut ws = load();
        let xml = Element::parse(r#"<block type="text_print" id="p1"/>"#).unwrap();
        let id = dom_to_block(&mut ws, &xml).unwrap();
        assert_ne!(id, BlockId::from("p1"));
        assert_eq!(ws.block_count(), 6);
    }

    #[test]
    fn test_rejects_non_block() {
        let mut ws = Workspace::new();
        let err = dom_to_block(&mut ws, &Element::new("field")).unwrap_err();
        assert!(matches!(err, EventError::NotABlock(_)));
        let err = dom_to_block(&mut ws, &Element::new("block")).unwrap_err();
        assert!(matches!(err, EventError::Malformed(_)));
    }

    #[test]
    fn test_bad_descendant_leaves_workspace_unchanged() {
        let mut ws = Workspace::new();
        let xml = Element::parse(r#"<block type="t" id="r"><next><block id="c"/></next></block>"#).unwrap();
        let err = dom_to_block(&mut ws, &xml).unwrap_err();
        assert!(matches!(err, EventError::Malformed(_)));
        assert_eq!(ws.block_count(), 0);

        // A failure deep in a value input unwinds the blocks above it too.
        let mut ws = load();
        let before = workspace_to_dom(&ws);
        let xml = Element::parse(
            r#"<block type="a" id="x1"><value name="V"><block type="b" id="x2"><next><block type="c"><field>1</field></block></next></block></value></block>"#,
        )
        .unwrap();
        assert!(dom_to_block(&mut ws, &xml).is_err());
        assert_eq!(workspace_to_dom(&ws), before);
    }

    #[test]
    fn test_bad_root_discards_earlier_roots() {
        let mut ws = Workspace::new();
        let xml = Element::parse(r#"<xml><block type="ok" id="a" x="1" y="2"/><block id="b"/></xml>"#).unwrap();
        assert!(dom_to_workspace(&mut ws, &xml).is_err());
        assert_eq!(ws.block_count(), 0);
        assert!(!ws.contains(&"a".into()));
    }

    #[test]
    fn test_workspace_to_dom_lists_top_blocks() {
        let mut ws = load();
        ws.add_block(Block::new("lonely", "text").at(Coordinate::new(100.0, 5.0))).unwrap();
        let xml = workspace_to_dom(&ws);
        assert_eq!(xml.name, "xml");
        let tops: Vec<&str> = xml.elements().filter_map(|e| e.attr("id")).collect();
        assert_eq!(tops, vec!["if", "lonely"]);
    }
}
