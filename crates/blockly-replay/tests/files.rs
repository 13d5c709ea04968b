//! Loading snapshots and logs from disk.

use std::fs;

use blockly_events::dom;
use blockly_replay::{ReplayConfig, load_events, load_workspace, replay};

const SNAPSHOT: &str = r#"<xml xmlns="https://developers.google.com/blockly/xml">
  <block type="variables_set" id="set" x="38" y="63">
    <field name="VAR">count</field>
    <value name="VALUE"><block type="math_number" id="num"><field name="NUM">0</field></block></value>
  </block>
</xml>"#;

const LOG: &str = r#"{"type": "change", "blockId": "num", "element": "field", "name": "NUM", "oldValue": "0", "newValue": "42"}
{"type": "change", "blockId": "set", "element": "comment", "oldValue": "", "newValue": "the answer"}
{"type": "move", "blockId": "num", "oldParentId": "set", "oldInputName": "VALUE", "newCoordinate": "200,200"}
"#;

#[test]
fn test_replay_from_files() {
    let dir = tempfile::tempdir().unwrap();
    let ws_path = dir.path().join("start.xml");
    let log_path = dir.path().join("log.jsonl");
    fs::write(&ws_path, SNAPSHOT).unwrap();
    fs::write(&log_path, LOG).unwrap();

    let config = ReplayConfig {
        rendered: true,
        ..Default::default()
    };
    let ws = load_workspace(&ws_path, &config).unwrap();
    assert_eq!(ws.block_count(), 2);
    let events = load_events(&log_path, &ws).unwrap();
    assert_eq!(events.len(), 3);

    let (ws, report) = replay(ws, events, 1, 0, &config);
    assert_eq!(report.delivered, 3);
    assert_eq!(report.undone, 1);

    // The move was undone; the field and comment edits stand.
    assert_eq!(ws.parent_of(&"num".into()).unwrap().parent.as_str(), "set");
    let num = ws.get_block_by_id(&"num".into()).unwrap();
    assert_eq!(num.get_field_value("NUM"), Some("42"));
    let set = ws.get_block_by_id(&"set".into()).unwrap();
    assert_eq!(set.comment_text(), Some("the answer"));

    let out = dom::workspace_to_dom(&ws).to_text().unwrap();
    assert!(out.contains(r#"<field name="NUM">42</field>"#));
}

#[test]
fn test_missing_files_name_the_path() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("absent.xml");
    let err = load_workspace(&missing, &ReplayConfig::default()).unwrap_err();
    assert!(format!("{err:#}").contains("absent.xml"));
}
