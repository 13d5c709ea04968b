//! Loading snapshots and event logs, and replaying one onto the other.

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result};
use serde_json::Value;

use blockly_events::{Editor, Element, Event, Workspace, dom};

use crate::config::ReplayConfig;

/// Parse an XML workspace snapshot (`<xml>` document or single `<block>`).
pub fn workspace_from_xml(text: &str, config: &ReplayConfig) -> Result<Workspace> {
    let mut workspace = Workspace::new();
    workspace.set_rendered(config.rendered);
    if text.trim().is_empty() {
        return Ok(workspace);
    }
    let xml = Element::parse(text).context("workspace snapshot is not valid XML")?;
    let tops = dom::dom_to_workspace(&mut workspace, &xml).context("loading workspace snapshot")?;
    tracing::debug!(top_blocks = tops.len(), blocks = workspace.block_count(), "workspace loaded");
    Ok(workspace)
}

pub fn load_workspace(path: &Path, config: &ReplayConfig) -> Result<Workspace> {
    let text = std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    workspace_from_xml(&text, config).with_context(|| format!("in {}", path.display()))
}

/// Decode an event log: either a JSON array of records or one record per
/// line. Events are bound to `workspace`.
pub fn events_from_json(text: &str, workspace: &Workspace) -> Result<Vec<Event>> {
    let trimmed = text.trim_start();
    if trimmed.starts_with('[') {
        let records: Vec<Value> = serde_json::from_str(trimmed).context("event log is not a JSON array")?;
        return records
            .iter()
            .enumerate()
            .map(|(i, record)| Event::from_json(record, workspace).with_context(|| format!("record {i}")))
            .collect();
    }

    text.lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(i, line)| Event::from_json_str(line, workspace).with_context(|| format!("line {}", i + 1)))
        .collect()
}

pub fn load_events(path: &Path, workspace: &Workspace) -> Result<Vec<Event>> {
    let text = std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    events_from_json(&text, workspace).with_context(|| format!("in {}", path.display()))
}

/// What a replay did.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ReplayReport {
    /// Records read from the log.
    pub replayed: usize,
    /// Events delivered after filtering (echoes included).
    pub delivered: usize,
    /// Undo steps taken.
    pub undone: usize,
    /// Redo steps taken.
    pub redone: usize,
}

/// Replay a log, then step back `undo` actions and forward `redo`.
pub fn replay(
    workspace: Workspace,
    events: Vec<Event>,
    undo: usize,
    redo: usize,
    config: &ReplayConfig,
) -> (Workspace, ReplayReport) {
    let mut editor = Editor::with_max_undo(workspace, config.max_undo);
    let mut report = ReplayReport {
        replayed: events.len(),
        ..Default::default()
    };

    for event in events {
        editor.replay(event);
        if !config.filter_on_replay {
            report.delivered += editor.flush().len();
        }
    }
    report.delivered += editor.flush().len();

    for _ in 0..undo {
        if !editor.history().can_undo() {
            break;
        }
        editor.undo();
        report.undone += 1;
    }
    for _ in 0..redo {
        if !editor.history().can_redo() {
            break;
        }
        editor.redo();
        report.redone += 1;
    }
    if report.undone < undo || report.redone < redo {
        tracing::warn!(
            undo_requested = undo,
            undone = report.undone,
            redo_requested = redo,
            redone = report.redone,
            "history ran out"
        );
    }

    (editor.into_workspace(), report)
}

/// Per-record summary for `inspect`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EventSummary {
    pub event_type: &'static str,
    pub block_id: Option<String>,
    pub group: Option<String>,
    pub record_undo: bool,
    pub is_null: bool,
}

impl EventSummary {
    pub fn of(event: &Event) -> Self {
        Self {
            event_type: event.event_type().as_str(),
            block_id: event.block_id().map(ToString::to_string),
            group: event.group().map(ToString::to_string),
            record_undo: event.record_undo(),
            is_null: event.is_null(),
        }
    }
}

/// Count of records per event type, in type-name order.
pub fn count_by_type(events: &[Event]) -> BTreeMap<&'static str, usize> {
    let mut counts = BTreeMap::new();
    for event in events {
        *counts.entry(event.event_type().as_str()).or_insert(0) += 1;
    }
    counts
}
