//! Replay recorded Blockly event logs.
//!
//! Loads a workspace snapshot (XML) and an event log (JSON), replays the log
//! through an [`Editor`](blockly_events::Editor), optionally steps the undo
//! history, and writes the resulting workspace back out as XML.

pub mod config;
pub mod replay;

pub use config::{ReplayConfig, config_file_path};
pub use replay::{
    EventSummary, ReplayReport, count_by_type, events_from_json, load_events, load_workspace, replay, workspace_from_xml,
};
