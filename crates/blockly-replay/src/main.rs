//! blockly-replay binary.
//!
//! Usage:
//!   # Replay a log onto a snapshot and print the result
//!   blockly-replay replay --workspace start.xml --events log.jsonl
//!
//!   # Replay, then undo the last two actions
//!   blockly-replay replay --workspace start.xml --events log.json --undo 2 --output end.xml
//!
//!   # List the records in a log
//!   blockly-replay inspect --events log.jsonl

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::{EnvFilter, fmt};

use blockly_events::{Workspace, dom};
use blockly_replay::{EventSummary, ReplayConfig, count_by_type, load_events, load_workspace, replay};

/// Replay and inspect Blockly event logs.
#[derive(Parser, Debug)]
#[command(name = "blockly-replay")]
#[command(about = "Replay, undo and inspect Blockly event logs")]
struct Args {
    /// Config file (default: ~/.config/blockly-replay/config.ron)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Apply an event log to a workspace snapshot
    Replay {
        /// Workspace snapshot (XML)
        #[arg(short, long)]
        workspace: PathBuf,

        /// Event log (JSON array or one record per line)
        #[arg(short, long)]
        events: PathBuf,

        /// Undo this many actions after replaying
        #[arg(long, default_value_t = 0)]
        undo: usize,

        /// Redo this many actions after undoing
        #[arg(long, default_value_t = 0)]
        redo: usize,

        /// Write the resulting workspace here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Summarize the records in an event log
    Inspect {
        /// Event log (JSON array or one record per line)
        #[arg(short, long)]
        events: PathBuf,
    },
}

fn main() -> Result<()> {
    // Logs to stderr; stdout carries the workspace XML.
    fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let config = ReplayConfig::load(args.config.as_deref())?;
    tracing::debug!(?config, "config loaded");

    match args.command {
        Command::Replay {
            workspace,
            events,
            undo,
            redo,
            output,
        } => {
            let ws = load_workspace(&workspace, &config)?;
            let log = load_events(&events, &ws)?;
            let (ws, report) = replay(ws, log, undo, redo, &config);
            tracing::info!(
                replayed = report.replayed,
                delivered = report.delivered,
                undone = report.undone,
                redone = report.redone,
                "replay complete"
            );

            let text = dom::workspace_to_dom(&ws).to_text().context("serializing workspace")?;
            match output {
                Some(path) => {
                    std::fs::write(&path, text + "\n").with_context(|| format!("writing {}", path.display()))?;
                    tracing::info!(path = %path.display(), "workspace written");
                }
                None => println!("{text}"),
            }
        }
        Command::Inspect { events } => {
            // Records decode against a scratch workspace; nothing is run.
            let scratch = Workspace::new();
            let log = load_events(&events, &scratch)?;
            for (i, event) in log.iter().enumerate() {
                let s = EventSummary::of(event);
                println!(
                    "{i:>4}  {:<7} block={:<22} group={:<22} undo={:<5} null={}",
                    s.event_type,
                    s.block_id.as_deref().unwrap_or("-"),
                    s.group.as_deref().unwrap_or("-"),
                    s.record_undo,
                    s.is_null,
                );
            }
            for (event_type, count) in count_by_type(&log) {
                println!("{event_type}: {count}");
            }
        }
    }

    Ok(())
}
