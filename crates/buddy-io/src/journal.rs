//! JSONL action journal.
//!
//! One entry per line, opened in append mode so successive runs
//! accumulate in the same file. The journal records what the controller
//! did and when (in ticks), not what the simulated world looked like.

use buddy_core::DispatchStats;
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::Path;
use std::sync::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};

/// Types of events that show up in the journal
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JournalEventType {
    /// Controller came up; details carry version, tick length and the
    /// device inventory
    RunStart,
    /// A key press was dispatched as a command
    Command,
    /// A canned script played to completion
    ScriptFinished,
    /// The dispatch loop exited; details carry the final stats
    RunEnd,
}

/// A single journal line
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JournalEntry {
    /// Simulation tick the event belongs to (0 for run_start)
    pub tick: u64,
    /// Wall-clock Unix timestamp in microseconds
    pub unix_us: u64,
    /// Type of event being recorded
    pub event: JournalEventType,
    /// Event-specific details
    pub details: serde_json::Value,
}

/// Thread-safe journal writing controller events to a JSONL file
pub struct Journal {
    writer: Mutex<BufWriter<File>>,
}

impl Journal {
    /// Open the journal at the specified path, creating parent
    /// directories as needed. The file is opened in append mode to
    /// preserve earlier runs.
    pub fn new(path: &Path) -> std::io::Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let file = OpenOptions::new().create(true).append(true).open(path)?;

        Ok(Self {
            writer: Mutex::new(BufWriter::with_capacity(8192, file)),
        })
    }

    /// Record controller startup.
    pub fn run_start(&self, version: &str, tick_ms: u64, devices: &[&str]) -> std::io::Result<()> {
        self.write(
            0,
            JournalEventType::RunStart,
            serde_json::json!({
                "version": version,
                "tick_ms": tick_ms,
                "devices": devices,
            }),
        )
    }

    /// Record a dispatched command by its stable label.
    pub fn command(&self, tick: u64, label: &str) -> std::io::Result<()> {
        self.write(
            tick,
            JournalEventType::Command,
            serde_json::json!({ "command": label }),
        )
    }

    /// Record a script playing out its final tick.
    pub fn script_finished(&self, tick: u64, script: &str) -> std::io::Result<()> {
        self.write(
            tick,
            JournalEventType::ScriptFinished,
            serde_json::json!({ "script": script }),
        )
    }

    /// Record the end of the run together with the loop's counters.
    pub fn run_end(&self, tick: u64, stats: &DispatchStats) -> std::io::Result<()> {
        let details = serde_json::to_value(stats).map_err(std::io::Error::other)?;
        self.write(tick, JournalEventType::RunEnd, details)
    }

    fn write(
        &self,
        tick: u64,
        event: JournalEventType,
        details: serde_json::Value,
    ) -> std::io::Result<()> {
        let entry = JournalEntry {
            tick,
            unix_us: unix_us(),
            event,
            details,
        };
        let mut writer = self.writer.lock().unwrap();
        serde_json::to_writer(&mut *writer, &entry)?;
        writer.write_all(b"\n")?;
        writer.flush()
    }
}

fn unix_us() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_micros() as u64)
        .unwrap_or(0)
}
