//! JSON files under the data directory.
//!
//! `conferences.json` holds the results of the last run, `deadline_history.json`
//! the append-only ledger. A missing file reads as empty. Writes go to a
//! temporary file next to the target and are renamed over it, so a crash never
//! leaves a truncated file behind.

use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::Context;
use deadliner_core::history::PriorRecord;
use deadliner_core::{DeadlineResult, HistoryEntry, HistoryLedger, PriorDeadlines};
use serde::Serialize;

pub const RESULTS_FILE: &str = "conferences.json";
pub const HISTORY_FILE: &str = "deadline_history.json";

pub fn results_path(data_dir: &Path) -> PathBuf {
    data_dir.join(RESULTS_FILE)
}

pub fn history_path(data_dir: &Path) -> PathBuf {
    data_dir.join(HISTORY_FILE)
}

/// Deadlines from the previous results file. Only `id` and `deadline_iso`
/// are read; every other field may be missing or malformed.
pub fn load_prior(path: &Path) -> anyhow::Result<PriorDeadlines> {
    let Some(content) = read_if_exists(path)? else {
        return Ok(PriorDeadlines::default());
    };
    let records: Vec<PriorRecord> = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse previous results {}", path.display()))?;
    Ok(PriorDeadlines::from_records(records))
}

pub fn load_history(path: &Path) -> anyhow::Result<HistoryLedger> {
    let Some(content) = read_if_exists(path)? else {
        return Ok(HistoryLedger::default());
    };
    let entries: Vec<HistoryEntry> = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse history {}", path.display()))?;
    Ok(HistoryLedger::new(entries))
}

/// Write both files of a finished run.
pub fn save_run(data_dir: &Path, results: &[DeadlineResult], ledger: &HistoryLedger) -> anyhow::Result<()> {
    write_json_atomic(&results_path(data_dir), results)?;
    write_json_atomic(&history_path(data_dir), ledger.entries())?;
    Ok(())
}

/// Pretty-print `value` as JSON and atomically replace `path` with it.
pub fn write_json_atomic<T: Serialize + ?Sized>(path: &Path, value: &T) -> anyhow::Result<()> {
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };
    std::fs::create_dir_all(&dir)
        .with_context(|| format!("Failed to create data directory {}", dir.display()))?;

    let mut tmp = tempfile::NamedTempFile::new_in(&dir)
        .with_context(|| format!("Failed to create temporary file in {}", dir.display()))?;
    serde_json::to_writer_pretty(&mut tmp, value)
        .with_context(|| format!("Failed to serialize {}", path.display()))?;
    tmp.flush()?;
    tmp.persist(path)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(())
}

fn read_if_exists(path: &Path) -> anyhow::Result<Option<String>> {
    match std::fs::read_to_string(path) {
        Ok(content) => Ok(Some(content)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e).with_context(|| format!("Failed to read {}", path.display())),
    }
}
