//! Append-only record of deadline changes.

use std::collections::HashMap;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::DeadlineResult;

/// Source tag written on entries produced by a crawl.
pub const CRAWLER_SOURCE: &str = "crawler";

/// One observed deadline value for a conference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub conference_id: String,
    pub seen_at_utc: DateTime<Utc>,
    pub deadline_iso: NaiveDate,
    pub source: String,
    pub is_firm_deadline: bool,
}

impl HistoryEntry {
    /// Entry to record when `deadline` differs from the previous run's value,
    /// or when there was no previous run for this conference.
    pub fn on_change(
        conference_id: &str,
        prior: Option<NaiveDate>,
        deadline: NaiveDate,
        is_firm: bool,
        seen_at: DateTime<Utc>,
    ) -> Option<HistoryEntry> {
        if prior == Some(deadline) {
            return None;
        }
        Some(HistoryEntry {
            conference_id: conference_id.to_string(),
            seen_at_utc: seen_at,
            deadline_iso: deadline,
            source: CRAWLER_SOURCE.to_string(),
            is_firm_deadline: is_firm,
        })
    }
}

/// All history entries, kept ordered by `seen_at_utc`.
///
/// Entries are only ever appended; existing ones are never touched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HistoryLedger {
    entries: Vec<HistoryEntry>,
}

impl HistoryLedger {
    pub fn new(mut entries: Vec<HistoryEntry>) -> Self {
        entries.sort_by_key(|e| e.seen_at_utc);
        Self { entries }
    }

    /// Append new entries and restore timestamp order. Returns how many were
    /// added.
    pub fn append(&mut self, new_entries: impl IntoIterator<Item = HistoryEntry>) -> usize {
        let before = self.entries.len();
        self.entries.extend(new_entries);
        // stable: entries sharing a timestamp keep insertion order
        self.entries.sort_by_key(|e| e.seen_at_utc);
        self.entries.len() - before
    }

    pub fn entries(&self) -> &[HistoryEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Most recent entry for one conference.
    pub fn latest_for(&self, conference_id: &str) -> Option<&HistoryEntry> {
        self.entries
            .iter()
            .rev()
            .find(|e| e.conference_id == conference_id)
    }
}

/// Deadline per conference from a previous run, used only to detect changes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PriorDeadlines {
    by_id: HashMap<String, NaiveDate>,
}

/// The part of a previously written result that change detection reads.
/// Everything else in the file is ignored.
#[derive(Debug, Clone, Deserialize)]
pub struct PriorRecord {
    pub id: String,
    #[serde(default)]
    pub deadline_iso: Option<NaiveDate>,
}

impl PriorDeadlines {
    pub fn from_records(records: impl IntoIterator<Item = PriorRecord>) -> Self {
        let by_id = records
            .into_iter()
            .filter_map(|r| Some((r.id, r.deadline_iso?)))
            .collect();
        Self { by_id }
    }

    pub fn from_results(results: &[DeadlineResult]) -> Self {
        let by_id = results
            .iter()
            .map(|r| (r.id.clone(), r.deadline_iso))
            .collect();
        Self { by_id }
    }

    pub fn get(&self, id: &str) -> Option<NaiveDate> {
        self.by_id.get(id).copied()
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn at(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 1, hour, 0, 0).unwrap()
    }

    #[test]
    fn entry_only_when_deadline_changes() {
        let d = ymd(2025, 3, 3);
        assert!(HistoryEntry::on_change("a", Some(d), d, true, at(0)).is_none());
        let e = HistoryEntry::on_change("a", Some(ymd(2025, 2, 1)), d, true, at(0)).unwrap();
        assert_eq!(e.deadline_iso, d);
        assert_eq!(e.source, CRAWLER_SOURCE);
        assert!(HistoryEntry::on_change("a", None, d, false, at(0)).is_some());
    }

    #[test]
    fn ledger_stays_sorted_and_append_only() {
        let first = HistoryEntry::on_change("a", None, ymd(2025, 3, 1), false, at(5)).unwrap();
        let mut ledger = HistoryLedger::new(vec![first.clone()]);
        let added = ledger.append(vec![
            HistoryEntry::on_change("b", None, ymd(2025, 4, 1), false, at(9)).unwrap(),
            HistoryEntry::on_change("c", None, ymd(2025, 5, 1), false, at(1)).unwrap(),
        ]);
        assert_eq!(added, 2);
        let ids: Vec<_> = ledger.entries().iter().map(|e| e.conference_id.as_str()).collect();
        assert_eq!(ids, vec!["c", "a", "b"]);
        assert!(ledger.entries().contains(&first));
    }

    #[test]
    fn same_timestamp_keeps_insertion_order() {
        let mut ledger = HistoryLedger::default();
        ledger.append(["x", "y", "z"].map(|id| {
            HistoryEntry::on_change(id, None, ymd(2025, 1, 1), false, at(3)).unwrap()
        }));
        let ids: Vec<_> = ledger.entries().iter().map(|e| e.conference_id.as_str()).collect();
        assert_eq!(ids, vec!["x", "y", "z"]);
    }

    #[test]
    fn latest_for_returns_newest() {
        let ledger = HistoryLedger::new(vec![
            HistoryEntry::on_change("a", None, ymd(2025, 3, 1), false, at(1)).unwrap(),
            HistoryEntry::on_change("a", None, ymd(2025, 3, 8), false, at(2)).unwrap(),
        ]);
        assert_eq!(ledger.latest_for("a").unwrap().deadline_iso, ymd(2025, 3, 8));
        assert!(ledger.latest_for("zzz").is_none());
    }

    #[test]
    fn prior_records_ignore_extra_fields() {
        let json = r#"[
            {"id": "sp-2025", "deadline_iso": "2025-03-03", "confidence": 0.9},
            {"id": "broken"}
        ]"#;
        let records: Vec<PriorRecord> = serde_json::from_str(json).unwrap();
        let prior = PriorDeadlines::from_records(records);
        assert_eq!(prior.get("sp-2025"), Some(ymd(2025, 3, 3)));
        assert_eq!(prior.get("broken"), None);
        assert_eq!(prior.len(), 1);
    }
}
