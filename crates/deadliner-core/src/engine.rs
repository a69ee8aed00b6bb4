//! Per-conference deadline resolution (the first, parallel phase of a crawl).

use chrono::{DateTime, NaiveDate, Utc};

use crate::catalog::ConferenceConfig;
use crate::dedup::dedup_candidates;
use crate::extension::{DEFAULT_LOOKBACK_DAYS, observed_extension_days};
use crate::extract::{DEFAULT_CONTEXT_CHARS, extract_candidates};
use crate::history::HistoryEntry;
use crate::predict::{Observation, PredictionParams, stretch_until};
use crate::rules::{ExtractionRule, RuleDocument};
use crate::select::{Selection, select_deadline};
use crate::{Candidate, DeadlineResult, FetchStatus, SourcePage};

/// Tunables of the engine that aren't part of the rule document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineSettings {
    /// Window before the deadline in which earlier dates count as drift.
    pub lookback_days: u32,
    /// Characters of a source line kept on each candidate.
    pub context_chars: usize,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            lookback_days: DEFAULT_LOOKBACK_DAYS,
            context_chars: DEFAULT_CONTEXT_CHARS,
        }
    }
}

/// Resolves deadlines from already-fetched lines. Holds no I/O handles, so it
/// can be shared across workers and built directly in tests.
#[derive(Debug, Clone, Default)]
pub struct DeadlineEngine {
    rules: RuleDocument,
    settings: EngineSettings,
}

/// Everything known about one conference after the first phase.
///
/// The predicted extension is still missing; it needs the whole batch (see
/// [`crate::batch::ResolvedBatch`]).
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedConference {
    pub id: String,
    pub family: Option<String>,
    pub year: Option<i32>,
    pub name: String,
    pub short_name: Option<String>,
    pub url: String,
    pub deadline: NaiveDate,
    /// Distinct dates up to and including the deadline, sorted.
    pub dates_found: Vec<NaiveDate>,
    pub is_firm: bool,
    pub observed_extension_days: u32,
    pub confidence: f64,
    pub checked_at: DateTime<Utc>,
    pub status: FetchStatus,
    pub error: Option<String>,
    pub fallback_deadline: NaiveDate,
    pub prediction: PredictionParams,
    /// Set when the deadline differs from the previous run.
    pub history: Option<HistoryEntry>,
}

impl DeadlineEngine {
    pub fn new(rules: RuleDocument, settings: EngineSettings) -> Self {
        Self { rules, settings }
    }

    pub fn rule_for(&self, conference: &ConferenceConfig) -> ExtractionRule {
        self.rules.resolve(conference)
    }

    /// Deduplicated candidates found in `lines`, sorted by date.
    pub fn candidates<S: AsRef<str>>(
        &self,
        lines: &[S],
        rule: &ExtractionRule,
        target_year: Option<i32>,
    ) -> Vec<Candidate> {
        if lines.is_empty() {
            return vec![];
        }
        let raw = extract_candidates(lines, rule, target_year, self.settings.context_chars);
        dedup_candidates(raw)
    }

    /// Deadline choice for one conference from its lines, seeds applied.
    pub fn select<S: AsRef<str>>(&self, conference: &ConferenceConfig, lines: &[S]) -> (Vec<Candidate>, Selection) {
        let rule = self.rule_for(conference);
        let candidates = self.candidates(lines, &rule, conference.year);
        let selection = select_deadline(&candidates, conference.fallback_deadline, conference.year)
            .with_seeds(&conference.seed_dates);
        (candidates, selection)
    }

    /// Resolve one conference from the pages fetched for it.
    ///
    /// `prior` is the deadline recorded by the previous run, used only to
    /// decide whether a history entry is due.
    pub fn resolve(
        &self,
        conference: &ConferenceConfig,
        pages: Vec<SourcePage>,
        prior: Option<NaiveDate>,
        now: DateTime<Utc>,
    ) -> ResolvedConference {
        let rule = self.rule_for(conference);

        let mut lines: Vec<String> = Vec::new();
        let mut errors: Vec<String> = Vec::new();
        let mut successes = 0usize;
        for SourcePage { url, page } in pages {
            if page.is_success() {
                successes += 1;
            }
            if let Some(err) = page.error {
                errors.push(format!("{url}: {err}"));
            }
            lines.extend(page.lines);
        }

        let candidates = self.candidates(&lines, &rule, conference.year);
        let selection = select_deadline(&candidates, conference.fallback_deadline, conference.year)
            .with_seeds(&conference.seed_dates);
        let deadline = selection.deadline;

        let mut dates_found: Vec<NaiveDate> = conference
            .seed_dates
            .iter()
            .copied()
            .chain(candidates.iter().map(|c| c.date))
            .filter(|d| *d <= deadline)
            .chain(std::iter::once(deadline))
            .collect();
        dates_found.sort_unstable();
        dates_found.dedup();

        let observed = observed_extension_days(&dates_found, deadline, self.settings.lookback_days);
        let status = if successes > 0 {
            FetchStatus::Ok
        } else {
            FetchStatus::Fallback
        };

        tracing::info!(
            id = %conference.id,
            deadline = %deadline,
            firm = selection.is_firm,
            confidence = selection.confidence,
            candidates = candidates.len(),
            status = status.as_str(),
            "resolved deadline"
        );

        ResolvedConference {
            id: conference.id.clone(),
            family: conference.family.clone(),
            year: conference.year,
            name: conference.name.clone(),
            short_name: conference.short_name.clone(),
            url: conference.url.clone(),
            deadline,
            dates_found,
            is_firm: selection.is_firm,
            observed_extension_days: observed,
            confidence: selection.confidence,
            checked_at: now,
            status,
            error: (!errors.is_empty()).then(|| errors.join(" | ")),
            fallback_deadline: conference.fallback_deadline,
            prediction: rule.prediction_params(),
            history: HistoryEntry::on_change(&conference.id, prior, deadline, selection.is_firm, now),
        }
    }
}

impl ResolvedConference {
    pub fn observation(&self) -> Observation<'_> {
        Observation {
            id: &self.id,
            family: self.family.as_deref(),
            year: self.year,
            is_firm: self.is_firm,
            observed_extension_days: self.observed_extension_days,
        }
    }

    /// Attach the predicted extension and produce the final record.
    pub fn into_result(self, predicted_extension_days: u32) -> DeadlineResult {
        let predicted = if self.is_firm { 0 } else { predicted_extension_days };
        DeadlineResult {
            stretch_until_iso: stretch_until(self.deadline, predicted),
            id: self.id,
            family: self.family,
            year: self.year,
            name: self.name,
            short_name: self.short_name,
            url: self.url,
            deadline_iso: self.deadline,
            deadline_dates_found: self.dates_found,
            is_firm_deadline: self.is_firm,
            observed_extension_days: self.observed_extension_days,
            confidence: self.confidence,
            last_checked_utc: self.checked_at,
            status: self.status,
            error: self.error,
            fallback_deadline: self.fallback_deadline,
            predicted_extension_days: predicted,
        }
    }
}
