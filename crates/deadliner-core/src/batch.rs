//! The two crawl phases and the barrier between them.
//!
//! Phase one ([`crawl_conferences`]) resolves every conference independently
//! and concurrently. Its output is only usable for prediction once frozen
//! into a [`ResolvedBatch`], which requires every conference to have
//! finished. Phase two ([`ResolvedBatch::predict`]) reads the frozen batch to
//! compute family-based extension predictions.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio_util::sync::CancellationToken;

use crate::catalog::ConferenceEntry;
use crate::engine::{DeadlineEngine, ResolvedConference};
use crate::history::{HistoryEntry, PriorDeadlines};
use crate::pool::{CrawlJob, CrawlPool};
use crate::predict::{Observation, predict_extension_days};
use crate::{CoreError, CrawlEvent, DeadlineResult, LineSource};

/// Knobs for one crawl run.
#[derive(Debug, Clone, Copy)]
pub struct CrawlOptions {
    pub concurrency: usize,
    /// Timestamp stamped on results and history entries of this run.
    pub now: DateTime<Utc>,
}

/// Output of the first phase.
#[derive(Debug, Default)]
pub struct PhaseOne {
    /// Resolved conferences, in catalog order.
    pub resolved: Vec<ResolvedConference>,
    /// Entries rejected for configuration errors.
    pub rejected: Vec<CoreError>,
    /// Ids of conferences that never finished (cancelled run).
    pub unfinished: Vec<String>,
}

impl PhaseOne {
    /// Close phase one. Fails if any conference didn't finish, since
    /// predictions need the complete peer set.
    pub fn freeze(self) -> Result<ResolvedBatch, CoreError> {
        if !self.unfinished.is_empty() {
            return Err(CoreError::IncompleteBatch {
                missing: self.unfinished.len(),
            });
        }
        Ok(ResolvedBatch {
            conferences: self.resolved,
        })
    }
}

/// The complete, read-only result of phase one.
#[derive(Debug, Clone, Default)]
pub struct ResolvedBatch {
    conferences: Vec<ResolvedConference>,
}

/// Output of the second phase.
#[derive(Debug, Clone, Default)]
pub struct BatchOutcome {
    /// Final results, sorted by deadline.
    pub results: Vec<DeadlineResult>,
    /// History entries produced by this run, in catalog order.
    pub history: Vec<HistoryEntry>,
}

impl ResolvedBatch {
    /// Freeze an already complete set of resolved conferences.
    pub fn new(conferences: Vec<ResolvedConference>) -> Self {
        Self { conferences }
    }

    pub fn conferences(&self) -> &[ResolvedConference] {
        &self.conferences
    }

    pub fn len(&self) -> usize {
        self.conferences.len()
    }

    pub fn is_empty(&self) -> bool {
        self.conferences.is_empty()
    }

    /// Predict extensions for every conference from its family peers.
    ///
    /// Each prediction reads the whole batch and writes nothing back, so the
    /// order of evaluation doesn't matter.
    pub fn predict(self) -> BatchOutcome {
        let observations: Vec<Observation<'_>> =
            self.conferences.iter().map(|c| c.observation()).collect();
        let predicted: Vec<u32> = self
            .conferences
            .iter()
            .zip(&observations)
            .map(|(c, obs)| predict_extension_days(obs, &observations, c.prediction))
            .collect();
        drop(observations);

        let mut history = Vec::new();
        let mut results: Vec<DeadlineResult> = self
            .conferences
            .into_iter()
            .zip(predicted)
            .map(|(mut c, days)| {
                history.extend(c.history.take());
                c.into_result(days)
            })
            .collect();
        // stable: equal deadlines keep catalog order
        results.sort_by_key(|r| r.deadline_iso);

        BatchOutcome { results, history }
    }
}

/// Run phase one over a catalog.
///
/// Entries are validated first; invalid ones are reported through
/// [`CrawlEvent::Rejected`] and collected in [`PhaseOne::rejected`]. The rest
/// are resolved by a [`CrawlPool`] with `options.concurrency` workers.
pub async fn crawl_conferences(
    entries: Vec<ConferenceEntry>,
    engine: Arc<DeadlineEngine>,
    source: Arc<dyn LineSource>,
    prior: Arc<PriorDeadlines>,
    options: CrawlOptions,
    progress: impl Fn(CrawlEvent) + Send + Sync + 'static,
    cancel: CancellationToken,
) -> PhaseOne {
    let total = entries.len();
    let progress: Arc<dyn Fn(CrawlEvent) + Send + Sync> = Arc::new(progress);
    let mut phase = PhaseOne::default();
    if total == 0 {
        return phase;
    }

    let pool = CrawlPool::new(
        engine,
        source,
        prior,
        options.now,
        cancel.clone(),
        options.concurrency.max(1),
    );

    let mut receivers = Vec::with_capacity(total);
    for (index, entry) in entries.into_iter().enumerate() {
        let conference = match entry.validate(index) {
            Ok(c) => c,
            Err(e) => {
                tracing::error!(error = %e, "rejecting conference entry");
                progress(CrawlEvent::Rejected {
                    index,
                    total,
                    error: e.to_string(),
                });
                phase.rejected.push(e);
                continue;
            }
        };

        let id = conference.id.clone();
        let (result_tx, result_rx) = tokio::sync::oneshot::channel();
        pool.submit(CrawlJob {
            conference,
            result_tx,
            index,
            total,
            progress: progress.clone(),
        })
        .await;
        receivers.push((id, result_rx));
    }

    for (id, rx) in receivers {
        match rx.await {
            Ok(resolved) => phase.resolved.push(resolved),
            Err(_) => phase.unfinished.push(id),
        }
    }

    pool.shutdown().await;

    if !phase.unfinished.is_empty() {
        tracing::warn!(unfinished = phase.unfinished.len(), "crawl incomplete");
    }
    phase
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::FetchStatus;
    use crate::predict::PredictionParams;
    use chrono::{NaiveDate, TimeZone};

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn resolved(id: &str, year: i32, deadline: NaiveDate, firm: bool, observed: u32) -> ResolvedConference {
        ResolvedConference {
            id: id.into(),
            family: Some("usenix".into()),
            year: Some(year),
            name: id.into(),
            short_name: None,
            url: format!("https://{id}.example"),
            deadline,
            dates_found: vec![deadline],
            is_firm: firm,
            observed_extension_days: observed,
            confidence: 0.8,
            checked_at: Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap(),
            status: FetchStatus::Ok,
            error: None,
            fallback_deadline: deadline,
            prediction: PredictionParams {
                default_days: 14,
                training_cap_days: 90,
            },
            history: None,
        }
    }

    #[test]
    fn predicts_from_earlier_family_years() {
        let batch = ResolvedBatch::new(vec![
            resolved("sec-2025", 2025, ymd(2025, 2, 1), false, 0),
            resolved("sec-2022", 2022, ymd(2022, 2, 1), false, 10),
            resolved("sec-2023", 2023, ymd(2023, 2, 1), false, 20),
            resolved("sec-2024", 2024, ymd(2024, 2, 1), false, 200),
        ]);
        let outcome = batch.predict();
        let target = outcome.results.iter().find(|r| r.id == "sec-2025").unwrap();
        assert_eq!(target.predicted_extension_days, 15);
        assert_eq!(target.stretch_until_iso, ymd(2025, 2, 16));
        // earliest year has no earlier peers
        let oldest = outcome.results.iter().find(|r| r.id == "sec-2022").unwrap();
        assert_eq!(oldest.predicted_extension_days, 14);
    }

    #[test]
    fn results_sorted_by_deadline() {
        let batch = ResolvedBatch::new(vec![
            resolved("c", 2025, ymd(2025, 9, 1), true, 0),
            resolved("a", 2025, ymd(2025, 1, 1), true, 0),
            resolved("b", 2025, ymd(2025, 5, 1), true, 0),
        ]);
        let ids: Vec<_> = batch.predict().results.into_iter().map(|r| r.id).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
    }

    #[test]
    fn firm_results_predict_zero() {
        let batch = ResolvedBatch::new(vec![
            resolved("sec-2025", 2025, ymd(2025, 2, 1), true, 0),
            resolved("sec-2022", 2022, ymd(2022, 2, 1), false, 10),
        ]);
        let outcome = batch.predict();
        let firm = outcome.results.iter().find(|r| r.id == "sec-2025").unwrap();
        assert_eq!(firm.predicted_extension_days, 0);
        assert_eq!(firm.stretch_until_iso, firm.deadline_iso);
    }

    #[test]
    fn unfinished_phase_cannot_be_frozen() {
        let phase = PhaseOne {
            unfinished: vec!["x".into()],
            ..Default::default()
        };
        assert!(matches!(
            phase.freeze(),
            Err(CoreError::IncompleteBatch { missing: 1 })
        ));
    }
}
