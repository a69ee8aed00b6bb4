//! Worker pool for the per-conference phase of a crawl.
//!
//! Architecture: one shared job queue drained by `num_workers` worker tasks.
//! A worker owns a job end to end: it fetches every source URL of the
//! conference through the [`LineSource`], resolves the deadline, and sends the
//! result back on the job's oneshot channel. Workers share nothing mutable.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::catalog::ConferenceConfig;
use crate::engine::{DeadlineEngine, ResolvedConference};
use crate::history::PriorDeadlines;
use crate::{CrawlEvent, LineSource, SourcePage};

/// A conference submitted to the pool.
pub struct CrawlJob {
    pub conference: ConferenceConfig,
    pub result_tx: oneshot::Sender<ResolvedConference>,
    pub index: usize,
    pub total: usize,
    pub progress: Arc<dyn Fn(CrawlEvent) + Send + Sync>,
}

/// Read-only state every worker needs.
struct WorkerContext {
    engine: Arc<DeadlineEngine>,
    source: Arc<dyn LineSource>,
    prior: Arc<PriorDeadlines>,
    now: DateTime<Utc>,
}

/// A pool of worker tasks resolving conferences.
///
/// Submit jobs via [`submit()`](CrawlPool::submit), receive results via the
/// oneshot receiver paired with each job. A job dropped because of
/// cancellation closes its channel without a result.
pub struct CrawlPool {
    job_tx: async_channel::Sender<CrawlJob>,
    pool_handle: JoinHandle<()>,
}

impl CrawlPool {
    pub fn new(
        engine: Arc<DeadlineEngine>,
        source: Arc<dyn LineSource>,
        prior: Arc<PriorDeadlines>,
        now: DateTime<Utc>,
        cancel: CancellationToken,
        num_workers: usize,
    ) -> Self {
        let (job_tx, job_rx) = async_channel::unbounded::<CrawlJob>();
        let ctx = Arc::new(WorkerContext {
            engine,
            source,
            prior,
            now,
        });

        let pool_handle = tokio::spawn(async move {
            let mut handles = Vec::with_capacity(num_workers.max(1));
            for _ in 0..num_workers.max(1) {
                handles.push(tokio::spawn(worker_loop(
                    job_rx.clone(),
                    ctx.clone(),
                    cancel.clone(),
                )));
            }

            // Drop our clone so workers are the last holders
            drop(job_rx);

            for h in handles {
                let _ = h.await;
            }
        });

        Self {
            job_tx,
            pool_handle,
        }
    }

    /// Submit a job to the pool.
    pub async fn submit(&self, job: CrawlJob) {
        let _ = self.job_tx.send(job).await;
    }

    /// Close the queue and wait for the workers to finish outstanding jobs.
    pub async fn shutdown(self) {
        self.job_tx.close();
        let _ = self.pool_handle.await;
    }
}

async fn worker_loop(
    job_rx: async_channel::Receiver<CrawlJob>,
    ctx: Arc<WorkerContext>,
    cancel: CancellationToken,
) {
    while let Ok(job) = job_rx.recv().await {
        if cancel.is_cancelled() {
            tracing::debug!(id = %job.conference.id, "skipping: cancelled");
            continue;
        }
        if let Some(resolved) = run_job(&job, &ctx, &cancel).await {
            let _ = job.result_tx.send(resolved);
        }
    }
}

async fn run_job(
    job: &CrawlJob,
    ctx: &WorkerContext,
    cancel: &CancellationToken,
) -> Option<ResolvedConference> {
    let conference = &job.conference;
    let urls = conference.sources();

    (job.progress)(CrawlEvent::Fetching {
        index: job.index,
        total: job.total,
        id: conference.id.clone(),
        urls: urls.len(),
    });

    let mut pages = Vec::with_capacity(urls.len());
    for url in urls {
        let page = tokio::select! {
            page = ctx.source.fetch(url) => page,
            _ = cancel.cancelled() => return None,
        };
        if let Some(err) = &page.error {
            tracing::warn!(id = %conference.id, url, error = %err, "source fetch problem");
            (job.progress)(CrawlEvent::SourceFailed {
                id: conference.id.clone(),
                url: url.to_string(),
                error: err.clone(),
            });
        } else {
            tracing::debug!(id = %conference.id, url, lines = page.lines.len(), "fetched source");
        }
        pages.push(SourcePage {
            url: url.to_string(),
            page,
        });
    }

    let prior = ctx.prior.get(&conference.id);
    let resolved = ctx.engine.resolve(conference, pages, prior, ctx.now);

    (job.progress)(CrawlEvent::Resolved {
        index: job.index,
        total: job.total,
        id: resolved.id.clone(),
        deadline: resolved.deadline,
        is_firm: resolved.is_firm,
        status: resolved.status,
        confidence: resolved.confidence,
    });

    Some(resolved)
}
