use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod batch;
pub mod catalog;
pub mod config_file;
pub mod dedup;
pub mod engine;
pub mod extension;
pub mod extract;
pub mod history;
pub mod keywords;
pub mod pool;
pub mod predict;
pub mod relevance;
pub mod rules;
pub mod select;

// Re-export for convenience
pub use batch::{BatchOutcome, CrawlOptions, PhaseOne, ResolvedBatch, crawl_conferences};
pub use catalog::{ConferenceConfig, ConferenceEntry, DateValue, load_conferences, load_rules};
pub use engine::{DeadlineEngine, EngineSettings, ResolvedConference};
pub use history::{HistoryEntry, HistoryLedger, PriorDeadlines};
pub use keywords::KeywordSet;
pub use rules::{ExtractionRule, RuleDocument, RuleOverride};
pub use select::Selection;

/// A date observed on a call-for-papers page, with the signals of the line(s)
/// it was found on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub date: NaiveDate,
    /// The matched token, after year completion.
    pub raw: String,
    /// Leading slice of the source line, kept for auditing.
    pub context: String,
    pub has_keyword: bool,
    pub is_firm: bool,
    pub is_extension: bool,
}

/// Whether any source of a conference produced text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FetchStatus {
    Ok,
    Fallback,
}

impl FetchStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            FetchStatus::Ok => "ok",
            FetchStatus::Fallback => "fallback",
        }
    }
}

/// Final, per-conference output of a crawl run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeadlineResult {
    pub id: String,
    pub family: Option<String>,
    pub year: Option<i32>,
    pub name: String,
    pub short_name: Option<String>,
    pub url: String,
    pub deadline_iso: NaiveDate,
    pub deadline_dates_found: Vec<NaiveDate>,
    pub is_firm_deadline: bool,
    pub observed_extension_days: u32,
    pub confidence: f64,
    pub last_checked_utc: DateTime<Utc>,
    pub status: FetchStatus,
    pub error: Option<String>,
    pub fallback_deadline: NaiveDate,
    pub predicted_extension_days: u32,
    pub stretch_until_iso: NaiveDate,
}

/// Outcome of fetching one URL.
///
/// A fetch succeeded when it produced at least one line. `error` may be set
/// alongside lines when the fetch succeeded in a degraded way.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FetchedPage {
    pub lines: Vec<String>,
    pub error: Option<String>,
}

impl FetchedPage {
    pub fn ok(lines: Vec<String>) -> Self {
        Self { lines, error: None }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            lines: vec![],
            error: Some(error.into()),
        }
    }

    pub fn is_success(&self) -> bool {
        !self.lines.is_empty()
    }
}

/// A fetched page tagged with the URL it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourcePage {
    pub url: String,
    pub page: FetchedPage,
}

/// Something that turns a URL into trimmed, non-empty text lines.
pub trait LineSource: Send + Sync {
    fn fetch<'a>(&'a self, url: &'a str) -> Pin<Box<dyn Future<Output = FetchedPage> + Send + 'a>>;
}

/// Progress events emitted while crawling.
#[derive(Debug, Clone)]
pub enum CrawlEvent {
    Fetching {
        index: usize,
        total: usize,
        id: String,
        urls: usize,
    },
    SourceFailed {
        id: String,
        url: String,
        error: String,
    },
    Resolved {
        index: usize,
        total: usize,
        id: String,
        deadline: NaiveDate,
        is_firm: bool,
        status: FetchStatus,
        confidence: f64,
    },
    /// A conference entry could not be turned into a valid configuration.
    Rejected {
        index: usize,
        total: usize,
        error: String,
    },
}

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("conference {conference}: missing required field `{field}`")]
    MissingField {
        conference: String,
        field: &'static str,
    },
    #[error("conference {conference}: `{field}` value {value:?} is not a date")]
    InvalidDate {
        conference: String,
        field: &'static str,
        value: String,
    },
    #[error("config error in {}: {source}", path.display())]
    Config {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("crawl stopped before {missing} conference(s) finished")]
    IncompleteBatch { missing: usize },
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
